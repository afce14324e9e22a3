//! Per-resource vacate failure.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value;

use super::api::ResourceKind;
use crate::output::OutputFormat;

/// A failure tied to one resource on one allocator.
///
/// Renders as `allocator <id>: resource id [<id>][<kind>]: <context>: <error>`
/// in text form, or as a JSON object carrying the same fields. Allocator-wide
/// failures leave the resource ID empty and omit that segment.
#[derive(Debug, Clone, thiserror::Error)]
#[error("allocator {allocator_id}{}: {source}", scope(.resource_id, .kind, .context))]
pub struct VacateError {
    /// Allocator being vacated.
    pub allocator_id: String,
    /// Resource that failed.
    pub resource_id: String,
    /// Kind of the resource, when known.
    pub kind: Option<ResourceKind>,
    /// Phase in which the failure happened.
    pub context: String,
    source: Arc<dyn StdError + Send + Sync + 'static>,
}

impl VacateError {
    /// Build an error for `resource_id` on `allocator_id`.
    pub fn new<E>(allocator_id: impl Into<String>, resource_id: impl Into<String>, err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        let boxed: Box<dyn StdError + Send + Sync + 'static> = err.into().into();
        Self {
            allocator_id: allocator_id.into(),
            resource_id: resource_id.into(),
            kind: None,
            context: String::new(),
            source: Arc::from(boxed),
        }
    }

    /// Build an error from a plain message.
    pub fn msg(
        allocator_id: impl Into<String>,
        resource_id: impl Into<String>,
        msg: impl fmt::Display,
    ) -> Self {
        Self::new(allocator_id, resource_id, anyhow::anyhow!("{msg}"))
    }

    /// Attach the resource kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: ResourceKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Attach the phase in which the failure happened.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// The wrapped error.
    #[must_use]
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.source.as_ref()
    }

    /// JSON representation.
    #[must_use]
    pub fn to_json_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::String(self.to_string()))
    }

    /// Render in the requested output format.
    #[must_use]
    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => self.to_string(),
            OutputFormat::Json => serde_json::to_string_pretty(&self.to_json_value())
                .unwrap_or_else(|_| self.to_string()),
        }
    }
}

/// The `: resource id [..][..]: <context>` part of the text rendering.
fn scope(resource_id: &str, kind: &Option<ResourceKind>, context: &str) -> String {
    let mut out = String::new();
    if !resource_id.is_empty() {
        out.push_str(&format!(": resource id [{resource_id}]"));
        if let Some(kind) = kind {
            out.push_str(&format!("[{kind}]"));
        }
    }
    if !context.is_empty() {
        out.push_str(": ");
        out.push_str(context);
    }
    out
}

impl Serialize for VacateError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("VacateError", 5)?;
        state.serialize_field("allocator_id", &self.allocator_id)?;
        if self.resource_id.is_empty() {
            state.skip_field("resource_id")?;
        } else {
            state.serialize_field("resource_id", &self.resource_id)?;
        }
        if let Some(kind) = self.kind {
            state.serialize_field("kind", &kind)?;
        } else {
            state.skip_field("kind")?;
        }
        if self.context.is_empty() {
            state.skip_field("context")?;
        } else {
            state.serialize_field("context", &self.context)?;
        }
        state.serialize_field("error", &self.source.to_string())?;
        state.end()
    }
}
