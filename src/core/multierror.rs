//! Flattening multi-error and the thread-safe accumulator built on it.
//!
//! Every phase of a vacate run appends into one [`MultiError`]. Appending an
//! error that is itself a `MultiError` (directly, boxed, or wrapped in an
//! `anyhow::Error`) splices its entries in place, so callers always see a flat
//! list no matter which layer produced the failures.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{json, Value};

use crate::output::OutputFormat;
use crate::vacate::VacateError;

/// Shared, cloneable error entry.
pub type ErrorEntry = Arc<dyn StdError + Send + Sync + 'static>;

/// An ordered, flat collection of errors.
#[derive(Clone, Default)]
pub struct MultiError {
    errors: Vec<ErrorEntry>,
}

impl MultiError {
    /// Create an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Append an `anyhow::Error`, flattening nested multi-errors.
    pub fn push(&mut self, err: anyhow::Error) {
        match err.downcast::<Self>() {
            Ok(nested) => self.extend(nested),
            Err(err) => {
                let boxed: Box<dyn StdError + Send + Sync + 'static> = err.into();
                self.push_boxed(boxed);
            }
        }
    }

    /// Append any concrete error value.
    pub fn push_error<E>(&mut self, err: E)
    where
        E: StdError + Send + Sync + 'static,
    {
        self.push_boxed(Box::new(err));
    }

    /// Append a boxed error, flattening nested multi-errors.
    pub fn push_boxed(&mut self, err: Box<dyn StdError + Send + Sync + 'static>) {
        match err.downcast::<Self>() {
            Ok(nested) => self.extend(*nested),
            Err(err) => self.errors.push(Arc::from(err)),
        }
    }

    /// Append a plain message.
    pub fn push_msg(&mut self, msg: impl fmt::Display) {
        self.push(anyhow::anyhow!("{msg}"));
    }

    /// Splice every entry of `other` onto the end of this collection.
    pub fn extend(&mut self, other: Self) {
        self.errors.extend(other.errors);
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether no error has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterate over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(dyn StdError + Send + Sync + 'static)> {
        self.errors.iter().map(AsRef::as_ref)
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one error was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Render in the requested output format.
    #[must_use]
    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => self.to_string(),
            OutputFormat::Json => {
                let entries: Vec<Value> = self
                    .iter()
                    .map(|err| match err.downcast_ref::<VacateError>() {
                        Some(vacate) => vacate.to_json_value(),
                        None => json!({ "message": err.to_string() }),
                    })
                    .collect();
                serde_json::to_string_pretty(&json!({ "errors": entries }))
                    .unwrap_or_else(|_| self.to_string())
            }
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.len() {
            0 => write!(f, "no errors"),
            1 => write!(f, "1 error occurred:\n\t* {}\n", self.errors[0]),
            n => {
                writeln!(f, "{n} errors occurred:")?;
                for err in &self.errors {
                    writeln!(f, "\t* {err}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.errors.iter().map(ToString::to_string))
            .finish()
    }
}

impl StdError for MultiError {}

impl From<anyhow::Error> for MultiError {
    fn from(err: anyhow::Error) -> Self {
        let mut merr = Self::new();
        merr.push(err);
        merr
    }
}

/// `RwLock`-guarded error accumulator shared across threads.
#[derive(Debug, Default)]
pub struct Errors {
    inner: RwLock<MultiError>,
}

impl Errors {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error.
    pub fn add(&self, err: anyhow::Error) {
        self.inner.write().push(err);
    }

    /// Number of recorded errors.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Copy of the recorded errors.
    pub fn snapshot(&self) -> MultiError {
        self.inner.read().clone()
    }

    /// Drop every recorded error.
    pub fn clear(&self) {
        *self.inner.write() = MultiError::new();
    }

    /// `Ok(())` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns a copy of the recorded errors.
    pub fn result(&self) -> Result<(), MultiError> {
        self.snapshot().into_result()
    }
}
