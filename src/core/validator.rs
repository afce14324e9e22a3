//! Work item capability contract.

use super::error::AppResult;

/// Anything the pool can run must be able to check itself first.
///
/// Workers call [`Validator::validate`] before handing an item to the run
/// function, so malformed items fail without reaching external systems.
pub trait Validator {
    /// Check the item is well formed.
    ///
    /// # Errors
    ///
    /// Returns a description of every defect found.
    fn validate(&self) -> AppResult<()>;
}
