//! Worker pool and the primitives it is built from.

pub mod counter;
pub mod error;
pub mod multierror;
pub mod pool;
pub mod status;
pub mod validator;

pub use counter::Counter;
pub use error::{AddError, AppResult, PoolError};
pub use multierror::{ErrorEntry, Errors, MultiError};
pub use pool::{
    Pool, PoolParams, RunFn, Timeout, DEFAULT_ADD_TIMEOUT, DEFAULT_STOP_TIMEOUT,
    QUEUE_CAPACITY_PER_WORKER,
};
pub use status::PoolStatus;
pub use validator::Validator;
