//! Unit tests for individual components

mod config_test;
mod error_test;
mod output_test;
mod runtime_test;
mod status_test;
mod util_test;
