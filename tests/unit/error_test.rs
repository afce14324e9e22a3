//! Tests for error types and multi-error flattening

use allocator_vacate::core::{Errors, MultiError, PoolError};
use allocator_vacate::output::OutputFormat;
use allocator_vacate::vacate::{ResourceKind, VacateError};

#[test]
fn test_pool_error_display() {
    assert_eq!(
        PoolError::AlreadyStopped.to_string(),
        "pool: cannot stop an already stopped pool"
    );
    assert_eq!(
        PoolError::StopOperationTimedOut.to_string(),
        "pool: the stop operation timed out, some work was abandoned"
    );
}

#[test]
fn test_empty_multierror_is_ok() {
    let merr = MultiError::new();
    assert!(merr.is_empty());
    assert_eq!(merr.to_string(), "no errors");
    assert!(merr.into_result().is_ok());
}

#[test]
fn test_nested_multierrors_flatten() {
    let mut inner = MultiError::new();
    inner.push_msg("first");
    inner.push_msg("second");

    let mut wrapped = MultiError::new();
    wrapped.push_msg("third");

    let mut outer = MultiError::new();
    outer.push_error(inner);
    outer.push(anyhow::Error::new(wrapped));
    outer.push_boxed(Box::new(std::io::Error::other("fourth")));

    assert_eq!(outer.len(), 4);
    assert_eq!(
        outer.to_string(),
        "4 errors occurred:\n\t* first\n\t* second\n\t* third\n\t* fourth\n"
    );
}

#[test]
fn test_single_error_display() {
    let merr = MultiError::from(anyhow::anyhow!("boom"));
    assert_eq!(merr.to_string(), "1 error occurred:\n\t* boom\n");
}

#[test]
fn test_vacate_error_survives_anyhow_round_trip() {
    let err = VacateError::msg("i-1", "abc", "rejected").with_kind(ResourceKind::Apm);
    let merr = MultiError::from(anyhow::Error::new(err));

    let found = merr
        .iter()
        .next()
        .and_then(|e| e.downcast_ref::<VacateError>())
        .cloned()
        .unwrap();
    assert_eq!(found.resource_id, "abc");
    assert_eq!(found.kind, Some(ResourceKind::Apm));
}

#[test]
fn test_json_rendering_mixes_entry_kinds() {
    let mut merr = MultiError::new();
    merr.push_error(VacateError::msg("i-1", "abc", "rejected").with_context("failed vacating"));
    merr.push_msg("plain failure");

    let value: serde_json::Value = serde_json::from_str(&merr.render(OutputFormat::Json)).unwrap();
    let errors = value["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0]["resource_id"], "abc");
    assert_eq!(errors[0]["context"], "failed vacating");
    assert_eq!(errors[1]["message"], "plain failure");
}

#[test]
fn test_errors_accumulator_is_shared() {
    let errors = std::sync::Arc::new(Errors::new());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let errors = std::sync::Arc::clone(&errors);
            std::thread::spawn(move || errors.add(anyhow::anyhow!("worker {i} failed")))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(errors.len(), 4);
    assert_eq!(errors.snapshot().len(), 4);
    assert!(errors.result().is_err());
    errors.clear();
    assert!(errors.is_empty());
    assert!(errors.result().is_ok());
}
