//! Tests for output devices and formats

use allocator_vacate::output::{OutputDevice, OutputFormat};
use std::thread;

#[test]
fn test_output_format_parsing() {
    assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
    assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
    assert!("yaml".parse::<OutputFormat>().is_err());
    assert_eq!(OutputFormat::default(), OutputFormat::Text);
    assert_eq!(OutputFormat::Json.to_string(), "json");
}

#[test]
fn test_concurrent_lines_do_not_tear() {
    let (device, buffer) = OutputDevice::buffer();
    let handles: Vec<_> = (0..8)
        .map(|writer| {
            let device = device.clone();
            thread::spawn(move || {
                for line in 0..50 {
                    device
                        .write_line(&format!("writer {writer} line {line}"))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let lines = buffer.lines();
    assert_eq!(lines.len(), 400);
    assert!(lines.iter().all(|l| l.starts_with("writer ") && l.contains(" line ")));

    // Lines of one writer keep their order.
    let writer_three: Vec<&String> = lines.iter().filter(|l| l.starts_with("writer 3 ")).collect();
    for (i, line) in writer_three.iter().enumerate() {
        assert_eq!(**line, format!("writer 3 line {i}"));
    }
}

#[test]
fn test_json_records() {
    let (device, buffer) = OutputDevice::buffer();
    device
        .write_json(&serde_json::json!({"resource_id": "abc", "finished": true}))
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&buffer.contents()).unwrap();
    assert_eq!(value["resource_id"], "abc");
}
