//! Unit tests for error.rs
//!
//! Tests all Error variants and their implementations (Display, Debug, Clone, std::error::Error).

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("device lock poisoned".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("device lock poisoned"));
}

#[test]
fn test_out_of_memory_display() {
    let err = Error::OutOfMemory;
    assert_eq!(format!("{}", err), "Out of GPU memory");
}

#[test]
fn test_invalid_resource_display() {
    let err = Error::InvalidResource("guest address 0x00400000 is not mapped".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Invalid resource"));
    assert!(display.contains("0x00400000"));
}

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("create EFB color texture".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Initialization failed"));
    assert!(display.contains("EFB color texture"));
}

#[test]
fn test_map_failed_display() {
    let err = Error::MapFailed("EFB depth cache buffer".to_string());
    let display = format!("{}", err);
    assert!(display.starts_with("Map failed"));
    assert!(display.contains("depth cache"));
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_debug() {
    assert!(format!("{:?}", Error::BackendError("x".to_string())).contains("BackendError"));
    assert!(format!("{:?}", Error::OutOfMemory).contains("OutOfMemory"));
    assert!(format!("{:?}", Error::MapFailed("x".to_string())).contains("MapFailed"));
}

#[test]
fn test_error_clone() {
    let err1 = Error::InitializationFailed("resolve texture".to_string());
    let err2 = err1.clone();
    assert_eq!(format!("{}", err1), format!("{}", err2));
}

// ============================================================================
// RESULT TYPE
// ============================================================================

#[test]
fn test_result_propagation() {
    fn inner() -> Result<u32> {
        Err(Error::MapFailed("color cache".to_string()))
    }
    fn outer() -> Result<u32> {
        let value = inner()?;
        Ok(value + 1)
    }
    assert!(matches!(outer(), Err(Error::MapFailed(_))));
}
