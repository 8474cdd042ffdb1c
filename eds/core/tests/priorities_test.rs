//! Priority and ready-set tests for eds-core

use eds_core::{EdsError, Priority, ReadySet};

#[test]
fn test_priority_creation() {
    assert!(Priority::new(5).is_ok());
    assert_eq!(Priority::new(0), Err(EdsError::InvalidPriority));
}

#[test]
fn test_priority_ordering() {
    let low = Priority::new(1).unwrap();
    let high = Priority::new(200).unwrap();
    assert!(high > low);
    assert!(Priority::IDLE < Priority::MIN);
    assert_eq!(Priority::MAX.raw(), u8::MAX);
}

#[test]
fn test_ready_set_highest() {
    let mut ready = ReadySet::new();
    assert!(ready.is_empty());
    assert_eq!(ready.highest(), None);

    for raw in [3, 130, 64, 1] {
        ready.insert(Priority::new(raw).unwrap());
    }
    assert_eq!(ready.len(), 4);
    assert_eq!(ready.highest(), Some(Priority::new(130).unwrap()));

    ready.remove(Priority::new(130).unwrap());
    assert_eq!(ready.highest(), Some(Priority::new(64).unwrap()));
    assert!(ready.contains(Priority::new(3).unwrap()));
    assert!(!ready.contains(Priority::new(130).unwrap()));
}

#[test]
fn test_ready_set_top_level() {
    let mut ready = ReadySet::new();
    ready.insert(Priority::MAX);
    ready.insert(Priority::MIN);
    assert_eq!(ready.highest(), Some(Priority::MAX));

    ready.clear();
    assert!(ready.is_empty());
}
