//! Task type tests for node-core

use node_core::{HandlerId, NodeError, TaskDescriptor, TaskParam, TaskPriority};

#[test]
fn test_priority_ordering() {
    assert!(TaskPriority::High > TaskPriority::Medium);
    assert!(TaskPriority::Medium > TaskPriority::Low);
}

#[test]
fn test_priority_default_is_medium() {
    assert_eq!(TaskPriority::default(), TaskPriority::Medium);
}

#[test]
fn test_priority_try_from() {
    assert_eq!(TaskPriority::try_from(2u8), Ok(TaskPriority::High));
    assert_eq!(TaskPriority::try_from(9u8), Err(NodeError::InvalidPriority));
}

#[test]
fn test_handler_id_index() {
    let id = HandlerId::from_index(3);
    assert_eq!(id.index(), 3);
    assert_eq!(id, HandlerId::from_index(3));
    assert_ne!(id, HandlerId::from_index(4));
}

#[test]
fn test_descriptor_fields() {
    let task = TaskDescriptor::new(TaskPriority::Low, HandlerId::from_index(1), TaskParam::new(42));
    assert_eq!(task.priority, TaskPriority::Low);
    assert_eq!(task.handler.index(), 1);
    assert_eq!(task.param.raw(), 42);
}
