//! Error types for class definitions and method dispatch

/// Errors raised while dispatching methods on class instances
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassError {
    /// No member with this name exists anywhere in the class chain
    #[error("Method not found: {class}::{method}")]
    MethodNotFound { class: String, method: String },

    /// Superclass dispatch found no parent implementation
    #[error("No superclass implementation of '{method}' above {class}")]
    NoSuperMethod { class: String, method: String },

    /// The resolved member is a value, not a method
    #[error("Member is not callable: {class}::{member}")]
    NotCallable { class: String, member: String },

    /// A method needed an instance extension that was never attached
    #[error("Missing instance extension: {0}")]
    MissingExtension(String),

    /// A method was called with arguments it cannot use
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A method body reported a failure of its own
    #[error("Method failed: {0}")]
    MethodFailed(String),
}
