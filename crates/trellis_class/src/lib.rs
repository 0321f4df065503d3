//! # Trellis Class
//!
//! Class definitions for UI components: single inheritance, trait bundles
//! composed at definition time, and explicit superclass dispatch.
//!
//! ## Key Features
//!
//! - **Single inheritance**: member lookup walks a shared parent chain
//! - **Traits**: ordered member bundles merged onto a class, later wins
//! - **Superclass access**: every method runs with a [`MethodContext`] that
//!   knows its defining class, so parent implementations are reached through
//!   an explicit table instead of caller inspection
//! - **Extensions**: typed per-instance slots for collaborators
//!
//! ## Usage
//!
//! ```rust
//! use trellis_class::{ClassBuilder, ClassError, Trait};
//! use serde_json::{json, Value};
//!
//! let sized = Trait::new("sized").value("width", json!(100));
//!
//! let panel = ClassBuilder::root("Panel")
//!     .with_trait(sized)
//!     .initialize(|cx, args| {
//!         cx.this().set("title", args.first().cloned().unwrap_or(Value::Null));
//!         Ok(())
//!     })
//!     .build();
//!
//! let dialog = ClassBuilder::extend("Dialog", &panel).build();
//! let instance = dialog.instantiate(&[json!("Settings")])?;
//!
//! assert_eq!(instance.get("title"), Some(json!("Settings")));
//! assert_eq!(instance.get("width"), Some(json!(100)));
//! # Ok::<(), ClassError>(())
//! ```

pub mod definition;
pub mod error;
pub mod instance;
pub mod member;

pub use definition::{define, ClassBuilder, ClassDefinition, INITIALIZE};
pub use error::ClassError;
pub use instance::{Instance, MethodContext, SuperTable};
pub use member::{method, Member, Method, MethodFn, Trait};

/// Result type used throughout the class system
pub type Result<T> = std::result::Result<T, ClassError>;
