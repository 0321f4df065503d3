//! Instances, method contexts and superclass access

use crate::definition::ClassDefinition;
use crate::error::ClassError;
use crate::member::Member;
use compact_str::CompactString;
use dashmap::DashMap;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// An object constructed from a [`ClassDefinition`].
///
/// Own fields are searched before the class chain, so `set` shadows a
/// prototype value for this instance only. Extension slots hold typed
/// collaborators (such as an event emitter) keyed by their type.
pub struct Instance {
    class: Arc<ClassDefinition>,
    fields: DashMap<CompactString, Value>,
    extensions: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Instance {
    pub(crate) fn new(class: Arc<ClassDefinition>) -> Self {
        Self {
            class,
            fields: DashMap::new(),
            extensions: DashMap::new(),
        }
    }

    pub fn class(&self) -> &Arc<ClassDefinition> {
        &self.class
    }

    pub fn is_instance_of(&self, class: &ClassDefinition) -> bool {
        self.class.is_subclass_of(class)
    }

    pub fn responds_to(&self, name: &str) -> bool {
        self.class.responds_to(name)
    }

    /// Read a field, falling back to prototype values on the class chain.
    /// Methods are not returned.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.fields.get(name) {
            return Some(value.value().clone());
        }
        self.class
            .lookup(name)
            .and_then(|(_, member)| member.as_value().cloned())
    }

    /// Write an own field
    pub fn set(&self, name: &str, value: Value) {
        self.fields.insert(CompactString::new(name), value);
    }

    /// Remove an own field, re-exposing any prototype value underneath
    pub fn unset(&self, name: &str) -> Option<Value> {
        self.fields.remove(name).map(|(_, value)| value)
    }

    /// Invoke a method by name, resolving it through the class chain
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, ClassError> {
        dispatch(self, &self.class, name, args).unwrap_or_else(|| {
            Err(ClassError::MethodNotFound {
                class: self.class.name().to_string(),
                method: name.to_string(),
            })
        })
    }

    /// Attach a typed collaborator, replacing any previous one of the same type
    pub fn insert_extension<T: Any + Send + Sync>(&self, extension: Arc<T>) {
        self.extensions.insert(TypeId::of::<T>(), extension);
    }

    pub fn extension<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let entry = self.extensions.get(&TypeId::of::<T>())?;
        Arc::clone(entry.value()).downcast::<T>().ok()
    }

    pub fn remove_extension<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let (_, extension) = self.extensions.remove(&TypeId::of::<T>())?;
        extension.downcast::<T>().ok()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.name())
            .field("fields", &self.fields.len())
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

/// Resolve `name` starting at `start` and run it against `this`.
///
/// Returns `None` when nothing in the chain defines the name.
fn dispatch(
    this: &Instance,
    start: &ClassDefinition,
    name: &str,
    args: &[Value],
) -> Option<Result<Value, ClassError>> {
    let (owner, member) = start.lookup(name)?;
    match member {
        Member::Method(body) => {
            trace!("📞 {}::{} on {}", owner.name(), name, this.class.name());
            let cx = MethodContext::new(this, owner, name);
            Some(body(&cx, args))
        }
        Member::Value(_) => Some(Err(ClassError::NotCallable {
            class: owner.name().to_string(),
            member: name.to_string(),
        })),
    }
}

/// Execution context handed to every method body.
///
/// Carries the receiver, the class whose table supplied the running body and
/// the running method's name, which is what makes superclass dispatch explicit
/// rather than inferred from the caller.
pub struct MethodContext<'a> {
    this: &'a Instance,
    class: &'a ClassDefinition,
    method: &'a str,
}

impl<'a> MethodContext<'a> {
    pub(crate) fn new(this: &'a Instance, class: &'a ClassDefinition, method: &'a str) -> Self {
        Self { this, class, method }
    }

    pub fn this(&self) -> &'a Instance {
        self.this
    }

    /// The class that defines the running method
    pub fn class(&self) -> &'a ClassDefinition {
        self.class
    }

    pub fn method_name(&self) -> &'a str {
        self.method
    }

    /// Accessor over the defining class's parent chain
    pub fn superclass(&self) -> SuperTable<'a> {
        SuperTable {
            this: self.this,
            from: self.class,
            parent: self.class.parent().map(Arc::as_ref),
        }
    }

    /// Run the parent implementation of the current method with `args`
    pub fn call_super(&self, args: &[Value]) -> Result<Value, ClassError> {
        self.superclass().call(self.method, args)
    }

    /// Virtual dispatch on the receiver
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, ClassError> {
        self.this.call(name, args)
    }
}

/// Parent members of a class, bound to a receiver
pub struct SuperTable<'a> {
    this: &'a Instance,
    from: &'a ClassDefinition,
    parent: Option<&'a ClassDefinition>,
}

impl<'a> SuperTable<'a> {
    pub fn class(&self) -> Option<&'a ClassDefinition> {
        self.parent
    }

    pub fn has(&self, name: &str) -> bool {
        self.parent.is_some_and(|parent| parent.lookup(name).is_some())
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.parent?
            .lookup(name)
            .and_then(|(_, member)| member.as_value().cloned())
    }

    /// Invoke the parent implementation of `name` on the bound receiver
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, ClassError> {
        let result = self
            .parent
            .and_then(|parent| dispatch(self.this, parent, name, args));
        result.unwrap_or_else(|| {
            Err(ClassError::NoSuperMethod {
                class: self.from.name().to_string(),
                method: name.to_string(),
            })
        })
    }
}
