//! Members and trait bundles merged into class definitions

use crate::definition::ClassDefinition;
use crate::error::ClassError;
use crate::instance::MethodContext;
use compact_str::CompactString;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Signature shared by every method body.
///
/// Methods receive a [`MethodContext`] describing the receiver, the class that
/// defines the running body and the method name, plus positional arguments.
pub type MethodFn = dyn Fn(&MethodContext<'_>, &[Value]) -> Result<Value, ClassError> + Send + Sync;

/// Shared handle to a method body
pub type Method = Arc<MethodFn>;

/// Wraps a closure as a [`Method`]
pub fn method<F>(body: F) -> Method
where
    F: Fn(&MethodContext<'_>, &[Value]) -> Result<Value, ClassError> + Send + Sync + 'static,
{
    Arc::new(body)
}

/// A single entry in a class member table
#[derive(Clone)]
pub enum Member {
    /// Callable member
    Method(Method),
    /// Prototype data shared by all instances
    Value(Value),
}

impl Member {
    pub fn is_method(&self) -> bool {
        matches!(self, Member::Method(_))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Member::Value(value) => Some(value),
            Member::Method(_) => None,
        }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Method(_) => f.write_str("Method(..)"),
            Member::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

/// Named, ordered bundle of members composed onto a class outside the
/// single-inheritance chain.
///
/// Adding a member whose name is already present replaces it in place, so the
/// last write wins while the original position is kept.
#[derive(Debug, Clone)]
pub struct Trait {
    name: CompactString,
    members: Vec<(CompactString, Member)>,
}

impl Trait {
    /// Create an empty trait bundle
    pub fn new(name: &str) -> Self {
        Self {
            name: CompactString::new(name),
            members: Vec::new(),
        }
    }

    /// Flatten a class definition into a trait.
    ///
    /// The result carries the full resolved member table of `class`, root
    /// first, so overrides lower in the chain win.
    pub fn from_class(class: &ClassDefinition) -> Self {
        let mut flattened = Self::new(class.name());
        let mut chain: Vec<&ClassDefinition> = class.ancestry().collect();
        chain.reverse();
        for def in chain {
            for (name, member) in def.own_members() {
                flattened.insert(name.clone(), member.clone());
            }
        }
        flattened
    }

    /// Add a method to the bundle
    pub fn method<F>(mut self, name: &str, body: F) -> Self
    where
        F: Fn(&MethodContext<'_>, &[Value]) -> Result<Value, ClassError> + Send + Sync + 'static,
    {
        self.insert(CompactString::new(name), Member::Method(method(body)));
        self
    }

    /// Add a prototype value to the bundle
    pub fn value(mut self, name: &str, value: Value) -> Self {
        self.insert(CompactString::new(name), Member::Value(value));
        self
    }

    pub(crate) fn insert(&mut self, name: CompactString, member: Member) {
        match self.members.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = member,
            None => self.members.push((name, member)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|(existing, _)| existing.as_str() == name)
            .map(|(_, member)| member)
    }

    /// Members in insertion order
    pub fn members(&self) -> impl Iterator<Item = (&CompactString, &Member)> {
        self.members.iter().map(|(name, member)| (name, member))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
