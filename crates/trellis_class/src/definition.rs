//! Class definitions and the builder that resolves them

use crate::error::ClassError;
use crate::instance::{Instance, MethodContext};
use crate::member::{method, Member, Trait};
use compact_str::CompactString;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Name of the constructor entry point in a member table
pub const INITIALIZE: &str = "initialize";

/// A resolved class: its own member table plus a shared link to its parent.
///
/// Member lookup searches the class's own table first and then walks the
/// parent chain. The parent is shared, never copied, so a parent defined
/// once serves every subclass.
#[derive(Debug)]
pub struct ClassDefinition {
    name: CompactString,
    parent: Option<Arc<ClassDefinition>>,
    traits: Vec<Arc<Trait>>,
    members: HashMap<CompactString, Member>,
    constructor: Option<Member>,
}

impl ClassDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<ClassDefinition>> {
        self.parent.as_ref()
    }

    /// Traits applied to this definition, in application order
    pub fn traits(&self) -> &[Arc<Trait>] {
        &self.traits
    }

    /// Members defined directly on this class (traits and body merged)
    pub fn own_members(&self) -> impl Iterator<Item = (&CompactString, &Member)> {
        self.members.iter()
    }

    pub fn own_member(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    /// This class followed by each ancestor up to the root
    pub fn ancestry(&self) -> impl Iterator<Item = &ClassDefinition> {
        std::iter::successors(Some(self), |def| def.parent.as_deref())
    }

    /// Resolve a member by name, returning the class that defines it.
    pub fn lookup(&self, name: &str) -> Option<(&ClassDefinition, &Member)> {
        self.ancestry()
            .find_map(|def| def.members.get(name).map(|member| (def, member)))
    }

    pub fn responds_to(&self, name: &str) -> bool {
        matches!(self.lookup(name), Some((_, Member::Method(_))))
    }

    /// Whether `other` is this class or one of its ancestors
    pub fn is_subclass_of(&self, other: &ClassDefinition) -> bool {
        self.ancestry().any(|def| std::ptr::eq(def, other))
    }

    /// Constructor declared in this class's own body.
    ///
    /// An `initialize` merged in from a trait is an ordinary member and never
    /// shows up here.
    pub fn constructor(&self) -> Option<&Member> {
        self.constructor.as_ref()
    }

    /// Construct a new instance.
    ///
    /// Runs the nearest body-declared `initialize` in the chain with `args`. A
    /// class whose body defines no initializer forwards every argument to its
    /// parent's; a root without one constructs an empty instance.
    pub fn instantiate(self: &Arc<Self>, args: &[Value]) -> Result<Arc<Instance>, ClassError> {
        let instance = Arc::new(Instance::new(Arc::clone(self)));
        let constructor = self
            .ancestry()
            .find_map(|def| def.constructor.as_ref().map(|member| (def, member)));
        match constructor {
            Some((def, Member::Method(body))) => {
                let cx = MethodContext::new(&instance, def, INITIALIZE);
                body(&cx, args)?;
            }
            Some((def, Member::Value(_))) => {
                return Err(ClassError::NotCallable {
                    class: def.name().to_string(),
                    member: INITIALIZE.to_string(),
                });
            }
            None => {}
        }
        Ok(instance)
    }
}

/// Builder for [`ClassDefinition`]s.
///
/// Traits are merged in the order they are added and the class body is
/// merged last; on a name collision the later entry wins.
///
/// ```rust
/// use trellis_class::{ClassBuilder, ClassError};
/// use serde_json::{json, Value};
///
/// let base = ClassBuilder::root("Base")
///     .method("greet", |_cx, _args| Ok(json!("base")))
///     .build();
///
/// let child = ClassBuilder::extend("Child", &base)
///     .method("greet", |cx, _args| {
///         let parent = cx.superclass().call("greet", &[])?;
///         Ok(json!(format!("{}-child", parent.as_str().unwrap_or_default())))
///     })
///     .build();
///
/// let instance = child.instantiate(&[])?;
/// assert_eq!(instance.call("greet", &[])?, json!("base-child"));
/// # Ok::<(), ClassError>(())
/// ```
pub struct ClassBuilder {
    name: CompactString,
    parent: Option<Arc<ClassDefinition>>,
    traits: Vec<Arc<Trait>>,
    body: Trait,
}

impl ClassBuilder {
    /// Start a definition with no parent
    pub fn root(name: &str) -> Self {
        Self {
            name: CompactString::new(name),
            parent: None,
            traits: Vec::new(),
            body: Trait::new(name),
        }
    }

    /// Start a definition inheriting from `parent`
    pub fn extend(name: &str, parent: &Arc<ClassDefinition>) -> Self {
        Self {
            parent: Some(Arc::clone(parent)),
            ..Self::root(name)
        }
    }

    /// Compose a trait bundle onto the definition
    pub fn with_trait(mut self, bundle: impl Into<Arc<Trait>>) -> Self {
        self.traits.push(bundle.into());
        self
    }

    /// Compose another class onto the definition as a trait
    pub fn with_class_trait(self, class: &ClassDefinition) -> Self {
        self.with_trait(Trait::from_class(class))
    }

    pub fn method<F>(mut self, name: &str, body: F) -> Self
    where
        F: Fn(&MethodContext<'_>, &[Value]) -> Result<Value, ClassError> + Send + Sync + 'static,
    {
        self.body = self.body.method(name, body);
        self
    }

    pub fn value(mut self, name: &str, value: Value) -> Self {
        self.body = self.body.value(name, value);
        self
    }

    /// Set the constructor body.
    ///
    /// Call `cx.call_super(args)` inside it to run the parent's constructor.
    pub fn initialize<F>(mut self, body: F) -> Self
    where
        F: Fn(&MethodContext<'_>, &[Value]) -> Result<(), ClassError> + Send + Sync + 'static,
    {
        self.body.insert(
            CompactString::new(INITIALIZE),
            Member::Method(method(move |cx, args| body(cx, args).map(|_| Value::Null))),
        );
        self
    }

    pub fn build(self) -> Arc<ClassDefinition> {
        let constructor = self.body.get(INITIALIZE).cloned();
        let mut members = HashMap::new();
        for bundle in self.traits.iter().map(Arc::as_ref).chain(std::iter::once(&self.body)) {
            for (name, member) in bundle.members() {
                members.insert(name.clone(), member.clone());
            }
        }

        debug!(
            "🧱 Defined class {} (parent: {}, traits: {}, members: {})",
            self.name,
            self.parent.as_ref().map(|p| p.name()).unwrap_or("-"),
            self.traits.len(),
            members.len()
        );

        Arc::new(ClassDefinition {
            name: self.name,
            parent: self.parent,
            traits: self.traits,
            members,
            constructor,
        })
    }
}

/// Define a class from an optional parent, trait bundles and a body.
///
/// Equivalent to chaining [`ClassBuilder`] calls; the body's name becomes the
/// class name.
pub fn define(
    parent: Option<&Arc<ClassDefinition>>,
    traits: &[Arc<Trait>],
    body: Trait,
) -> Arc<ClassDefinition> {
    let mut builder = match parent {
        Some(parent) => ClassBuilder::extend(body.name(), parent),
        None => ClassBuilder::root(body.name()),
    };
    for bundle in traits {
        builder = builder.with_trait(Arc::clone(bundle));
    }
    builder.body = body;
    builder.build()
}
