//! The runtime context every generated build method constructs first.

use weave_typesys::{
    CompilerConfig, Emitter, HostConstructor, HostField, HostMethod, HostType, TypeResolutionError,
};

/// Contract of the configured context type: a public constructor taking the
/// service provider, and optionally a `RootObject` field holding the top of
/// the object graph.
#[derive(Clone, Debug)]
pub struct RuntimeContext {
    pub context_type: HostType,
    pub constructor: HostConstructor,
    pub root_object_field: Option<HostField>,
    /// Instance `PushParent(object)` and `PopParent()`. Present only when the
    /// context type declares both.
    pub parent_stack: Option<ParentStack>,
}

/// Methods that maintain the ancestor stack markup extensions read from the
/// context while the objects around them are still being initialized.
#[derive(Clone, Debug)]
pub struct ParentStack {
    pub push: HostMethod,
    pub pop: HostMethod,
}

impl RuntimeContext {
    pub fn new(config: &CompilerConfig) -> Result<Self, TypeResolutionError> {
        let context_type = config.mappings.context_type.clone();
        let constructor = context_type.get_constructor(&[config.mappings.service_provider.clone()])?;
        let root_object_field = context_type.find_field("RootObject").filter(|f| !f.is_static());
        let instance = |name: &str, arity: usize| {
            context_type.find_method_by(|m| m.name() == name && !m.is_static() && m.parameters().len() == arity)
        };
        let parent_stack = match (instance("PushParent", 1), instance("PopParent", 0)) {
            (Some(push), Some(pop)) => Some(ParentStack { push, pop }),
            _ => None,
        };
        Ok(Self {
            context_type,
            constructor,
            root_object_field,
            parent_stack,
        })
    }

    /// Replace the service provider on top of the stack with a new context.
    pub fn emit_factory(&self, gen: &mut dyn Emitter) {
        gen.newobj(&self.constructor);
    }
}
