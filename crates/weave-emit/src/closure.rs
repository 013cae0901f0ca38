//! Deferred content: a subtree compiled into its own `Build` method and handed
//! out as a `Func<ServiceProvider, Object>` factory.

use tracing::debug;
use weave_ast::{Ast, NodeId};
use weave_typesys::{Emitter, HostType, MemberKind, TypeResolutionError, Visibility};

use crate::context::EmitContext;
use crate::error::EmitError;

impl<'a> EmitContext<'a> {
    /// Compile `value` into a nested closure type and push the factory.
    ///
    /// The closure's `Build(provider)` constructs a fresh runtime context from
    /// `provider`, recovers the root object through the root-object provider
    /// when one is configured, then evaluates `value`. At the call site the
    /// factory is created from `Build`, and passed through the customization
    /// hook together with the enclosing runtime context when configured.
    pub(crate) fn emit_deferred_content(
        &mut self,
        ast: &Ast,
        value: NodeId,
        func_type: &HostType,
        gen: &mut dyn Emitter,
    ) -> Result<HostType, EmitError> {
        let object = self.config.well_known.object.clone();
        let service_provider = self.config.mappings.service_provider.clone();

        let index = self.closures.get();
        self.closures.set(index + 1);
        let name = format!("DeferredClosure_{}", index);

        let mut sub = self.owner.define_sub_type(&object, &name, false);
        let mut build = sub.define_method(
            &object,
            &[service_provider],
            "Build",
            Visibility::Public,
            true,
            false,
            None,
        );
        {
            let body = build.generator();
            let context_local = body.define_local(&self.runtime.context_type);
            let mut inner = EmitContext {
                config: self.config,
                runtime: self.runtime,
                context_local,
                owner: &mut *sub,
                closures: self.closures.clone(),
            };
            inner.compile_builder(ast, value, body)?;
        }
        let build_method = build.method();

        let constructor = func_type
            .constructors()
            .into_iter()
            .find(|c| {
                let params = c.parameters();
                params.len() == 2 && params[0] == object
            })
            .ok_or_else(|| TypeResolutionError::ConstructorNotFound {
                type_name: func_type.fqn(),
                arguments: vec![object.full_name(), self.config.well_known.intptr.full_name()],
            })?;
        gen.ldnull().ldftn(&build_method).newobj(&constructor);

        if let Some(customization) = &self.config.mappings.deferred_content_customization {
            gen.ldloc(self.context_local);
            gen.emit_call(customization, false);
        }

        let closure = sub.create_type();
        debug!(closure = %closure, "compiled deferred content");
        Ok(func_type.clone())
    }

    fn compile_builder(&mut self, ast: &Ast, value: NodeId, gen: &mut dyn Emitter) -> Result<(), EmitError> {
        gen.ldarg(0);
        self.runtime.emit_factory(gen);
        gen.stloc(self.context_local);

        if let Some(provider) = &self.config.mappings.root_object_provider {
            let object = &self.config.well_known.object;
            let service_provider = &self.config.mappings.service_provider;
            let get_service = service_provider.get_method_by(|m| m.name() == "GetService")?;
            let get_root = provider.get_method_by(|m| m.name() == "get_RootObject")?;
            let field = self
                .runtime
                .root_object_field
                .clone()
                .ok_or_else(|| TypeResolutionError::MemberNotFound {
                    type_name: self.runtime.context_type.fqn(),
                    kind: MemberKind::Field,
                    name: "RootObject".to_string(),
                })?;

            let no_root = gen.define_label();
            let pool = gen.locals_pool();
            let loc = pool.get_local(object, gen);
            gen.ldarg(0)
                .brfalse(no_root)
                .ldarg(0)
                .ldtype(provider)
                .emit_call(&get_service, false)
                .stloc(loc.local())
                .ldloc(loc.local())
                .brfalse(no_root)
                .ldloc(loc.local())
                .castclass(provider)
                .emit_call(&get_root, false)
                .stloc(loc.local())
                .ldloc(self.context_local)
                .ldloc(loc.local())
                .castclass(&field.field_type())
                .stfld(&field)
                .mark_label(no_root);
        }

        let object = self.config.well_known.object.clone();
        self.emit_value(ast, value, gen, Some(&object))?;
        gen.ret();
        Ok(())
    }
}
