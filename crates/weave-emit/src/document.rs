use tracing::debug;
use weave_ast::{Ast, NodeId};
use weave_typesys::{CompilerConfig, HostMethod, TypeBuilder, Visibility};

use crate::context::EmitContext;
use crate::error::EmitError;
use crate::runtime::RuntimeContext;

/// Compile a transformed document into `owner` as
/// `public static Object Build(ServiceProvider)`.
///
/// The method constructs the runtime context, evaluates `root`, stores the
/// result in the context's `RootObject` slot when it has one, and returns it.
pub fn compile_document(
    config: &CompilerConfig,
    ast: &Ast,
    root: NodeId,
    owner: &mut dyn TypeBuilder,
) -> Result<HostMethod, EmitError> {
    let runtime = RuntimeContext::new(config)?;
    let object = config.well_known.object.clone();

    let mut build = owner.define_method(
        &object,
        &[config.mappings.service_provider.clone()],
        "Build",
        Visibility::Public,
        true,
        false,
        None,
    );
    let method = build.method();
    let gen = build.generator();

    let context_local = gen.define_local(&runtime.context_type);
    gen.ldarg(0);
    runtime.emit_factory(gen);
    gen.stloc(context_local);

    let mut ctx = EmitContext::new(config, &runtime, context_local, owner);
    let produced = ctx.emit_value(ast, root, gen, None)?;

    if let Some(field) = &runtime.root_object_field {
        let pool = gen.locals_pool();
        let value = pool.get_local(&produced, gen);
        gen.stloc(value.local()).ldloc(context_local).ldloc(value.local());
        if produced.is_value_type() {
            gen.box_value(&produced);
        }
        let slot = field.field_type();
        if !slot.is_assignable_from(&produced) {
            gen.castclass(&slot);
        }
        gen.stfld(field).ldloc(value.local());
    }
    if produced.is_value_type() {
        gen.box_value(&produced);
    }
    gen.ret();

    debug!(method = %method, closures = ctx.closure_count(), "compiled document");
    Ok(method)
}
