//! Whole-document emission, from hand-built markup through the default
//! pipeline down to the recorded `Build` body.

use std::rc::Rc;

use weave_ast::{Ast, NodeId, NodeKind, PropertyRef};
use weave_callsite::{DirectWrappedMethod, WrappedMethod, WrappedMethodWithCasts};
use weave_common::Span;
use weave_emit::{compile_document, EmitContext, EmitError, RuntimeContext};
use weave_transform::{Pipeline, TransformOptions, TransformationContext};
use weave_typesys::memory::{AssemblyDef, CoreTypes, MemoryTypeSystem};
use weave_typesys::{CompilerConfig, ConstValue, Emitter, HostType, RecordingEmitter, TypeMappings};

const UI: &str = "urn:ui";

// ── Helpers ────────────────────────────────────────────────────────────

struct Fixture {
    ts: MemoryTypeSystem,
    core: CoreTypes,
    ui: AssemblyDef,
    config: CompilerConfig,
    to_text: weave_typesys::HostMethod,
}

fn fixture_with(rooted: bool, parents: bool) -> Fixture {
    let (ts, core) = MemoryTypeSystem::with_core_types();
    let ui = ts.assembly("Ui");

    let deferred_attr = ui.class("Ui", "DeferredContentAttribute");

    let context = ui.class("Ui", "Context");
    context.add_interface(&core.service_provider);
    context.add_constructor(&[core.service_provider.clone()]);
    if rooted {
        context.add_field("RootObject", &core.object, false);
    }
    if parents {
        context.add_method("PushParent", &core.void, &[core.object.clone()]);
        context.add_method("PopParent", &core.void, &[]);
    }

    let control = ui.class("Ui", "Control");
    control.add_constructor(&[]);
    let button = ui.class("Ui", "Button");
    button.set_base(&control.ty());
    button.add_constructor(&[]);
    button.add_property("Content", &core.object);
    button.add_property("Width", &core.int32);

    let controls = ui.class("Ui", "Controls");
    controls.add_method("Add", &core.void, &[control.ty()]);
    let panel = ui.class("Ui", "Panel");
    panel.add_constructor(&[]);
    panel.add_property_full("Children", &controls.ty(), true, false, Vec::new());

    let batch = ui.class("Ui", "Batch");
    batch.add_constructor(&[]);
    batch.add_property("Title", &core.string);
    batch.add_method("BeginInit", &core.void, &[]);
    batch.add_method("EndInit", &core.void, &[]);

    let optional_int = core.nullable.make_generic_type(&[core.int32.clone()]).unwrap();
    let gauge = ui.class("Ui", "Gauge");
    gauge.add_constructor(&[]);
    gauge.add_property("Level", &optional_int);

    let stat = ui.class("Ui", "StaticExtension");
    stat.add_constructor(&[core.string.clone()]);
    stat.add_method("ProvideValue", &core.object, &[core.service_provider.clone()]);

    let convert = ui.class("Ui", "Convert");
    let to_text = convert.add_static_method("ToText", &core.string, &[core.object.clone()]);

    let mappings = TypeMappings {
        service_provider: core.service_provider.clone(),
        root_object_provider: None,
        context_type: context.ty(),
        deferred_content_customization: None,
        deferred_content_attribute: Some(deferred_attr.ty()),
    };
    let config = CompilerConfig::new(Rc::new(ts.clone()), mappings).unwrap();

    let template = ui.class("Ui", "Template");
    template.add_constructor(&[]);
    let content_attr = ts.attribute(&deferred_attr.ty(), Vec::new(), true);
    template.add_property_full(
        "Content",
        &config.deferred_content_type().unwrap(),
        true,
        true,
        vec![content_attr],
    );

    Fixture {
        ts,
        core,
        ui,
        config,
        to_text,
    }
}

fn fixture() -> Fixture {
    fixture_with(true, false)
}

fn object_with(ast: &mut Ast, name: &str, arguments: Vec<NodeId>, children: Vec<NodeId>) -> NodeId {
    let type_ref = ast.alloc(
        Span::default(),
        NodeKind::XmlTypeReference {
            xml_namespace: UI.to_string(),
            name: name.to_string(),
            generic_arguments: Vec::new(),
        },
    );
    ast.alloc(
        Span::new(0, name.len() as u32 + 2),
        NodeKind::Object {
            type_ref,
            arguments,
            children,
        },
    )
}

fn object(ast: &mut Ast, name: &str, children: Vec<NodeId>) -> NodeId {
    object_with(ast, name, Vec::new(), children)
}

fn prop(ast: &mut Ast, name: &str, values: Vec<NodeId>) -> NodeId {
    ast.alloc(
        Span::default(),
        NodeKind::PropertyValue {
            property: PropertyRef::Named(name.to_string()),
            values,
        },
    )
}

fn constant(ast: &mut Ast, value: ConstValue, ty: &HostType) -> NodeId {
    ast.alloc(Span::default(), NodeKind::Constant { value, ty: ty.clone() })
}

fn text(ast: &mut Ast, core: &CoreTypes, s: &str) -> NodeId {
    constant(ast, ConstValue::Str(s.to_string()), &core.string)
}

/// Transform leniently, then compile into a fresh `Ui.Page`.
fn compile(fx: &Fixture, ast: &mut Ast) -> Result<String, EmitError> {
    let mut ctx = TransformationContext::new(&fx.config, TransformOptions::lenient());
    ctx.add_namespace_alias(UI, "Ui", None);
    let root = Pipeline::default().run(&mut ctx, ast).unwrap();

    let mut owner = fx.ts.define_dynamic_type(&fx.ui, "Ui", "Page", &fx.core.object);
    let build = compile_document(&fx.config, ast, root, &mut *owner)?;
    owner.create_type();
    Ok(fx.ts.method_listing(&build).unwrap())
}

/// Emit a single hand-built value into a scratch body.
fn emit_value(fx: &Fixture, ast: &Ast, id: NodeId, expected: Option<&HostType>) -> Result<String, EmitError> {
    let runtime = RuntimeContext::new(&fx.config).unwrap();
    let mut owner = fx.ts.define_dynamic_type(&fx.ui, "Ui", "Scratch", &fx.core.object);
    let mut gen = RecordingEmitter::new();
    let local = gen.define_local(&runtime.context_type);
    let mut ctx = EmitContext::new(&fx.config, &runtime, local, &mut *owner);
    ctx.emit_value(ast, id, &mut gen, expected)?;
    Ok(gen.listing())
}

// ── Documents ──────────────────────────────────────────────────────────

#[test]
fn stores_the_root_object_and_returns_it() {
    let fx = fixture();
    let mut ast = Ast::new();
    let hi = text(&mut ast, &fx.core, "Hi");
    let content = prop(&mut ast, "Content", vec![hi]);
    let root = object(&mut ast, "Button", vec![content]);
    ast.set_root(root);

    insta::assert_snapshot!(compile(&fx, &mut ast).unwrap(), @r#"
    ldarg.0
    newobj Ui.Context::.ctor
    stloc 0
    newobj Ui.Button::.ctor
    dup
    dup
    ldstr "Hi"
    call Ui.Button::set_Content
    pop
    stloc 1
    ldloc 0
    ldloc 1
    stfld Ui.Context::RootObject
    ldloc 1
    ret
    "#);
}

#[test]
fn context_without_root_slot_just_returns() {
    let fx = fixture_with(false, false);
    let mut ast = Ast::new();
    let root = object(&mut ast, "Button", vec![]);
    ast.set_root(root);

    insta::assert_snapshot!(compile(&fx, &mut ast).unwrap(), @r"
    ldarg.0
    newobj Ui.Context::.ctor
    stloc 0
    newobj Ui.Button::.ctor
    ret
    ");
}

#[test]
fn read_only_collection_is_filled_through_its_getter() {
    let fx = fixture_with(false, false);
    let mut ast = Ast::new();
    let first = object(&mut ast, "Button", vec![]);
    let second = object(&mut ast, "Button", vec![]);
    let children = prop(&mut ast, "Children", vec![first, second]);
    let root = object(&mut ast, "Panel", vec![children]);
    ast.set_root(root);

    insta::assert_snapshot!(compile(&fx, &mut ast).unwrap(), @r"
    ldarg.0
    newobj Ui.Context::.ctor
    stloc 0
    newobj Ui.Panel::.ctor
    dup
    dup
    call Ui.Panel::get_Children
    dup
    newobj Ui.Button::.ctor
    call Ui.Controls::Add
    dup
    newobj Ui.Button::.ctor
    call Ui.Controls::Add
    pop
    pop
    ret
    ");
}

#[test]
fn batched_initialization_is_bracketed() {
    let fx = fixture_with(false, false);
    let mut ast = Ast::new();
    let x = text(&mut ast, &fx.core, "x");
    let title = prop(&mut ast, "Title", vec![x]);
    let root = object(&mut ast, "Batch", vec![title]);
    ast.set_root(root);

    insta::assert_snapshot!(compile(&fx, &mut ast).unwrap(), @r#"
    ldarg.0
    newobj Ui.Context::.ctor
    stloc 0
    newobj Ui.Batch::.ctor
    dup
    dup
    call Ui.Batch::BeginInit
    dup
    dup
    ldstr "x"
    call Ui.Batch::set_Title
    pop
    call Ui.Batch::EndInit
    ret
    "#);
}

#[test]
fn markup_extension_receives_the_runtime_context() {
    let fx = fixture_with(false, false);
    let mut ast = Ast::new();
    let member = text(&mut ast, &fx.core, "Ui.Colors.Red");
    let ext = object_with(&mut ast, "Static", vec![member], vec![]);
    let content = prop(&mut ast, "Content", vec![ext]);
    let root = object(&mut ast, "Button", vec![content]);
    ast.set_root(root);

    insta::assert_snapshot!(compile(&fx, &mut ast).unwrap(), @r#"
    ldarg.0
    newobj Ui.Context::.ctor
    stloc 0
    newobj Ui.Button::.ctor
    dup
    dup
    ldstr "Ui.Colors.Red"
    newobj Ui.StaticExtension::.ctor
    ldloc 0
    call Ui.StaticExtension::ProvideValue
    call Ui.Button::set_Content
    pop
    ret
    "#);
}

#[test]
fn objects_around_context_reading_extensions_are_pushed_as_parents() {
    let fx = fixture_with(false, true);
    let mut ast = Ast::new();
    let member = text(&mut ast, &fx.core, "Ui.Colors.Red");
    let ext = object_with(&mut ast, "Static", vec![member], vec![]);
    let content = prop(&mut ast, "Content", vec![ext]);
    let inner = object(&mut ast, "Button", vec![content]);
    let outer = object(&mut ast, "Button", vec![]);
    let children = prop(&mut ast, "Children", vec![inner, outer]);
    let root = object(&mut ast, "Panel", vec![children]);
    ast.set_root(root);

    // Only the button whose property reads the context is pushed.
    insta::assert_snapshot!(compile(&fx, &mut ast).unwrap(), @r#"
    ldarg.0
    newobj Ui.Context::.ctor
    stloc 0
    newobj Ui.Panel::.ctor
    stloc 1
    ldloc 0
    ldloc 1
    call Ui.Context::PushParent
    ldloc 1
    dup
    dup
    call Ui.Panel::get_Children
    dup
    newobj Ui.Button::.ctor
    stloc 2
    ldloc 0
    ldloc 2
    call Ui.Context::PushParent
    ldloc 2
    dup
    dup
    ldstr "Ui.Colors.Red"
    newobj Ui.StaticExtension::.ctor
    ldloc 0
    call Ui.StaticExtension::ProvideValue
    call Ui.Button::set_Content
    pop
    ldloc 0
    call Ui.Context::PopParent
    call Ui.Controls::Add
    dup
    newobj Ui.Button::.ctor
    call Ui.Controls::Add
    pop
    pop
    ldloc 0
    call Ui.Context::PopParent
    ret
    "#);
}

#[test]
fn loosely_typed_extension_values_are_cast_for_the_setter() {
    let fx = fixture_with(false, false);
    let mut ast = Ast::new();
    let member = text(&mut ast, &fx.core, "Ui.Strings.Hello");
    let ext = object_with(&mut ast, "Static", vec![member], vec![]);
    let title = prop(&mut ast, "Title", vec![ext]);
    let root = object(&mut ast, "Batch", vec![title]);
    ast.set_root(root);

    insta::assert_snapshot!(compile(&fx, &mut ast).unwrap(), @r#"
    ldarg.0
    newobj Ui.Context::.ctor
    stloc 0
    newobj Ui.Batch::.ctor
    dup
    dup
    call Ui.Batch::BeginInit
    dup
    dup
    ldstr "Ui.Strings.Hello"
    newobj Ui.StaticExtension::.ctor
    ldloc 0
    call Ui.StaticExtension::ProvideValue
    castclass System.String
    call Ui.Batch::set_Title
    pop
    call Ui.Batch::EndInit
    ret
    "#);
}

#[test]
fn nullable_slots_wrap_their_value_type() {
    let fx = fixture_with(false, false);
    let mut ast = Ast::new();
    let five = constant(&mut ast, ConstValue::Int(5), &fx.core.int32);
    let level = prop(&mut ast, "Level", vec![five]);
    let root = object(&mut ast, "Gauge", vec![level]);
    ast.set_root(root);

    insta::assert_snapshot!(compile(&fx, &mut ast).unwrap(), @r"
    ldarg.0
    newobj Ui.Context::.ctor
    stloc 0
    newobj Ui.Gauge::.ctor
    dup
    dup
    ldc.i4 5
    newobj System.Nullable`1<System.Int32>::.ctor
    call Ui.Gauge::set_Level
    pop
    ret
    ");
}

#[test]
fn deferred_property_value_becomes_a_factory() {
    let fx = fixture_with(false, false);
    let mut ast = Ast::new();
    let button = object(&mut ast, "Button", vec![]);
    let content = prop(&mut ast, "Content", vec![button]);
    let root = object(&mut ast, "Template", vec![content]);
    ast.set_root(root);

    insta::assert_snapshot!(compile(&fx, &mut ast).unwrap(), @r"
    ldarg.0
    newobj Ui.Context::.ctor
    stloc 0
    newobj Ui.Template::.ctor
    dup
    dup
    ldnull
    ldftn Ui.DeferredClosure_0::Build
    newobj System.Func`2<System.IServiceProvider, System.Object>::.ctor
    call Ui.Template::set_Content
    pop
    ret
    ");

    let closure = fx
        .ts
        .created_types()
        .into_iter()
        .find(|t| t.name() == "DeferredClosure_0")
        .unwrap();
    let build = closure.methods().into_iter().find(|m| m.name() == "Build").unwrap();
    insta::assert_snapshot!(fx.ts.method_listing(&build).unwrap(), @r"
    ldarg.0
    newobj Ui.Context::.ctor
    stloc 0
    newobj Ui.Button::.ctor
    ret
    ");
}

#[test]
fn unresolved_nodes_are_rejected() {
    let fx = fixture();
    let mut ast = Ast::new();
    let root = object(&mut ast, "Buton", vec![]);
    ast.set_root(root);

    let err = compile(&fx, &mut ast).unwrap_err();
    assert_eq!(
        err,
        EmitError::UnresolvedNode {
            node: "Object",
            span: Span::new(0, 7),
        }
    );
    assert_eq!(err.to_string(), "cannot emit unresolved Object node");
}

// ── Values ─────────────────────────────────────────────────────────────

#[test]
fn value_types_are_boxed_into_reference_slots() {
    let fx = fixture();
    let mut ast = Ast::new();
    let five = constant(&mut ast, ConstValue::Int(5), &fx.core.int32);

    insta::assert_snapshot!(emit_value(&fx, &ast, five, Some(&fx.core.object)).unwrap(), @r"
    ldc.i4 5
    box System.Int32
    ");
    insta::assert_snapshot!(emit_value(&fx, &ast, five, Some(&fx.core.int32)).unwrap(), @"ldc.i4 5");
}

#[test]
fn value_types_never_widen() {
    let fx = fixture();
    let mut ast = Ast::new();
    let five = constant(&mut ast, ConstValue::Int(5), &fx.core.int32);
    let x = text(&mut ast, &fx.core, "x");

    let err = emit_value(&fx, &ast, five, Some(&fx.core.boolean)).unwrap_err();
    assert_eq!(
        err,
        EmitError::IncompatibleValue {
            expected: "System.Boolean".into(),
            actual: "System.Int32".into(),
            span: Span::default(),
        }
    );
    assert_eq!(
        err.to_string(),
        "cannot pass a System.Int32 value where System.Boolean is expected"
    );

    let err = emit_value(&fx, &ast, x, Some(&fx.core.int32)).unwrap_err();
    assert!(matches!(err, EmitError::IncompatibleValue { .. }), "{:?}", err);

    let optional_int = fx.core.nullable.make_generic_type(&[fx.core.int32.clone()]).unwrap();
    insta::assert_snapshot!(emit_value(&fx, &ast, five, Some(&optional_int)).unwrap(), @r"
    ldc.i4 5
    newobj System.Nullable`1<System.Int32>::.ctor
    ");
}

#[test]
fn constants_without_an_encoding_are_errors() {
    let fx = fixture();
    let mut ast = Ast::new();
    let big = constant(&mut ast, ConstValue::Int(i64::from(i32::MAX) + 1), &fx.core.int32);

    let err = emit_value(&fx, &ast, big, None).unwrap_err();
    assert!(matches!(err, EmitError::UnsupportedConstant { .. }), "{:?}", err);
}

#[test]
fn method_call_arguments_are_cast_to_the_callee() {
    let fx = fixture();
    let mut ast = Ast::new();
    let x = text(&mut ast, &fx.core, "x");

    let direct: Rc<dyn WrappedMethod> = Rc::new(DirectWrappedMethod::new(fx.to_text.clone()));
    let adapted = WrappedMethodWithCasts::new(direct, vec![fx.core.string.clone()]).unwrap();
    let call = ast.alloc(
        Span::default(),
        NodeKind::MethodCall {
            method: Rc::new(adapted),
            arguments: vec![x],
        },
    );

    insta::assert_snapshot!(emit_value(&fx, &ast, call, None).unwrap(), @r#"
    ldstr "x"
    castclass System.Object
    call Ui.Convert::ToText
    "#);
}

#[test]
fn manipulations_are_not_values() {
    let fx = fixture();
    let mut ast = Ast::new();
    let group = ast.alloc(Span::new(3, 9), NodeKind::ManipulationGroup { children: Vec::new() });

    let err = emit_value(&fx, &ast, group, None).unwrap_err();
    assert_eq!(
        err,
        EmitError::NotAValue {
            node: "ManipulationGroup",
            span: Span::new(3, 9),
        }
    );
}
