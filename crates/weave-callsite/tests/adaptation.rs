//! Cast adaptation for wrapped methods and plain method handles.

use std::rc::Rc;

use weave_callsite::{
    DirectWrappedMethod, MethodWithCasts, SignatureAdaptationError, WrappedMethod,
    WrappedMethodWithCasts,
};
use weave_typesys::memory::{CoreTypes, MemoryTypeSystem};
use weave_typesys::{Emitter, HostMethod, HostType, Instr, RecordingEmitter};

// ── Helpers ────────────────────────────────────────────────────────────

struct Zoo {
    core: CoreTypes,
    animal: HostType,
    dog: HostType,
    cat: HostType,
    keeper: HostType,
    /// `static void Keeper.Pair(Animal, Animal)`
    pair: HostMethod,
    /// `static void Keeper.Line(Animal, Animal, Animal)`
    line: HostMethod,
    /// `Animal Keeper.Adopt(Animal)`, an instance method.
    adopt: HostMethod,
}

fn zoo() -> Zoo {
    let (ts, core) = MemoryTypeSystem::with_core_types();
    let asm = ts.assembly("Zoo");
    let animal = asm.class("Zoo", "Animal");
    let dog = asm.class("Zoo", "Dog");
    dog.set_base(&animal.ty());
    let cat = asm.class("Zoo", "Cat");
    cat.set_base(&animal.ty());
    let keeper = asm.class("Zoo", "Keeper");
    let a = animal.ty();
    let pair = keeper.add_static_method("Pair", &core.void, &[a.clone(), a.clone()]);
    let line = keeper.add_static_method("Line", &core.void, &[a.clone(), a.clone(), a.clone()]);
    let adopt = keeper.add_method("Adopt", &a, &[a.clone()]);
    Zoo {
        core,
        animal: a,
        dog: dog.ty(),
        cat: cat.ty(),
        keeper: keeper.ty(),
        pair,
        line,
        adopt,
    }
}

fn emit_wrapped(method: &dyn WrappedMethod, swallow: bool) -> RecordingEmitter {
    let mut rec = RecordingEmitter::new();
    method.emit(&mut rec, swallow);
    rec
}

fn count_casts(rec: &RecordingEmitter) -> usize {
    rec.instructions()
        .iter()
        .filter(|i| matches!(i, Instr::Castclass(_)))
        .count()
}

// ── Wrapped methods ────────────────────────────────────────────────────

#[test]
fn direct_wrapper_exposes_receiver() {
    let z = zoo();
    let wrapped = DirectWrappedMethod::new(z.adopt.clone());
    assert_eq!(wrapped.parameters_with_this(), &[z.keeper.clone(), z.animal.clone()]);
    assert_eq!(wrapped.return_type(), z.animal);

    let rec = emit_wrapped(&wrapped, true);
    insta::assert_snapshot!(rec.listing(), @r"
    call Zoo.Keeper::Adopt
    pop
    ");
}

#[test]
fn identical_parameters_emit_no_casts_and_no_temporaries() {
    let z = zoo();
    let base: Rc<dyn WrappedMethod> = Rc::new(DirectWrappedMethod::new(z.pair.clone()));
    let adapted = WrappedMethodWithCasts::new(base, vec![z.animal.clone(), z.animal.clone()]).unwrap();

    let rec = emit_wrapped(&adapted, false);
    assert_eq!(rec.instructions(), vec![Instr::Call(z.pair.clone())]);
    assert_eq!(rec.locals_pool().acquisitions(), 0);
}

#[test]
fn dog_and_cat_into_animal_pair() {
    let z = zoo();
    let base: Rc<dyn WrappedMethod> = Rc::new(DirectWrappedMethod::new(z.pair.clone()));
    let adapted = WrappedMethodWithCasts::new(base, vec![z.dog.clone(), z.cat.clone()]).unwrap();

    let rec = emit_wrapped(&adapted, false);
    assert_eq!(count_casts(&rec), 2);
    assert_eq!(rec.locals_pool().acquisitions(), 1);
    assert_eq!(rec.locals_pool().live(), 0);
    insta::assert_snapshot!(rec.listing(), @r"
    castclass Zoo.Animal
    stloc 0
    castclass Zoo.Animal
    ldloc 0
    call Zoo.Keeper::Pair
    ");
}

#[test]
fn casts_cover_only_the_mismatching_suffix() {
    let z = zoo();
    let base: Rc<dyn WrappedMethod> = Rc::new(DirectWrappedMethod::new(z.line.clone()));
    let adapted = WrappedMethodWithCasts::new(
        base,
        vec![z.animal.clone(), z.dog.clone(), z.animal.clone()],
    )
    .unwrap();

    // firstCast = 1, so 3 - 1 casts; the last position matches but sits above
    // firstCast and is cast anyway.
    let rec = emit_wrapped(&adapted, false);
    assert_eq!(count_casts(&rec), 2);
    insta::assert_snapshot!(rec.listing(), @r"
    castclass Zoo.Animal
    stloc 0
    castclass Zoo.Animal
    ldloc 0
    call Zoo.Keeper::Line
    ");
}

#[test]
fn receiver_is_cast_for_instance_methods() {
    let z = zoo();
    let base: Rc<dyn WrappedMethod> = Rc::new(DirectWrappedMethod::new(z.adopt.clone()));
    let adapted =
        WrappedMethodWithCasts::new(base, vec![z.core.object.clone(), z.dog.clone()]).unwrap();

    let rec = emit_wrapped(&adapted, false);
    insta::assert_snapshot!(rec.listing(), @r"
    castclass Zoo.Animal
    stloc 0
    castclass Zoo.Keeper
    ldloc 0
    call Zoo.Keeper::Adopt
    ");
}

#[test]
fn three_temporaries_reload_in_original_order() {
    let (ts, core) = MemoryTypeSystem::with_core_types();
    let asm = ts.assembly("Shapes");
    let shape = asm.class("Shapes", "Shape");
    let s = shape.ty();
    let draw = shape.add_static_method("Draw", &core.void, &[s.clone(), s.clone(), s.clone(), s.clone()]);
    let base: Rc<dyn WrappedMethod> = Rc::new(DirectWrappedMethod::new(draw));
    let o = core.object.clone();
    let adapted = WrappedMethodWithCasts::new(base, vec![o.clone(), o.clone(), o.clone(), o]).unwrap();

    let rec = emit_wrapped(&adapted, false);
    assert_eq!(count_casts(&rec), 4);
    assert_eq!(rec.locals_pool().acquisitions(), 3);
    insta::assert_snapshot!(rec.listing(), @r"
    castclass Shapes.Shape
    stloc 0
    castclass Shapes.Shape
    stloc 1
    castclass Shapes.Shape
    stloc 2
    castclass Shapes.Shape
    ldloc 2
    ldloc 1
    ldloc 0
    call Shapes.Shape::Draw
    ");
}

#[test]
fn temporaries_are_reused_by_the_next_call() {
    let z = zoo();
    let base: Rc<dyn WrappedMethod> = Rc::new(DirectWrappedMethod::new(z.pair.clone()));
    let adapted = WrappedMethodWithCasts::new(base, vec![z.dog.clone(), z.cat.clone()]).unwrap();

    let mut rec = RecordingEmitter::new();
    adapted.emit(&mut rec, false);
    adapted.emit(&mut rec, false);
    assert_eq!(rec.locals_pool().acquisitions(), 2);
    assert_eq!(rec.locals().len(), 1);
}

#[test]
fn arity_mismatch_is_rejected() {
    let z = zoo();
    let base: Rc<dyn WrappedMethod> = Rc::new(DirectWrappedMethod::new(z.pair.clone()));
    let err = WrappedMethodWithCasts::new(base, vec![z.dog.clone()])
        .err()
        .unwrap();
    assert_eq!(
        err,
        SignatureAdaptationError {
            method: "Zoo.Keeper::Pair".into(),
            expected: 2,
            found: 1,
        }
    );

    let err = MethodWithCasts::new(z.adopt.clone(), vec![z.dog.clone()]).err().unwrap();
    assert_eq!(err.expected, 2);
}

// ── MethodWithCasts ────────────────────────────────────────────────────

#[test]
fn method_with_casts_emits_through_emit_call() {
    let z = zoo();
    let adapted = MethodWithCasts::new(z.adopt.clone(), vec![z.core.object.clone(), z.cat.clone()])
        .unwrap()
        .into_method();
    assert!(adapted.is_static());
    assert_eq!(adapted.parameters(), vec![z.core.object.clone(), z.cat.clone()]);
    assert_eq!(adapted.parameters_with_this(), adapted.parameters());

    let mut rec = RecordingEmitter::new();
    let gen: &mut dyn Emitter = &mut rec;
    gen.emit_call(&adapted, true);
    insta::assert_snapshot!(rec.listing(), @r"
    castclass Zoo.Animal
    stloc 0
    castclass Zoo.Keeper
    ldloc 0
    call Zoo.Keeper::Adopt
    pop
    ");
}

#[test]
fn method_with_casts_identity_includes_parameter_list() {
    let z = zoo();
    let a = MethodWithCasts::new(z.pair.clone(), vec![z.dog.clone(), z.cat.clone()])
        .unwrap()
        .into_method();
    let b = MethodWithCasts::new(z.pair.clone(), vec![z.dog.clone(), z.cat.clone()])
        .unwrap()
        .into_method();
    let c = MethodWithCasts::new(z.pair.clone(), vec![z.cat.clone(), z.dog.clone()])
        .unwrap()
        .into_method();
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_ne!(a, z.pair);
    assert_eq!(a.id(), z.pair.id());
}

#[test]
fn method_with_identical_parameters_is_a_plain_call() {
    let z = zoo();
    let adapted = MethodWithCasts::new(z.pair.clone(), vec![z.animal.clone(), z.animal.clone()])
        .unwrap()
        .into_method();
    let mut rec = RecordingEmitter::new();
    let gen: &mut dyn Emitter = &mut rec;
    gen.emit_call(&adapted, true);
    // Void result: nothing to pop.
    assert_eq!(rec.instructions(), vec![Instr::Call(z.pair.clone())]);
    assert_eq!(rec.locals_pool().acquisitions(), 0);
}
