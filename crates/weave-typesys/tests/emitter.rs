//! Recording emitter, call emission and the temporaries pool.

use weave_typesys::memory::MemoryTypeSystem;
use weave_typesys::{Emitter, Instr, RecordingEmitter};

#[test]
fn swallowed_call_pops_non_void_results_only() {
    let (ts, core) = MemoryTypeSystem::with_core_types();
    let ui = ts.assembly("Ui");
    let panel = ui.class("Ui", "Panel");
    let add = panel.add_method("Add", &core.int32, &[core.object.clone()]);
    let clear = panel.add_method("Clear", &core.void, &[]);

    let mut rec = RecordingEmitter::new();
    let gen: &mut dyn Emitter = &mut rec;
    gen.ldarg(0).ldnull().emit_call(&add, true);
    gen.ldarg(0).emit_call(&clear, true);
    gen.ldarg(0).ldnull().emit_call(&add, false).ret();

    insta::assert_snapshot!(rec.listing(), @r"
    ldarg.0
    ldnull
    call Ui.Panel::Add
    pop
    ldarg.0
    call Ui.Panel::Clear
    ldarg.0
    ldnull
    call Ui.Panel::Add
    ret
    ");
}

#[test]
fn pool_reuses_released_locals_of_the_same_type() {
    let (_ts, core) = MemoryTypeSystem::with_core_types();
    let mut rec = RecordingEmitter::new();
    let pool = rec.locals_pool();

    let first = pool.get_local(&core.string, &mut rec);
    let second = pool.get_local(&core.string, &mut rec);
    assert_ne!(first.local(), second.local());
    assert_eq!(pool.live(), 2);

    let reused_slot = first.local();
    drop(first);
    assert_eq!(pool.live(), 1);

    let third = pool.get_local(&core.string, &mut rec);
    assert_eq!(third.local(), reused_slot);

    let other = pool.get_local(&core.int32, &mut rec);
    assert_ne!(other.local(), reused_slot);

    drop(second);
    drop(third);
    drop(other);
    assert_eq!(pool.live(), 0);
    assert_eq!(pool.acquisitions(), 4);
    // Three distinct locals were ever defined.
    assert_eq!(rec.locals().len(), 3);
}

#[test]
fn branches_reference_labels() {
    let mut rec = RecordingEmitter::new();
    let gen: &mut dyn Emitter = &mut rec;
    let skip = gen.define_label();
    gen.ldarg(0).brfalse(skip).ldnull().pop().mark_label(skip).ret();

    assert_eq!(rec.instructions().len(), 6);
    assert_eq!(rec.instructions()[4], Instr::MarkLabel(skip));
    insta::assert_snapshot!(rec.listing(), @r"
    ldarg.0
    brfalse L0
    ldnull
    pop
    L0:
    ret
    ");
}
