//! The code-generation primitive surface.
//!
//! Backends implement [`Emitter`] for their method bodies. The compiler talks
//! to it in terms of [`Instr`], a small stack-machine instruction set, and
//! borrows temporaries from the emitter's [`LocalsPool`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ty::{HostConstructor, HostField, HostMethod, HostType};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Local(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub enum Instr {
    Ldarg(u16),
    Ldnull,
    Ldstr(String),
    LdcI4(i32),
    Ldloc(Local),
    Stloc(Local),
    Ldfld(HostField),
    Stfld(HostField),
    Call(HostMethod),
    Newobj(HostConstructor),
    Castclass(HostType),
    Box(HostType),
    /// Push the runtime type object for a type.
    Ldtype(HostType),
    Ldftn(HostMethod),
    Br(Label),
    Brfalse(Label),
    MarkLabel(Label),
    Dup,
    Pop,
    Ret,
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Ldarg(n) => write!(f, "ldarg.{}", n),
            Instr::Ldnull => write!(f, "ldnull"),
            Instr::Ldstr(s) => write!(f, "ldstr {:?}", s),
            Instr::LdcI4(n) => write!(f, "ldc.i4 {}", n),
            Instr::Ldloc(l) => write!(f, "ldloc {}", l.0),
            Instr::Stloc(l) => write!(f, "stloc {}", l.0),
            Instr::Ldfld(fld) => write!(f, "ldfld {}", fld),
            Instr::Stfld(fld) => write!(f, "stfld {}", fld),
            Instr::Call(m) => write!(f, "call {}", m),
            Instr::Newobj(c) => write!(f, "newobj {}::.ctor", c.declaring_type()),
            Instr::Castclass(t) => write!(f, "castclass {}", t),
            Instr::Box(t) => write!(f, "box {}", t),
            Instr::Ldtype(t) => write!(f, "ldtype {}", t),
            Instr::Ldftn(m) => write!(f, "ldftn {}", m),
            Instr::Br(l) => write!(f, "br L{}", l.0),
            Instr::Brfalse(l) => write!(f, "brfalse L{}", l.0),
            Instr::MarkLabel(l) => write!(f, "L{}:", l.0),
            Instr::Dup => write!(f, "dup"),
            Instr::Pop => write!(f, "pop"),
            Instr::Ret => write!(f, "ret"),
        }
    }
}

/// A method body under construction.
pub trait Emitter {
    fn emit(&mut self, instr: Instr);
    fn define_local(&mut self, ty: &HostType) -> Local;
    fn define_label(&mut self) -> Label;
    /// The temporary pool shared by every user of this body.
    fn locals_pool(&self) -> LocalsPool;
}

/// A method whose call site is not a plain `call` instruction.
pub trait CustomEmitMethod {
    fn emit_call(&self, gen: &mut dyn Emitter);
}

impl<'a> dyn Emitter + 'a {
    pub fn ldarg(&mut self, n: u16) -> &mut Self {
        self.emit(Instr::Ldarg(n));
        self
    }

    pub fn ldnull(&mut self) -> &mut Self {
        self.emit(Instr::Ldnull);
        self
    }

    pub fn ldstr(&mut self, s: &str) -> &mut Self {
        self.emit(Instr::Ldstr(s.to_string()));
        self
    }

    pub fn ldc_i4(&mut self, n: i32) -> &mut Self {
        self.emit(Instr::LdcI4(n));
        self
    }

    pub fn ldloc(&mut self, local: Local) -> &mut Self {
        self.emit(Instr::Ldloc(local));
        self
    }

    pub fn stloc(&mut self, local: Local) -> &mut Self {
        self.emit(Instr::Stloc(local));
        self
    }

    pub fn ldfld(&mut self, field: &HostField) -> &mut Self {
        self.emit(Instr::Ldfld(field.clone()));
        self
    }

    pub fn stfld(&mut self, field: &HostField) -> &mut Self {
        self.emit(Instr::Stfld(field.clone()));
        self
    }

    pub fn newobj(&mut self, ctor: &HostConstructor) -> &mut Self {
        self.emit(Instr::Newobj(ctor.clone()));
        self
    }

    pub fn castclass(&mut self, ty: &HostType) -> &mut Self {
        self.emit(Instr::Castclass(ty.clone()));
        self
    }

    pub fn box_value(&mut self, ty: &HostType) -> &mut Self {
        self.emit(Instr::Box(ty.clone()));
        self
    }

    pub fn ldtype(&mut self, ty: &HostType) -> &mut Self {
        self.emit(Instr::Ldtype(ty.clone()));
        self
    }

    pub fn ldftn(&mut self, method: &HostMethod) -> &mut Self {
        self.emit(Instr::Ldftn(method.clone()));
        self
    }

    pub fn br(&mut self, label: Label) -> &mut Self {
        self.emit(Instr::Br(label));
        self
    }

    pub fn brfalse(&mut self, label: Label) -> &mut Self {
        self.emit(Instr::Brfalse(label));
        self
    }

    pub fn mark_label(&mut self, label: Label) -> &mut Self {
        self.emit(Instr::MarkLabel(label));
        self
    }

    pub fn dup(&mut self) -> &mut Self {
        self.emit(Instr::Dup);
        self
    }

    pub fn pop(&mut self) -> &mut Self {
        self.emit(Instr::Pop);
        self
    }

    pub fn ret(&mut self) -> &mut Self {
        self.emit(Instr::Ret);
        self
    }

    /// Call `method`, dropping its result when `swallow_result` is set and it
    /// returns something.
    pub fn emit_call(&mut self, method: &HostMethod, swallow_result: bool) -> &mut Self {
        match method.custom_emit() {
            Some(custom) => custom.emit_call(self),
            None => self.emit(Instr::Call(method.clone())),
        }
        if swallow_result && !method.return_type().is_void() {
            self.emit(Instr::Pop);
        }
        self
    }
}

// ── Temporaries ────────────────────────────────────────────────────────

#[derive(Default)]
struct PoolState {
    free: Vec<(HostType, Local)>,
    acquisitions: usize,
    live: usize,
}

/// Hands out locals for the duration of one emission scope and recycles
/// them once released. Two live temporaries never share a local.
#[derive(Clone, Default)]
pub struct LocalsPool(Rc<RefCell<PoolState>>);

impl LocalsPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow a local of type `ty`, reusing a released one if possible.
    pub fn get_local(&self, ty: &HostType, gen: &mut dyn Emitter) -> PooledLocal {
        let reused = {
            let mut state = self.0.borrow_mut();
            state.acquisitions += 1;
            state.live += 1;
            let pos = state.free.iter().position(|(t, _)| t == ty);
            pos.map(|i| state.free.swap_remove(i).1)
        };
        let local = match reused {
            Some(local) => local,
            None => gen.define_local(ty),
        };
        PooledLocal {
            pool: self.clone(),
            ty: ty.clone(),
            local,
        }
    }

    /// Total number of `get_local` calls over the pool's lifetime.
    pub fn acquisitions(&self) -> usize {
        self.0.borrow().acquisitions
    }

    /// Temporaries currently checked out.
    pub fn live(&self) -> usize {
        self.0.borrow().live
    }
}

/// A checked-out temporary. Dropping it returns the local to the pool.
pub struct PooledLocal {
    pool: LocalsPool,
    ty: HostType,
    local: Local,
}

impl PooledLocal {
    pub fn local(&self) -> Local {
        self.local
    }
}

impl Drop for PooledLocal {
    fn drop(&mut self) {
        let mut state = self.pool.0.borrow_mut();
        state.live -= 1;
        state.free.push((self.ty.clone(), self.local));
    }
}

// ── Recording emitter ──────────────────────────────────────────────────

/// An emitter that just records what it is given. Backends that produce
/// bytecode lazily can use it as a staging buffer; tests read the listing.
#[derive(Clone, Default)]
pub struct RecordingEmitter {
    body: Rc<RefCell<Vec<Instr>>>,
    locals: Rc<RefCell<Vec<HostType>>>,
    labels: u32,
    pool: LocalsPool,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record into an existing shared body.
    pub fn with_body(body: Rc<RefCell<Vec<Instr>>>) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    pub fn instructions(&self) -> Vec<Instr> {
        self.body.borrow().clone()
    }

    /// Types of the locals defined so far, indexed by `Local`.
    pub fn locals(&self) -> Vec<HostType> {
        self.locals.borrow().clone()
    }

    /// One instruction per line.
    pub fn listing(&self) -> String {
        listing(&self.body.borrow())
    }
}

impl Emitter for RecordingEmitter {
    fn emit(&mut self, instr: Instr) {
        self.body.borrow_mut().push(instr);
    }

    fn define_local(&mut self, ty: &HostType) -> Local {
        let mut locals = self.locals.borrow_mut();
        locals.push(ty.clone());
        Local(locals.len() as u32 - 1)
    }

    fn define_label(&mut self) -> Label {
        self.labels += 1;
        Label(self.labels - 1)
    }

    fn locals_pool(&self) -> LocalsPool {
        self.pool.clone()
    }
}

/// Render instructions one per line.
pub fn listing(instrs: &[Instr]) -> String {
    let mut out = String::new();
    for instr in instrs {
        out.push_str(&instr.to_string());
        out.push('\n');
    }
    out
}
