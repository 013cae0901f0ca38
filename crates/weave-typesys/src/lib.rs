//! Host type system facade for the Weave markup compiler.
//!
//! The compiler never depends on a concrete reflection or metadata library.
//! Everything it needs to know about types, and everything it needs to build
//! new ones, goes through the traits in this crate.
//!
//! # Architecture
//!
//! - [`ty`]: Handles (`HostType`, `HostMethod`, ...) over backend trait objects
//! - [`pseudo`]: Placeholder types with no backend behind them
//! - [`system`]: The `TypeSystem` entry point (assemblies, type lookup)
//! - [`resolve`]: Member resolution (methods, constructors, properties, fields)
//! - [`emit`]: Instruction set, `Emitter`, temporaries pool
//! - [`builder`]: Type/method/constructor builders used by emission
//! - [`config`]: `CompilerConfig`, well-known types, type mappings
//! - [`memory`]: In-memory reference backend
//! - [`error`]: `TypeResolutionError`

pub mod builder;
pub mod config;
pub mod emit;
pub mod error;
pub mod memory;
pub mod pseudo;
pub mod resolve;
pub mod system;
pub mod ty;

pub use builder::{ConstructorBuilder, MethodBuilder, TypeBuilder};
pub use config::{CompilerConfig, TypeMappings, WellKnownTypes};
pub use emit::{CustomEmitMethod, Emitter, Instr, Label, Local, LocalsPool, PooledLocal, RecordingEmitter};
pub use error::{MemberKind, TypeResolutionError};
pub use pseudo::PseudoType;
pub use resolve::MethodSignature;
pub use system::{TypeSystem, TypeSystemExt};
pub use ty::{
    ConstValue, CustomAttribute, HandleId, HostAssembly, HostConstructor, HostEvent, HostField,
    HostMethod, HostProperty, HostType, Visibility,
};
