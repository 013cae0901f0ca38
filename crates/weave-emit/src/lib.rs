//! Code emission for the Weave markup compiler.
//!
//! Turns a transformed document into instructions on the host backend's
//! [`Emitter`](weave_typesys::Emitter): one static `Build` method for the
//! document, plus one nested closure type per deferred-content subtree.
//!
//! # Architecture
//!
//! - [`context`]: `EmitContext`, value and manipulation emission
//! - [`closure`]: deferred-content closures
//! - [`runtime`]: `RuntimeContext`, the context type's construction contract
//!   and its optional parent stack
//! - [`document`]: `compile_document` entry point
//! - [`error`]: `EmitError`

pub mod closure;
pub mod context;
pub mod document;
pub mod error;
pub mod runtime;

pub use context::EmitContext;
pub use document::compile_document;
pub use error::EmitError;
pub use runtime::{ParentStack, RuntimeContext};
