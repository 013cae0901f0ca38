//! Transformation pipeline for the Weave markup compiler.
//!
//! Rewrites a parsed document, bottom-up, from XML-level nodes (namespaced
//! type names, named properties, object elements) into resolved nodes bound
//! to the host type system, ready for emission.
//!
//! # Architecture
//!
//! - [`context`]: `TransformationContext` (config, namespace aliases, slots,
//!   ancestor stack, lenient/strict error policy)
//! - [`pipeline`]: `Transformer` trait, `Pipeline`, `default_passes`
//! - [`passes`]: the built-in passes
//! - [`diagnostics`]: ariadne rendering and JSON summaries
//! - [`error`]: `TransformationError`

pub mod context;
pub mod diagnostics;
pub mod error;
pub mod passes;
pub mod pipeline;

pub use context::{NamespaceAlias, SlotKey, SlotValue, TransformOptions, TransformationContext};
pub use error::{TransformErrorKind, TransformationError};
pub use pipeline::{default_passes, Pipeline, Transformer};
