//! Call-site emission: wrapped methods and cast adaptation.
//!
//! - [`wrapped`]: `WrappedMethod`, the direct wrapper and the cast-adapting decorator
//! - [`casts`]: the shared cast algorithm and `MethodWithCasts`
//! - [`error`]: `SignatureAdaptationError`

pub mod casts;
pub mod error;
pub mod wrapped;

pub use casts::{emit_argument_casts, MethodWithCasts};
pub use error::SignatureAdaptationError;
pub use wrapped::{DirectWrappedMethod, WrappedMethod, WrappedMethodWithCasts};
