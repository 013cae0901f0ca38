//! Shared source-location types for the Weave markup compiler.

pub mod span;

pub use span::{LineIndex, Position, Span};
