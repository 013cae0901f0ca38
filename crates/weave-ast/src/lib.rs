//! AST node model for the Weave markup compiler.
//!
//! Nodes live in an [`Ast`] arena and refer to their children by
//! [`NodeId`]. Parser output and resolved nodes share one tagged union,
//! [`NodeKind`]; transformation passes rewrite the former into the latter.
//!
//! # Architecture
//!
//! - [`arena`]: `Ast`, `NodeId`, tree dump
//! - [`node`]: `NodeKind`, `NodeClass`, `TypeReference`
//! - [`property`]: `ClrProperty`, `PropertySetter`, `DirectCallPropertySetter`,
//!   `AdaptedPropertySetter`

pub mod arena;
pub mod node;
pub mod property;

pub use arena::{Ast, Node, NodeId};
pub use node::{NodeClass, NodeKind, TypeReference};
pub use property::{
    AdaptedPropertySetter, BinderParameters, ClrProperty, DirectCallPropertySetter, PropertyRef, PropertySetter,
};
