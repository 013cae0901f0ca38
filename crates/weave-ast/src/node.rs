//! Node kinds.
//!
//! Every node is either a value (leaves one value on the stack when emitted),
//! a manipulation (consumes a target object supplied by its parent), or a
//! type reference. The parser produces the first group of kinds below;
//! transformation passes rewrite them into the resolved kinds.

use std::fmt;
use std::rc::Rc;

use weave_callsite::WrappedMethod;
use weave_typesys::{ConstValue, HostConstructor, HostMethod, HostType};

use crate::arena::NodeId;
use crate::property::{ClrProperty, PropertyRef, PropertySetter};

/// A resolved type, possibly marked as a markup-extension producer.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeReference {
    pub ty: HostType,
    pub is_markup_extension: bool,
}

impl TypeReference {
    pub fn new(ty: HostType) -> Self {
        Self {
            ty,
            is_markup_extension: false,
        }
    }

    pub fn markup_extension(ty: HostType) -> Self {
        Self {
            ty,
            is_markup_extension: true,
        }
    }
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ty.fqn())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeClass {
    Value,
    Manipulation,
    TypeReference,
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    // ── Parser-level ───────────────────────────────────────────────────
    /// `prefix:Name` as written, with its namespace URI already looked up
    /// from the prefix.
    XmlTypeReference {
        xml_namespace: String,
        name: String,
        generic_arguments: Vec<NodeId>,
    },
    /// An object element. `type_ref` is a type reference node; `children`
    /// are property values.
    Object {
        type_ref: NodeId,
        arguments: Vec<NodeId>,
        children: Vec<NodeId>,
    },
    PropertyValue {
        property: PropertyRef,
        values: Vec<NodeId>,
    },

    // ── Resolved ───────────────────────────────────────────────────────
    /// A literal. Parsers emit text as `Str` constants typed `System.String`.
    Constant {
        value: ConstValue,
        ty: HostType,
    },
    ClrTypeReference(TypeReference),
    NewClrObject {
        type_ref: TypeReference,
        constructor: HostConstructor,
        arguments: Vec<NodeId>,
    },
    PropertyAssignment {
        property: ClrProperty,
        possible_setters: Vec<Rc<dyn PropertySetter>>,
        values: Vec<NodeId>,
    },
    /// Applies `manipulation` to the current value of `property` (read
    /// through its getter) instead of to the object itself.
    PropertyValueManipulation {
        property: ClrProperty,
        manipulation: NodeId,
    },
    NoReturnMethodCall {
        method: Rc<dyn WrappedMethod>,
        arguments: Vec<NodeId>,
    },
    /// A static call, or an instance call whose receiver is the first
    /// argument. Produces the method's return value.
    MethodCall {
        method: Rc<dyn WrappedMethod>,
        arguments: Vec<NodeId>,
    },
    ManipulationGroup {
        children: Vec<NodeId>,
    },
    /// Produces `value` after applying `manipulation` to it.
    ValueWithManipulation {
        value: NodeId,
        manipulation: NodeId,
    },
    /// Produces `provide_value(value[, service provider])`.
    MarkupExtension {
        value: NodeId,
        provide_value: HostMethod,
    },
    /// Wraps the manipulations that initialize a freshly constructed object.
    ObjectInitialization {
        manipulation: NodeId,
        ty: HostType,
        skip_begin_init: bool,
    },
    /// A value compiled into a separately invocable factory of type `ty`.
    DeferredContent {
        value: NodeId,
        ty: HostType,
    },
}

impl NodeKind {
    /// Child slots in visitation order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::XmlTypeReference {
                generic_arguments, ..
            } => generic_arguments.clone(),
            NodeKind::Object {
                type_ref,
                arguments,
                children,
            } => std::iter::once(*type_ref)
                .chain(arguments.iter().copied())
                .chain(children.iter().copied())
                .collect(),
            NodeKind::PropertyValue { values, .. } => values.clone(),
            NodeKind::Constant { .. } | NodeKind::ClrTypeReference(_) => Vec::new(),
            NodeKind::NewClrObject { arguments, .. }
            | NodeKind::NoReturnMethodCall { arguments, .. }
            | NodeKind::MethodCall { arguments, .. } => arguments.clone(),
            NodeKind::PropertyAssignment { values, .. } => values.clone(),
            NodeKind::PropertyValueManipulation { manipulation, .. }
            | NodeKind::ObjectInitialization { manipulation, .. } => vec![*manipulation],
            NodeKind::ManipulationGroup { children } => children.clone(),
            NodeKind::ValueWithManipulation {
                value,
                manipulation,
            } => vec![*value, *manipulation],
            NodeKind::MarkupExtension { value, .. } | NodeKind::DeferredContent { value, .. } => {
                vec![*value]
            }
        }
    }

    /// Mutable child slots, in the same order as [`NodeKind::children`].
    pub fn children_mut(&mut self) -> Vec<&mut NodeId> {
        match self {
            NodeKind::XmlTypeReference {
                generic_arguments, ..
            } => generic_arguments.iter_mut().collect(),
            NodeKind::Object {
                type_ref,
                arguments,
                children,
            } => std::iter::once(type_ref)
                .chain(arguments.iter_mut())
                .chain(children.iter_mut())
                .collect(),
            NodeKind::PropertyValue { values, .. } => values.iter_mut().collect(),
            NodeKind::Constant { .. } | NodeKind::ClrTypeReference(_) => Vec::new(),
            NodeKind::NewClrObject { arguments, .. }
            | NodeKind::NoReturnMethodCall { arguments, .. }
            | NodeKind::MethodCall { arguments, .. } => arguments.iter_mut().collect(),
            NodeKind::PropertyAssignment { values, .. } => values.iter_mut().collect(),
            NodeKind::PropertyValueManipulation { manipulation, .. }
            | NodeKind::ObjectInitialization { manipulation, .. } => vec![manipulation],
            NodeKind::ManipulationGroup { children } => children.iter_mut().collect(),
            NodeKind::ValueWithManipulation {
                value,
                manipulation,
            } => vec![value, manipulation],
            NodeKind::MarkupExtension { value, .. } | NodeKind::DeferredContent { value, .. } => {
                vec![value]
            }
        }
    }

    pub fn class(&self) -> NodeClass {
        match self {
            NodeKind::XmlTypeReference { .. } | NodeKind::ClrTypeReference(_) => NodeClass::TypeReference,
            NodeKind::PropertyValue { .. }
            | NodeKind::PropertyAssignment { .. }
            | NodeKind::PropertyValueManipulation { .. }
            | NodeKind::NoReturnMethodCall { .. }
            | NodeKind::ManipulationGroup { .. }
            | NodeKind::ObjectInitialization { .. } => NodeClass::Manipulation,
            NodeKind::Object { .. }
            | NodeKind::Constant { .. }
            | NodeKind::NewClrObject { .. }
            | NodeKind::MethodCall { .. }
            | NodeKind::ValueWithManipulation { .. }
            | NodeKind::MarkupExtension { .. }
            | NodeKind::DeferredContent { .. } => NodeClass::Value,
        }
    }

    /// Whether the node only exists before resolution.
    pub fn is_parser_level(&self) -> bool {
        matches!(
            self,
            NodeKind::XmlTypeReference { .. } | NodeKind::Object { .. } | NodeKind::PropertyValue { .. }
        )
    }

    /// Opt-in read access to the ancestor stack during emission.
    pub fn needs_parent_stack(&self) -> bool {
        match self {
            NodeKind::MarkupExtension { provide_value, .. } => !provide_value.parameters().is_empty(),
            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::XmlTypeReference { .. } => "XmlTypeReference",
            NodeKind::Object { .. } => "Object",
            NodeKind::PropertyValue { .. } => "PropertyValue",
            NodeKind::Constant { .. } => "Constant",
            NodeKind::ClrTypeReference(_) => "ClrTypeReference",
            NodeKind::NewClrObject { .. } => "NewClrObject",
            NodeKind::PropertyAssignment { .. } => "PropertyAssignment",
            NodeKind::PropertyValueManipulation { .. } => "PropertyValueManipulation",
            NodeKind::NoReturnMethodCall { .. } => "NoReturnMethodCall",
            NodeKind::MethodCall { .. } => "MethodCall",
            NodeKind::ManipulationGroup { .. } => "ManipulationGroup",
            NodeKind::ValueWithManipulation { .. } => "ValueWithManipulation",
            NodeKind::MarkupExtension { .. } => "MarkupExtension",
            NodeKind::ObjectInitialization { .. } => "ObjectInitialization",
            NodeKind::DeferredContent { .. } => "DeferredContent",
        }
    }
}
