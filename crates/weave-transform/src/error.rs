use std::fmt;

use weave_common::Span;
use weave_typesys::TypeResolutionError;

use crate::context::SlotKey;

/// A semantic problem found by a transformation pass.
///
/// In strict mode the first one aborts the pipeline. In lenient mode it is
/// recorded on the context and the pass carries on with a substitute node.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformationError {
    pub kind: TransformErrorKind,
    pub span: Span,
}

impl TransformationError {
    pub fn new(kind: TransformErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransformErrorKind {
    /// The XML namespace maps to no CLR namespace.
    UnknownNamespace { xml_namespace: String },
    /// No type with this name in any CLR namespace the XML namespace maps to.
    UnresolvedType { xml_namespace: String, name: String },
    UnresolvedProperty { type_name: String, property: String },
    /// The property has neither a setter nor a getter to add through.
    InvalidAssignmentTarget { property: String },
    /// A property element with no enclosing object element.
    PropertyOutsideObject { property: String },
    NoConstructor { type_name: String, arguments: Vec<String> },
    MissingProvideValue { type_name: String },
    AmbiguousMarkupExtension { type_name: String, candidates: usize },
    NoMatchingSetter { property: String, value_types: Vec<String> },
    /// A pass ran before the pass producing a slot it reads. Always fatal.
    MissingSlot { pass: &'static str, slot: SlotKey },
    /// The document has no root node.
    EmptyDocument,
    /// The type system refused an operation (generic instantiation, ...).
    TypeSystem { message: String },
}

impl fmt::Display for TransformErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNamespace { xml_namespace } => {
                write!(f, "unknown XML namespace `{}`", xml_namespace)
            }
            Self::UnresolvedType { xml_namespace, name } => {
                write!(f, "unable to resolve type {} in namespace `{}`", name, xml_namespace)
            }
            Self::UnresolvedProperty { type_name, property } => {
                write!(f, "unable to find property {} on type {}", property, type_name)
            }
            Self::InvalidAssignmentTarget { property } => {
                write!(f, "property {} has no setter and no collection to add to", property)
            }
            Self::PropertyOutsideObject { property } => {
                write!(f, "property {} is not inside an object element", property)
            }
            Self::NoConstructor {
                type_name,
                arguments,
            } => {
                if arguments.is_empty() {
                    write!(f, "no parameterless constructor on type {}", type_name)
                } else {
                    write!(
                        f,
                        "no constructor on type {} accepts ({})",
                        type_name,
                        arguments.join(", ")
                    )
                }
            }
            Self::MissingProvideValue { type_name } => {
                write!(f, "markup extension {} has no ProvideValue method", type_name)
            }
            Self::AmbiguousMarkupExtension {
                type_name,
                candidates,
            } => {
                write!(
                    f,
                    "markup extension {} has {} applicable ProvideValue overloads",
                    type_name, candidates
                )
            }
            Self::NoMatchingSetter {
                property,
                value_types,
            } => {
                write!(
                    f,
                    "no setter of property {} accepts ({})",
                    property,
                    value_types.join(", ")
                )
            }
            Self::MissingSlot { pass, slot } => {
                write!(f, "pass {} requires the {} slot, which no earlier pass produced", pass, slot)
            }
            Self::EmptyDocument => write!(f, "document has no root node"),
            Self::TypeSystem { message } => write!(f, "{}", message),
        }
    }
}

impl fmt::Display for TransformationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for TransformationError {}

impl From<TypeResolutionError> for TransformErrorKind {
    fn from(err: TypeResolutionError) -> Self {
        TransformErrorKind::TypeSystem {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = TransformationError::new(
            TransformErrorKind::UnresolvedType {
                xml_namespace: "urn:ui".into(),
                name: "Buton".into(),
            },
            Span::new(1, 6),
        );
        assert_eq!(err.to_string(), "unable to resolve type Buton in namespace `urn:ui`");

        let kind = TransformErrorKind::MissingSlot {
            pass: "ObjectConstructionTransformer",
            slot: SlotKey::TypeCache,
        };
        assert_eq!(
            kind.to_string(),
            "pass ObjectConstructionTransformer requires the type cache slot, which no earlier pass produced"
        );
    }

    #[test]
    fn type_system_errors_convert() {
        let kind: TransformErrorKind = TypeResolutionError::TypeNotFound {
            name: "Ui.Missing".into(),
        }
        .into();
        assert_eq!(kind.to_string(), "unable to resolve type Ui.Missing");
    }
}
