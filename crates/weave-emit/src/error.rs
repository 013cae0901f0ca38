use std::fmt;

use weave_common::Span;
use weave_typesys::TypeResolutionError;

/// Why a resolved tree could not be turned into code.
#[derive(Debug, Clone, PartialEq)]
pub enum EmitError {
    /// A parser-level node survived transformation (lenient mode leaves them
    /// behind after reporting).
    UnresolvedNode { node: &'static str, span: Span },
    /// A manipulation or type reference where a value was needed.
    NotAValue { node: &'static str, span: Span },
    /// A value or type reference where a manipulation was needed.
    NotAManipulation { node: &'static str, span: Span },
    NoSetter { property: String, span: Span },
    NoGetter { property: String, span: Span },
    UnsupportedConstant { value: String, span: Span },
    /// A value that no conversion turns into the slot's type.
    IncompatibleValue { expected: String, actual: String, span: Span },
    TypeResolution(TypeResolutionError),
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitError::UnresolvedNode { node, .. } => {
                write!(f, "cannot emit unresolved {} node", node)
            }
            EmitError::NotAValue { node, .. } => write!(f, "{} does not produce a value", node),
            EmitError::NotAManipulation { node, .. } => {
                write!(f, "{} cannot be applied to an object", node)
            }
            EmitError::NoSetter { property, .. } => write!(f, "property {} has no bound setter", property),
            EmitError::NoGetter { property, .. } => write!(f, "property {} has no getter", property),
            EmitError::UnsupportedConstant { value, .. } => {
                write!(f, "constant {} has no instruction encoding", value)
            }
            EmitError::IncompatibleValue { expected, actual, .. } => {
                write!(f, "cannot pass a {} value where {} is expected", actual, expected)
            }
            EmitError::TypeResolution(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for EmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EmitError::TypeResolution(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TypeResolutionError> for EmitError {
    fn from(err: TypeResolutionError) -> Self {
        EmitError::TypeResolution(err)
    }
}
