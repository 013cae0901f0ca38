//! Errors raised by the type system facade.
//!
//! Only the `get_*` accessors produce these. Their `find_*` counterparts
//! return `None` and leave it to the caller to decide whether absence is fatal.

use std::fmt;

/// The kind of non-method member a lookup was searching for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberKind {
    Property,
    Field,
    Event,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Property => write!(f, "property"),
            MemberKind::Field => write!(f, "field"),
            MemberKind::Event => write!(f, "event"),
        }
    }
}

/// A required type or member lookup found nothing, or the backend refused an
/// operation on a type.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeResolutionError {
    /// `get_type` found no type with this name.
    TypeNotFound { name: String },
    /// No method satisfied the query. `description` is a human-readable
    /// rendering of the query (name, signature or predicate).
    MethodNotFound {
        type_name: String,
        description: String,
    },
    /// No public instance constructor accepts these argument types.
    ConstructorNotFound {
        type_name: String,
        arguments: Vec<String>,
    },
    /// A property, field or event lookup failed.
    MemberNotFound {
        type_name: String,
        kind: MemberKind,
        name: String,
    },
    /// The backend does not support the operation on this type
    /// (e.g. instantiating a pseudo type).
    Unsupported {
        operation: &'static str,
        subject: String,
    },
}

impl fmt::Display for TypeResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeResolutionError::TypeNotFound { name } => {
                write!(f, "unable to resolve type {}", name)
            }
            TypeResolutionError::MethodNotFound {
                type_name,
                description,
            } => {
                write!(f, "method {} is not found on type {}", description, type_name)
            }
            TypeResolutionError::ConstructorNotFound {
                type_name,
                arguments,
            } => {
                if arguments.is_empty() {
                    write!(
                        f,
                        "constructor with no arguments is not found on type {}",
                        type_name
                    )
                } else {
                    write!(
                        f,
                        "constructor with arguments {} is not found on type {}",
                        arguments.join(", "),
                        type_name
                    )
                }
            }
            TypeResolutionError::MemberNotFound {
                type_name,
                kind,
                name,
            } => {
                write!(f, "{} {} is not found on type {}", kind, name, type_name)
            }
            TypeResolutionError::Unsupported { operation, subject } => {
                write!(f, "{} is not supported by {}", operation, subject)
            }
        }
    }
}

impl std::error::Error for TypeResolutionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_message_mentions_arguments() {
        let none = TypeResolutionError::ConstructorNotFound {
            type_name: "Core:Ui.Button".into(),
            arguments: vec![],
        };
        assert_eq!(
            none.to_string(),
            "constructor with no arguments is not found on type Core:Ui.Button"
        );

        let some = TypeResolutionError::ConstructorNotFound {
            type_name: "Core:Ui.Button".into(),
            arguments: vec!["System.String".into(), "System.Int32".into()],
        };
        assert_eq!(
            some.to_string(),
            "constructor with arguments System.String, System.Int32 is not found on type Core:Ui.Button"
        );
    }

    #[test]
    fn member_message() {
        let err = TypeResolutionError::MemberNotFound {
            type_name: "Core:Ui.Button".into(),
            kind: MemberKind::Property,
            name: "Content".into(),
        };
        assert_eq!(err.to_string(), "property Content is not found on type Core:Ui.Button");
    }
}
