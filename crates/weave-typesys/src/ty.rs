//! Handles into the host type system.
//!
//! The compiler never sees a backend's metadata directly. Every type, method,
//! constructor, property, field, event, assembly and attribute is reached
//! through a cheap-to-clone handle wrapping an `Rc<dyn ...Info>` trait object
//! the backend implements. Handles compare and hash by their backend-assigned
//! [`HandleId`], so two handles obtained through different lookups are equal
//! whenever they denote the same metadata.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::Rc;

use crate::emit::CustomEmitMethod;
use crate::error::TypeResolutionError;

/// Stable identity of a piece of backend metadata.
///
/// Backends allocate ids below [`crate::pseudo::PSEUDO_ID_BASE`]; the upper
/// half of the range belongs to pseudo types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub u64);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Assembly,
    Private,
}

/// A compile-time constant: attribute arguments, literal fields, markup text.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Null => write!(f, "null"),
            ConstValue::Bool(b) => write!(f, "{}", b),
            ConstValue::Int(i) => write!(f, "{}", i),
            ConstValue::Float(x) => write!(f, "{}", x),
            ConstValue::Str(s) => write!(f, "{:?}", s),
        }
    }
}

// ── Backend contracts ──────────────────────────────────────────────────

/// Metadata of a type as exposed by a backend.
pub trait TypeInfo {
    fn id(&self) -> HandleId;
    fn name(&self) -> &str;
    fn namespace(&self) -> Option<&str>;
    fn assembly(&self) -> Option<HostAssembly>;
    fn is_public(&self) -> bool;

    /// Members declared directly on this type (inherited ones excluded).
    fn properties(&self) -> Vec<HostProperty>;
    fn events(&self) -> Vec<HostEvent>;
    fn fields(&self) -> Vec<HostField>;
    fn methods(&self) -> Vec<HostMethod>;
    fn constructors(&self) -> Vec<HostConstructor>;
    fn custom_attributes(&self) -> Vec<CustomAttribute>;

    fn generic_arguments(&self) -> Vec<HostType>;
    fn generic_parameters(&self) -> Vec<HostType>;
    fn generic_type_definition(&self) -> Option<HostType>;
    fn make_generic_type(&self, arguments: &[HostType]) -> Result<HostType, TypeResolutionError>;

    fn is_array(&self) -> bool;
    fn array_element_type(&self) -> Option<HostType>;
    fn make_array_type(&self, dimensions: u32) -> Result<HostType, TypeResolutionError>;

    fn base_type(&self) -> Option<HostType>;
    fn declaring_type(&self) -> Option<HostType>;
    /// Interfaces this type lists directly.
    fn interfaces(&self) -> Vec<HostType>;

    fn is_value_type(&self) -> bool;
    fn is_enum(&self) -> bool;
    fn is_interface(&self) -> bool;

    /// The "no value" return type. A swallowed call to a void method emits no `Pop`.
    fn is_void(&self) -> bool {
        false
    }

    /// Whether this is the backend's one-argument nullable wrapper definition.
    fn is_nullable_wrapper(&self) -> bool {
        false
    }

    /// Whether this is a placeholder with no backend metadata behind it.
    fn is_pseudo(&self) -> bool {
        false
    }

    /// Backend-defined compatibility test: can a value of `candidate` be
    /// stored where this type is expected?
    fn is_assignable_from(&self, candidate: &HostType) -> bool;
}

pub trait MethodInfo {
    fn id(&self) -> HandleId;
    fn name(&self) -> &str;
    fn declaring_type(&self) -> HostType;
    fn visibility(&self) -> Visibility;
    fn is_static(&self) -> bool;
    fn return_type(&self) -> HostType;
    fn parameters(&self) -> Vec<HostType>;

    fn custom_attributes(&self) -> Vec<CustomAttribute> {
        Vec::new()
    }

    fn generic_arguments(&self) -> Vec<HostType> {
        Vec::new()
    }

    fn is_generic_method_definition(&self) -> bool {
        false
    }

    fn make_generic_method(&self, _arguments: &[HostType]) -> Result<HostMethod, TypeResolutionError> {
        Err(TypeResolutionError::Unsupported {
            operation: "generic method instantiation",
            subject: self.name().to_string(),
        })
    }

    /// Parameter list imposed on an existing method by a call-site adapter.
    /// Two handles sharing an id but carrying different adapted lists are
    /// distinct methods.
    fn adapted_parameters(&self) -> Option<&[HostType]> {
        None
    }

    /// A bespoke call sequence replacing the plain `call` instruction.
    fn custom_emit(&self) -> Option<&dyn CustomEmitMethod> {
        None
    }
}

pub trait ConstructorInfo {
    fn id(&self) -> HandleId;
    fn declaring_type(&self) -> HostType;
    fn is_public(&self) -> bool;
    fn is_static(&self) -> bool;
    fn parameters(&self) -> Vec<HostType>;
}

pub trait PropertyInfo {
    fn id(&self) -> HandleId;
    fn name(&self) -> &str;
    fn declaring_type(&self) -> HostType;
    fn property_type(&self) -> HostType;
    fn getter(&self) -> Option<HostMethod>;
    fn setter(&self) -> Option<HostMethod>;
    fn custom_attributes(&self) -> Vec<CustomAttribute>;

    fn indexer_parameters(&self) -> Vec<HostType> {
        Vec::new()
    }
}

pub trait FieldInfo {
    fn id(&self) -> HandleId;
    fn name(&self) -> &str;
    fn declaring_type(&self) -> HostType;
    fn field_type(&self) -> HostType;
    fn is_public(&self) -> bool;
    fn is_static(&self) -> bool;

    fn is_literal(&self) -> bool {
        false
    }

    fn literal_value(&self) -> Option<ConstValue> {
        None
    }

    fn custom_attributes(&self) -> Vec<CustomAttribute> {
        Vec::new()
    }
}

pub trait EventInfo {
    fn id(&self) -> HandleId;
    fn name(&self) -> &str;
    fn declaring_type(&self) -> HostType;
    fn add_method(&self) -> Option<HostMethod>;
}

pub trait AssemblyInfo {
    fn id(&self) -> HandleId;
    fn name(&self) -> &str;

    fn custom_attributes(&self) -> Vec<CustomAttribute> {
        Vec::new()
    }

    /// Look up a type by its namespace-qualified name (`Ns.Name`).
    fn find_type(&self, full_name: &str) -> Option<HostType>;
}

pub trait AttributeInfo {
    fn id(&self) -> HandleId;
    fn attribute_type(&self) -> HostType;
    fn arguments(&self) -> Vec<ConstValue>;

    fn properties(&self) -> Vec<(String, ConstValue)> {
        Vec::new()
    }

    /// Whether derived types see this attribute when it sits on a base type.
    fn is_inherited(&self) -> bool {
        true
    }
}

// ── Handles ────────────────────────────────────────────────────────────

macro_rules! host_handle {
    ($(#[$meta:meta])* $handle:ident => $info:ident) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $handle(Rc<dyn $info>);

        impl $handle {
            pub fn new(info: Rc<dyn $info>) -> Self {
                Self(info)
            }
        }

        impl Deref for $handle {
            type Target = dyn $info;

            fn deref(&self) -> &Self::Target {
                &*self.0
            }
        }

        impl Hash for $handle {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.id().hash(state);
            }
        }
    };
}

host_handle!(
    /// A type known to the backend, or a [`crate::pseudo::PseudoType`].
    HostType => TypeInfo
);
host_handle!(
    /// A method. May be an adapter such as a cast-adapted method.
    HostMethod => MethodInfo
);
host_handle!(HostConstructor => ConstructorInfo);
host_handle!(HostProperty => PropertyInfo);
host_handle!(HostField => FieldInfo);
host_handle!(HostEvent => EventInfo);
host_handle!(HostAssembly => AssemblyInfo);
host_handle!(CustomAttribute => AttributeInfo);

macro_rules! id_equality {
    ($($handle:ident),*) => {
        $(
            impl PartialEq for $handle {
                fn eq(&self, other: &Self) -> bool {
                    self.0.id() == other.0.id()
                }
            }

            impl Eq for $handle {}
        )*
    };
}

id_equality!(
    HostType,
    HostConstructor,
    HostProperty,
    HostField,
    HostEvent,
    HostAssembly,
    CustomAttribute
);

impl PartialEq for HostMethod {
    fn eq(&self, other: &Self) -> bool {
        self.0.id() == other.0.id() && self.0.adapted_parameters() == other.0.adapted_parameters()
    }
}

impl Eq for HostMethod {}

impl HostType {
    /// `Namespace.Name`, or just `Name` for types outside a namespace.
    pub fn qualified_name(&self) -> String {
        match self.namespace() {
            Some(ns) if !ns.is_empty() => format!("{}.{}", ns, self.name()),
            _ => self.name().to_string(),
        }
    }

    /// `Namespace.Name,Assembly`.
    pub fn full_name(&self) -> String {
        let mut name = self.qualified_name();
        if let Some(asm) = self.assembly() {
            name.push(',');
            name.push_str(asm.name());
        }
        name
    }

    /// `Assembly:Namespace.Name`, the form used in resolution errors.
    pub fn fqn(&self) -> String {
        let asm = self.assembly().map(|a| a.name().to_string()).unwrap_or_default();
        format!("{}:{}", asm, self.qualified_name())
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}

impl fmt::Debug for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostType({})", self.qualified_name())
    }
}

impl fmt::Display for HostMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type(), self.name())
    }
}

impl fmt::Debug for HostMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostMethod({}(", self)?;
        for (i, p) in self.parameters().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ") -> {})", self.return_type())
    }
}

impl fmt::Display for HostConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::.ctor(", self.declaring_type())?;
        for (i, p) in self.parameters().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for HostConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostConstructor({})", self)
    }
}

macro_rules! member_display {
    ($($handle:ident),*) => {
        $(
            impl fmt::Display for $handle {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}::{}", self.declaring_type(), self.name())
                }
            }

            impl fmt::Debug for $handle {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}({})", stringify!($handle), self)
                }
            }
        )*
    };
}

member_display!(HostProperty, HostField, HostEvent);

impl fmt::Debug for HostAssembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostAssembly({})", self.name())
    }
}

impl fmt::Debug for CustomAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CustomAttribute({})", self.attribute_type())
    }
}
