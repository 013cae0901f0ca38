//! Placeholder types that exist without any backend metadata.
//!
//! `{x:Null}` types the null literal, `{Unknown type}` stands in for values
//! whose type is irrelevant, and `{Unresolved type: '...'}` is what lenient
//! transformation substitutes for a type reference that failed to resolve.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::TypeResolutionError;
use crate::ty::{
    CustomAttribute, HandleId, HostAssembly, HostConstructor, HostEvent, HostField, HostMethod,
    HostProperty, HostType, TypeInfo,
};

/// Ids handed to pseudo types start here so they never collide with backend ids.
pub const PSEUDO_ID_BASE: u64 = 1 << 63;

static NEXT_PSEUDO_ID: AtomicU64 = AtomicU64::new(PSEUDO_ID_BASE);

pub struct PseudoType {
    id: HandleId,
    name: String,
}

thread_local! {
    static NULL: HostType = PseudoType::create("{x:Null}".to_string());
    static UNKNOWN: HostType = PseudoType::create("{Unknown type}".to_string());
}

impl PseudoType {
    fn create(name: String) -> HostType {
        let id = HandleId(NEXT_PSEUDO_ID.fetch_add(1, Ordering::Relaxed));
        HostType::new(Rc::new(PseudoType { id, name }))
    }

    /// The type of the `{x:Null}` literal. Always the same handle on a thread.
    pub fn null() -> HostType {
        NULL.with(|t| t.clone())
    }

    pub fn unknown() -> HostType {
        UNKNOWN.with(|t| t.clone())
    }

    /// A fresh placeholder carrying the resolution failure message.
    pub fn unresolved(message: &str) -> HostType {
        Self::create(format!("{{Unresolved type: '{}'}}", message))
    }
}

impl TypeInfo for PseudoType {
    fn id(&self) -> HandleId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> Option<&str> {
        None
    }

    fn assembly(&self) -> Option<HostAssembly> {
        None
    }

    fn is_public(&self) -> bool {
        true
    }

    fn properties(&self) -> Vec<HostProperty> {
        Vec::new()
    }

    fn events(&self) -> Vec<HostEvent> {
        Vec::new()
    }

    fn fields(&self) -> Vec<HostField> {
        Vec::new()
    }

    fn methods(&self) -> Vec<HostMethod> {
        Vec::new()
    }

    fn constructors(&self) -> Vec<HostConstructor> {
        Vec::new()
    }

    fn custom_attributes(&self) -> Vec<CustomAttribute> {
        Vec::new()
    }

    fn generic_arguments(&self) -> Vec<HostType> {
        Vec::new()
    }

    fn generic_parameters(&self) -> Vec<HostType> {
        Vec::new()
    }

    fn generic_type_definition(&self) -> Option<HostType> {
        None
    }

    fn make_generic_type(&self, _arguments: &[HostType]) -> Result<HostType, TypeResolutionError> {
        Err(TypeResolutionError::Unsupported {
            operation: "generic instantiation",
            subject: self.name.clone(),
        })
    }

    fn is_array(&self) -> bool {
        false
    }

    fn array_element_type(&self) -> Option<HostType> {
        None
    }

    fn make_array_type(&self, _dimensions: u32) -> Result<HostType, TypeResolutionError> {
        Err(TypeResolutionError::Unsupported {
            operation: "array construction",
            subject: self.name.clone(),
        })
    }

    fn base_type(&self) -> Option<HostType> {
        None
    }

    fn declaring_type(&self) -> Option<HostType> {
        None
    }

    fn interfaces(&self) -> Vec<HostType> {
        Vec::new()
    }

    fn is_value_type(&self) -> bool {
        false
    }

    fn is_enum(&self) -> bool {
        false
    }

    fn is_interface(&self) -> bool {
        false
    }

    fn is_pseudo(&self) -> bool {
        true
    }

    fn is_assignable_from(&self, candidate: &HostType) -> bool {
        candidate.id() == self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_a_singleton() {
        assert_eq!(PseudoType::null(), PseudoType::null());
        assert_ne!(PseudoType::null(), PseudoType::unknown());
        assert_eq!(PseudoType::null().name(), "{x:Null}");
    }

    #[test]
    fn unresolved_types_are_distinct() {
        let a = PseudoType::unresolved("ui:Missing");
        let b = PseudoType::unresolved("ui:Missing");
        assert_ne!(a, b);
        assert_eq!(a.name(), "{Unresolved type: 'ui:Missing'}");
        assert!(a.is_pseudo());
        assert!(a.id().0 >= PSEUDO_ID_BASE);
    }

    #[test]
    fn pseudo_types_only_accept_themselves() {
        let unknown = PseudoType::unknown();
        assert!(unknown.is_assignable_from(&unknown));
        assert!(!unknown.is_assignable_from(&PseudoType::null()));
    }

    #[test]
    fn instantiation_is_unsupported() {
        let err = PseudoType::unknown().make_array_type(1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "array construction is not supported by {Unknown type}"
        );
    }
}
