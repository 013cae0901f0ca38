//! Member resolution over the facade.
//!
//! Every lookup walks the same search order: members declared on the type
//! itself, then each type in the base chain, then every interface the type
//! implements (directly, through its bases, or through other interfaces),
//! de-duplicated in discovery order. The first match wins. There is no
//! ambiguity detection: when several overloads qualify, enumeration order
//! decides.
//!
//! `find_*` accessors return `None` when nothing matches. `get_*` accessors
//! turn that into a [`TypeResolutionError`] describing the query.

use std::fmt;

use rustc_hash::FxHashSet;

use crate::error::{MemberKind, TypeResolutionError};
use crate::ty::{
    CustomAttribute, HandleId, HostConstructor, HostEvent, HostField, HostMethod, HostProperty,
    HostType,
};

/// A method query carrying the full shape of the wanted signature.
#[derive(Clone, Debug)]
pub struct MethodSignature {
    pub name: String,
    pub return_type: HostType,
    pub is_static: bool,
    /// Compare parameters by equality (`true`) or by assignability.
    pub is_exact_match: bool,
    /// Only look at members declared on the queried type itself.
    pub declaring_only: bool,
    pub parameters: Vec<HostType>,
}

impl MethodSignature {
    pub fn new(name: impl Into<String>, return_type: HostType, parameters: Vec<HostType>) -> Self {
        Self {
            name: name.into(),
            return_type,
            is_static: false,
            is_exact_match: true,
            declaring_only: false,
            parameters,
        }
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn allow_downcast(mut self) -> Self {
        self.is_exact_match = false;
        self
    }

    pub fn declaring_only(mut self) -> Self {
        self.declaring_only = true;
        self
    }

    fn matches(&self, m: &HostMethod) -> bool {
        m.name() == self.name
            && m.return_type() == self.return_type
            && m.is_static() == self.is_static
            && params_match(&m.parameters(), &self.parameters, !self.is_exact_match)
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.parameters.iter().map(|p| p.full_name()).collect();
        write!(
            f,
            "{} {} {} ({}) (exact match: {}, declaring only: {})",
            if self.is_static { "static" } else { "instance" },
            self.return_type.full_name(),
            self.name,
            params.join(", "),
            self.is_exact_match,
            self.declaring_only
        )
    }
}

/// Pairwise parameter test. Arity must agree; the first mismatch rejects.
fn params_match(declared: &[HostType], args: &[HostType], allow_downcast: bool) -> bool {
    declared.len() == args.len()
        && declared.iter().zip(args).all(|(param, arg)| {
            if allow_downcast {
                param.is_assignable_from(arg)
            } else {
                param == arg
            }
        })
}

impl HostType {
    // ── Search order ───────────────────────────────────────────────────

    /// The type itself followed by its base chain, nearest first.
    pub fn self_and_bases(&self) -> Vec<HostType> {
        let mut chain = vec![self.clone()];
        let mut current = self.base_type();
        while let Some(ty) = current {
            current = ty.base_type();
            chain.push(ty);
        }
        chain
    }

    /// Every interface reachable from this type, de-duplicated, in the order
    /// they are first discovered: own interfaces (and what they extend)
    /// before those contributed by base types.
    pub fn all_interfaces(&self) -> Vec<HostType> {
        let mut seen: FxHashSet<HandleId> = FxHashSet::default();
        let mut out = Vec::new();
        for ty in self.self_and_bases() {
            let mut pending = ty.interfaces();
            pending.reverse();
            while let Some(iface) = pending.pop() {
                if !seen.insert(iface.id()) {
                    continue;
                }
                let mut inherited = iface.interfaces();
                inherited.reverse();
                out.push(iface);
                pending.extend(inherited);
            }
        }
        out
    }

    fn search_levels(&self, declaring_only: bool) -> Vec<HostType> {
        if declaring_only {
            return vec![self.clone()];
        }
        let mut levels = self.self_and_bases();
        levels.extend(self.all_interfaces());
        levels
    }

    // ── Methods ────────────────────────────────────────────────────────

    /// Every method satisfying `pred`, in search order.
    pub fn find_methods(&self, pred: impl Fn(&HostMethod) -> bool) -> Vec<HostMethod> {
        self.search_levels(false)
            .iter()
            .flat_map(|level| level.methods())
            .filter(|m| pred(m))
            .collect()
    }

    pub fn find_method_by(&self, pred: impl Fn(&HostMethod) -> bool) -> Option<HostMethod> {
        self.search_levels(false)
            .iter()
            .find_map(|level| level.methods().into_iter().find(|m| pred(m)))
    }

    pub fn get_method_by(
        &self,
        pred: impl Fn(&HostMethod) -> bool,
    ) -> Result<HostMethod, TypeResolutionError> {
        self.find_method_by(pred)
            .ok_or_else(|| TypeResolutionError::MethodNotFound {
                type_name: self.fqn(),
                description: "matching the given predicate".to_string(),
            })
    }

    /// Name and return type must match exactly. Parameters are compared by
    /// equality, or by assignability when `allow_downcast` is set.
    pub fn find_method_matching(
        &self,
        name: &str,
        return_type: &HostType,
        allow_downcast: bool,
        args: &[HostType],
    ) -> Option<HostMethod> {
        self.find_method_by(|m| {
            m.name() == name
                && m.return_type() == *return_type
                && params_match(&m.parameters(), args, allow_downcast)
        })
    }

    pub fn get_method_matching(
        &self,
        name: &str,
        return_type: &HostType,
        allow_downcast: bool,
        args: &[HostType],
    ) -> Result<HostMethod, TypeResolutionError> {
        self.find_method_matching(name, return_type, allow_downcast, args)
            .ok_or_else(|| TypeResolutionError::MethodNotFound {
                type_name: self.fqn(),
                description: format!("{} with matching signature", name),
            })
    }

    pub fn find_method(&self, signature: &MethodSignature) -> Option<HostMethod> {
        self.search_levels(signature.declaring_only)
            .iter()
            .find_map(|level| level.methods().into_iter().find(|m| signature.matches(m)))
    }

    pub fn get_method(&self, signature: &MethodSignature) -> Result<HostMethod, TypeResolutionError> {
        self.find_method(signature)
            .ok_or_else(|| TypeResolutionError::MethodNotFound {
                type_name: self.fqn(),
                description: format!("with signature {}", signature),
            })
    }

    // ── Constructors ───────────────────────────────────────────────────

    /// Public instance constructors only; parameters compare by assignability.
    pub fn find_constructor(&self, args: &[HostType]) -> Option<HostConstructor> {
        self.constructors()
            .into_iter()
            .filter(|c| c.is_public() && !c.is_static())
            .find(|c| params_match(&c.parameters(), args, true))
    }

    pub fn get_constructor(&self, args: &[HostType]) -> Result<HostConstructor, TypeResolutionError> {
        self.find_constructor(args)
            .ok_or_else(|| TypeResolutionError::ConstructorNotFound {
                type_name: self.fqn(),
                arguments: args.iter().map(|a| a.full_name()).collect(),
            })
    }

    // ── Properties, fields, events ─────────────────────────────────────

    pub fn find_property(&self, name: &str) -> Option<HostProperty> {
        self.search_levels(false)
            .iter()
            .find_map(|level| level.properties().into_iter().find(|p| p.name() == name))
    }

    pub fn get_property(&self, name: &str) -> Result<HostProperty, TypeResolutionError> {
        self.find_property(name)
            .ok_or_else(|| self.member_not_found(MemberKind::Property, name))
    }

    pub fn find_field(&self, name: &str) -> Option<HostField> {
        self.self_and_bases()
            .iter()
            .find_map(|level| level.fields().into_iter().find(|f| f.name() == name))
    }

    pub fn get_field(&self, name: &str) -> Result<HostField, TypeResolutionError> {
        self.find_field(name)
            .ok_or_else(|| self.member_not_found(MemberKind::Field, name))
    }

    fn member_not_found(&self, kind: MemberKind, name: &str) -> TypeResolutionError {
        TypeResolutionError::MemberNotFound {
            type_name: self.fqn(),
            kind,
            name: name.to_string(),
        }
    }

    pub fn all_properties(&self) -> Vec<HostProperty> {
        self.self_and_bases()
            .iter()
            .flat_map(|t| t.properties())
            .collect()
    }

    pub fn all_fields(&self) -> Vec<HostField> {
        self.self_and_bases().iter().flat_map(|t| t.fields()).collect()
    }

    pub fn all_events(&self) -> Vec<HostEvent> {
        self.self_and_bases().iter().flat_map(|t| t.events()).collect()
    }

    /// Own attributes plus those of base types that are marked inherited.
    pub fn all_custom_attributes(&self) -> Vec<CustomAttribute> {
        let mut out = self.custom_attributes();
        for base in self.self_and_bases().iter().skip(1) {
            out.extend(base.custom_attributes().into_iter().filter(|a| a.is_inherited()));
        }
        out
    }

    // ── Nullability and assignability ──────────────────────────────────

    /// Instantiation of the backend's one-argument nullable wrapper.
    pub fn is_nullable(&self) -> bool {
        self.generic_type_definition()
            .is_some_and(|def| def.is_nullable_wrapper())
    }

    pub fn is_nullable_of(&self, value_type: &HostType) -> bool {
        self.is_nullable() && self.generic_arguments().first() == Some(value_type)
    }

    pub fn accepts_null(&self) -> bool {
        !self.is_value_type() || self.is_nullable()
    }

    /// Like `is_assignable_from`, but value types never widen.
    pub fn is_directly_assignable_from(&self, other: &HostType) -> bool {
        if self.is_value_type() || other.is_value_type() {
            return self == other;
        }
        self.is_assignable_from(other)
    }
}

impl HostMethod {
    /// Parameters with the receiver prepended for instance methods.
    pub fn parameters_with_this(&self) -> Vec<HostType> {
        let mut params = self.parameters();
        if !self.is_static() {
            params.insert(0, self.declaring_type());
        }
        params
    }

    /// The receiver type for instance methods, the first parameter for
    /// static ones (extension-style setters).
    pub fn this_or_first_parameter(&self) -> Option<HostType> {
        if self.is_static() {
            self.parameters().into_iter().next()
        } else {
            Some(self.declaring_type())
        }
    }
}
