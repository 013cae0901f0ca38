use std::rc::Rc;

use weave_ast::{Ast, NodeId, NodeKind, PropertySetter};
use weave_typesys::{HostType, PseudoType};

use crate::context::TransformationContext;
use crate::error::{TransformErrorKind, TransformationError};
use crate::pipeline::Transformer;

/// Narrows `PropertyAssignment::possible_setters` to the setters that accept
/// every assigned value.
///
/// A setter takes exactly one parameter. Several values need
/// `allow_multiple`. `{x:Null}` needs `allow_x_null` and a parameter that
/// accepts null. Values that can be null at run time (method results and
/// markup extensions of nullable types) need `allow_runtime_null`.
///
/// Value types only bind to the same type, a reference slot (boxed) or
/// their `Nullable<T>`. A reference value typed more loosely than the
/// parameter binds through an adapted setter that casts it back.
pub struct SetterBinder;

impl Transformer for SetterBinder {
    fn name(&self) -> &'static str {
        "SetterBinder"
    }

    fn transform(
        &mut self,
        ctx: &mut TransformationContext<'_>,
        ast: &mut Ast,
        id: NodeId,
    ) -> Result<NodeId, TransformationError> {
        let (property, setters, values) = match ast.kind(id) {
            NodeKind::PropertyAssignment {
                property,
                possible_setters,
                values,
            } => (property.to_string(), possible_setters.clone(), values.clone()),
            _ => return Ok(id),
        };

        let mut value_types = Vec::with_capacity(values.len());
        for &value in &values {
            match ast.value_type(value) {
                Some(ty) if ty == PseudoType::null() || !ty.is_pseudo() => value_types.push((value, ty)),
                // Unresolved value, already reported.
                _ => return Ok(id),
            }
        }

        // Setters that take the values as they are come first. Setters that
        // need the values cast down are kept after them as a fallback.
        let mut bound: Vec<Rc<dyn PropertySetter>> = Vec::new();
        let mut adapted: Vec<Rc<dyn PropertySetter>> = Vec::new();
        for setter in setters {
            match bind(ast, setter.as_ref(), &value_types) {
                Some(Binding::Direct) => bound.push(setter),
                Some(Binding::Cast(loose)) => {
                    if let Some(setter) = setter.adapted(&[loose]) {
                        adapted.push(setter);
                    }
                }
                None => {}
            }
        }
        bound.extend(adapted);

        if bound.is_empty() {
            let span = ast.span(id);
            return ctx.error(
                TransformationError::new(
                    TransformErrorKind::NoMatchingSetter {
                        property,
                        value_types: value_types.iter().map(|(_, t)| t.to_string()).collect(),
                    },
                    span,
                ),
                id,
            );
        }

        if let NodeKind::PropertyAssignment { possible_setters, .. } = &mut ast.node_mut(id).kind {
            *possible_setters = bound;
        }
        Ok(id)
    }
}

/// How a setter parameter takes one value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Fit {
    /// As is, boxed, or wrapped into `Nullable<T>`.
    Direct,
    /// Only after a down cast of a reference value.
    Cast,
}

enum Binding {
    Direct,
    /// The setter must be adapted to take this looser parameter type.
    Cast(HostType),
}

fn fit(parameter: &HostType, value: &HostType) -> Option<Fit> {
    if parameter.is_directly_assignable_from(value) {
        return Some(Fit::Direct);
    }
    if value.is_value_type() {
        // Value types never widen to another value type.
        let boxed = !parameter.is_value_type() && parameter.is_assignable_from(value);
        return (boxed || parameter.is_nullable_of(value)).then_some(Fit::Direct);
    }
    if !parameter.is_value_type() && value.is_assignable_from(parameter) {
        return Some(Fit::Cast);
    }
    None
}

fn bind(ast: &Ast, setter: &dyn PropertySetter, values: &[(NodeId, HostType)]) -> Option<Binding> {
    let binder = setter.binder_parameters();
    let [parameter] = setter.parameters() else {
        return None;
    };
    if values.len() > 1 && !binder.allow_multiple {
        return None;
    }

    let mut loose: Option<HostType> = None;
    for (value, ty) in values {
        if *ty == PseudoType::null() {
            if binder.allow_x_null && parameter.accepts_null() {
                continue;
            }
            return None;
        }
        if !binder.allow_runtime_null && may_be_null_at_runtime(ast, *value, ty) {
            return None;
        }
        match fit(parameter, ty)? {
            Fit::Direct => {}
            Fit::Cast => {
                if loose.is_none() {
                    loose = Some(ty.clone());
                }
            }
        }
    }

    let Some(loose) = loose else {
        return Some(Binding::Direct);
    };
    // Every value must pass through the looser parameter unchanged.
    let all_fit = values
        .iter()
        .all(|(_, ty)| *ty == PseudoType::null() || fit(&loose, ty) == Some(Fit::Direct));
    all_fit.then_some(Binding::Cast(loose))
}

fn may_be_null_at_runtime(ast: &Ast, value: NodeId, ty: &HostType) -> bool {
    let produced_by_call = match ast.kind(value) {
        NodeKind::MethodCall { .. } | NodeKind::MarkupExtension { .. } => true,
        NodeKind::ValueWithManipulation { value, .. } => {
            matches!(ast.kind(*value), NodeKind::MethodCall { .. } | NodeKind::MarkupExtension { .. })
        }
        _ => false,
    };
    produced_by_call && ty.accepts_null()
}
