use std::rc::Rc;

use weave_ast::{Ast, ClrProperty, NodeId, NodeKind, PropertyRef};
use weave_callsite::{DirectWrappedMethod, WrappedMethod};
use weave_typesys::HostMethod;

use crate::context::{SlotKey, TransformationContext};
use crate::error::{TransformErrorKind, TransformationError};
use crate::pipeline::Transformer;

/// `PropertyValue` → `PropertyAssignment`.
///
/// Named properties are looked up on the type of the nearest enclosing
/// object element. A property with no setter but a getter whose type has a
/// one-argument `Add` becomes a `PropertyValueManipulation` that adds each
/// value to the collection the getter returns.
pub struct PropertyReferenceResolver;

impl Transformer for PropertyReferenceResolver {
    fn name(&self) -> &'static str {
        "PropertyReferenceResolver"
    }

    fn requires(&self) -> &'static [SlotKey] {
        &[SlotKey::TypeCache]
    }

    fn transform(
        &mut self,
        ctx: &mut TransformationContext<'_>,
        ast: &mut Ast,
        id: NodeId,
    ) -> Result<NodeId, TransformationError> {
        let (property, values) = match ast.kind(id) {
            NodeKind::PropertyValue { property, values } => (property.clone(), values.clone()),
            _ => return Ok(id),
        };
        let span = ast.span(id);

        let property = match property {
            PropertyRef::Clr(p) => p,
            PropertyRef::Named(name) => {
                let Some(owner) = ctx.find_ancestor(ast, |k| matches!(k, NodeKind::Object { .. })) else {
                    return ctx.error(
                        TransformationError::new(TransformErrorKind::PropertyOutsideObject { property: name }, span),
                        id,
                    );
                };
                let Some(ty) = ast.value_type(owner) else {
                    return Ok(id);
                };
                if ty.is_pseudo() {
                    return Ok(id);
                }
                match ty.find_property(&name) {
                    Some(p) => ClrProperty::from_host(&p),
                    None => {
                        return ctx.error(
                            TransformationError::new(
                                TransformErrorKind::UnresolvedProperty {
                                    type_name: ty.fqn(),
                                    property: name,
                                },
                                span,
                            ),
                            id,
                        );
                    }
                }
            }
        };

        if !property.setters.is_empty() {
            return Ok(ast.alloc(
                span,
                NodeKind::PropertyAssignment {
                    possible_setters: property.setters.clone(),
                    property,
                    values,
                },
            ));
        }

        match collection_adder(&property) {
            Some(add) => {
                let wrapped: Rc<dyn WrappedMethod> = Rc::new(DirectWrappedMethod::new(add));
                let calls: Vec<NodeId> = values
                    .iter()
                    .map(|&value| {
                        let value_span = ast.span(value);
                        ast.alloc(
                            value_span,
                            NodeKind::NoReturnMethodCall {
                                method: wrapped.clone(),
                                arguments: vec![value],
                            },
                        )
                    })
                    .collect();
                let group = ast.alloc(span, NodeKind::ManipulationGroup { children: calls });
                Ok(ast.alloc(
                    span,
                    NodeKind::PropertyValueManipulation {
                        property,
                        manipulation: group,
                    },
                ))
            }
            None => ctx.error(
                TransformationError::new(
                    TransformErrorKind::InvalidAssignmentTarget {
                        property: property.to_string(),
                    },
                    span,
                ),
                id,
            ),
        }
    }
}

/// Instance `Add(item)` on the getter's return type.
fn collection_adder(property: &ClrProperty) -> Option<HostMethod> {
    let getter = property.getter.as_ref()?;
    getter
        .return_type()
        .find_method_by(|m| m.name() == "Add" && !m.is_static() && m.parameters().len() == 1)
}
