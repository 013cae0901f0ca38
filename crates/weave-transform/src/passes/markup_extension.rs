use weave_ast::{Ast, NodeId, NodeKind};
use weave_typesys::{HostMethod, HostType};

use crate::context::TransformationContext;
use crate::error::{TransformErrorKind, TransformationError};
use crate::pipeline::Transformer;

/// Wraps constructed markup extensions in `MarkupExtension`.
///
/// The wrapped node is the fully initialized extension: for an initialized
/// object that is the `ValueWithManipulation`, not its inner `NewClrObject`.
/// Applicable `ProvideValue` overloads are instance methods taking nothing or
/// the service provider; only the most derived type declaring one counts.
pub struct MarkupExtensionTransformer;

impl Transformer for MarkupExtensionTransformer {
    fn name(&self) -> &'static str {
        "MarkupExtensionTransformer"
    }

    fn transform(
        &mut self,
        ctx: &mut TransformationContext<'_>,
        ast: &mut Ast,
        id: NodeId,
    ) -> Result<NodeId, TransformationError> {
        let constructed = match ast.kind(id) {
            NodeKind::NewClrObject { .. } => {
                let initialized_by_parent = ctx.parent().is_some_and(|p| {
                    matches!(ast.kind(p), NodeKind::ValueWithManipulation { value, .. } if *value == id)
                });
                if initialized_by_parent {
                    return Ok(id);
                }
                id
            }
            NodeKind::ValueWithManipulation { value, .. } => *value,
            _ => return Ok(id),
        };
        let ty = match ast.kind(constructed) {
            NodeKind::NewClrObject { type_ref, .. } if type_ref.is_markup_extension => type_ref.ty.clone(),
            _ => return Ok(id),
        };
        let span = ast.span(id);

        let candidates = provide_value_candidates(&ty, &ctx.config.mappings.service_provider);
        let provide_value = match candidates.as_slice() {
            [single] => single.clone(),
            [] => {
                return ctx.error(
                    TransformationError::new(TransformErrorKind::MissingProvideValue { type_name: ty.fqn() }, span),
                    id,
                );
            }
            many => {
                return ctx.error(
                    TransformationError::new(
                        TransformErrorKind::AmbiguousMarkupExtension {
                            type_name: ty.fqn(),
                            candidates: many.len(),
                        },
                        span,
                    ),
                    id,
                );
            }
        };

        Ok(ast.alloc(
            span,
            NodeKind::MarkupExtension {
                value: id,
                provide_value,
            },
        ))
    }
}

fn provide_value_candidates(ty: &HostType, service_provider: &HostType) -> Vec<HostMethod> {
    let applicable = |m: &HostMethod| {
        if m.name() != "ProvideValue" || m.is_static() {
            return false;
        }
        let params = m.parameters();
        params.is_empty() || (params.len() == 1 && params[0].is_assignable_from(service_provider))
    };
    let all = ty.find_methods(applicable);
    let Some(first) = all.first() else {
        return all;
    };
    let declaring = first.declaring_type();
    all.into_iter()
        .filter(|m| m.declaring_type() == declaring)
        .collect()
}
