use weave_ast::{Ast, NodeId, NodeKind};

use crate::context::{SlotKey, TransformationContext};
use crate::error::TransformationError;
use crate::pipeline::Transformer;

/// Wraps every value assigned to a property carrying the configured
/// deferred-content attribute in `DeferredContent`. Such properties are typed
/// `Func<ServiceProvider, Object>`, so the setter binder sees matching values.
pub struct DeferredContentTransformer;

impl Transformer for DeferredContentTransformer {
    fn name(&self) -> &'static str {
        "DeferredContentTransformer"
    }

    fn produces(&self) -> &'static [SlotKey] {
        &[SlotKey::DeferredClosures]
    }

    fn transform(
        &mut self,
        ctx: &mut TransformationContext<'_>,
        ast: &mut Ast,
        id: NodeId,
    ) -> Result<NodeId, TransformationError> {
        let Some(attribute) = ctx.config.mappings.deferred_content_attribute.clone() else {
            return Ok(id);
        };
        let values = match ast.kind(id) {
            NodeKind::PropertyAssignment { property, values, .. }
                if property
                    .custom_attributes
                    .iter()
                    .any(|a| a.attribute_type() == attribute) =>
            {
                values.clone()
            }
            _ => return Ok(id),
        };
        let span = ast.span(id);

        let mut wrapped = Vec::with_capacity(values.len());
        for value in values {
            if matches!(ast.kind(value), NodeKind::DeferredContent { .. }) {
                wrapped.push(value);
                continue;
            }
            match ast.deferred_content(value, ctx.config) {
                Ok(deferred) => {
                    ctx.bump_counter(SlotKey::DeferredClosures);
                    wrapped.push(deferred);
                }
                Err(err) => return ctx.error(TransformationError::new(err.into(), span), id),
            }
        }

        if let NodeKind::PropertyAssignment { values, .. } = &mut ast.node_mut(id).kind {
            *values = wrapped;
        }
        Ok(id)
    }
}
