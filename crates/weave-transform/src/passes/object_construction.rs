use weave_ast::{Ast, NodeId, NodeKind};

use crate::context::{SlotKey, TransformationContext};
use crate::error::{TransformErrorKind, TransformationError};
use crate::pipeline::Transformer;

/// `Object` → `NewClrObject`, wrapped in a `ValueWithManipulation` over an
/// `ObjectInitialization` when the element sets any properties.
///
/// The constructor is the first public instance constructor whose parameters
/// accept the argument types. Children that are still unresolved (lenient
/// mode already reported them) are dropped from the initialization group.
pub struct ObjectConstructionTransformer;

impl Transformer for ObjectConstructionTransformer {
    fn name(&self) -> &'static str {
        "ObjectConstructionTransformer"
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
        let (type_ref, arguments, children) = match ast.kind(id) {
            NodeKind::Object {
                type_ref,
                arguments,
                children,
            } => match ast.type_reference(*type_ref) {
                Some(r) => (r.clone(), arguments.clone(), children.clone()),
                None => return Ok(id),
            },
            _ => return Ok(id),
        };
        if type_ref.ty.is_pseudo() {
            return Ok(id);
        }
        let span = ast.span(id);

        let mut argument_types = Vec::with_capacity(arguments.len());
        for &arg in &arguments {
            match ast.value_type(arg) {
                Some(ty) if !ty.is_pseudo() => argument_types.push(ty),
                _ => return Ok(id),
            }
        }

        let Some(constructor) = type_ref.ty.find_constructor(&argument_types) else {
            return ctx.error(
                TransformationError::new(
                    TransformErrorKind::NoConstructor {
                        type_name: type_ref.ty.fqn(),
                        arguments: argument_types.iter().map(|t| t.to_string()).collect(),
                    },
                    span,
                ),
                id,
            );
        };

        let ty = type_ref.ty.clone();
        let value = ast.alloc(
            span,
            NodeKind::NewClrObject {
                type_ref,
                constructor,
                arguments,
            },
        );

        let manipulations: Vec<NodeId> = children
            .into_iter()
            .filter(|&c| !ast.kind(c).is_parser_level())
            .collect();
        if manipulations.is_empty() {
            return Ok(value);
        }

        let group = ast.alloc(span, NodeKind::ManipulationGroup { children: manipulations });
        let init = ast.alloc(
            span,
            NodeKind::ObjectInitialization {
                manipulation: group,
                ty,
                skip_begin_init: false,
            },
        );
        Ok(ast.alloc(
            span,
            NodeKind::ValueWithManipulation {
                value,
                manipulation: init,
            },
        ))
    }
}
