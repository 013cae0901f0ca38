use weave_ast::{Ast, NodeId, NodeKind, TypeReference};
use weave_typesys::{HostType, PseudoType};

use crate::context::{NamespaceAlias, SlotKey, TransformationContext};
use crate::error::{TransformErrorKind, TransformationError};
use crate::pipeline::Transformer;

/// `XmlTypeReference` → `ClrTypeReference`.
///
/// Each candidate name is tried in every CLR namespace the XML namespace maps
/// to, `<Name>Extension` before `<Name>`. Generic references look up
/// ``Name`N`` and instantiate it with the already resolved arguments.
pub struct TypeReferenceResolver;

impl Transformer for TypeReferenceResolver {
    fn name(&self) -> &'static str {
        "TypeReferenceResolver"
    }

    fn produces(&self) -> &'static [SlotKey] {
        &[SlotKey::TypeCache]
    }

    fn transform(
        &mut self,
        ctx: &mut TransformationContext<'_>,
        ast: &mut Ast,
        id: NodeId,
    ) -> Result<NodeId, TransformationError> {
        let (xml_namespace, name, generic_arguments) = match ast.kind(id) {
            NodeKind::XmlTypeReference {
                xml_namespace,
                name,
                generic_arguments,
            } => (xml_namespace.clone(), name.clone(), generic_arguments.clone()),
            _ => return Ok(id),
        };
        let span = ast.span(id);

        let mut arguments = Vec::with_capacity(generic_arguments.len());
        for arg in &generic_arguments {
            let resolved = ast
                .type_reference(*arg)
                .filter(|r| !r.ty.is_pseudo())
                .map(|r| r.ty.clone());
            match resolved {
                Some(ty) => arguments.push(ty),
                // Already reported while resolving the argument.
                None => return Ok(unresolved(ast, id, &format!("{}:{}", xml_namespace, name))),
            }
        }

        let aliases = ctx.resolve_namespace(&xml_namespace);
        if aliases.is_empty() {
            let substitute = unresolved(ast, id, &format!("{}:{}", xml_namespace, name));
            return ctx.error(
                TransformationError::new(TransformErrorKind::UnknownNamespace { xml_namespace }, span),
                substitute,
            );
        }

        let arity = if arguments.is_empty() {
            String::new()
        } else {
            format!("`{}", arguments.len())
        };
        let candidates = [format!("{}Extension{}", name, arity), format!("{}{}", name, arity)];

        let found = candidates
            .iter()
            .enumerate()
            .find_map(|(i, candidate)| lookup(ctx, &xml_namespace, &aliases, candidate).map(|ty| (i == 0, ty)));
        let Some((via_extension_name, definition)) = found else {
            let substitute = unresolved(ast, id, &format!("{}:{}", xml_namespace, name));
            return ctx.error(
                TransformationError::new(TransformErrorKind::UnresolvedType { xml_namespace, name }, span),
                substitute,
            );
        };

        let ty = if arguments.is_empty() {
            definition
        } else {
            match definition.make_generic_type(&arguments) {
                Ok(ty) => ty,
                Err(err) => {
                    let substitute = unresolved(ast, id, &format!("{}:{}", xml_namespace, name));
                    return ctx.error(TransformationError::new(err.into(), span), substitute);
                }
            }
        };

        let reference = if via_extension_name || has_provide_value(&ty) {
            TypeReference::markup_extension(ty)
        } else {
            TypeReference::new(ty)
        };
        Ok(ast.alloc(span, NodeKind::ClrTypeReference(reference)))
    }
}

fn lookup(
    ctx: &mut TransformationContext<'_>,
    xml_namespace: &str,
    aliases: &[NamespaceAlias],
    candidate: &str,
) -> Option<HostType> {
    let key = format!("{{{}}}{}", xml_namespace, candidate);
    if let Some(ty) = ctx.cached_type(&key) {
        return Some(ty);
    }
    let ts = ctx.config.type_system.clone();
    let ty = aliases.iter().find_map(|alias| {
        let full_name = if alias.clr_namespace.is_empty() {
            candidate.to_string()
        } else {
            format!("{}.{}", alias.clr_namespace, candidate)
        };
        match &alias.assembly {
            Some(assembly) => ts.find_type_in(&full_name, assembly),
            None => ts.find_type(&full_name),
        }
    })?;
    ctx.cache_type(key, ty.clone());
    Some(ty)
}

fn has_provide_value(ty: &HostType) -> bool {
    ty.find_method_by(|m| m.name() == "ProvideValue" && !m.is_static())
        .is_some()
}

fn unresolved(ast: &mut Ast, id: NodeId, what: &str) -> NodeId {
    let span = ast.span(id);
    ast.alloc(
        span,
        NodeKind::ClrTypeReference(TypeReference::new(PseudoType::unresolved(what))),
    )
}
