//! Ordered transformation passes over a document.

use tracing::debug;
use weave_ast::{Ast, NodeId};
use weave_common::Span;

use crate::context::{SlotKey, TransformationContext};
use crate::error::{TransformErrorKind, TransformationError};
use crate::passes::{
    DeferredContentTransformer, MarkupExtensionTransformer, ObjectConstructionTransformer,
    PropertyReferenceResolver, SetterBinder, TypeReferenceResolver,
};

/// One rewrite applied to every node of a document, children before parents.
///
/// `transform` returns the node that should occupy the visited node's slot in
/// its parent: the same id to leave it in place, or a freshly allocated one.
///
/// Slot contract: the pipeline refuses to run a pass while any slot in
/// `requires` is missing, and creates every slot in `produces` (at its
/// initial value) before the pass starts.
pub trait Transformer {
    fn name(&self) -> &'static str;

    fn requires(&self) -> &'static [SlotKey] {
        &[]
    }

    fn produces(&self) -> &'static [SlotKey] {
        &[]
    }

    fn transform(
        &mut self,
        ctx: &mut TransformationContext<'_>,
        ast: &mut Ast,
        id: NodeId,
    ) -> Result<NodeId, TransformationError>;
}

/// The built-in passes, in the order they must run.
pub fn default_passes() -> Vec<Box<dyn Transformer>> {
    vec![
        Box::new(TypeReferenceResolver),
        Box::new(PropertyReferenceResolver),
        Box::new(ObjectConstructionTransformer),
        Box::new(MarkupExtensionTransformer),
        Box::new(DeferredContentTransformer),
        Box::new(SetterBinder),
    ]
}

pub struct Pipeline {
    passes: Vec<Box<dyn Transformer>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(default_passes())
    }
}

impl Pipeline {
    pub fn new(passes: Vec<Box<dyn Transformer>>) -> Self {
        Self { passes }
    }

    pub fn push(&mut self, pass: Box<dyn Transformer>) -> &mut Self {
        self.passes.push(pass);
        self
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run every pass over the tree rooted at `ast.root()`. The resulting
    /// root is written back to the arena and to `ctx.root_object`.
    pub fn run(&mut self, ctx: &mut TransformationContext<'_>, ast: &mut Ast) -> Result<NodeId, TransformationError> {
        let mut root = ast
            .root()
            .ok_or_else(|| TransformationError::new(TransformErrorKind::EmptyDocument, Span::default()))?;

        for pass in &mut self.passes {
            if let Some(&slot) = pass.requires().iter().find(|&&s| !ctx.has_slot(s)) {
                return Err(TransformationError::new(
                    TransformErrorKind::MissingSlot {
                        pass: pass.name(),
                        slot,
                    },
                    ast.span(root),
                ));
            }
            for &slot in pass.produces() {
                ctx.ensure_slot(slot);
            }

            debug!(pass = pass.name(), nodes = ast.len(), "running transformation pass");
            root = ctx.visit(ast, root, pass.as_mut())?;
            ast.set_root(root);
        }

        ctx.root_object = Some(root);
        Ok(root)
    }
}
