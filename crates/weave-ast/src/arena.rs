use std::fmt::Write as _;

use weave_common::Span;
use weave_typesys::{CompilerConfig, HostType, TypeResolutionError};

use crate::node::{NodeClass, NodeKind, TypeReference};
use crate::property::PropertyRef;

/// Index of a node in its [`Ast`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Clone, Debug)]
pub struct Node {
    pub span: Span,
    pub kind: NodeKind,
}

/// Arena owning every node of one document.
///
/// Parents refer to children by [`NodeId`]. A pass replaces a child by
/// writing a different id into the parent's slot; sibling ids stay valid and
/// the replaced node simply becomes unreachable.
#[derive(Clone, Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, span: Span, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { span, kind });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children()
    }

    /// Point the `index`-th child slot of `parent` at `child`.
    pub fn replace_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if let Some(slot) = self.node_mut(parent).kind.children_mut().into_iter().nth(index) {
            *slot = child;
        }
    }

    pub fn class(&self, id: NodeId) -> NodeClass {
        self.kind(id).class()
    }

    pub fn needs_parent_stack(&self, id: NodeId) -> bool {
        self.kind(id).needs_parent_stack()
    }

    /// Whether `id` or anything below it reads the ancestor stack. Deferred
    /// content runs later against its own stack and is not searched.
    pub fn subtree_needs_parent_stack(&self, id: NodeId) -> bool {
        if self.needs_parent_stack(id) {
            return true;
        }
        if matches!(self.kind(id), NodeKind::DeferredContent { .. }) {
            return false;
        }
        self.children(id).into_iter().any(|child| self.subtree_needs_parent_stack(child))
    }

    /// Static type of a value node. `None` for manipulations, type
    /// references, and unresolved object elements.
    pub fn value_type(&self, id: NodeId) -> Option<HostType> {
        match self.kind(id) {
            NodeKind::Constant { ty, .. } => Some(ty.clone()),
            NodeKind::NewClrObject { type_ref, .. } => Some(type_ref.ty.clone()),
            NodeKind::MethodCall { method, .. } => Some(method.return_type()),
            NodeKind::ValueWithManipulation { value, .. } => self.value_type(*value),
            NodeKind::MarkupExtension { provide_value, .. } => Some(provide_value.return_type()),
            NodeKind::DeferredContent { ty, .. } => Some(ty.clone()),
            NodeKind::Object { type_ref, .. } => match self.kind(*type_ref) {
                NodeKind::ClrTypeReference(r) => Some(r.ty.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    /// The resolved type a type-reference node denotes.
    pub fn type_reference(&self, id: NodeId) -> Option<&TypeReference> {
        match self.kind(id) {
            NodeKind::ClrTypeReference(r) => Some(r),
            _ => None,
        }
    }

    /// Wrap `value` as deferred content typed `Func<ServiceProvider, Object>`.
    pub fn deferred_content(&mut self, value: NodeId, config: &CompilerConfig) -> Result<NodeId, TypeResolutionError> {
        let ty = config.deferred_content_type()?;
        let span = self.span(value);
        Ok(self.alloc(span, NodeKind::DeferredContent { value, ty }))
    }

    /// Indented tree rendering starting at `id`, one node per line.
    pub fn dump(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.dump_into(id, 0, &mut out);
        out
    }

    fn dump_into(&self, id: NodeId, depth: usize, out: &mut String) {
        let kind = self.kind(id);
        let _ = write!(out, "{}{}", "  ".repeat(depth), kind.name());
        match kind {
            NodeKind::XmlTypeReference {
                xml_namespace,
                name,
                ..
            } => {
                let _ = write!(out, " {{{}}}{}", xml_namespace, name);
            }
            NodeKind::PropertyValue { property, .. } => match property {
                PropertyRef::Named(name) => {
                    let _ = write!(out, " {}", name);
                }
                PropertyRef::Clr(p) => {
                    let _ = write!(out, " {}", p);
                }
            },
            NodeKind::Constant { value, ty } => {
                let _ = write!(out, " {} : {}", value, ty);
            }
            NodeKind::ClrTypeReference(r) => {
                let _ = write!(out, " {}", r.ty);
                if r.is_markup_extension {
                    out.push_str(" (markup extension)");
                }
            }
            NodeKind::NewClrObject { type_ref, .. } => {
                let _ = write!(out, " {}", type_ref.ty);
            }
            NodeKind::PropertyAssignment {
                property,
                possible_setters,
                ..
            } => {
                let _ = write!(out, " {} ({} setters)", property.name, possible_setters.len());
            }
            NodeKind::PropertyValueManipulation { property, .. } => {
                let _ = write!(out, " {}", property.name);
            }
            NodeKind::NoReturnMethodCall { method, .. } | NodeKind::MethodCall { method, .. } => {
                let _ = write!(out, " {}::{}", method.declaring_type(), method.name());
            }
            NodeKind::MarkupExtension { provide_value, .. } => {
                let _ = write!(out, " {}", provide_value);
            }
            NodeKind::ObjectInitialization { ty, .. } | NodeKind::DeferredContent { ty, .. } => {
                let _ = write!(out, " {}", ty);
            }
            NodeKind::Object { .. } | NodeKind::ManipulationGroup { .. } | NodeKind::ValueWithManipulation { .. } => {}
        }
        out.push('\n');
        for child in kind.children() {
            self.dump_into(child, depth + 1, out);
        }
    }
}
