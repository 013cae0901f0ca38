//! Per-document transformation state.
//!
//! The context carries the compiler configuration, the XML-namespace alias
//! table, the extension slots passes use to hand data to later passes, and
//! the ancestor stack of the node currently being transformed.

use std::fmt;

use rustc_hash::FxHashMap;
use tracing::{trace, warn};
use weave_ast::{Ast, NodeId};
use weave_typesys::{CompilerConfig, HostType};

use crate::error::TransformationError;
use crate::pipeline::Transformer;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransformOptions {
    /// Abort on the first error instead of recording it and substituting.
    pub strict: bool,
}

impl TransformOptions {
    pub fn strict() -> Self {
        Self { strict: true }
    }

    pub fn lenient() -> Self {
        Self { strict: false }
    }
}

// ── Slots ──────────────────────────────────────────────────────────────

/// Keys of the extension slot table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotKey {
    /// Resolved types by `{xml namespace}Name`. Its presence also marks that
    /// type references have been resolved.
    TypeCache,
    /// Number of values wrapped as deferred content.
    DeferredClosures,
}

impl SlotKey {
    /// The value a producing pass starts from.
    pub fn initial_value(self) -> SlotValue {
        match self {
            SlotKey::TypeCache => SlotValue::TypeCache(FxHashMap::default()),
            SlotKey::DeferredClosures => SlotValue::Counter(0),
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKey::TypeCache => write!(f, "type cache"),
            SlotKey::DeferredClosures => write!(f, "deferred closures"),
        }
    }
}

#[derive(Clone, Debug)]
pub enum SlotValue {
    TypeCache(FxHashMap<String, HostType>),
    Counter(u32),
}

// ── Namespaces ─────────────────────────────────────────────────────────

/// One CLR namespace an XML namespace maps to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespaceAlias {
    pub clr_namespace: String,
    /// Restricts lookup to the assembly whose name contains this.
    pub assembly: Option<String>,
}

impl NamespaceAlias {
    /// Parse `clr-namespace:Ns[;assembly=Asm]`.
    pub fn parse_clr_namespace(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix("clr-namespace:")?;
        let mut parts = rest.split(';');
        let clr_namespace = parts.next()?.trim().to_string();
        let assembly = parts
            .filter_map(|p| p.trim().strip_prefix("assembly="))
            .map(|a| a.to_string())
            .next();
        Some(Self {
            clr_namespace,
            assembly,
        })
    }
}

// ── Context ────────────────────────────────────────────────────────────

pub struct TransformationContext<'cfg> {
    pub config: &'cfg CompilerConfig,
    strict: bool,
    slots: FxHashMap<SlotKey, SlotValue>,
    namespace_aliases: FxHashMap<String, Vec<NamespaceAlias>>,
    /// The document's root value once the pipeline has run.
    pub root_object: Option<NodeId>,
    parents: Vec<NodeId>,
    diagnostics: Vec<TransformationError>,
}

impl<'cfg> TransformationContext<'cfg> {
    pub fn new(config: &'cfg CompilerConfig, options: TransformOptions) -> Self {
        Self {
            config,
            strict: options.strict,
            slots: FxHashMap::default(),
            namespace_aliases: FxHashMap::default(),
            root_object: None,
            parents: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn add_namespace_alias(&mut self, xml_namespace: &str, clr_namespace: &str, assembly: Option<&str>) {
        self.namespace_aliases
            .entry(xml_namespace.to_string())
            .or_default()
            .push(NamespaceAlias {
                clr_namespace: clr_namespace.to_string(),
                assembly: assembly.map(str::to_string),
            });
    }

    /// CLR namespaces an XML namespace maps to, in registration order.
    /// `clr-namespace:` URIs map without registration.
    pub fn resolve_namespace(&self, xml_namespace: &str) -> Vec<NamespaceAlias> {
        if let Some(aliases) = self.namespace_aliases.get(xml_namespace) {
            return aliases.clone();
        }
        NamespaceAlias::parse_clr_namespace(xml_namespace)
            .into_iter()
            .collect()
    }

    // ── Slots ──────────────────────────────────────────────────────────

    pub fn has_slot(&self, key: SlotKey) -> bool {
        self.slots.contains_key(&key)
    }

    pub fn slot(&self, key: SlotKey) -> Option<&SlotValue> {
        self.slots.get(&key)
    }

    pub fn set_slot(&mut self, key: SlotKey, value: SlotValue) {
        self.slots.insert(key, value);
    }

    /// Create `key` with its initial value unless present.
    pub fn ensure_slot(&mut self, key: SlotKey) {
        self.slots.entry(key).or_insert_with(|| key.initial_value());
    }

    pub fn cached_type(&self, key: &str) -> Option<HostType> {
        match self.slots.get(&SlotKey::TypeCache) {
            Some(SlotValue::TypeCache(cache)) => cache.get(key).cloned(),
            _ => None,
        }
    }

    pub fn cache_type(&mut self, key: String, ty: HostType) {
        let slot = self
            .slots
            .entry(SlotKey::TypeCache)
            .or_insert_with(|| SlotKey::TypeCache.initial_value());
        if let SlotValue::TypeCache(cache) = slot {
            cache.insert(key, ty);
        }
    }

    /// Increment a counter slot and return the new value.
    pub fn bump_counter(&mut self, key: SlotKey) -> u32 {
        let slot = self.slots.entry(key).or_insert(SlotValue::Counter(0));
        match slot {
            SlotValue::Counter(n) => {
                *n += 1;
                *n
            }
            other => {
                *other = SlotValue::Counter(1);
                1
            }
        }
    }

    pub fn counter(&self, key: SlotKey) -> u32 {
        match self.slots.get(&key) {
            Some(SlotValue::Counter(n)) => *n,
            _ => 0,
        }
    }

    // ── Ancestors ──────────────────────────────────────────────────────

    /// Ancestors of the node being transformed, root first.
    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parents.last().copied()
    }

    /// Nearest ancestor satisfying `pred`.
    pub fn find_ancestor(&self, ast: &Ast, pred: impl Fn(&weave_ast::NodeKind) -> bool) -> Option<NodeId> {
        self.parents
            .iter()
            .rev()
            .copied()
            .find(|&id| pred(ast.kind(id)))
    }

    // ── Errors ─────────────────────────────────────────────────────────

    /// Strict mode returns `err`. Lenient mode records it and hands back
    /// `substitute` so the pass can continue.
    pub fn error(&mut self, err: TransformationError, substitute: NodeId) -> Result<NodeId, TransformationError> {
        if self.strict {
            return Err(err);
        }
        warn!(span = ?err.span, "{}", err);
        self.diagnostics.push(err);
        Ok(substitute)
    }

    pub fn diagnostics(&self) -> &[TransformationError] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<TransformationError> {
        std::mem::take(&mut self.diagnostics)
    }

    // ── Traversal ──────────────────────────────────────────────────────

    /// Post-order visit: children first, each replaced by what the pass
    /// returns for it, then the node itself.
    pub fn visit(
        &mut self,
        ast: &mut Ast,
        id: NodeId,
        pass: &mut dyn Transformer,
    ) -> Result<NodeId, TransformationError> {
        self.parents.push(id);
        let visited = self.visit_children(ast, id, pass);
        self.parents.pop();
        visited?;

        let result = pass.transform(self, ast, id)?;
        if result != id {
            trace!(
                pass = pass.name(),
                from = ast.kind(id).name(),
                to = ast.kind(result).name(),
                "rewrote node"
            );
        }
        Ok(result)
    }

    fn visit_children(
        &mut self,
        ast: &mut Ast,
        id: NodeId,
        pass: &mut dyn Transformer,
    ) -> Result<(), TransformationError> {
        for (index, child) in ast.children(id).into_iter().enumerate() {
            let replacement = self.visit(ast, child, pass)?;
            if replacement != child {
                ast.replace_child(id, index, replacement);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clr_namespace_uris() {
        assert_eq!(
            NamespaceAlias::parse_clr_namespace("clr-namespace:Ui.Controls;assembly=Ui"),
            Some(NamespaceAlias {
                clr_namespace: "Ui.Controls".into(),
                assembly: Some("Ui".into()),
            })
        );
        assert_eq!(
            NamespaceAlias::parse_clr_namespace("clr-namespace:Ui"),
            Some(NamespaceAlias {
                clr_namespace: "Ui".into(),
                assembly: None,
            })
        );
        assert_eq!(NamespaceAlias::parse_clr_namespace("urn:ui"), None);
    }

    #[test]
    fn slot_initial_values() {
        assert!(matches!(SlotKey::DeferredClosures.initial_value(), SlotValue::Counter(0)));
        assert!(matches!(SlotKey::TypeCache.initial_value(), SlotValue::TypeCache(c) if c.is_empty()));
        assert_eq!(SlotKey::TypeCache.to_string(), "type cache");
    }
}
