//! Node type registration.
//!
//! Plugins describe each element type they contribute with a [`NodeTypeSpec`]: its name, the
//! markup import rules that produce it, and optional editing hooks. Specs are registered on an
//! [`EditorBuilder`](crate::EditorBuilder) before the editor is built, so the set of known types
//! is fixed for the editor's lifetime.

use crate::error::TreeError;
use crate::markup::Element;
use crate::node::{ElementNode, NodeKey, PARAGRAPH_TYPE, ROOT_TYPE, TEXT_TYPE};
use crate::transaction::Transaction;
use std::collections::BTreeMap;
use std::fmt;

/// Converts a markup element into a node, or declines with `None`.
pub type ImportFn = fn(&Element) -> Option<ImportedElement>;

/// Runs after an imported element and its children are attached.
pub type AfterImportFn = fn(&mut Transaction<'_>, NodeKey) -> Result<(), TreeError>;

/// Invoked by the default Backspace handler when the caret sits at the very start of a node of
/// this type. Returns `true` when the hook handled the keystroke.
pub type CollapseAtStartFn = fn(&mut Transaction<'_>, NodeKey) -> bool;

/// The result of a successful [`ImportFn`].
pub struct ImportedElement {
    /// The node to insert in place of the markup element.
    pub node: Box<dyn ElementNode>,
    /// Optional fix-up once the node's children have been imported.
    pub after: Option<AfterImportFn>,
}

impl ImportedElement {
    /// Wrap a node with no post-import fix-up.
    pub fn new(node: impl ElementNode) -> Self {
        Self {
            node: Box::new(node),
            after: None,
        }
    }

    /// Builder: attach a post-import fix-up.
    pub fn with_after(mut self, after: AfterImportFn) -> Self {
        self.after = Some(after);
        self
    }
}

impl fmt::Debug for ImportedElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportedElement")
            .field("node", &self.node)
            .field("after", &self.after.is_some())
            .finish()
    }
}

/// A markup import rule.
#[derive(Debug, Clone, Copy)]
pub struct ImportRule {
    /// Lowercase tag this rule is tried on.
    pub tag: &'static str,
    /// Higher priorities are tried first.
    pub priority: u8,
    /// The conversion.
    pub convert: ImportFn,
}

/// Everything the editor needs to know about one element type.
#[derive(Debug, Clone)]
pub struct NodeTypeSpec {
    name: &'static str,
    import_rules: Vec<ImportRule>,
    collapse_at_start: Option<CollapseAtStartFn>,
}

impl NodeTypeSpec {
    /// A spec with no import rules or hooks.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            import_rules: Vec::new(),
            collapse_at_start: None,
        }
    }

    /// Builder: add an import rule.
    pub fn with_import_rule(mut self, tag: &'static str, priority: u8, convert: ImportFn) -> Self {
        self.import_rules.push(ImportRule {
            tag,
            priority,
            convert,
        });
        self
    }

    /// Builder: set the Backspace-at-start hook.
    pub fn with_collapse_at_start(mut self, hook: CollapseAtStartFn) -> Self {
        self.collapse_at_start = Some(hook);
        self
    }

    /// The type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Import rules in registration order.
    pub fn import_rules(&self) -> &[ImportRule] {
        &self.import_rules
    }

    /// The Backspace-at-start hook, if any.
    pub fn collapse_at_start(&self) -> Option<CollapseAtStartFn> {
        self.collapse_at_start
    }
}

/// The set of node types known to an editor.
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    types: BTreeMap<&'static str, NodeTypeSpec>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        let mut registry = Self {
            types: BTreeMap::new(),
        };
        for name in [ROOT_TYPE, PARAGRAPH_TYPE, TEXT_TYPE] {
            registry.register(NodeTypeSpec::new(name));
        }
        registry
    }
}

impl NodeRegistry {
    /// Register (or replace) a type.
    pub fn register(&mut self, spec: NodeTypeSpec) {
        if self.types.insert(spec.name, spec).is_some() {
            tracing::debug!("node type re-registered; previous spec replaced");
        }
    }

    /// Whether a type with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Spec for a type.
    pub fn get(&self, name: &str) -> Option<&NodeTypeSpec> {
        self.types.get(name)
    }

    /// Registered type names.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.keys().copied()
    }

    /// All import rules for `tag`, highest priority first.
    pub fn import_rules_for(&self, tag: &str) -> Vec<ImportRule> {
        let mut rules: Vec<ImportRule> = self
            .types
            .values()
            .flat_map(|spec| spec.import_rules.iter().copied())
            .filter(|rule| rule.tag == tag)
            .collect();
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        rules
    }

    /// The Backspace-at-start hook for a type.
    pub fn collapse_hook(&self, name: &str) -> Option<CollapseAtStartFn> {
        self.types.get(name)?.collapse_at_start
    }
}
