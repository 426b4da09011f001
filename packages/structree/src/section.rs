//! Section tree and builder
//!
//! The builder drives a depth-first, document-order descent over the raw
//! document. At each level every key is classified through the registry:
//! reserved keys become resolved overrides on the current section, mapping
//! values under unreserved keys become child sections, and anything else is
//! skipped. A section with no child sections is a leaf.
//!
//! Nodes live by value in an arena owned by [`SectionTree`]; `parent`/`root`
//! links are stable indices into that arena, so handles are cheap copies that
//! never extend a node's lifetime.
//!
//! # Example
//!
//! ```ignore
//! use structree::{HandlerSpec, TreeBuilder};
//!
//! let tree = TreeBuilder::new("fruit tastiness")
//!     .handler(HandlerSpec::plain(["message", "message-alt"]))
//!     .build_from_yaml(&yaml_text)?;
//! for leaf in tree.leaf_sections() {
//!     println!("{}", leaf.resolve_path());
//! }
//! ```

use std::sync::Arc;

use serde_yaml_ng::{Mapping, Value};

use crate::context::{default_context, SharedContext};
use crate::error::{Result, TreeError};
use crate::handler::{normalize_alias, HandlerKind, HandlerSpec};
use crate::overrides::{MappedOverride, Override};
use crate::registry::{OverrideRegistry, Resolution};

/// Build lifecycle extension points.
///
/// Both methods default to no-ops. `pre_build` runs exactly once before any
/// section is constructed, `post_build` exactly once after the whole
/// recursive build completes. A failure aborts the build and propagates to
/// the caller.
pub trait TreeHooks {
    fn pre_build(&mut self) -> Result<()> {
        Ok(())
    }

    fn post_build(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A resolved override recorded on a section.
#[derive(Debug, Clone)]
pub enum OverrideNode {
    Plain(Override),
    Mapped(MappedOverride),
}

impl OverrideNode {
    /// Alias actually used in the document.
    pub fn alias(&self) -> &str {
        match self {
            OverrideNode::Plain(o) => o.alias(),
            OverrideNode::Mapped(m) => m.alias(),
        }
    }

    /// Underscore-normalized lookup name.
    pub fn name(&self) -> &str {
        match self {
            OverrideNode::Plain(o) => o.name(),
            OverrideNode::Mapped(m) => m.name(),
        }
    }

    /// Root-qualified dotted path.
    pub fn path(&self) -> &str {
        match self {
            OverrideNode::Plain(o) => o.path(),
            OverrideNode::Mapped(m) => m.path(),
        }
    }

    /// Shared context carrier of the owning tree.
    pub fn context(&self) -> &SharedContext {
        match self {
            OverrideNode::Plain(o) => o.context(),
            OverrideNode::Mapped(m) => m.context(),
        }
    }

    pub fn as_plain(&self) -> Option<&Override> {
        match self {
            OverrideNode::Plain(o) => Some(o),
            OverrideNode::Mapped(_) => None,
        }
    }

    pub fn as_mapped(&self) -> Option<&MappedOverride> {
        match self {
            OverrideNode::Mapped(m) => Some(m),
            OverrideNode::Plain(_) => None,
        }
    }

    /// Keyed lookup delegated to plain-override content.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_plain().and_then(|o| o.get(key))
    }
}

/// Stable index of a section in its owning tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionId(usize);

#[derive(Debug)]
struct SectionNode {
    name: String,
    path: String,
    parent: Option<SectionId>,
    children: Vec<SectionId>,
    overrides: Vec<OverrideNode>,
    content: Mapping,
}

/// An immutable, navigable tree built from one raw document.
///
/// The tree exclusively owns every section and override node. Handles
/// ([`Section`]) borrow from the tree and are valid for its lifetime only.
#[derive(Debug)]
pub struct SectionTree {
    nodes: Vec<SectionNode>,
    context: SharedContext,
}

impl SectionTree {
    /// Root section of the tree.
    pub fn root(&self) -> Section<'_> {
        Section {
            tree: self,
            id: SectionId(0),
        }
    }

    /// Shared context carrier threaded through every node of this tree.
    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    /// Lazy depth-first document-order traversal over every leaf section.
    ///
    /// Restartable: each call walks the immutable tree from scratch.
    pub fn leaf_sections(&self) -> LeafSections<'_> {
        self.root().leaf_sections()
    }

    fn node(&self, id: SectionId) -> &SectionNode {
        &self.nodes[id.0]
    }
}

/// Borrowing handle to one section of a [`SectionTree`].
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    tree: &'a SectionTree,
    id: SectionId,
}

impl<'a> Section<'a> {
    /// Declared name of this section (the root's is the supplied root name).
    pub fn name(&self) -> &'a str {
        &self.tree.node(self.id).name
    }

    /// Root-qualified dotted path of this section.
    pub fn resolve_path(&self) -> &'a str {
        &self.tree.node(self.id).path
    }

    /// Parent section; `None` for the root.
    pub fn parent(&self) -> Option<Section<'a>> {
        self.tree.node(self.id).parent.map(|id| Section {
            tree: self.tree,
            id,
        })
    }

    /// Root section of the owning tree.
    pub fn root(&self) -> Section<'a> {
        self.tree.root()
    }

    /// Child sections in document order.
    pub fn children(&self) -> impl Iterator<Item = Section<'a>> + 'a {
        let tree = self.tree;
        self.tree
            .node(self.id)
            .children
            .iter()
            .map(move |id| Section { tree, id: *id })
    }

    /// A section is a leaf iff it produced zero child sections.
    pub fn is_leaf(&self) -> bool {
        self.tree.node(self.id).children.is_empty()
    }

    /// Resolved override by normalized alias (`message-alt` → `message_alt`).
    ///
    /// Absence is `None`, never an error.
    pub fn get(&self, name: &str) -> Option<&'a OverrideNode> {
        let name = normalize_alias(name);
        self.tree
            .node(self.id)
            .overrides
            .iter()
            .find(|o| o.name() == name)
    }

    /// Resolved overrides of this section, in document order.
    pub fn overrides(&self) -> impl Iterator<Item = &'a OverrideNode> {
        self.tree.node(self.id).overrides.iter()
    }

    /// Raw mapping content this section was built from.
    pub fn content(&self) -> &'a Mapping {
        &self.tree.node(self.id).content
    }

    /// Shared context carrier of the owning tree.
    pub fn context(&self) -> &'a SharedContext {
        &self.tree.context
    }

    /// Lazy depth-first document-order traversal over leaves of this subtree.
    pub fn leaf_sections(&self) -> LeafSections<'a> {
        LeafSections {
            tree: self.tree,
            stack: vec![self.id],
        }
    }
}

/// Iterator over leaf sections, depth-first in document order.
#[derive(Debug)]
pub struct LeafSections<'a> {
    tree: &'a SectionTree,
    stack: Vec<SectionId>,
}

impl<'a> Iterator for LeafSections<'a> {
    type Item = Section<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let node = self.tree.node(id);
            if node.children.is_empty() {
                return Some(Section {
                    tree: self.tree,
                    id,
                });
            }
            self.stack.extend(node.children.iter().rev());
        }
        None
    }
}

/// Builder for a [`SectionTree`].
///
/// # Arguments
/// * root name — becomes the first path component of every node
/// * handlers — ordered override handler list seeding the registry
/// * context — optional shared carrier; a fresh default is installed if none
/// * hooks — optional lifecycle hooks, gated by [`TreeBuilder::run_hooks`]
pub struct TreeBuilder<'h> {
    root_name: String,
    handlers: Vec<HandlerSpec>,
    context: Option<SharedContext>,
    hooks: Option<&'h mut dyn TreeHooks>,
    run_hooks: bool,
}

impl<'h> TreeBuilder<'h> {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root_name: root_name.into(),
            handlers: Vec::new(),
            context: None,
            hooks: None,
            run_hooks: true,
        }
    }

    /// Register one override handler. Registration order decides alias
    /// conflicts (first wins).
    #[must_use]
    pub fn handler(mut self, handler: HandlerSpec) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Register several override handlers in order.
    #[must_use]
    pub fn handlers(mut self, handlers: impl IntoIterator<Item = HandlerSpec>) -> Self {
        self.handlers.extend(handlers);
        self
    }

    /// Install a shared context carrier for the whole tree.
    #[must_use]
    pub fn context(mut self, context: SharedContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Attach lifecycle hooks.
    #[must_use]
    pub fn hooks(mut self, hooks: &'h mut dyn TreeHooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Gate hook invocation; defaults to `true`.
    #[must_use]
    pub fn run_hooks(mut self, run: bool) -> Self {
        self.run_hooks = run;
        self
    }

    /// Parse YAML text and build the tree from it.
    pub fn build_from_yaml(self, text: &str) -> Result<SectionTree> {
        let doc: Value = serde_yaml_ng::from_str(text)?;
        self.build(&doc)
    }

    /// Build the tree from a parsed document value.
    ///
    /// # Returns
    /// * `Ok(SectionTree)` - the fully built, immutable tree
    /// * `Err(TreeError)` - on a malformed document or hook failure; no
    ///   partial tree is exposed
    pub fn build(mut self, doc: &Value) -> Result<SectionTree> {
        let content = match doc {
            Value::Mapping(map) => map.clone(),
            Value::Null => Mapping::new(),
            _ => return Err(TreeError::RootNotMapping(self.root_name)),
        };
        let context = self.context.take().unwrap_or_else(default_context);
        let registry = OverrideRegistry::new(std::mem::take(&mut self.handlers));

        if self.run_hooks {
            if let Some(hooks) = self.hooks.as_deref_mut() {
                hooks.pre_build()?;
            }
        }

        let mut nodes = Vec::new();
        let root_name = self.root_name.clone();
        build_section(
            &mut nodes,
            self.root_name,
            content,
            None,
            root_name.clone(),
            &registry,
            &context,
        )?;

        if self.run_hooks {
            if let Some(hooks) = self.hooks.as_deref_mut() {
                hooks.post_build()?;
            }
        }

        tracing::debug!(root = %root_name, sections = nodes.len(), "tree built");
        Ok(SectionTree { nodes, context })
    }
}

fn build_section(
    nodes: &mut Vec<SectionNode>,
    name: String,
    content: Mapping,
    parent: Option<SectionId>,
    path: String,
    registry: &OverrideRegistry,
    context: &SharedContext,
) -> Result<SectionId> {
    let id = SectionId(nodes.len());
    nodes.push(SectionNode {
        name,
        path: path.clone(),
        parent,
        children: Vec::new(),
        overrides: Vec::new(),
        content: content.clone(),
    });

    for (key, value) in &content {
        let Some(key) = key.as_str() else {
            tracing::debug!(path = %path, "skipping non-string key");
            continue;
        };
        match registry.resolve(key) {
            Some(Resolution::Handler(handler)) => {
                let node = resolve_override(handler, key, &path, value, context)?;
                nodes[id.0].overrides.push(node);
            }
            Some(Resolution::Member { family }) => {
                push_implicit_member(&mut nodes[id.0], family, key, &path, value, context)?;
            }
            None => {
                if let Some(child_map) = value.as_mapping() {
                    let child_path = format!("{path}.{key}");
                    let child = build_section(
                        nodes,
                        key.to_string(),
                        child_map.clone(),
                        Some(id),
                        child_path,
                        registry,
                        context,
                    )?;
                    nodes[id.0].children.push(child);
                } else {
                    // Unmatched key with a non-mapping value carries no
                    // structure and no reserved meaning.
                    tracing::debug!(key, path = %path, "ignoring unmatched non-mapping key");
                }
            }
        }
    }

    Ok(id)
}

fn resolve_override(
    handler: &HandlerSpec,
    alias: &str,
    section_path: &str,
    value: &Value,
    context: &SharedContext,
) -> Result<OverrideNode> {
    let node = match handler.kind() {
        HandlerKind::Plain => OverrideNode::Plain(Override::new(
            alias,
            section_path,
            value.clone(),
            context.clone(),
        )),
        HandlerKind::Mapped { members } => OverrideNode::Mapped(MappedOverride::resolve(
            alias,
            section_path,
            value,
            Arc::clone(members),
            context.clone(),
        )?),
    };
    Ok(node)
}

/// A loose member key at section level grows an implicit mapped override
/// recorded under its family's primary alias.
fn push_implicit_member(
    node: &mut SectionNode,
    family: &HandlerSpec,
    key: &str,
    section_path: &str,
    value: &Value,
    context: &SharedContext,
) -> Result<()> {
    let Some(members) = family.members() else {
        return Ok(());
    };
    let family_name = normalize_alias(family.primary_alias());
    let idx = match node.overrides.iter().position(|o| o.name() == family_name) {
        Some(idx) => idx,
        None => {
            node.overrides.push(OverrideNode::Mapped(
                MappedOverride::new_implicit(
                    family.primary_alias(),
                    section_path,
                    Arc::clone(members),
                    context.clone(),
                ),
            ));
            node.overrides.len() - 1
        }
    };
    if let OverrideNode::Mapped(mapped) = &mut node.overrides[idx] {
        mapped.push_loose_entry(key, value)?;
    }
    Ok(())
}
