//! Resolved override views
//!
//! An [`Override`] is a typed view over the value following a reserved key.
//! A [`MappedOverride`] additionally normalizes its raw content into an
//! ordered sequence of instances, each holding resolved member overrides, and
//! resolves logical `and`/`or`/`not` sub-groups recursively with the
//! enclosing family's member-type set.
//!
//! # Instance normalization
//!
//! Raw content for a mapped override is either one mapping or a sequence:
//! - a mapping is exactly one instance;
//! - a sequence is folded in order: an element mapping with two or more keys
//!   is its own instance, while a single-key element mapping (or, in a
//!   leaf-style family, a bare scalar) joins a shared *principal* instance
//!   created at its first occurrence.
//!
//! The principal rule is what makes `group: [{settings: ..}, {settings: ..}]`
//! one instance whose `settings` member collects two entries, while a list of
//! multi-key mappings stays one instance per element.

use std::sync::Arc;

use serde_yaml_ng::{Mapping, Value};

use crate::context::SharedContext;
use crate::error::{Result, TreeError};
use crate::handler::{is_logical_key, normalize_alias, HandlerKind, HandlerSpec};

/// Resolved plain override: the typed view over one reserved key's value.
#[derive(Debug, Clone)]
pub struct Override {
    alias: String,
    name: String,
    path: String,
    content: Value,
    context: SharedContext,
}

impl Override {
    pub(crate) fn new(
        alias: &str,
        parent_path: &str,
        content: Value,
        context: SharedContext,
    ) -> Self {
        Self {
            alias: alias.to_string(),
            name: normalize_alias(alias),
            path: format!("{parent_path}.{alias}"),
            content,
            context,
        }
    }

    /// Alias actually used in the document (e.g. `message-alt`).
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Underscore-normalized lookup name (e.g. `message_alt`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root-qualified dotted path of this override.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw content following the alias.
    pub fn content(&self) -> &Value {
        &self.content
    }

    /// Keyed lookup over mapping content; absence is `None`, never an error.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.content.get(key)
    }

    /// Shared context carrier of the owning tree.
    pub fn context(&self) -> &SharedContext {
        &self.context
    }
}

/// A terminal entry of a leaf-style family, exposing only its name.
#[derive(Debug, Clone)]
pub struct Terminal {
    name: String,
    path: String,
}

impl Terminal {
    fn new(name: &str, parent_path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: format!("{parent_path}.{name}"),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// One resolved member of a mapped-override instance.
#[derive(Debug, Clone)]
pub enum Member {
    /// Structured member resolved as a plain override.
    Plain(Override),
    /// Nested mapped override: a logical group or a mapped member type.
    Group(MappedOverride),
    /// Terminal name entry of a leaf-style family.
    Terminal(Terminal),
}

impl Member {
    /// Alias as written in the document.
    pub fn alias(&self) -> &str {
        match self {
            Member::Plain(o) => o.alias(),
            Member::Group(g) => g.alias(),
            Member::Terminal(t) => t.name(),
        }
    }

    /// Normalized lookup name (terminals keep their literal name).
    pub fn name(&self) -> &str {
        match self {
            Member::Plain(o) => o.name(),
            Member::Group(g) => g.name(),
            Member::Terminal(t) => t.name(),
        }
    }

    /// Root-qualified dotted path.
    pub fn path(&self) -> &str {
        match self {
            Member::Plain(o) => o.path(),
            Member::Group(g) => g.path(),
            Member::Terminal(t) => t.path(),
        }
    }

    pub fn as_override(&self) -> Option<&Override> {
        match self {
            Member::Plain(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&MappedOverride> {
        match self {
            Member::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_terminal(&self) -> Option<&Terminal> {
        match self {
            Member::Terminal(t) => Some(t),
            _ => None,
        }
    }

    /// Keyed lookup delegated to plain-override content.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_override().and_then(|o| o.get(key))
    }

    /// Shared context carrier, for members that carry one.
    pub fn context(&self) -> Option<&SharedContext> {
        match self {
            Member::Plain(o) => Some(o.context()),
            Member::Group(g) => Some(g.context()),
            Member::Terminal(_) => None,
        }
    }
}

/// One top-level instance of a mapped override, holding resolved members in
/// document order.
#[derive(Debug, Clone, Default)]
pub struct Instance {
    entries: Vec<Member>,
}

impl Instance {
    /// First member with the given (normalized) name, if any.
    pub fn get(&self, name: &str) -> Option<&Member> {
        let name = normalize_alias(name);
        self.entries
            .iter()
            .find(|m| normalize_alias(m.alias()) == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Member> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Instance {
    type Item = &'a Member;
    type IntoIter = std::slice::Iter<'a, Member>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Members with one name collected across every instance, in instance order.
///
/// An empty view is the absence marker: looking up a member no instance
/// defines never fails.
#[derive(Debug)]
pub struct MemberMatches<'a> {
    items: Vec<&'a Member>,
}

impl<'a> MemberMatches<'a> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&'a Member> {
        self.items.first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Member> + '_ {
        self.items.iter().copied()
    }
}

impl<'a> IntoIterator for MemberMatches<'a> {
    type Item = &'a Member;
    type IntoIter = std::vec::IntoIter<&'a Member>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Resolved mapped override: an ordered sequence of instances over the raw
/// content following a reserved key.
#[derive(Debug, Clone)]
pub struct MappedOverride {
    alias: String,
    name: String,
    path: String,
    content: Value,
    members_spec: Arc<[HandlerSpec]>,
    instances: Vec<Instance>,
    loose_instance: Option<usize>,
    context: SharedContext,
}

impl MappedOverride {
    pub(crate) fn resolve(
        alias: &str,
        parent_path: &str,
        content: &Value,
        members: Arc<[HandlerSpec]>,
        context: SharedContext,
    ) -> Result<Self> {
        let mut mapped = Self::empty(alias, parent_path, members, context);
        mapped.content = content.clone();
        mapped.normalize(content)?;
        Ok(mapped)
    }

    /// Implicit family override grown from loose member keys at section level.
    pub(crate) fn new_implicit(
        alias: &str,
        parent_path: &str,
        members: Arc<[HandlerSpec]>,
        context: SharedContext,
    ) -> Self {
        Self::empty(alias, parent_path, members, context)
    }

    fn empty(
        alias: &str,
        parent_path: &str,
        members: Arc<[HandlerSpec]>,
        context: SharedContext,
    ) -> Self {
        Self {
            alias: alias.to_string(),
            name: normalize_alias(alias),
            path: format!("{parent_path}.{alias}"),
            content: Value::Null,
            members_spec: members,
            instances: Vec::new(),
            loose_instance: None,
            context,
        }
    }

    fn normalize(&mut self, content: &Value) -> Result<()> {
        match content {
            Value::Null => Ok(()),
            Value::Mapping(map) => {
                let instance = resolve_instance(
                    map,
                    &self.members_spec,
                    &self.path,
                    &self.context,
                )?;
                self.instances.push(instance);
                Ok(())
            }
            Value::Sequence(elements) => {
                for element in elements {
                    self.normalize_element(element)?;
                }
                Ok(())
            }
            _ if self.members_spec.is_empty() => {
                // Leaf-style families accept a bare scalar as their content.
                self.push_scalar(content)
            }
            _ => Err(TreeError::malformed(
                &self.path,
                "content is neither a mapping nor a sequence",
            )),
        }
    }

    fn normalize_element(&mut self, element: &Value) -> Result<()> {
        if let Some(map) = element.as_mapping() {
            if map.len() >= 2 {
                let instance = resolve_instance(
                    map,
                    &self.members_spec,
                    &self.path,
                    &self.context,
                )?;
                self.instances.push(instance);
                return Ok(());
            }
            let members = Arc::clone(&self.members_spec);
            for (key, value) in map {
                let Some(key) = key.as_str() else {
                    tracing::debug!(path = %self.path, "skipping non-string instance key");
                    continue;
                };
                let member = resolve_entry(key, value, &members, &self.path, &self.context)?;
                if let Some(member) = member {
                    self.principal_instance().entries.push(member);
                }
            }
            Ok(())
        } else {
            self.push_scalar(element)
        }
    }

    fn push_scalar(&mut self, value: &Value) -> Result<()> {
        if !self.members_spec.is_empty() {
            return Err(TreeError::malformed(
                &self.path,
                "sequence element is neither a mapping nor an acceptable leaf scalar",
            ));
        }
        let Some(name) = scalar_name(value) else {
            return Err(TreeError::malformed(&self.path, "unusable leaf scalar"));
        };
        let terminal = Member::Terminal(Terminal::new(&name, &self.path));
        self.principal_instance().entries.push(terminal);
        Ok(())
    }

    /// Shared instance that single-member elements and terminals fold into,
    /// created at its first use.
    fn principal_instance(&mut self) -> &mut Instance {
        let idx = match self.loose_instance {
            Some(idx) => idx,
            None => {
                self.instances.push(Instance::default());
                let idx = self.instances.len() - 1;
                self.loose_instance = Some(idx);
                idx
            }
        };
        &mut self.instances[idx]
    }

    /// Resolve one loose member key found at section level into this
    /// implicit override.
    pub(crate) fn push_loose_entry(&mut self, key: &str, value: &Value) -> Result<()> {
        let members = Arc::clone(&self.members_spec);
        let member = resolve_entry(key, value, &members, &self.path, &self.context)?;
        if let Some(member) = member {
            self.principal_instance().entries.push(member);
        }
        Ok(())
    }

    /// Alias actually used in the document.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Underscore-normalized lookup name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root-qualified dotted path of this override.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw content following the alias (`Null` for implicit overrides).
    pub fn content(&self) -> &Value {
        &self.content
    }

    /// Shared context carrier of the owning tree.
    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    /// Member-type set of this family; logical sub-groups share it.
    pub fn member_types(&self) -> &[HandlerSpec] {
        &self.members_spec
    }

    /// Number of top-level instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Top-level instances in document order.
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instance> {
        self.instances.iter()
    }

    /// Collect the named member from every instance that defines it.
    ///
    /// The view is empty when no instance defines the member; that is the
    /// absence marker, not a failure.
    pub fn member(&self, name: &str) -> MemberMatches<'_> {
        let name = normalize_alias(name);
        MemberMatches {
            items: self
                .members()
                .filter(|m| normalize_alias(m.alias()) == name)
                .collect(),
        }
    }

    /// First nested group member with the given name (e.g. `and`).
    pub fn group(&self, name: &str) -> Option<&MappedOverride> {
        self.member(name).into_iter().find_map(Member::as_group)
    }

    /// Every member of every instance, in document order.
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.instances.iter().flat_map(|i| i.entries.iter())
    }

    /// Recursively flatten terminal names across nested logical groups.
    pub fn terminal_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_terminals(self, &mut names);
        names
    }
}

impl<'a> IntoIterator for &'a MappedOverride {
    type Item = &'a Instance;
    type IntoIter = std::slice::Iter<'a, Instance>;

    fn into_iter(self) -> Self::IntoIter {
        self.instances.iter()
    }
}

fn collect_terminals<'a>(mapped: &'a MappedOverride, out: &mut Vec<&'a str>) {
    for member in mapped.members() {
        match member {
            Member::Terminal(t) => out.push(t.name()),
            Member::Group(g) => collect_terminals(g, out),
            Member::Plain(_) => {}
        }
    }
}

fn resolve_instance(
    map: &Mapping,
    members: &Arc<[HandlerSpec]>,
    base_path: &str,
    context: &SharedContext,
) -> Result<Instance> {
    let mut instance = Instance::default();
    for (key, value) in map {
        let Some(key) = key.as_str() else {
            tracing::debug!(path = base_path, "skipping non-string instance key");
            continue;
        };
        if let Some(member) = resolve_entry(key, value, members, base_path, context)? {
            instance.entries.push(member);
        }
    }
    Ok(instance)
}

fn resolve_entry(
    key: &str,
    value: &Value,
    members: &Arc<[HandlerSpec]>,
    base_path: &str,
    context: &SharedContext,
) -> Result<Option<Member>> {
    if is_logical_key(key) {
        // Logical groups reuse the enclosing family's member set, so this
        // recursion is self-similar to unbounded depth.
        let group =
            MappedOverride::resolve(key, base_path, value, Arc::clone(members), context.clone())?;
        return Ok(Some(Member::Group(group)));
    }
    if let Some(spec) = members.iter().find(|m| m.matches_alias(key)) {
        let member = match spec.kind() {
            HandlerKind::Plain => {
                Member::Plain(Override::new(key, base_path, value.clone(), context.clone()))
            }
            HandlerKind::Mapped { members: inner } => Member::Group(MappedOverride::resolve(
                key,
                base_path,
                value,
                Arc::clone(inner),
                context.clone(),
            )?),
        };
        return Ok(Some(member));
    }
    if members.is_empty() {
        return Ok(Some(Member::Terminal(Terminal::new(key, base_path))));
    }
    tracing::debug!(key, path = base_path, "ignoring unmatched member key");
    Ok(None)
}

fn scalar_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
