//! Override handler specifications
//!
//! A handler declares which reserved keys (aliases) it recognizes and, for
//! mapped handlers, which member types its instances may contain. Handlers
//! are plain data: the tree builder resolves them through the
//! [`OverrideRegistry`](crate::registry::OverrideRegistry), never through
//! runtime introspection.
//!
//! A mapped handler with an *empty* member list is a leaf-style family: its
//! instances hold terminal name entries (reference lists) instead of
//! structured members.

use std::sync::Arc;

/// Keys resolved as logical combinator groups inside every mapped family.
pub const LOGICAL_KEYS: [&str; 3] = ["and", "or", "not"];

/// Normalize an alias for lookup: hyphens become underscores.
///
/// The raw spelling is kept on resolved overrides so the alias actually used
/// (e.g. `message-alt`) can always be recovered.
pub fn normalize_alias(alias: &str) -> String {
    alias.replace('-', "_")
}

/// Check whether a key is a logical combinator (`and`/`or`/`not`).
pub fn is_logical_key(key: &str) -> bool {
    LOGICAL_KEYS.contains(&key)
}

/// Kind of a handler: a plain typed view, or a mapped multi-member family.
#[derive(Debug, Clone)]
pub enum HandlerKind {
    /// Plain override over the raw value following the alias.
    Plain,
    /// Mapped override with an ordered member-type set.
    ///
    /// The member set is shared (`Arc`) because nested logical groups reuse
    /// the enclosing family's set to unbounded depth.
    Mapped { members: Arc<[HandlerSpec]> },
}

/// Declaration of one override handler.
#[derive(Debug, Clone)]
pub struct HandlerSpec {
    aliases: Vec<String>,
    kind: HandlerKind,
}

impl HandlerSpec {
    /// Declare a plain override handler recognizing the given aliases.
    ///
    /// The first alias is the handler's primary name.
    pub fn plain<I, S>(aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            aliases: aliases.into_iter().map(Into::into).collect(),
            kind: HandlerKind::Plain,
        }
    }

    /// Declare a mapped override handler with an ordered member-type set.
    ///
    /// An empty member set declares a leaf-style family whose instances hold
    /// terminal name entries.
    pub fn mapped<I, S>(aliases: I, members: Vec<HandlerSpec>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            aliases: aliases.into_iter().map(Into::into).collect(),
            kind: HandlerKind::Mapped {
                members: members.into(),
            },
        }
    }

    /// Primary alias (the first declared).
    pub fn primary_alias(&self) -> &str {
        self.aliases.first().map(String::as_str).unwrap_or_default()
    }

    /// All declared aliases, in declaration order.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn kind(&self) -> &HandlerKind {
        &self.kind
    }

    /// Member-type set for mapped handlers; `None` for plain handlers.
    pub fn members(&self) -> Option<&Arc<[HandlerSpec]>> {
        match &self.kind {
            HandlerKind::Plain => None,
            HandlerKind::Mapped { members } => Some(members),
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.kind, HandlerKind::Mapped { .. })
    }

    /// Check whether this handler recognizes the given key (normalized).
    pub fn matches_alias(&self, key: &str) -> bool {
        let key = normalize_alias(key);
        self.aliases.iter().any(|a| normalize_alias(a) == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_alias() {
        assert_eq!(normalize_alias("message-alt"), "message_alt");
        assert_eq!(normalize_alias("message"), "message");
    }

    #[test]
    fn test_logical_keys() {
        assert!(is_logical_key("and"));
        assert!(is_logical_key("or"));
        assert!(is_logical_key("not"));
        assert!(!is_logical_key("nor"));
    }

    #[test]
    fn test_plain_spec() {
        let spec = HandlerSpec::plain(["message", "message-alt"]);
        assert_eq!(spec.primary_alias(), "message");
        assert!(!spec.is_mapped());
        assert!(spec.matches_alias("message-alt"));
        assert!(spec.matches_alias("message_alt"));
        assert!(!spec.matches_alias("meta"));
    }

    #[test]
    fn test_mapped_spec() {
        let spec = HandlerSpec::mapped(
            ["group"],
            vec![
                HandlerSpec::plain(["settings"]),
                HandlerSpec::plain(["action", "altaction"]),
            ],
        );
        assert!(spec.is_mapped());
        let members = spec.members().unwrap();
        assert_eq!(members.len(), 2);
        assert!(members[1].matches_alias("altaction"));
    }

    #[test]
    fn test_leaf_style_family() {
        let spec = HandlerSpec::mapped(["refs"], vec![]);
        assert!(spec.is_mapped());
        assert!(spec.members().unwrap().is_empty());
    }
}
