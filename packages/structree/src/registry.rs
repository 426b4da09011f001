//! Alias registry for override handlers
//!
//! Seeded once per build from the supplied handler list, the registry
//! classifies each raw document key as either a reserved override key or an
//! ordinary structural key (no match).
//!
//! Two resolution classes exist, in precedence order:
//! 1. a handler's own alias resolves to that handler;
//! 2. a mapped family's member alias (or a logical `and`/`or`/`not` key)
//!    resolves to the enclosing family, so loose member keys found at section
//!    level are collected into an implicit mapped override.
//!
//! Within each class, the first-registered handler wins an alias conflict.

use std::collections::HashMap;

use crate::handler::{normalize_alias, HandlerSpec, LOGICAL_KEYS};

/// Outcome of resolving a raw key against the registry.
#[derive(Debug, Clone, Copy)]
pub enum Resolution<'r> {
    /// The key is one of the handler's own aliases.
    Handler(&'r HandlerSpec),
    /// The key is a member alias (or logical key) of a mapped family; the
    /// family is returned so the caller can wrap the member implicitly.
    Member { family: &'r HandlerSpec },
}

/// Registry mapping normalized aliases to handlers.
#[derive(Debug)]
pub struct OverrideRegistry {
    handlers: Vec<HandlerSpec>,
    by_alias: HashMap<String, usize>,
    member_alias: HashMap<String, usize>,
}

impl OverrideRegistry {
    /// Build a registry from an ordered handler list.
    ///
    /// Registration order is significant: on conflicting aliases the
    /// first-registered handler wins and later claims are dropped with a
    /// warning.
    pub fn new(handlers: Vec<HandlerSpec>) -> Self {
        let mut by_alias: HashMap<String, usize> = HashMap::new();
        let mut member_alias: HashMap<String, usize> = HashMap::new();

        for (idx, handler) in handlers.iter().enumerate() {
            for alias in handler.aliases() {
                let key = normalize_alias(alias);
                if let Some(&prev) = by_alias.get(&key) {
                    tracing::warn!(
                        alias = %alias,
                        winner = %handlers[prev].primary_alias(),
                        loser = %handler.primary_alias(),
                        "alias already registered, first-registered handler wins"
                    );
                } else {
                    by_alias.insert(key, idx);
                }
            }
        }

        for (idx, handler) in handlers.iter().enumerate() {
            let Some(members) = handler.members() else {
                continue;
            };
            let member_keys = members
                .iter()
                .flat_map(|m| m.aliases().iter().map(String::as_str))
                .chain(LOGICAL_KEYS);
            for alias in member_keys {
                let key = normalize_alias(alias);
                if !member_alias.contains_key(&key) {
                    member_alias.insert(key, idx);
                }
            }
        }

        Self {
            handlers,
            by_alias,
            member_alias,
        }
    }

    /// Resolve a raw document key.
    ///
    /// Returns `None` for keys with no reserved meaning; those are structural
    /// child keys (mappings) or ignorable scalars.
    pub fn resolve(&self, key: &str) -> Option<Resolution<'_>> {
        let key = normalize_alias(key);
        if let Some(idx) = self.by_alias.get(&key) {
            return Some(Resolution::Handler(&self.handlers[*idx]));
        }
        self.member_alias
            .get(&key)
            .map(|idx| Resolution::Member {
                family: &self.handlers[*idx],
            })
    }

    /// Check whether any handler claims the key as its own alias.
    #[must_use]
    pub fn has_handler(&self, key: &str) -> bool {
        self.by_alias.contains_key(&normalize_alias(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_handlers() -> Vec<HandlerSpec> {
        vec![
            HandlerSpec::plain(["message", "message-alt"]),
            HandlerSpec::mapped(
                ["group"],
                vec![
                    HandlerSpec::plain(["settings"]),
                    HandlerSpec::plain(["action", "altaction"]),
                ],
            ),
        ]
    }

    #[test]
    fn test_resolve_own_alias() {
        let registry = OverrideRegistry::new(sample_handlers());
        assert!(matches!(
            registry.resolve("message"),
            Some(Resolution::Handler(h)) if h.primary_alias() == "message"
        ));
        assert!(matches!(
            registry.resolve("message-alt"),
            Some(Resolution::Handler(h)) if h.primary_alias() == "message"
        ));
        assert!(registry.resolve("unknown").is_none());
    }

    #[test]
    fn test_resolve_member_alias() {
        let registry = OverrideRegistry::new(sample_handlers());
        for key in ["settings", "action", "altaction", "and", "or", "not"] {
            assert!(
                matches!(
                    registry.resolve(key),
                    Some(Resolution::Member { family }) if family.primary_alias() == "group"
                ),
                "expected {key} to resolve to the group family"
            );
        }
    }

    #[test]
    fn test_own_alias_beats_member_alias() {
        // "settings" registered directly must shadow the member-alias route.
        let mut handlers = sample_handlers();
        handlers.push(HandlerSpec::plain(["settings"]));
        let registry = OverrideRegistry::new(handlers);
        assert!(matches!(
            registry.resolve("settings"),
            Some(Resolution::Handler(h)) if h.primary_alias() == "settings"
        ));
    }

    #[test]
    fn test_has_handler() {
        let registry = OverrideRegistry::new(sample_handlers());
        assert!(registry.has_handler("message"));
        assert!(registry.has_handler("message-alt"));
        assert!(registry.has_handler("group"));
        // Member aliases are not handlers in their own right.
        assert!(!registry.has_handler("settings"));
        assert!(!registry.has_handler("missing"));
    }

    #[test]
    fn test_first_registered_wins() {
        let handlers = vec![
            HandlerSpec::plain(["input"]),
            HandlerSpec::mapped(["input"], vec![]),
        ];
        let registry = OverrideRegistry::new(handlers);
        assert!(matches!(
            registry.resolve("input"),
            Some(Resolution::Handler(h)) if !h.is_mapped()
        ));
    }
}
