//! structree
//!
//! Override-resolution trees for declarative YAML rule and check documents.
//! This library turns an arbitrarily deep, order-preserving document into a
//! typed, navigable tree where reserved keys at any depth resolve through
//! pluggable override handlers instead of position-based parsing:
//! - structural keys become [`Section`] nodes, reserved keys become resolved
//!   [`Override`]/[`MappedOverride`] views
//! - mapped families normalize singular and sequence forms into ordered
//!   instances and resolve `and`/`or`/`not` sub-groups recursively
//! - a shared context carrier and dotted paths are threaded through every node
//!
//! # Example
//!
//! ```ignore
//! use structree::{HandlerSpec, TreeBuilder};
//!
//! let tree = TreeBuilder::new("fruit tastiness")
//!     .handler(HandlerSpec::plain(["input"]))
//!     .handler(HandlerSpec::plain(["message", "message-alt"]))
//!     .handler(HandlerSpec::plain(["settings"]))
//!     .build_from_yaml(&std::fs::read_to_string("checks.yaml")?)?;
//!
//! for leaf in tree.leaf_sections() {
//!     println!("{}: {:?}", leaf.resolve_path(), leaf.get("message"));
//! }
//! ```

pub mod context;
pub mod error;
pub mod handler;
pub mod overrides;
pub mod registry;
pub mod section;

// Re-export commonly used items
pub use context::{ContextStore, MapContext, SharedContext};
pub use error::{Result, TreeError};
pub use handler::{normalize_alias, HandlerKind, HandlerSpec, LOGICAL_KEYS};
pub use overrides::{Instance, MappedOverride, Member, MemberMatches, Override, Terminal};
pub use registry::{OverrideRegistry, Resolution};
pub use section::{
    LeafSections, OverrideNode, Section, SectionId, SectionTree, TreeBuilder, TreeHooks,
};

// Raw document types come straight from the YAML parser.
pub use serde_yaml_ng::{Mapping, Value};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
