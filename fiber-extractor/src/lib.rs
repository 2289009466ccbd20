//! Fiber Extractor - Extract conversation records from rendered UI trees.
//!
//! This crate reads the in-memory tree a script-rendered web application
//! builds for its own rendering and turns matched nodes into typed records.
//! It never touches the host document: it is handed a root node and only
//! reads from it.
//!
//! # Quick Start
//!
//! ```
//! use fiber_extractor::{extract_messages, FiberTree, DEFAULT_MAX_NODES};
//! use serde_json::json;
//!
//! let tree = FiberTree::from_value(json!({
//!     "type": "div",
//!     "children": [
//!         { "type": "div", "props": { "msg": { "id": "m2", "t": 20, "body": "second" } } },
//!         { "type": "div", "props": { "msg": { "id": "m1", "t": 10, "body": "first" } } }
//!     ]
//! })).unwrap();
//!
//! let outcome = extract_messages(&tree.root().unwrap(), DEFAULT_MAX_NODES);
//! assert_eq!(outcome.records[0].body, "first");
//! assert_eq!(outcome.skipped, 0);
//! ```
//!
//! # Modules
//!
//! - [`result`]: `ParseError`, `ParseResult` and result helpers
//! - [`node`]: The `UiNode` interface and the snapshot-backed `FiberTree`
//! - [`traversal`]: Upward/downward search, bounded collection, predicates
//! - [`validate`]: Field validators for untyped property bags
//! - [`types`]: Records (NormalizedMessage, Sender, Attachment, Chat)
//! - [`extractor`]: Record parsing and batch extraction
//! - [`source`]: Tree-root suppliers

pub mod extractor;
pub mod node;
pub mod result;
pub mod source;
pub mod traversal;
pub mod types;
pub mod validate;

pub use extractor::{
    extract_chat_from_node, extract_chats, extract_from_node, extract_messages, parse_attachment,
    parse_chat, parse_message, parse_sender, BatchOutcome,
};
pub use node::{FiberRef, FiberSnapshot, FiberTree, NodeType, UiNode};
pub use result::{combine, ParseError, ParseErrorKind, ParseResult, ParseResultExt};
pub use source::{find_fiber_key, HostContainer, SnapshotSource, TreeSource};
pub use traversal::{
    all_of, any_of, by_type, collect_nodes, traverse_downward, traverse_upward, with_property,
    with_property_value, Predicate, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NODES, MAX_VISITS,
};
pub use types::{
    generate_id, Attachment, AttachmentType, Chat, MessageStatus, NormalizedMessage, Sender,
};
