//! Tree-root suppliers.
//!
//! The host renderer stores the root of its UI tree on a container element
//! under a property whose name starts with one of a few known prefixes
//! followed by a random suffix. [`find_fiber_key`] picks that property;
//! [`TreeSource`] hands the traversal engine a root node.

use crate::node::{FiberRef, FiberSnapshot, FiberTree, UiNode};
use crate::result::{ParseError, ParseResult};
use serde::{Deserialize, Serialize};

/// Property-name prefixes that hold the UI tree, in probe order.
pub const FIBER_KEY_PREFIXES: [&str; 3] = [
    "__reactFiber$",
    "__reactInternalInstance$",
    "__reactContainer$",
];

/// Returns the first property name matching a known prefix, probing prefixes
/// in order.
///
/// # Example
///
/// ```
/// use fiber_extractor::source::find_fiber_key;
///
/// let names = ["id", "__reactContainer$x1", "__reactFiber$k9"];
/// assert_eq!(find_fiber_key(names), Some("__reactFiber$k9"));
/// assert_eq!(find_fiber_key(["id", "className"]), None);
/// ```
pub fn find_fiber_key<'a, I>(property_names: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let names: Vec<&'a str> = property_names.into_iter().collect();
    FIBER_KEY_PREFIXES
        .iter()
        .find_map(|prefix| names.iter().copied().find(|name| name.starts_with(prefix)))
}

/// Supplies the root node the traversal engine starts from.
pub trait TreeSource {
    type Node<'a>: UiNode
    where
        Self: 'a;

    /// # Errors
    ///
    /// `fiber-not-found` when no tree is reachable.
    fn root(&self) -> ParseResult<Self::Node<'_>>;
}

impl TreeSource for FiberTree {
    type Node<'a> = FiberRef<'a>;

    fn root(&self) -> ParseResult<FiberRef<'_>> {
        FiberTree::root(self).ok_or_else(|| ParseError::fiber_not_found("tree is empty"))
    }
}

/// Host container element as captured alongside a tree snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostContainer {
    /// Element identifier (e.g. `"app"`)
    pub id: String,

    /// Own property names of the element
    #[serde(default)]
    pub properties: Vec<String>,
}

/// A captured container element plus the tree hanging off it.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    container: HostContainer,
    tree: FiberTree,
}

impl SnapshotSource {
    pub fn new(container: HostContainer, tree: FiberTree) -> Self {
        Self { container, tree }
    }

    pub fn from_snapshot(container: HostContainer, snapshot: FiberSnapshot) -> Self {
        Self::new(container, FiberTree::from_snapshot(snapshot))
    }

    pub fn tree(&self) -> &FiberTree {
        &self.tree
    }
}

impl TreeSource for SnapshotSource {
    type Node<'a> = FiberRef<'a>;

    fn root(&self) -> ParseResult<FiberRef<'_>> {
        let key = find_fiber_key(self.container.properties.iter().map(String::as_str))
            .ok_or_else(|| {
                ParseError::fiber_not_found(format!(
                    "no UI tree property on element '{}'",
                    self.container.id
                ))
            })?;
        log::debug!("[SOURCE] Using tree property {}", key);

        self.tree
            .find_by_element(&self.container.id)
            .or_else(|| self.tree.root())
            .ok_or_else(|| ParseError::fiber_not_found("tree is empty"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ParseErrorKind;
    use serde_json::json;

    fn tree() -> FiberTree {
        FiberTree::from_value(json!({
            "tag": 3,
            "children": [ { "type": "div", "element": "app", "key": "app-root" } ]
        }))
        .unwrap()
    }

    #[test]
    fn test_prefix_order_wins_over_property_order() {
        let names = ["__reactInternalInstance$a", "__reactFiber$b"];
        assert_eq!(find_fiber_key(names), Some("__reactFiber$b"));
    }

    #[test]
    fn test_snapshot_source_resolves_container_node() {
        let source = SnapshotSource::new(
            HostContainer {
                id: "app".to_string(),
                properties: vec!["__reactContainer$xyz".to_string()],
            },
            tree(),
        );
        let root = source.root().unwrap();
        assert_eq!(root.key(), Some("app-root"));
    }

    #[test]
    fn test_snapshot_source_without_fiber_key() {
        let source = SnapshotSource::new(
            HostContainer {
                id: "app".to_string(),
                properties: vec!["className".to_string()],
            },
            tree(),
        );
        assert_eq!(source.root().unwrap_err().kind, ParseErrorKind::FiberNotFound);
    }

    #[test]
    fn test_fiber_tree_is_its_own_source() {
        let tree = tree();
        let root = TreeSource::root(&tree).unwrap();
        assert_eq!(root.tag(), 3);
    }
}
