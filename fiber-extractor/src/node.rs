//! UI node model.
//!
//! The extraction core reads a tree of rendered UI nodes that it does not own.
//! [`UiNode`] is the read-only view the traversal engine and extraction
//! pipeline need: type descriptor, key, property bag, and the
//! parent / first-child / next-sibling links. Handles are cheap to clone; the
//! core never creates or frees nodes.
//!
//! [`FiberTree`] is an arena-backed implementation loaded from a nested JSON
//! snapshot. Links are derived on load, so a snapshot is always a proper tree.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type descriptor of a node, borrowed from the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType<'a> {
    /// Plain string tag for host elements (e.g. `"div"`)
    Host(&'a str),
    /// Function component with its name and optional display name
    Component {
        name: &'a str,
        display_name: Option<&'a str>,
    },
    /// No type (root containers, text nodes, ...)
    None,
}

/// Read-only access to a node of an externally owned UI tree.
pub trait UiNode: Clone {
    /// Numeric work tag assigned by the host renderer
    fn tag(&self) -> u32;

    fn node_type(&self) -> NodeType<'_>;

    fn key(&self) -> Option<&str>;

    /// Opaque property bag, usually a JSON object
    fn props(&self) -> Option<&Value>;

    /// Opaque internal state
    fn state(&self) -> Option<&Value>;

    /// Identifier of the host-document element backing this node, if any
    fn element(&self) -> Option<&str>;

    fn parent(&self) -> Option<Self>;

    fn child(&self) -> Option<Self>;

    fn sibling(&self) -> Option<Self>;

    /// Position among siblings (0-based)
    fn index(&self) -> usize;

    /// Looks up a single entry in the property bag.
    fn prop(&self, key: &str) -> Option<&Value> {
        self.props().and_then(|props| props.get(key))
    }
}

/// Owned type descriptor as it appears in a snapshot.
///
/// A plain string is a host tag; an object is a component descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeDescriptor {
    Host(String),
    Component {
        #[serde(default)]
        name: String,
        #[serde(default, rename = "displayName", skip_serializing_if = "Option::is_none")]
        display_name: Option<String>,
    },
}

/// One node of a nested JSON tree snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FiberSnapshot {
    #[serde(default)]
    pub tag: u32,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<TypeDescriptor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(default)]
    pub props: Value,

    #[serde(default)]
    pub state: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FiberSnapshot>,
}

#[derive(Debug, Clone)]
struct FiberData {
    tag: u32,
    node_type: Option<TypeDescriptor>,
    key: Option<String>,
    props: Value,
    state: Value,
    element: Option<String>,
    parent: Option<usize>,
    child: Option<usize>,
    sibling: Option<usize>,
    index: usize,
}

/// Arena holding a tree loaded from a snapshot. Node 0 is the root.
#[derive(Debug, Clone, Default)]
pub struct FiberTree {
    nodes: Vec<FiberData>,
}

impl FiberTree {
    /// Flattens a nested snapshot into the arena.
    pub fn from_snapshot(snapshot: FiberSnapshot) -> Self {
        let mut tree = FiberTree { nodes: Vec::new() };
        tree.insert(snapshot, None, 0);
        tree
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let snapshot: FiberSnapshot = serde_json::from_value(value)?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let snapshot: FiberSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot))
    }

    fn insert(&mut self, snapshot: FiberSnapshot, parent: Option<usize>, index: usize) -> usize {
        let id = self.nodes.len();
        self.nodes.push(FiberData {
            tag: snapshot.tag,
            node_type: snapshot.node_type,
            key: snapshot.key,
            props: snapshot.props,
            state: snapshot.state,
            element: snapshot.element,
            parent,
            child: None,
            sibling: None,
            index,
        });

        let mut previous: Option<usize> = None;
        for (position, child) in snapshot.children.into_iter().enumerate() {
            let child_id = self.insert(child, Some(id), position);
            match previous {
                Some(prev) => self.nodes[prev].sibling = Some(child_id),
                None => self.nodes[id].child = Some(child_id),
            }
            previous = Some(child_id);
        }

        id
    }

    pub fn root(&self) -> Option<FiberRef<'_>> {
        self.get(0)
    }

    pub fn get(&self, id: usize) -> Option<FiberRef<'_>> {
        if id < self.nodes.len() {
            Some(FiberRef { tree: self, id })
        } else {
            None
        }
    }

    /// Finds the node backed by the given host-document element.
    pub fn find_by_element(&self, element: &str) -> Option<FiberRef<'_>> {
        self.nodes
            .iter()
            .position(|node| node.element.as_deref() == Some(element))
            .map(|id| FiberRef { tree: self, id })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Borrowed handle to a node inside a [`FiberTree`].
#[derive(Debug, Clone, Copy)]
pub struct FiberRef<'a> {
    tree: &'a FiberTree,
    id: usize,
}

impl<'a> FiberRef<'a> {
    /// Arena index of this node.
    pub fn id(&self) -> usize {
        self.id
    }

    fn data(&self) -> &'a FiberData {
        &self.tree.nodes[self.id]
    }

    fn at(&self, id: Option<usize>) -> Option<FiberRef<'a>> {
        id.map(|id| FiberRef {
            tree: self.tree,
            id,
        })
    }
}

impl PartialEq for FiberRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for FiberRef<'_> {}

impl UiNode for FiberRef<'_> {
    fn tag(&self) -> u32 {
        self.data().tag
    }

    fn node_type(&self) -> NodeType<'_> {
        match &self.data().node_type {
            Some(TypeDescriptor::Host(tag)) => NodeType::Host(tag),
            Some(TypeDescriptor::Component { name, display_name }) => NodeType::Component {
                name,
                display_name: display_name.as_deref(),
            },
            None => NodeType::None,
        }
    }

    fn key(&self) -> Option<&str> {
        self.data().key.as_deref()
    }

    fn props(&self) -> Option<&Value> {
        match &self.data().props {
            Value::Null => None,
            props => Some(props),
        }
    }

    fn state(&self) -> Option<&Value> {
        match &self.data().state {
            Value::Null => None,
            state => Some(state),
        }
    }

    fn element(&self) -> Option<&str> {
        self.data().element.as_deref()
    }

    fn parent(&self) -> Option<Self> {
        self.at(self.data().parent)
    }

    fn child(&self) -> Option<Self> {
        self.at(self.data().child)
    }

    fn sibling(&self) -> Option<Self> {
        self.at(self.data().sibling)
    }

    fn index(&self) -> usize {
        self.data().index
    }
}
