//! Tree traversal engine.
//!
//! Generic searches over any [`UiNode`] tree:
//!
//! - [`traverse_upward`]: walk the parent chain to the first match
//! - [`traverse_downward`]: pre-order depth-first search to the first match
//! - [`collect_nodes`]: pre-order depth-first collection of every match, capped
//!
//! Plus predicate combinators ([`by_type`], [`with_property`],
//! [`with_property_value`], [`all_of`], [`any_of`]).
//!
//! All functions are pure: they only read the tree. Walks use an explicit
//! stack, so long sibling runs and deep subtrees never grow the call stack.
//! Depth counts child links from the starting node; siblings share their
//! depth. Downward walks also stop after [`MAX_VISITS`] nodes, so a node
//! graph whose links loop back on themselves still terminates.

use crate::node::{NodeType, UiNode};
use crate::result::{ParseError, ParseResult};
use serde_json::Value;

/// Default depth bound for [`traverse_upward`] and [`traverse_downward`].
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Default match cap for [`collect_nodes`].
pub const DEFAULT_MAX_NODES: usize = 1000;

/// Hard cap on nodes visited by one downward walk.
pub const MAX_VISITS: usize = 100_000;

/// Boxed node predicate, used to combine heterogeneous predicates.
pub type Predicate<'p, N> = Box<dyn Fn(&N) -> bool + 'p>;

/// Walks the parent chain starting at `node` (depth 0) and returns the first
/// node satisfying `predicate`.
///
/// The depth bound is checked before the predicate at each step: a match at
/// exactly `max_depth` succeeds, one past fails.
///
/// # Errors
///
/// `traversal-failed` when the chain ends without a match, or when the walk
/// goes past `max_depth`. The message tells the two apart.
pub fn traverse_upward<N, P>(node: &N, predicate: P, max_depth: usize) -> ParseResult<N>
where
    N: UiNode,
    P: Fn(&N) -> bool,
{
    let mut current = Some(node.clone());
    let mut depth = 0usize;

    while let Some(candidate) = current {
        if depth > max_depth {
            return Err(ParseError::traversal_failed(format!(
                "upward traversal exceeded max depth {}",
                max_depth
            ))
            .with_context("max_depth", max_depth));
        }
        if predicate(&candidate) {
            return Ok(candidate);
        }
        current = candidate.parent();
        depth += 1;
    }

    Err(
        ParseError::traversal_failed("upward traversal reached the root without a match")
            .with_context("depth", depth),
    )
}

/// Pre-order depth-first search below `node` (the node itself first, then
/// its first-child subtree, then the next sibling). Siblings of `node` itself
/// are not part of the search.
///
/// # Errors
///
/// `traversal-failed` when no node of the bounded subtree matches.
pub fn traverse_downward<N, P>(node: &N, predicate: P, max_depth: usize) -> ParseResult<N>
where
    N: UiNode,
    P: Fn(&N) -> bool,
{
    let mut truncated = false;
    let mut found = None;

    let end = walk(node, |candidate, depth| {
        if depth > max_depth {
            truncated = true;
            return Visit::Prune;
        }
        if predicate(candidate) {
            found = Some(candidate.clone());
            return Visit::Stop;
        }
        Visit::Continue
    });

    match found {
        Some(matched) => Ok(matched),
        None if end == WalkEnd::BudgetSpent => Err(ParseError::traversal_failed(format!(
            "downward traversal visited {} nodes without a match",
            MAX_VISITS
        ))
        .with_context("max_visits", MAX_VISITS)),
        None if truncated => Err(ParseError::traversal_failed(format!(
            "no match within max depth {} below the starting node",
            max_depth
        ))
        .with_context("max_depth", max_depth)),
        None => Err(ParseError::traversal_failed(
            "no matching node in the subtree",
        )),
    }
}

/// Collects every node below `node` (inclusive) that satisfies `predicate`,
/// in pre-order.
///
/// The walk stops entirely once `max_nodes` matches are collected; nodes past
/// that point are never visited. Subtrees deeper than [`DEFAULT_MAX_DEPTH`]
/// are skipped. An empty list is a valid outcome.
pub fn collect_nodes<N, P>(node: &N, predicate: P, max_nodes: usize) -> Vec<N>
where
    N: UiNode,
    P: Fn(&N) -> bool,
{
    let mut matches = Vec::new();
    if max_nodes == 0 {
        return matches;
    }

    let end = walk(node, |candidate, depth| {
        if depth > DEFAULT_MAX_DEPTH {
            return Visit::Prune;
        }
        if predicate(candidate) {
            matches.push(candidate.clone());
            if matches.len() >= max_nodes {
                return Visit::Stop;
            }
        }
        Visit::Continue
    });
    if end == WalkEnd::BudgetSpent {
        log::warn!(
            "[TRAVERSE] Collection stopped after {} visits with {} matches",
            MAX_VISITS,
            matches.len()
        );
    }

    matches
}

enum Visit {
    Continue,
    /// Skip this node's subtree and its later siblings
    Prune,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkEnd {
    Exhausted,
    Stopped,
    BudgetSpent,
}

/// Pre-order walk: node, first-child subtree, next sibling. At most
/// [`MAX_VISITS`] nodes are handed to `visit`.
fn walk<N, F>(start: &N, mut visit: F) -> WalkEnd
where
    N: UiNode,
    F: FnMut(&N, usize) -> Visit,
{
    // (node, depth, follow siblings)
    let mut stack: Vec<(N, usize, bool)> = vec![(start.clone(), 0, false)];
    let mut visits = 0usize;

    while let Some((node, depth, follow_sibling)) = stack.pop() {
        if visits == MAX_VISITS {
            return WalkEnd::BudgetSpent;
        }
        visits += 1;
        match visit(&node, depth) {
            Visit::Stop => return WalkEnd::Stopped,
            Visit::Prune => continue,
            Visit::Continue => {}
        }
        if follow_sibling {
            if let Some(sibling) = node.sibling() {
                stack.push((sibling, depth, true));
            }
        }
        if let Some(child) = node.child() {
            stack.push((child, depth + 1, true));
        }
    }
    WalkEnd::Exhausted
}

/// Matches a host node whose tag equals `name`, or a component whose name or
/// display name equals `name`.
pub fn by_type<N: UiNode>(name: &str) -> impl Fn(&N) -> bool {
    let name = name.to_string();
    move |node: &N| match node.node_type() {
        NodeType::Host(tag) => tag == name,
        NodeType::Component {
            name: component,
            display_name,
        } => display_name == Some(name.as_str()) || component == name,
        NodeType::None => false,
    }
}

/// Matches nodes whose property bag contains `key`.
pub fn with_property<N: UiNode>(key: &str) -> impl Fn(&N) -> bool {
    let key = key.to_string();
    move |node: &N| node.prop(&key).is_some()
}

/// Matches nodes whose property `key` equals `value` exactly.
pub fn with_property_value<N: UiNode>(key: &str, value: Value) -> impl Fn(&N) -> bool {
    let key = key.to_string();
    move |node: &N| node.prop(&key) == Some(&value)
}

/// Matches when every predicate matches, checked left to right.
pub fn all_of<'p, N: UiNode + 'p>(predicates: Vec<Predicate<'p, N>>) -> impl Fn(&N) -> bool + 'p {
    move |node: &N| predicates.iter().all(|predicate| predicate(node))
}

/// Matches when any predicate matches, checked left to right.
pub fn any_of<'p, N: UiNode + 'p>(predicates: Vec<Predicate<'p, N>>) -> impl Fn(&N) -> bool + 'p {
    move |node: &N| predicates.iter().any(|predicate| predicate(node))
}
