//! Turns the flat comment rows of one post into a reply forest.
//!
//! Nodes live in an arena addressed by position; parent links are resolved to
//! indices in a single pass and the nested output is assembled bottom-up with
//! an explicit stack. Nothing recurses, so neither deep chains nor corrupted
//! parent pointers can exhaust the stack.

use std::collections::HashMap;

use crate::domain::comment::{Comment, CommentNode};

/// Builds the reply forest for `comments`, which are expected in ascending
/// creation order; reply lists keep that order.
///
/// A comment whose parent is missing from the input is treated as a root.
/// Comments on a parent cycle, and everything hanging below one, are not
/// reachable from any root and are left out.
pub fn build_tree(comments: &[Comment]) -> Vec<CommentNode> {
    let mut index: HashMap<i64, usize> = HashMap::with_capacity(comments.len());
    let mut arena: Vec<Option<CommentNode>> = Vec::with_capacity(comments.len());
    let mut parents: Vec<Option<i64>> = Vec::with_capacity(comments.len());

    for comment in comments {
        if index.contains_key(&comment.id) {
            continue;
        }
        index.insert(comment.id, arena.len());
        arena.push(Some(CommentNode::from(comment)));
        parents.push(comment.parent_id);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); arena.len()];
    let mut roots = Vec::new();
    for (idx, parent_id) in parents.iter().enumerate() {
        match parent_id.and_then(|parent_id| index.get(&parent_id)) {
            Some(&parent) => children[parent].push(idx),
            None => roots.push(idx),
        }
    }

    // Pre-order walk from the roots. Every node has a single parent, so a
    // node is pushed at most once and cycle members are never pushed.
    let mut order = Vec::with_capacity(arena.len());
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(idx) = stack.pop() {
        order.push(idx);
        stack.extend(children[idx].iter().rev());
    }

    for &idx in order.iter().rev() {
        let replies: Vec<CommentNode> = children[idx]
            .iter()
            .filter_map(|&child| arena[child].take())
            .collect();
        if let Some(node) = arena[idx].as_mut() {
            node.replies = replies;
        }
    }

    roots
        .into_iter()
        .filter_map(|root| arena[root].take())
        .collect()
}

/// Parent a new reply is stored under when the client asked for `requested`.
///
/// Replying to a reply attaches to that reply's parent instead, so a stored
/// reply never has another reply as its parent.
pub fn capped_parent(requested: &Comment) -> i64 {
    requested.parent_id.unwrap_or(requested.id)
}

/// Flattens a forest back into ids, parents before children.
pub fn flatten_ids(forest: &[CommentNode]) -> Vec<i64> {
    let mut ids = Vec::new();
    let mut stack: Vec<&CommentNode> = forest.iter().rev().collect();
    while let Some(node) = stack.pop() {
        ids.push(node.id);
        stack.extend(node.replies.iter().rev());
    }
    ids
}

/// Number of levels in the forest; zero when empty.
pub fn depth(forest: &[CommentNode]) -> usize {
    let mut deepest = 0;
    let mut stack: Vec<(&CommentNode, usize)> = forest.iter().map(|node| (node, 1)).collect();
    while let Some((node, level)) = stack.pop() {
        deepest = deepest.max(level);
        stack.extend(node.replies.iter().map(|reply| (reply, level + 1)));
    }
    deepest
}
