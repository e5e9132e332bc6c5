//! Traversal strategies producing the solution key for a question

use crate::tree::{Node, NodeId, Tree};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Maps each node id to its zero-based position in the visit order.
pub type Solution = BTreeMap<NodeId, u32>;

/// The traversal orders a question can ask for.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Traversal {
    PreorderDfs,
    InorderDfs,
    PostorderDfs,
    LevelOrder,
}

impl Traversal {
    pub const ALL: [Traversal; 4] = [
        Traversal::PreorderDfs,
        Traversal::InorderDfs,
        Traversal::PostorderDfs,
        Traversal::LevelOrder,
    ];

    /// Human readable name, used as the question title.
    pub fn title(&self) -> &'static str {
        match self {
            Traversal::PreorderDfs => "Pre order Depth first search",
            Traversal::InorderDfs => "In order Depth first search",
            Traversal::PostorderDfs => "Post order Depth first search",
            Traversal::LevelOrder => "Breadth first search",
        }
    }

    pub fn solve(&self, tree: &Tree) -> Solution {
        let mut order = Visitor::default();
        match self {
            Traversal::PreorderDfs => preorder(tree.root(), &mut order),
            Traversal::InorderDfs => inorder(tree.root(), &mut order),
            Traversal::PostorderDfs => postorder(tree.root(), &mut order),
            Traversal::LevelOrder => level_order(tree.root(), &mut order),
        }
        order.solution
    }
}

/// Node ids sorted by visit index, i.e. the inverse of a solution.
pub fn visit_order(solution: &Solution) -> Vec<NodeId> {
    let mut order: Vec<(u32, NodeId)> = solution.iter().map(|(id, idx)| (*idx, *id)).collect();
    order.sort_unstable();
    order.into_iter().map(|(_, id)| id).collect()
}

#[derive(Default)]
struct Visitor {
    cursor: u32,
    solution: Solution,
}

impl Visitor {
    fn visit(&mut self, node: &Node) {
        self.solution.insert(node.id, self.cursor);
        self.cursor += 1;
    }
}

fn preorder(root: &Node, order: &mut Visitor) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        order.visit(node);
        // Right first so the left subtree is popped first
        stack.extend(node.right());
        stack.extend(node.left());
    }
}

fn inorder(node: &Node, order: &mut Visitor) {
    if let Some(left) = node.left() {
        inorder(left, order);
    }
    order.visit(node);
    if let Some(right) = node.right() {
        inorder(right, order);
    }
}

fn postorder(node: &Node, order: &mut Visitor) {
    if let Some(left) = node.left() {
        postorder(left, order);
    }
    if let Some(right) = node.right() {
        postorder(right, order);
    }
    order.visit(node);
}

fn level_order(root: &Node, order: &mut Visitor) {
    let mut queue = VecDeque::from([root]);
    while let Some(node) = queue.pop_front() {
        order.visit(node);
        queue.extend(node.left());
        queue.extend(node.right());
    }
}
