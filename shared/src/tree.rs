//! Random binary trees used as puzzle content

use serde::{Deserialize, Serialize};

pub type NodeId = u32;

/// A node of a generated tree. Children are owned by their parent.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "leftChild")]
    pub left: Option<Box<Node>>,
    #[serde(rename = "rightChild")]
    pub right: Option<Box<Node>>,
}

impl Node {
    pub fn leaf(id: NodeId) -> Self {
        Self {
            id,
            left: None,
            right: None,
        }
    }

    pub fn left(&self) -> Option<&Node> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&Node> {
        self.right.as_deref()
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tree {
    pub root: Node,
    pub max_depth: u32,
}

impl Tree {
    /// Generates a tree level by level, breadth first.
    ///
    /// Every node at `level < max_depth` spawns a left and then a right child,
    /// each independently when `random() < 1 / (level + 1)`. Ids are handed out
    /// in breadth-first order starting at 0 for the root. `random` must return
    /// values in `[0, 1)`.
    pub fn generate(max_depth: u32, mut random: impl FnMut() -> f64) -> Self {
        // children[id] = (left, right) of node `id`
        let mut children: Vec<(Option<NodeId>, Option<NodeId>)> = vec![(None, None)];
        let mut active: Vec<NodeId> = vec![0];

        // The last level (level == max_depth) never branches
        for level in 0..max_depth {
            let threshold = 1.0 / (level as f64 + 1.0);
            let mut next_level = Vec::new();

            for &id in &active {
                if random() < threshold {
                    let child = children.len() as NodeId;
                    children.push((None, None));
                    children[id as usize].0 = Some(child);
                    next_level.push(child);
                }
                if random() < threshold {
                    let child = children.len() as NodeId;
                    children.push((None, None));
                    children[id as usize].1 = Some(child);
                    next_level.push(child);
                }
            }

            if next_level.is_empty() {
                break;
            }
            active = next_level;
        }

        Self {
            root: build_node(0, &children),
            max_depth,
        }
    }

    /// Wraps an existing root, e.g. a hand-built fixture.
    pub fn from_root(root: Node) -> Self {
        let max_depth = depth(&root);
        Self { root, max_depth }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn node_count(&self) -> usize {
        count(&self.root)
    }

    /// Number of edges on the longest root-to-leaf path.
    pub fn depth(&self) -> u32 {
        depth(&self.root)
    }

    /// All node ids in breadth-first order.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(self.node_count());
        let mut queue = std::collections::VecDeque::from([&self.root]);
        while let Some(node) = queue.pop_front() {
            ids.push(node.id);
            queue.extend(node.left());
            queue.extend(node.right());
        }
        ids
    }
}

fn build_node(id: NodeId, children: &[(Option<NodeId>, Option<NodeId>)]) -> Node {
    let (left, right) = children[id as usize];
    Node {
        id,
        left: left.map(|child| Box::new(build_node(child, children))),
        right: right.map(|child| Box::new(build_node(child, children))),
    }
}

fn count(node: &Node) -> usize {
    1 + node.left().map_or(0, count) + node.right().map_or(0, count)
}

fn depth(node: &Node) -> u32 {
    if node.is_leaf() {
        return 0;
    }
    1 + node.left().map_or(0, depth).max(node.right().map_or(0, depth))
}
