//! Index arena holding the branches of one inverse-kinematics solve.
//!
//! Every node stores one joint angle and the index of its parent. A path
//! from the root to a leaf at depth [`TREE_DEPTH`] is one complete joint
//! candidate; leaves above that depth are branches whose deeper joints were
//! all pruned. The arena is cleared, not dropped, between solves.

/// Depth of a complete candidate: one node per leg joint.
pub const TREE_DEPTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy)]
struct SolutionNode {
    angle: f64,
    parent: Option<NodeId>,
    depth: usize,
    has_children: bool,
}

#[derive(Debug, Default)]
pub struct SolutionTree {
    nodes: Vec<SolutionNode>,
}

impl SolutionTree {
    pub fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(64),
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_root(&mut self, angle: f64) -> NodeId {
        self.push(SolutionNode {
            angle,
            parent: None,
            depth: 1,
            has_children: false,
        })
    }

    pub fn add_child(&mut self, parent: NodeId, angle: f64) -> NodeId {
        let depth = self.nodes[parent.0].depth + 1;
        self.nodes[parent.0].has_children = true;
        self.push(SolutionNode {
            angle,
            parent: Some(parent),
            depth,
            has_children: false,
        })
    }

    pub fn angle(&self, id: NodeId) -> f64 {
        self.nodes[id.0].angle
    }

    /// Root-to-leaf angle sequences of full depth, in leaf insertion order.
    pub fn complete_paths(&self) -> impl Iterator<Item = [f64; TREE_DEPTH]> + '_ {
        self.nodes
            .iter()
            .filter(|node| !node.has_children && node.depth == TREE_DEPTH)
            .map(move |leaf| {
                let mut path = [0.0; TREE_DEPTH];
                let mut node = *leaf;
                loop {
                    path[node.depth - 1] = node.angle;
                    match node.parent {
                        Some(parent) => node = self.nodes[parent.0],
                        None => break,
                    }
                }
                path
            })
    }

    /// Number of leaves that stop short of a full candidate.
    pub fn pruned_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| !node.has_children && node.depth < TREE_DEPTH)
            .count()
    }

    fn push(&mut self, node: SolutionNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(tree: &mut SolutionTree, from: NodeId, angles: &[f64]) -> NodeId {
        angles
            .iter()
            .fold(from, |parent, angle| tree.add_child(parent, *angle))
    }

    #[test]
    fn full_paths_are_collected_root_first() {
        let mut tree = SolutionTree::new();
        let root = tree.add_root(0.1);
        let knee = tree.add_child(root, 0.2);
        chain(&mut tree, knee, &[0.3, 0.4, 0.5, 0.6]);
        chain(&mut tree, knee, &[-0.3, -0.4, -0.5, -0.6]);

        let paths: Vec<_> = tree.complete_paths().collect();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0], [0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        assert_eq!(paths[1], [0.1, 0.2, -0.3, -0.4, -0.5, -0.6]);
    }

    #[test]
    fn short_branches_are_discarded() {
        let mut tree = SolutionTree::new();
        let root = tree.add_root(0.0);
        chain(&mut tree, root, &[1.0, 2.0]);
        chain(&mut tree, root, &[1.0, 2.0, 3.0, 4.0, 5.0]);

        assert_eq!(tree.complete_paths().count(), 1);
        assert_eq!(tree.pruned_leaves(), 1);
    }

    #[test]
    fn clear_reuses_the_arena() {
        let mut tree = SolutionTree::new();
        let root = tree.add_root(0.0);
        tree.add_child(root, 1.0);
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.complete_paths().count(), 0);
    }
}
