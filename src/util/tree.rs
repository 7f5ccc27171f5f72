/// An ordered tree whose nodes are stored in preorder. A node is named by
/// its position in that order; the root is node `0`.
///
/// Nodes are appended with `push`, which keeps the order as long as every
/// subtree is completed before the next sibling is started.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tree<V> {
    nodes: Vec<Node<V>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Node<V> {
    value: V,
    parent: Option<usize>,
    children: Vec<usize>,
}

impl<V> Tree<V> {
    pub fn new() -> Self {
        Tree { nodes: Vec::new() }
    }

    /// Appends `value` as the last child of `parent`, or as the root.
    pub fn push(&mut self, parent: Option<usize>, value: V) -> usize {
        debug_assert!(
            parent.map_or(self.nodes.is_empty(), |p| p < self.nodes.len()),
            "nodes are pushed in preorder"
        );
        let node = self.nodes.len();
        if let Some(p) = parent {
            self.nodes[p].children.push(node);
        }
        self.nodes.push(Node {
            value,
            parent,
            children: Vec::new(),
        });
        node
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<&V> {
        self.value(0)
    }

    pub fn value(&self, node: usize) -> Option<&V> {
        self.nodes.get(node).map(|n| &n.value)
    }

    pub fn children(&self, node: usize) -> &[usize] {
        match self.nodes.get(node) {
            Some(n) => &n.children,
            None => &[],
        }
    }

    /// All values in preorder.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.nodes.iter().map(|n| &n.value)
    }

    /// Nodes without children, from left to right.
    pub fn leaves(&self) -> impl Iterator<Item = (usize, &V)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.children.is_empty())
            .map(|(i, n)| (i, &n.value))
    }

    /// The Gorn address of `node`: the root is at `[]`, the `i`-th child of
    /// the node at `a` is at `a ++ [i]`.
    pub fn address(&self, node: usize) -> Vec<usize> {
        let mut address = Vec::new();
        let mut current = node;
        while let Some(parent) = self.nodes.get(current).and_then(|n| n.parent) {
            let position = self.nodes[parent]
                .children
                .iter()
                .position(|&c| c == current)
                .unwrap_or(0);
            address.push(position);
            current = parent;
        }
        address.reverse();
        address
    }
}

impl<V> Default for Tree<V> {
    fn default() -> Self {
        Tree::new()
    }
}
