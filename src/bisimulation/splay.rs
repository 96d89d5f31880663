// Nodes live in a Vec and refer to each other by index.
const NIL: usize = usize::MAX;

#[derive(Debug, Clone)]
struct Node<V> {
    key: f64,
    value: V,
    parent: usize,
    left: usize,
    right: usize,
}

/// Splay tree mapping approximate keys to values.
///
/// Keys that differ by less than the epsilon passed to [`insert`](SplayTree::insert)
/// share one node. Every insertion moves the accessed node to the root,
/// so keys that are hit repeatedly stay close to the top.
#[derive(Debug, Clone)]
pub(crate) struct SplayTree<V> {
    nodes: Vec<Node<V>>,
    root: usize,
}

impl<V: Copy> SplayTree<V> {
    pub(crate) fn new() -> Self {
        SplayTree {
            nodes: Vec::new(),
            root: NIL,
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Remove all nodes, keeping the allocation around for the next use.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = NIL;
    }

    /// Look up the node for `key`, creating one holding `value` if no key within
    /// `epsilon` is present.
    ///
    /// Returns the value stored at the node and whether a new node was created.
    pub(crate) fn insert(&mut self, key: f64, epsilon: f64, value: V) -> (V, bool) {
        let mut x = self.root;
        let mut parent = NIL;
        while x != NIL && (key - self.nodes[x].key).abs() >= epsilon {
            parent = x;
            x = if key < self.nodes[x].key {
                self.nodes[x].left
            } else {
                self.nodes[x].right
            };
        }
        if x != NIL {
            self.splay(x);
            return (self.nodes[x].value, false);
        }

        let new = self.nodes.len();
        self.nodes.push(Node { key, value, parent, left: NIL, right: NIL });
        if parent == NIL {
            self.root = new;
        } else if key < self.nodes[parent].key {
            self.nodes[parent].left = new;
        } else {
            self.nodes[parent].right = new;
        }
        self.splay(new);
        (value, true)
    }

    /// Values of all nodes, in insertion order.
    pub(crate) fn values(&self) -> impl Iterator<Item=V> + '_ {
        self.nodes.iter().map(|node| node.value)
    }

    fn splay(&mut self, x: usize) {
        loop {
            let p = self.nodes[x].parent;
            if p == NIL {
                break;
            }
            let g = self.nodes[p].parent;
            let x_is_left = self.nodes[p].left == x;
            if g == NIL {
                // zig
                if x_is_left {
                    self.rotate_right(p);
                } else {
                    self.rotate_left(p);
                }
                continue;
            }
            let p_is_left = self.nodes[g].left == p;
            match (x_is_left, p_is_left) {
                // zig-zig
                (true, true) => {
                    self.rotate_right(g);
                    self.rotate_right(p);
                },
                (false, false) => {
                    self.rotate_left(g);
                    self.rotate_left(p);
                },
                // zig-zag
                (false, true) => {
                    self.rotate_left(p);
                    self.rotate_right(g);
                },
                (true, false) => {
                    self.rotate_right(p);
                    self.rotate_left(g);
                },
            }
        }
    }

    fn rotate_left(&mut self, x: usize) {
        let y = self.nodes[x].right;
        let inner = self.nodes[y].left;
        self.nodes[x].right = inner;
        if inner != NIL {
            self.nodes[inner].parent = x;
        }
        self.replace_child(x, y);
        self.nodes[y].left = x;
        self.nodes[x].parent = y;
    }

    fn rotate_right(&mut self, x: usize) {
        let y = self.nodes[x].left;
        let inner = self.nodes[y].right;
        self.nodes[x].left = inner;
        if inner != NIL {
            self.nodes[inner].parent = x;
        }
        self.replace_child(x, y);
        self.nodes[y].right = x;
        self.nodes[x].parent = y;
    }

    // Hang `y` where `x` used to be below x's parent
    fn replace_child(&mut self, x: usize, y: usize) {
        let parent = self.nodes[x].parent;
        self.nodes[y].parent = parent;
        if parent == NIL {
            self.root = y;
        } else if self.nodes[parent].left == x {
            self.nodes[parent].left = y;
        } else {
            self.nodes[parent].right = y;
        }
    }
}

impl<V: Copy> Default for SplayTree<V> {
    fn default() -> Self {
        Self::new()
    }
}
