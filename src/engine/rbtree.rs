//! A red-black tree keyed by byte-wise string ordering.
//!
//! Nodes live in an arena (`Vec<Node>`) and refer to each other by index. Children are owned by
//! the arena slot of their parent only in the logical sense; the `parent` index is a plain
//! back-reference used while rebalancing and while walking to a successor. Slot `0` is a black
//! sentinel standing in for every leaf, which lets the rebalancing code treat leaves like nodes.
//! Slots freed by deletions are recycled by later insertions.
use std::cmp::Ordering;
use std::mem;
use std::ops::Bound;

use super::KvsEngine;
use crate::error::{KvsError, Result};
use tracing::debug;

// index of the sentinel leaf
const NIL: usize = 0;

/// color of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    /// a red node, never the parent of another red node
    Red,
    /// a black node, counted in the black height
    Black,
}

#[derive(Debug, Clone)]
struct Node {
    key: String,
    value: String,
    color: Color,
    parent: usize,
    left: usize,
    right: usize,
}

impl Node {
    fn sentinel() -> Self {
        Node {
            key: String::new(),
            value: String::new(),
            color: Color::Black,
            parent: NIL,
            left: NIL,
            right: NIL,
        }
    }
}

/// A fixed-capacity red-black tree store.
///
/// `get`, `insert` and `remove` are `O(log n)`; iteration yields records in strictly ascending
/// key order.
#[derive(Debug)]
pub struct RbTreeStore {
    // nodes[NIL] is the sentinel
    nodes: Vec<Node>,
    // arena slots released by deletions
    free: Vec<usize>,
    root: usize,
    capacity: usize,
    count: usize,
}

impl RbTreeStore {
    /// creates an empty tree that accepts at most `capacity` records
    pub fn new(capacity: usize) -> Self {
        RbTreeStore {
            nodes: vec![Node::sentinel()],
            free: Vec::new(),
            root: NIL,
            capacity,
            count: 0,
        }
    }

    /// color of the root node, `None` for an empty tree
    pub fn root_color(&self) -> Option<Color> {
        if self.root == NIL {
            None
        } else {
            Some(self.nodes[self.root].color)
        }
    }

    /// A lazy in-order iterator starting at the first key satisfying `start`.
    ///
    /// Passing `Bound::Excluded(last_key)` resumes a traversal right after the last record a
    /// previous iterator returned.
    pub fn range(&self, start: Bound<&str>) -> Range<'_> {
        let next = match start {
            Bound::Unbounded => self.minimum(self.root),
            Bound::Included(from) => self.lower_bound(from, true),
            Bound::Excluded(from) => self.lower_bound(from, false),
        };
        Range { tree: self, next }
    }

    /// Checks every red-black invariant and returns the black height of the tree.
    ///
    /// # Errors
    /// returns [`KvsError::Corrupted`] naming the first violated invariant: a red root, a red node
    /// with a red child, unequal black heights, keys out of order, a broken parent link or a node
    /// count that differs from `len()`.
    pub fn validate(&self) -> Result<usize> {
        if self.nodes[NIL].color != Color::Black {
            return Err(KvsError::Corrupted("sentinel is not black".into()));
        }
        if self.nodes[self.root].color != Color::Black {
            return Err(KvsError::Corrupted("root is red".into()));
        }
        let (nodes, black_height) = self.check_subtree(self.root, NIL, None, None)?;
        if nodes != self.count {
            return Err(KvsError::Corrupted(format!(
                "tree holds {} nodes but count is {}",
                nodes, self.count
            )));
        }
        Ok(black_height)
    }

    fn check_subtree<'a>(
        &'a self,
        x: usize,
        parent: usize,
        lower: Option<&'a str>,
        upper: Option<&'a str>,
    ) -> Result<(usize, usize)> {
        if x == NIL {
            return Ok((0, 1));
        }
        let node = &self.nodes[x];
        if node.parent != parent {
            return Err(KvsError::Corrupted(format!(
                "broken parent link at {}",
                node.key
            )));
        }
        let key = node.key.as_str();
        if lower.map_or(false, |l| key <= l) || upper.map_or(false, |u| key >= u) {
            return Err(KvsError::Corrupted(format!("key {} is out of order", key)));
        }
        if node.color == Color::Red
            && (self.color(node.left) == Color::Red || self.color(node.right) == Color::Red)
        {
            return Err(KvsError::Corrupted(format!(
                "red node {} has a red child",
                key
            )));
        }

        let (left_nodes, left_height) = self.check_subtree(node.left, x, lower, Some(key))?;
        let (right_nodes, right_height) = self.check_subtree(node.right, x, Some(key), upper)?;
        if left_height != right_height {
            return Err(KvsError::Corrupted(format!(
                "black height differs below {} ({} vs {})",
                key, left_height, right_height
            )));
        }
        let own = if node.color == Color::Black { 1 } else { 0 };
        Ok((left_nodes + right_nodes + 1, left_height + own))
    }

    #[cfg(debug_assertions)]
    fn debug_validate(&self) {
        if let Err(e) = self.validate() {
            panic!("red-black invariant violated: {}", e);
        }
    }

    #[cfg(not(debug_assertions))]
    fn debug_validate(&self) {}

    fn color(&self, x: usize) -> Color {
        self.nodes[x].color
    }

    fn left(&self, x: usize) -> usize {
        self.nodes[x].left
    }

    fn right(&self, x: usize) -> usize {
        self.nodes[x].right
    }

    fn parent(&self, x: usize) -> usize {
        self.nodes[x].parent
    }

    fn find(&self, key: &str) -> usize {
        let mut x = self.root;
        while x != NIL {
            match key.cmp(self.nodes[x].key.as_str()) {
                Ordering::Less => x = self.left(x),
                Ordering::Greater => x = self.right(x),
                Ordering::Equal => return x,
            }
        }
        NIL
    }

    // first node whose key is >= `from` (or > `from` when not `inclusive`)
    fn lower_bound(&self, from: &str, inclusive: bool) -> usize {
        let mut candidate = NIL;
        let mut x = self.root;
        while x != NIL {
            let key = self.nodes[x].key.as_str();
            if key > from || (inclusive && key == from) {
                candidate = x;
                x = self.left(x);
            } else {
                x = self.right(x);
            }
        }
        candidate
    }

    fn minimum(&self, mut x: usize) -> usize {
        if x == NIL {
            return NIL;
        }
        while self.left(x) != NIL {
            x = self.left(x);
        }
        x
    }

    fn successor(&self, mut x: usize) -> usize {
        if self.right(x) != NIL {
            return self.minimum(self.right(x));
        }
        let mut y = self.parent(x);
        while y != NIL && x == self.right(y) {
            x = y;
            y = self.parent(y);
        }
        y
    }

    fn alloc(&mut self, key: String, value: String, parent: usize) -> usize {
        let node = Node {
            key,
            value,
            color: Color::Red,
            parent,
            left: NIL,
            right: NIL,
        };
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    // returns the value held by slot `z` and recycles the slot
    fn release(&mut self, z: usize) -> String {
        let node = &mut self.nodes[z];
        node.key.clear();
        node.left = NIL;
        node.right = NIL;
        node.parent = NIL;
        let value = mem::take(&mut node.value);
        self.free.push(z);
        value
    }

    fn rotate_left(&mut self, x: usize) {
        let y = self.right(x);
        let y_left = self.left(y);
        self.nodes[x].right = y_left;
        if y_left != NIL {
            self.nodes[y_left].parent = x;
        }
        let x_parent = self.parent(x);
        self.nodes[y].parent = x_parent;
        if x_parent == NIL {
            self.root = y;
        } else if x == self.left(x_parent) {
            self.nodes[x_parent].left = y;
        } else {
            self.nodes[x_parent].right = y;
        }
        self.nodes[y].left = x;
        self.nodes[x].parent = y;
    }

    fn rotate_right(&mut self, x: usize) {
        let y = self.left(x);
        let y_right = self.right(y);
        self.nodes[x].left = y_right;
        if y_right != NIL {
            self.nodes[y_right].parent = x;
        }
        let x_parent = self.parent(x);
        self.nodes[y].parent = x_parent;
        if x_parent == NIL {
            self.root = y;
        } else if x == self.right(x_parent) {
            self.nodes[x_parent].right = y;
        } else {
            self.nodes[x_parent].left = y;
        }
        self.nodes[y].right = x;
        self.nodes[x].parent = y;
    }

    fn insert_fixup(&mut self, mut z: usize) {
        while self.color(self.parent(z)) == Color::Red {
            let p = self.parent(z);
            let g = self.parent(p);
            if p == self.left(g) {
                let uncle = self.right(g);
                if self.color(uncle) == Color::Red {
                    self.nodes[p].color = Color::Black;
                    self.nodes[uncle].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    z = g;
                } else {
                    if z == self.right(p) {
                        z = p;
                        self.rotate_left(z);
                    }
                    let p = self.parent(z);
                    let g = self.parent(p);
                    self.nodes[p].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    self.rotate_right(g);
                }
            } else {
                let uncle = self.left(g);
                if self.color(uncle) == Color::Red {
                    self.nodes[p].color = Color::Black;
                    self.nodes[uncle].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    z = g;
                } else {
                    if z == self.left(p) {
                        z = p;
                        self.rotate_right(z);
                    }
                    let p = self.parent(z);
                    let g = self.parent(p);
                    self.nodes[p].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    self.rotate_left(g);
                }
            }
        }
        let root = self.root;
        self.nodes[root].color = Color::Black;
    }

    // replaces the subtree rooted at `u` with the one rooted at `v`.
    // `v` may be the sentinel, whose parent is then set so the fix-up can walk upwards.
    fn transplant(&mut self, u: usize, v: usize) {
        let u_parent = self.parent(u);
        if u_parent == NIL {
            self.root = v;
        } else if u == self.left(u_parent) {
            self.nodes[u_parent].left = v;
        } else {
            self.nodes[u_parent].right = v;
        }
        self.nodes[v].parent = u_parent;
    }

    fn delete_node(&mut self, z: usize) {
        let mut removed_color = self.color(z);
        let x;
        if self.left(z) == NIL {
            x = self.right(z);
            self.transplant(z, x);
        } else if self.right(z) == NIL {
            x = self.left(z);
            self.transplant(z, x);
        } else {
            let y = self.minimum(self.right(z));
            removed_color = self.color(y);
            x = self.right(y);
            if self.parent(y) == z {
                self.nodes[x].parent = y;
            } else {
                self.transplant(y, x);
                let z_right = self.right(z);
                self.nodes[y].right = z_right;
                self.nodes[z_right].parent = y;
            }
            self.transplant(z, y);
            let z_left = self.left(z);
            self.nodes[y].left = z_left;
            self.nodes[z_left].parent = y;
            self.nodes[y].color = self.color(z);
        }

        if removed_color == Color::Black {
            self.delete_fixup(x);
        }
        self.nodes[NIL].parent = NIL;
    }

    fn delete_fixup(&mut self, mut x: usize) {
        while x != self.root && self.color(x) == Color::Black {
            let p = self.parent(x);
            if x == self.left(p) {
                let mut w = self.right(p);
                if self.color(w) == Color::Red {
                    self.nodes[w].color = Color::Black;
                    self.nodes[p].color = Color::Red;
                    self.rotate_left(p);
                    w = self.right(self.parent(x));
                }
                if self.color(self.left(w)) == Color::Black
                    && self.color(self.right(w)) == Color::Black
                {
                    self.nodes[w].color = Color::Red;
                    x = self.parent(x);
                } else {
                    if self.color(self.right(w)) == Color::Black {
                        let w_left = self.left(w);
                        self.nodes[w_left].color = Color::Black;
                        self.nodes[w].color = Color::Red;
                        self.rotate_right(w);
                        w = self.right(self.parent(x));
                    }
                    let p = self.parent(x);
                    self.nodes[w].color = self.color(p);
                    self.nodes[p].color = Color::Black;
                    let w_right = self.right(w);
                    self.nodes[w_right].color = Color::Black;
                    self.rotate_left(p);
                    x = self.root;
                }
            } else {
                let mut w = self.left(p);
                if self.color(w) == Color::Red {
                    self.nodes[w].color = Color::Black;
                    self.nodes[p].color = Color::Red;
                    self.rotate_right(p);
                    w = self.left(self.parent(x));
                }
                if self.color(self.right(w)) == Color::Black
                    && self.color(self.left(w)) == Color::Black
                {
                    self.nodes[w].color = Color::Red;
                    x = self.parent(x);
                } else {
                    if self.color(self.left(w)) == Color::Black {
                        let w_right = self.right(w);
                        self.nodes[w_right].color = Color::Black;
                        self.nodes[w].color = Color::Red;
                        self.rotate_left(w);
                        w = self.left(self.parent(x));
                    }
                    let p = self.parent(x);
                    self.nodes[w].color = self.color(p);
                    self.nodes[p].color = Color::Black;
                    let w_left = self.left(w);
                    self.nodes[w_left].color = Color::Black;
                    self.rotate_right(p);
                    x = self.root;
                }
            }
        }
        self.nodes[x].color = Color::Black;
    }
}

impl KvsEngine for RbTreeStore {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn len(&self) -> usize {
        self.count
    }

    fn get(&self, key: &str) -> Option<&str> {
        match self.find(key) {
            NIL => None,
            x => Some(self.nodes[x].value.as_str()),
        }
    }

    fn insert(&mut self, key: String, value: String) -> Result<()> {
        let mut parent = NIL;
        let mut go_left = false;
        let mut x = self.root;
        while x != NIL {
            parent = x;
            match key.as_str().cmp(self.nodes[x].key.as_str()) {
                Ordering::Less => {
                    go_left = true;
                    x = self.left(x);
                }
                Ordering::Greater => {
                    go_left = false;
                    x = self.right(x);
                }
                Ordering::Equal => return Err(KvsError::KeyExists),
            }
        }
        if self.count >= self.capacity {
            debug!(capacity = self.capacity, "rbtree store rejected {}", &key);
            return Err(KvsError::StoreFull);
        }

        let z = self.alloc(key, value, parent);
        if parent == NIL {
            self.root = z;
        } else if go_left {
            self.nodes[parent].left = z;
        } else {
            self.nodes[parent].right = z;
        }
        self.insert_fixup(z);
        self.count += 1;
        self.debug_validate();
        Ok(())
    }

    fn update(&mut self, key: &str, value: String) -> Result<String> {
        match self.find(key) {
            NIL => Err(KvsError::KeyNotFound),
            x => Ok(mem::replace(&mut self.nodes[x].value, value)),
        }
    }

    fn remove(&mut self, key: &str) -> Result<String> {
        let z = self.find(key);
        if z == NIL {
            return Err(KvsError::KeyNotFound);
        }
        self.delete_node(z);
        self.count -= 1;
        let value = self.release(z);
        self.debug_validate();
        Ok(value)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_> {
        Box::new(self.range(Bound::Unbounded))
    }

    fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[NIL] = Node::sentinel();
        self.free.clear();
        self.root = NIL;
        self.count = 0;
    }
}

/// In-order iterator over a [`RbTreeStore`], see [`RbTreeStore::range`]
#[derive(Debug, Clone)]
pub struct Range<'a> {
    tree: &'a RbTreeStore,
    next: usize,
}

impl<'a> Iterator for Range<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next == NIL {
            return None;
        }
        let tree = self.tree;
        let current = self.next;
        self.next = tree.successor(current);
        let node = &tree.nodes[current];
        Some((node.key.as_str(), node.value.as_str()))
    }
}
