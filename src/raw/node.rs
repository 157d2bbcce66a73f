use core::cmp::Ordering;

use smallvec::SmallVec;

use super::handle::Handle;

#[cfg(test)]
pub(crate) const ORDER: usize = 16;
#[cfg(not(test))]
pub(crate) const ORDER: usize = 128;

pub(crate) const MAX_CHILDREN: usize = ORDER;
pub(crate) const MIN_CHILDREN: usize = ORDER.div_ceil(2);
pub(crate) const MAX_KEYS: usize = MAX_CHILDREN - 1;
pub(crate) const MIN_INTERNAL_KEYS: usize = MIN_CHILDREN - 1;
pub(crate) const MIN_LEAF_KEYS: usize = MAX_KEYS.div_ceil(2);

/// A node of an index tree. Node handles point into the index's node arena; every other
/// handle stored here (leaf entries, separators) points into the queue's entry arena.
#[derive(Clone)]
pub(crate) enum Node {
    Internal(InternalNode),
    Leaf(LeafNode),
}

// B+Tree: internal nodes route by separator entries.
#[derive(Clone)]
pub(crate) struct InternalNode {
    // separators[i] is always the exact greatest entry of children[i], so it stays a live handle.
    // +1 allows for more ergonomic split operations.
    separators: SmallVec<[Handle; MAX_KEYS + 1]>,
    children: SmallVec<[Handle; MAX_CHILDREN + 1]>,
}

// B+Tree: leaves hold the ordered entry handles and a doubly linked chain.
#[derive(Clone)]
pub(crate) struct LeafNode {
    prev: Option<Handle>,
    next: Option<Handle>,
    // +1 allows for more ergonomic split operations.
    entries: SmallVec<[Handle; MAX_KEYS + 1]>,
}

impl Node {
    /// Returns the leaf node, panicking if this is not a leaf.
    pub(crate) fn as_leaf(&self) -> &LeafNode {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the leaf node mutably, panicking if this is not a leaf.
    pub(crate) fn as_leaf_mut(&mut self) -> &mut LeafNode {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the internal node, panicking if this is not internal.
    pub(crate) fn as_internal(&self) -> &InternalNode {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }

    /// Returns the internal node mutably, panicking if this is not internal.
    pub(crate) fn as_internal_mut(&mut self) -> &mut InternalNode {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }
}

impl InternalNode {
    pub(crate) fn new() -> Self {
        Self {
            separators: SmallVec::new(),
            children: SmallVec::new(),
        }
    }

    pub(crate) fn separator_count(&self) -> usize {
        self.separators.len()
    }

    pub(crate) fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Returns true if this node is below minimum capacity and needs rebalancing.
    pub(crate) fn is_at_minimum(&self) -> bool {
        self.separators.len() < MIN_INTERNAL_KEYS
    }

    /// Returns true if this node can lend a child to a sibling.
    pub(crate) fn can_lend(&self) -> bool {
        self.separators.len() > MIN_INTERNAL_KEYS
    }

    #[inline]
    pub(crate) fn separator(&self, index: usize) -> Handle {
        self.separators[index]
    }

    #[cfg(test)]
    pub(crate) fn separators(&self) -> &[Handle] {
        &self.separators
    }

    #[inline]
    pub(crate) fn child(&self, index: usize) -> Handle {
        self.children[index]
    }

    /// Picks the child to descend into: the first whose greatest entry does not compare
    /// `Less` than the probe, or the last child if every separator does.
    #[inline]
    pub(crate) fn search_child<F>(&self, probe: &mut F) -> usize
    where
        F: FnMut(Handle) -> Ordering,
    {
        self.separators.partition_point(|&separator| probe(separator) == Ordering::Less)
    }

    /// Inserts `child` right after `children[index]`, with `separator` as the new bound of
    /// `children[index]`.
    pub(crate) fn insert_child(&mut self, index: usize, separator: Handle, child: Handle) {
        self.separators.insert(index, separator);
        self.children.insert(index + 1, child);
    }

    /// Removes `separators[index]` and `children[index + 1]`.
    pub(crate) fn remove_child(&mut self, index: usize) -> (Handle, Handle) {
        let separator = self.separators.remove(index);
        let child = self.children.remove(index + 1);
        (separator, child)
    }

    pub(crate) fn push_child(&mut self, separator: Handle, child: Handle) {
        self.separators.push(separator);
        self.children.push(child);
    }

    pub(crate) fn push_child_front(&mut self, child: Handle, separator: Handle) {
        self.separators.insert(0, separator);
        self.children.insert(0, child);
    }

    /// Sets the first child (before any separators).
    pub(crate) fn set_first_child(&mut self, child: Handle) {
        if self.children.is_empty() {
            self.children.push(child);
        } else {
            self.children[0] = child;
        }
    }

    pub(crate) fn set_separator(&mut self, index: usize, separator: Handle) {
        self.separators[index] = separator;
    }

    /// Pops the last child together with the separator bounding its left neighbour.
    pub(crate) fn pop_child(&mut self) -> Option<(Handle, Handle)> {
        let separator = self.separators.pop()?;
        let child = self.children.pop()?;
        Some((separator, child))
    }

    /// Pops the first child together with its own separator.
    pub(crate) fn pop_child_front(&mut self) -> Option<(Handle, Handle)> {
        if self.separators.is_empty() {
            None
        } else {
            let separator = self.separators.remove(0);
            let child = self.children.remove(0);
            Some((child, separator))
        }
    }

    /// Splits this node at the midpoint. Returns (`median`, `new_node`), where `median` is the
    /// greatest entry left behind in `self`.
    pub(crate) fn split(&mut self) -> (Handle, InternalNode) {
        let mid = self.separators.len() / 2;

        let mut right = InternalNode::new();
        right.separators = self.separators.drain(mid + 1..).collect();
        right.children = self.children.drain(mid + 1..).collect();

        let median = self.separators.pop().expect("`InternalNode::split()` - node has no separators!");
        (median, right)
    }

    /// Merges with a right sibling, given the separator between them from the parent.
    pub(crate) fn merge_with_right(&mut self, separator: Handle, mut right: InternalNode) {
        self.separators.push(separator);
        self.separators.append(&mut right.separators);
        self.children.append(&mut right.children);
    }
}

impl LeafNode {
    pub(crate) fn new() -> Self {
        Self {
            prev: None,
            next: None,
            entries: SmallVec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if this node is below minimum capacity and needs rebalancing.
    pub(crate) fn is_at_minimum(&self) -> bool {
        self.entries.len() < MIN_LEAF_KEYS
    }

    /// Returns true if this node can lend an entry to a sibling without going below minimum.
    pub(crate) fn can_lend(&self) -> bool {
        self.entries.len() > MIN_LEAF_KEYS
    }

    pub(crate) fn prev(&self) -> Option<Handle> {
        self.prev
    }

    pub(crate) fn set_prev(&mut self, prev: Option<Handle>) {
        self.prev = prev;
    }

    pub(crate) fn next(&self) -> Option<Handle> {
        self.next
    }

    pub(crate) fn set_next(&mut self, next: Option<Handle>) {
        self.next = next;
    }

    #[inline]
    pub(crate) fn entry(&self, index: usize) -> Handle {
        self.entries[index]
    }

    pub(crate) fn entries(&self) -> &[Handle] {
        &self.entries
    }

    pub(crate) fn last_entry(&self) -> Option<Handle> {
        self.entries.last().copied()
    }

    /// Position of the first entry that does not compare `Less` than the probe.
    #[inline]
    pub(crate) fn search<F>(&self, probe: &mut F) -> usize
    where
        F: FnMut(Handle) -> Ordering,
    {
        self.entries.partition_point(|&entry| probe(entry) == Ordering::Less)
    }

    pub(crate) fn insert(&mut self, index: usize, entry: Handle) {
        self.entries.insert(index, entry);
    }

    pub(crate) fn remove(&mut self, index: usize) -> Handle {
        self.entries.remove(index)
    }

    pub(crate) fn push(&mut self, entry: Handle) {
        self.entries.push(entry);
    }

    pub(crate) fn push_front(&mut self, entry: Handle) {
        self.entries.insert(0, entry);
    }

    pub(crate) fn pop(&mut self) -> Option<Handle> {
        self.entries.pop()
    }

    pub(crate) fn pop_front(&mut self) -> Option<Handle> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    /// Splits this leaf at the midpoint. Returns (`separator`, `new_node`), where `separator`
    /// is the last entry left in `self`.
    pub(crate) fn split(&mut self) -> (Handle, LeafNode) {
        let mid = self.entries.len() / 2;

        let mut right = LeafNode::new();
        right.entries = self.entries.drain(mid..).collect();

        let separator = self.last_entry().expect("`LeafNode::split()` - leaf is too small to split!");
        (separator, right)
    }

    /// Merges with a right sibling, taking over its `next` link.
    pub(crate) fn merge_with_right(&mut self, mut right: LeafNode) {
        self.entries.append(&mut right.entries);
        self.next = right.next;
    }
}
