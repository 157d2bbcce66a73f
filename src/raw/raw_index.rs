use alloc::vec::Vec;
use core::cmp::Ordering;
use core::iter::FusedIterator;
use core::marker::PhantomData;

use smallvec::SmallVec;

use super::arena::Arena;
use super::entry::Entry;
use super::handle::Handle;
use super::node::{InternalNode, LeafNode, MAX_CHILDREN, MAX_KEYS, Node};
use super::order::Order;

/// A B+tree of entry handles, kept sorted by the order `O`.
///
/// The tree never owns entries. Every comparison goes through the entry arena the caller
/// passes in (or through a caller-supplied probe), which lets two indexes share one arena.
pub(crate) struct RawIndex<O> {
    /// Arena storing all tree nodes.
    nodes: Arena<Node>,
    /// Handle to the root node, if the index is non-empty.
    root: Option<Handle>,
    /// Number of entry handles in the index.
    len: usize,
    /// Leftmost leaf, holding the smallest entry.
    first_leaf: Option<Handle>,
    /// Rightmost leaf, holding the greatest entry.
    last_leaf: Option<Handle>,
    _order: PhantomData<fn() -> O>,
}

/// Path element for tracking traversal during mutations.
struct PathElement {
    /// Handle to the node at this level.
    node: Handle,
    /// Index of the child we descended into.
    child_index: usize,
}

type Path = SmallVec<[PathElement; 16]>;

/// A position within a leaf together with the route that reached it.
///
/// A cursor is only meaningful for the index that produced it, and only until that index is
/// next mutated.
pub(crate) struct Cursor {
    path: Path,
    leaf: Handle,
    index: usize,
}

impl<O> RawIndex<O> {
    pub(crate) const fn new() -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
            len: 0,
            first_leaf: None,
            last_leaf: None,
            _order: PhantomData,
        }
    }

    /// Creates an empty index whose node arena can hold `capacity` entries without growing.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Arena::with_capacity(capacity.div_ceil(MAX_KEYS)),
            ..Self::new()
        }
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.len = 0;
        self.first_leaf = None;
        self.last_leaf = None;
    }

    /// The smallest entry, in O(1).
    pub(crate) fn first(&self) -> Option<Handle> {
        let leaf = self.nodes.get(self.first_leaf?).as_leaf();
        leaf.entries().first().copied()
    }

    /// The greatest entry, in O(1).
    pub(crate) fn last(&self) -> Option<Handle> {
        let leaf = self.nodes.get(self.last_leaf?).as_leaf();
        leaf.last_entry()
    }

    /// Walks the leaf chain in ascending order.
    pub(crate) fn handles(&self) -> Handles<'_> {
        let back_index = self
            .last_leaf
            .map_or(0, |leaf| self.nodes.get(leaf).as_leaf().len().saturating_sub(1));
        Handles {
            nodes: &self.nodes,
            front_leaf: self.first_leaf,
            front_index: 0,
            back_leaf: self.last_leaf,
            back_index,
            remaining: self.len,
        }
    }

    /// Returns the entry under `cursor`, or `None` if the cursor sits past the last entry.
    pub(crate) fn entry_at(&self, cursor: &Cursor) -> Option<Handle> {
        self.nodes.get(cursor.leaf).as_leaf().entries().get(cursor.index).copied()
    }

    /// Returns the entry just before `cursor`, or `None` if the cursor is at the front.
    pub(crate) fn predecessor(&self, cursor: &Cursor) -> Option<Handle> {
        let leaf = self.nodes.get(cursor.leaf).as_leaf();
        match cursor.index.checked_sub(1) {
            Some(index) => Some(leaf.entry(index)),
            None => self.nodes.get(leaf.prev()?).as_leaf().last_entry(),
        }
    }

    /// Descends with `probe`, which reports how a stored entry compares to the sought
    /// position. The cursor lands on the first entry that is not `Less`, which is also the
    /// insertion point for an entry the probe describes. `None` only for an empty index.
    pub(crate) fn seek<F>(&self, mut probe: F) -> Option<Cursor>
    where
        F: FnMut(Handle) -> Ordering,
    {
        let mut current = self.root?;
        let mut path = Path::new();

        loop {
            match self.nodes.get(current) {
                Node::Internal(internal) => {
                    let child_index = internal.search_child(&mut probe);
                    path.push(PathElement {
                        node: current,
                        child_index,
                    });
                    current = internal.child(child_index);
                }
                Node::Leaf(leaf) => {
                    let index = leaf.search(&mut probe);
                    return Some(Cursor {
                        path,
                        leaf: current,
                        index,
                    });
                }
            }
        }
    }

    /// Cursor on the smallest entry. Performs no comparisons.
    pub(crate) fn seek_first(&self) -> Option<Cursor> {
        self.seek_edge(false)
    }

    /// Cursor on the greatest entry. Performs no comparisons.
    pub(crate) fn seek_last(&self) -> Option<Cursor> {
        self.seek_edge(true)
    }

    fn seek_edge(&self, rightmost: bool) -> Option<Cursor> {
        let mut current = self.root?;
        let mut path = Path::new();

        loop {
            match self.nodes.get(current) {
                Node::Internal(internal) => {
                    let child_index = if rightmost { internal.child_count() - 1 } else { 0 };
                    path.push(PathElement {
                        node: current,
                        child_index,
                    });
                    current = internal.child(child_index);
                }
                Node::Leaf(leaf) => {
                    let index = if rightmost { leaf.len().saturating_sub(1) } else { 0 };
                    return Some(Cursor {
                        path,
                        leaf: current,
                        index,
                    });
                }
            }
        }
    }

    /// First entry for which `probe` is not `Less`.
    pub(crate) fn lower_bound<F>(&self, probe: F) -> Option<Handle>
    where
        F: FnMut(Handle) -> Ordering,
    {
        let cursor = self.seek(probe)?;
        self.entry_at(&cursor)
    }

    /// Inserts `entry` at `cursor`, which must come from [`seek`](Self::seek) on this index
    /// with no mutation in between (`None` for an empty index). Performs no comparisons.
    pub(crate) fn insert_at(&mut self, cursor: Option<Cursor>, entry: Handle) {
        let Some(Cursor {
            mut path,
            leaf: leaf_handle,
            index,
        }) = cursor
        else {
            assert!(self.root.is_none(), "`RawIndex::insert_at()` - no cursor for a non-empty index!");
            let mut leaf = LeafNode::new();
            leaf.push(entry);
            let leaf_handle = self.nodes.alloc(Node::Leaf(leaf));
            self.root = Some(leaf_handle);
            self.first_leaf = Some(leaf_handle);
            self.last_leaf = Some(leaf_handle);
            self.len = 1;
            return;
        };

        let leaf = self.nodes.get_mut(leaf_handle).as_leaf_mut();
        leaf.insert(index, entry);
        self.len += 1;

        if leaf.len() > MAX_KEYS {
            self.split_leaf_and_propagate(leaf_handle, &mut path);
        }
    }

    /// Removes and returns the entry under `cursor`. Performs no comparisons.
    pub(crate) fn remove_at(&mut self, cursor: Cursor) -> Handle {
        let Cursor {
            mut path,
            leaf: leaf_handle,
            index,
        } = cursor;

        let leaf = self.nodes.get_mut(leaf_handle).as_leaf_mut();
        let removed = leaf.remove(index);
        let new_last = if index == leaf.len() { leaf.last_entry() } else { None };
        let underflow = leaf.is_at_minimum();
        self.len -= 1;

        if self.len == 0 {
            self.clear();
            return removed;
        }

        // The removed entry was this leaf's maximum, so one ancestor still names it.
        if let Some(new_last) = new_last {
            self.refresh_separator(&path, new_last);
        }

        if underflow && !path.is_empty() {
            self.rebalance_leaf(leaf_handle, &mut path);
        }

        removed
    }

    /// Builds an index from handles already in ascending `O` order, without comparing.
    ///
    /// Leaves and internal nodes are filled evenly, so every non-root node is at or above its
    /// minimum occupancy.
    pub(crate) fn from_sorted(entries: &[Handle]) -> Self {
        let mut index = Self::with_capacity(entries.len());
        if entries.is_empty() {
            return index;
        }

        // (node, greatest entry in its subtree)
        let mut level: Vec<(Handle, Handle)> = Vec::with_capacity(entries.len().div_ceil(MAX_KEYS));
        let mut prev: Option<Handle> = None;

        for chunk in even_chunks(entries, entries.len().div_ceil(MAX_KEYS)) {
            let mut leaf = LeafNode::new();
            leaf.set_prev(prev);
            for &entry in chunk {
                leaf.push(entry);
            }
            let greatest = leaf.last_entry().expect("`RawIndex::from_sorted()` - empty leaf chunk!");
            let handle = index.nodes.alloc(Node::Leaf(leaf));
            if let Some(prev) = prev {
                index.nodes.get_mut(prev).as_leaf_mut().set_next(Some(handle));
            }
            prev = Some(handle);
            level.push((handle, greatest));
        }

        index.first_leaf = level.first().map(|&(handle, _)| handle);
        index.last_leaf = prev;

        while level.len() > 1 {
            let mut parents = Vec::with_capacity(level.len().div_ceil(MAX_CHILDREN));
            for group in even_chunks(&level, level.len().div_ceil(MAX_CHILDREN)) {
                let (&(first, mut greatest), rest) =
                    group.split_first().expect("`RawIndex::from_sorted()` - empty node group!");
                let mut internal = InternalNode::new();
                internal.set_first_child(first);
                for &(child, child_greatest) in rest {
                    internal.push_child(greatest, child);
                    greatest = child_greatest;
                }
                parents.push((index.nodes.alloc(Node::Internal(internal)), greatest));
            }
            level = parents;
        }

        index.root = Some(level[0].0);
        index.len = entries.len();
        index
    }

    /// Points the ancestor separator that named the removed maximum at the leaf's new maximum.
    fn refresh_separator(&mut self, path: &Path, new_last: Handle) {
        for elem in path.iter().rev() {
            let parent = self.nodes.get_mut(elem.node).as_internal_mut();
            if elem.child_index < parent.separator_count() {
                parent.set_separator(elem.child_index, new_last);
                return;
            }
        }
    }

    /// Splits an overfull leaf and propagates splits up the tree as needed.
    fn split_leaf_and_propagate(&mut self, leaf_handle: Handle, path: &mut Path) {
        let leaf = self.nodes.get_mut(leaf_handle).as_leaf_mut();
        let (separator, mut right_leaf) = leaf.split();

        let old_next = leaf.next();
        right_leaf.set_prev(Some(leaf_handle));
        right_leaf.set_next(old_next);

        let right_handle = self.nodes.alloc(Node::Leaf(right_leaf));
        self.nodes.get_mut(leaf_handle).as_leaf_mut().set_next(Some(right_handle));

        if let Some(old_next) = old_next {
            self.nodes.get_mut(old_next).as_leaf_mut().set_prev(Some(right_handle));
        }

        if self.last_leaf == Some(leaf_handle) {
            self.last_leaf = Some(right_handle);
        }

        self.propagate_split(path, separator, right_handle);
    }

    /// Inserts a new right sibling into each ancestor until one has room, growing a new root
    /// if the split reaches the top.
    fn propagate_split(&mut self, path: &mut Path, mut separator: Handle, mut new_child: Handle) {
        while let Some(elem) = path.pop() {
            let parent = self.nodes.get_mut(elem.node).as_internal_mut();
            parent.insert_child(elem.child_index, separator, new_child);

            if parent.separator_count() <= MAX_KEYS {
                return;
            }

            let (median, right_internal) = parent.split();
            separator = median;
            new_child = self.nodes.alloc(Node::Internal(right_internal));
        }

        let old_root = self.root.expect("`RawIndex::propagate_split()` - split without a root!");
        let mut new_root = InternalNode::new();
        new_root.set_first_child(old_root);
        new_root.push_child(separator, new_child);
        self.root = Some(self.nodes.alloc(Node::Internal(new_root)));
    }

    /// Rebalances a leaf after a removal caused it to underflow.
    fn rebalance_leaf(&mut self, leaf_handle: Handle, path: &mut Path) {
        let parent_elem = path.last().expect("`RawIndex::rebalance_leaf()` - leaf has no parent!");
        let parent_handle = parent_elem.node;
        let child_idx = parent_elem.child_index;

        let parent = self.nodes.get(parent_handle).as_internal();

        if child_idx > 0 {
            let left_handle = parent.child(child_idx - 1);
            if self.nodes.get(left_handle).as_leaf().can_lend() {
                self.borrow_from_left_leaf(leaf_handle, left_handle, parent_handle, child_idx);
                return;
            }
        }

        if child_idx + 1 < parent.child_count() {
            let right_handle = parent.child(child_idx + 1);
            if self.nodes.get(right_handle).as_leaf().can_lend() {
                self.borrow_from_right_leaf(leaf_handle, right_handle, parent_handle, child_idx);
                return;
            }
        }

        if child_idx > 0 {
            let left_handle = parent.child(child_idx - 1);
            self.merge_leaves(left_handle, leaf_handle, path, child_idx - 1);
        } else {
            let right_handle = parent.child(child_idx + 1);
            self.merge_leaves(leaf_handle, right_handle, path, child_idx);
        }
    }

    /// Moves the left sibling's greatest entry to the front of `leaf_handle`.
    fn borrow_from_left_leaf(&mut self, leaf_handle: Handle, left_handle: Handle, parent_handle: Handle, child_idx: usize) {
        let left = self.nodes.get_mut(left_handle).as_leaf_mut();
        let moved = left.pop().expect("`RawIndex::borrow_from_left_leaf()` - empty sibling!");
        let left_last = left.last_entry().expect("`RawIndex::borrow_from_left_leaf()` - sibling drained!");

        self.nodes.get_mut(leaf_handle).as_leaf_mut().push_front(moved);
        self.nodes.get_mut(parent_handle).as_internal_mut().set_separator(child_idx - 1, left_last);
    }

    /// Moves the right sibling's smallest entry to the back of `leaf_handle`.
    fn borrow_from_right_leaf(&mut self, leaf_handle: Handle, right_handle: Handle, parent_handle: Handle, child_idx: usize) {
        let right = self.nodes.get_mut(right_handle).as_leaf_mut();
        let moved = right.pop_front().expect("`RawIndex::borrow_from_right_leaf()` - empty sibling!");

        self.nodes.get_mut(leaf_handle).as_leaf_mut().push(moved);
        // The borrowed entry is the new maximum of `leaf_handle`.
        self.nodes.get_mut(parent_handle).as_internal_mut().set_separator(child_idx, moved);
    }

    /// Folds `right_handle` into `left_handle` and drops it from the parent.
    fn merge_leaves(&mut self, left_handle: Handle, right_handle: Handle, path: &mut Path, separator_idx: usize) {
        let Node::Leaf(right) = self.nodes.take(right_handle) else {
            panic!("expected leaf node");
        };

        let left = self.nodes.get_mut(left_handle).as_leaf_mut();
        left.merge_with_right(right);

        if let Some(next_handle) = left.next() {
            self.nodes.get_mut(next_handle).as_leaf_mut().set_prev(Some(left_handle));
        }

        if self.last_leaf == Some(right_handle) {
            self.last_leaf = Some(left_handle);
        }

        self.remove_from_parent_and_propagate(path, separator_idx);
    }

    /// Removes `separators[separator_idx]` and the child after it from the deepest node on
    /// `path`, then repairs that node.
    fn remove_from_parent_and_propagate(&mut self, path: &mut Path, separator_idx: usize) {
        let parent_elem = path.pop().expect("`RawIndex::remove_from_parent_and_propagate()` - empty path!");
        let parent_handle = parent_elem.node;

        let parent = self.nodes.get_mut(parent_handle).as_internal_mut();
        // The removed child was already taken out of the arena by the merge.
        let _ = parent.remove_child(separator_idx);

        if path.is_empty() {
            if parent.child_count() == 1 {
                let new_root = parent.child(0);
                self.nodes.free(parent_handle);
                self.root = Some(new_root);
            }
            return;
        }

        if parent.is_at_minimum() {
            self.rebalance_internal(parent_handle, path);
        }
    }

    /// Rebalances an internal node after one of its children was merged away.
    fn rebalance_internal(&mut self, node_handle: Handle, path: &mut Path) {
        let parent_elem = path.last().expect("`RawIndex::rebalance_internal()` - node has no parent!");
        let parent_handle = parent_elem.node;
        let child_idx = parent_elem.child_index;

        let parent = self.nodes.get(parent_handle).as_internal();

        if child_idx > 0 {
            let left_handle = parent.child(child_idx - 1);
            if self.nodes.get(left_handle).as_internal().can_lend() {
                self.borrow_from_left_internal(node_handle, left_handle, parent_handle, child_idx);
                return;
            }
        }

        if child_idx + 1 < parent.child_count() {
            let right_handle = parent.child(child_idx + 1);
            if self.nodes.get(right_handle).as_internal().can_lend() {
                self.borrow_from_right_internal(node_handle, right_handle, parent_handle, child_idx);
                return;
            }
        }

        if child_idx > 0 {
            let left_handle = parent.child(child_idx - 1);
            self.merge_internals(left_handle, node_handle, path, child_idx - 1);
        } else {
            let right_handle = parent.child(child_idx + 1);
            self.merge_internals(node_handle, right_handle, path, child_idx);
        }
    }

    /// Rotates the left sibling's last child through the parent into `node_handle`.
    fn borrow_from_left_internal(&mut self, node_handle: Handle, left_handle: Handle, parent_handle: Handle, child_idx: usize) {
        // Bound of the left sibling, i.e. of the child about to move.
        let parent_separator = self.nodes.get(parent_handle).as_internal().separator(child_idx - 1);

        let left = self.nodes.get_mut(left_handle).as_internal_mut();
        let (left_separator, moved_child) =
            left.pop_child().expect("`RawIndex::borrow_from_left_internal()` - empty sibling!");

        self.nodes.get_mut(node_handle).as_internal_mut().push_child_front(moved_child, parent_separator);
        self.nodes.get_mut(parent_handle).as_internal_mut().set_separator(child_idx - 1, left_separator);
    }

    /// Rotates the right sibling's first child through the parent into `node_handle`.
    fn borrow_from_right_internal(&mut self, node_handle: Handle, right_handle: Handle, parent_handle: Handle, child_idx: usize) {
        // Bound of `node_handle`, i.e. of its current last child.
        let parent_separator = self.nodes.get(parent_handle).as_internal().separator(child_idx);

        let right = self.nodes.get_mut(right_handle).as_internal_mut();
        let (moved_child, moved_separator) =
            right.pop_child_front().expect("`RawIndex::borrow_from_right_internal()` - empty sibling!");

        self.nodes.get_mut(node_handle).as_internal_mut().push_child(parent_separator, moved_child);
        self.nodes.get_mut(parent_handle).as_internal_mut().set_separator(child_idx, moved_separator);
    }

    /// Folds the right internal node into the left one, pulling the parent separator down.
    fn merge_internals(&mut self, left_handle: Handle, right_handle: Handle, path: &mut Path, separator_idx: usize) {
        let parent_handle = path.last().expect("`RawIndex::merge_internals()` - empty path!").node;
        let separator = self.nodes.get(parent_handle).as_internal().separator(separator_idx);

        let Node::Internal(right) = self.nodes.take(right_handle) else {
            panic!("expected internal node");
        };

        self.nodes.get_mut(left_handle).as_internal_mut().merge_with_right(separator, right);

        self.remove_from_parent_and_propagate(path, separator_idx);
    }
}

impl<O: Order> RawIndex<O> {
    /// Seeks the position of `target` under `O`. For a live entry this lands exactly on its
    /// handle; for an entry not yet in the index it is the insertion point.
    pub(crate) fn seek_entry<K: Ord, V: Ord>(&self, entries: &Arena<Entry<K, V>>, target: &Entry<K, V>) -> Option<Cursor> {
        self.seek(|handle| O::cmp(entries.get(handle), target))
    }

    /// Seeks the live entry `handle`, panicking if the index does not contain it.
    pub(crate) fn seek_handle<K: Ord, V: Ord>(&self, entries: &Arena<Entry<K, V>>, handle: Handle) -> Cursor {
        let cursor = self.seek_entry(entries, entries.get(handle));
        match cursor {
            Some(cursor) if self.entry_at(&cursor) == Some(handle) => cursor,
            _ => panic!("`RawIndex::seek_handle()` - entry is not in this index!"),
        }
    }
}

impl<O> Clone for RawIndex<O> {
    fn clone(&self) -> Self {
        // Node handles are arena indexes, so a slot-for-slot copy keeps every link valid.
        Self {
            nodes: self.nodes.clone(),
            root: self.root,
            len: self.len,
            first_leaf: self.first_leaf,
            last_leaf: self.last_leaf,
            _order: PhantomData,
        }
    }
}

impl<O> Default for RawIndex<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits `items` into `parts` consecutive runs whose lengths differ by at most one.
fn even_chunks<T>(items: &[T], parts: usize) -> impl Iterator<Item = &[T]> {
    let base = items.len() / parts;
    let extra = items.len() % parts;
    let mut rest = items;

    (0..parts).map(move |part| {
        let (head, tail) = rest.split_at(base + usize::from(part < extra));
        rest = tail;
        head
    })
}

/// Ascending iterator over the entry handles of a [`RawIndex`].
#[derive(Clone)]
pub(crate) struct Handles<'a> {
    nodes: &'a Arena<Node>,
    front_leaf: Option<Handle>,
    front_index: usize,
    back_leaf: Option<Handle>,
    back_index: usize,
    remaining: usize,
}

impl Iterator for Handles<'_> {
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        if self.remaining == 0 {
            return None;
        }

        let leaf = self.nodes.get(self.front_leaf?).as_leaf();
        let handle = leaf.entry(self.front_index);

        self.remaining -= 1;
        self.front_index += 1;

        if self.front_index >= leaf.len() {
            self.front_leaf = leaf.next();
            self.front_index = 0;
        }

        Some(handle)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl DoubleEndedIterator for Handles<'_> {
    fn next_back(&mut self) -> Option<Handle> {
        if self.remaining == 0 {
            return None;
        }

        let leaf = self.nodes.get(self.back_leaf?).as_leaf();
        let handle = leaf.entry(self.back_index);

        self.remaining -= 1;

        if self.back_index == 0 {
            self.back_leaf = leaf.prev();
            if let Some(prev_handle) = self.back_leaf {
                self.back_index = self.nodes.get(prev_handle).as_leaf().len().saturating_sub(1);
            }
        } else {
            self.back_index -= 1;
        }

        Some(handle)
    }
}

impl ExactSizeIterator for Handles<'_> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl FusedIterator for Handles<'_> {}
