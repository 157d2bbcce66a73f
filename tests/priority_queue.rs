use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::panic::{self, AssertUnwindSafe};

use kvpq::priority_queue;
use kvpq::{PriorityQueue, QueueError};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use static_assertions::assert_impl_all;

assert_impl_all!(PriorityQueue<String, u64>: Send, Sync, Clone, Default);
assert_impl_all!(priority_queue::Iter<'static, String, u64>: Send, Sync, Clone);
assert_impl_all!(QueueError: std::error::Error, Copy);

/// The number of operations to perform in each proptest case.
const TEST_SIZE: usize = 2_000;

/// Narrow enough that keys and whole pairs repeat often.
fn key_strategy() -> impl Strategy<Value = i64> {
    -40i64..40i64
}

fn value_strategy() -> impl Strategy<Value = i64> {
    -100i64..100i64
}

fn pairs_strategy(max: usize) -> impl Strategy<Value = Vec<(i64, i64)>> {
    proptest::collection::vec((key_strategy(), value_strategy()), 0..max)
}

// ─── Reference model ─────────────────────────────────────────────────────────

/// Entries kept sorted by (value, key), which is everything the queue promises to expose.
#[derive(Clone, Debug, Default)]
struct Model {
    entries: Vec<(i64, i64)>,
}

impl Model {
    fn insert(&mut self, key: i64, value: i64) {
        let at = self.entries.partition_point(|&(k, v)| (v, k) <= (value, key));
        self.entries.insert(at, (key, value));
    }

    fn pop_min(&mut self) -> Option<(i64, i64)> {
        if self.entries.is_empty() { None } else { Some(self.entries.remove(0)) }
    }

    fn pop_max(&mut self) -> Option<(i64, i64)> {
        self.entries.pop()
    }

    /// Position of the entry `change_value` targets: the smallest value under `key`.
    fn find(&self, key: i64) -> Option<usize> {
        self.entries.iter().position(|&(k, _)| k == key)
    }

    fn get(&self, key: i64) -> Option<&i64> {
        self.find(key).map(|at| &self.entries[at].1)
    }

    fn change_value(&mut self, key: i64, value: i64) -> Option<i64> {
        let at = self.find(key)?;
        let (_, old) = self.entries.remove(at);
        self.insert(key, value);
        Some(old)
    }

    fn peek_min(&self) -> Option<(&i64, &i64)> {
        self.entries.first().map(|(k, v)| (k, v))
    }

    fn peek_max(&self) -> Option<(&i64, &i64)> {
        self.entries.last().map(|(k, v)| (k, v))
    }
}

fn queue_of(pairs: &[(i64, i64)]) -> PriorityQueue<i64, i64> {
    pairs.iter().copied().collect()
}

fn model_of(pairs: &[(i64, i64)]) -> Model {
    let mut model = Model::default();
    for &(k, v) in pairs {
        model.insert(k, v);
    }
    model
}

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

// ─── Operations enum for driving randomized tests ────────────────────────────

#[derive(Debug, Clone)]
enum QueueOp {
    Insert(i64, i64),
    DeleteMin,
    DeleteMax,
    PopMin,
    PopMax,
    ChangeValue(i64, i64),
    Get(i64),
    ContainsKey(i64),
    Extremes,
    Merge(Vec<(i64, i64)>),
    MergeClone(usize),
    CloneAndDrain,
    Clear,
}

fn queue_op_strategy() -> impl Strategy<Value = QueueOp> {
    prop_oneof![
        10 => (key_strategy(), value_strategy()).prop_map(|(k, v)| QueueOp::Insert(k, v)),
        2 => Just(QueueOp::DeleteMin),
        2 => Just(QueueOp::DeleteMax),
        2 => Just(QueueOp::PopMin),
        2 => Just(QueueOp::PopMax),
        4 => (key_strategy(), value_strategy()).prop_map(|(k, v)| QueueOp::ChangeValue(k, v)),
        1 => key_strategy().prop_map(QueueOp::Get),
        1 => key_strategy().prop_map(QueueOp::ContainsKey),
        2 => Just(QueueOp::Extremes),
        1 => pairs_strategy(200).prop_map(QueueOp::Merge),
        1 => (0usize..20).prop_map(QueueOp::MergeClone),
        1 => Just(QueueOp::CloneAndDrain),
        1 => Just(QueueOp::Clear),
    ]
}

// ─── Model-based operation sequences ─────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Replays a random operation sequence on the queue and on a sorted vector and asserts
    /// identical results at every step.
    #[test]
    fn queue_ops_match_model(ops in proptest::collection::vec(queue_op_strategy(), TEST_SIZE)) {
        let mut queue: PriorityQueue<i64, i64> = PriorityQueue::new();
        let mut model = Model::default();

        for op in &ops {
            match op {
                QueueOp::Insert(k, v) => {
                    queue.insert(*k, *v);
                    model.insert(*k, *v);
                }
                QueueOp::DeleteMin => {
                    queue.delete_min();
                    model.pop_min();
                }
                QueueOp::DeleteMax => {
                    queue.delete_max();
                    model.pop_max();
                }
                QueueOp::PopMin => {
                    prop_assert_eq!(queue.pop_min(), model.pop_min(), "pop_min");
                }
                QueueOp::PopMax => {
                    prop_assert_eq!(queue.pop_max(), model.pop_max(), "pop_max");
                }
                QueueOp::ChangeValue(k, v) => {
                    let expected = model.change_value(*k, *v).ok_or(QueueError::KeyNotFound);
                    prop_assert_eq!(queue.change_value(k, *v), expected, "change_value({}, {})", k, v);
                }
                QueueOp::Get(k) => {
                    prop_assert_eq!(queue.get(k), model.get(*k), "get({})", k);
                }
                QueueOp::ContainsKey(k) => {
                    prop_assert_eq!(queue.contains_key(k), model.find(*k).is_some(), "contains_key({})", k);
                }
                QueueOp::Extremes => {
                    prop_assert_eq!(queue.peek_min(), model.peek_min());
                    prop_assert_eq!(queue.peek_max(), model.peek_max());
                    prop_assert_eq!(queue.min_key(), model.peek_min().map(|(k, _)| k).ok_or(QueueError::Empty));
                    prop_assert_eq!(queue.min_value(), model.peek_min().map(|(_, v)| v).ok_or(QueueError::Empty));
                    prop_assert_eq!(queue.max_key(), model.peek_max().map(|(k, _)| k).ok_or(QueueError::Empty));
                    prop_assert_eq!(queue.max_value(), model.peek_max().map(|(_, v)| v).ok_or(QueueError::Empty));
                }
                QueueOp::Merge(pairs) => {
                    let mut other = queue_of(pairs);
                    queue.merge(&mut other);
                    prop_assert!(other.is_empty(), "merge left entries behind");
                    for &(k, v) in pairs {
                        model.insert(k, v);
                    }
                }
                QueueOp::MergeClone(keep) => {
                    let mut copy = queue.clone();
                    while copy.len() > *keep {
                        copy.delete_min();
                    }
                    let kept = model.entries[model.entries.len() - copy.len()..].to_vec();
                    queue.merge(&mut copy);
                    prop_assert!(copy.is_empty(), "merge left entries behind");
                    for (k, v) in kept {
                        model.insert(k, v);
                    }
                }
                QueueOp::CloneAndDrain => {
                    let mut copy = queue.clone();
                    prop_assert_eq!(&copy, &queue);
                    while copy.pop_max().is_some() {}
                    prop_assert_eq!(queue.len(), model.entries.len(), "clone shares entries");
                }
                QueueOp::Clear => {
                    queue.clear();
                    model.entries.clear();
                }
            }
            prop_assert_eq!(queue.len(), model.entries.len(), "len mismatch after {:?}", op);
            prop_assert_eq!(queue.is_empty(), model.entries.is_empty(), "is_empty mismatch after {:?}", op);
        }

        let drained: Vec<(i64, i64)> = queue.into_iter().collect();
        prop_assert_eq!(drained, model.entries);
    }

    /// Iteration yields ascending (value, key) order from both ends.
    #[test]
    fn iter_matches_model(pairs in pairs_strategy(TEST_SIZE)) {
        let queue = queue_of(&pairs);
        let model = model_of(&pairs);

        let forward: Vec<(i64, i64)> = queue.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(&forward, &model.entries);

        let mut backward: Vec<(i64, i64)> = queue.iter().rev().map(|(k, v)| (*k, *v)).collect();
        backward.reverse();
        prop_assert_eq!(&backward, &model.entries);

        prop_assert_eq!(queue.iter().len(), pairs.len());
    }

    /// Merging matches inserting the other queue's entries one by one.
    #[test]
    fn merge_matches_model(left in pairs_strategy(600), right in pairs_strategy(600)) {
        let mut queue = queue_of(&left);
        let mut other = queue_of(&right);
        queue.merge(&mut other);

        let mut model = model_of(&left);
        for &(k, v) in &right {
            model.insert(k, v);
        }

        prop_assert!(other.is_empty());
        prop_assert_eq!(queue.len(), left.len() + right.len());
        let merged: Vec<(i64, i64)> = queue.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(merged, model.entries);

        // The merged queue keeps working as a queue.
        let mut model = model_of(&left);
        for &(k, v) in &right {
            model.insert(k, v);
        }
        for &(k, _) in &right {
            prop_assert_eq!(queue.change_value(&k, 0).ok(), model.change_value(k, 0));
        }
        while let Some(pair) = queue.pop_min() {
            prop_assert_eq!(Some(pair), model.pop_min());
        }
    }

    /// Queue comparison and hashing follow the (value, key) sequence.
    #[test]
    fn comparisons_follow_value_order(a in pairs_strategy(30), b in pairs_strategy(30)) {
        let qa = queue_of(&a);
        let qb = queue_of(&b);
        let sa: Vec<(i64, i64)> = model_of(&a).entries.iter().map(|&(k, v)| (v, k)).collect();
        let sb: Vec<(i64, i64)> = model_of(&b).entries.iter().map(|&(k, v)| (v, k)).collect();

        prop_assert_eq!(qa.cmp(&qb), sa.cmp(&sb));
        prop_assert_eq!(qa.partial_cmp(&qb), Some(sa.cmp(&sb)));
        prop_assert_eq!(qa == qb, sa == sb);
        prop_assert_eq!(qb.cmp(&qa), qa.cmp(&qb).reverse());
        prop_assert_eq!(qa.cmp(&qa), Ordering::Equal);

        // The same entries in another insertion order give an equal queue.
        let shuffled: PriorityQueue<i64, i64> = a.iter().rev().copied().collect();
        prop_assert_eq!(&shuffled, &qa);
        prop_assert_eq!(hash_of(&shuffled), hash_of(&qa));
    }
}

// ─── Examples ────────────────────────────────────────────────────────────────

#[test]
fn reference_example() {
    let mut queue = PriorityQueue::new();
    queue.insert(1, 5);
    queue.insert(2, 3);
    queue.insert(3, 9);

    assert_eq!(queue.min_value(), Ok(&3));
    assert_eq!(queue.min_key(), Ok(&2));
    assert_eq!(queue.max_value(), Ok(&9));
    assert_eq!(queue.max_key(), Ok(&3));

    assert_eq!(queue.change_value(&2, 10), Ok(3));
    assert_eq!(queue.len(), 3);
    assert!(!queue.iter().any(|pair| pair == (&2, &3)));
    assert_eq!(queue.min_value(), Ok(&5));
    assert_eq!(queue.peek_max(), Some((&2, &10)));
}

#[test]
fn empty_queue_reports_errors_but_deletes_quietly() {
    let mut queue: PriorityQueue<&str, u32> = PriorityQueue::new();

    queue.delete_min();
    queue.delete_max();
    assert_eq!(queue.len(), 0);

    assert_eq!(queue.min_value(), Err(QueueError::Empty));
    assert_eq!(queue.max_value(), Err(QueueError::Empty));
    assert_eq!(queue.min_key(), Err(QueueError::Empty));
    assert_eq!(queue.max_key(), Err(QueueError::Empty));
    assert_eq!(queue.change_value("anything", 1), Err(QueueError::KeyNotFound));
    assert_eq!(queue.pop_min(), None);
    assert_eq!(queue.peek_min(), None);
}

#[test]
fn single_entry_is_both_extremes() {
    let queue = PriorityQueue::from([("only", 42)]);
    assert_eq!(queue.min_value(), queue.max_value());
    assert_eq!(queue.min_key(), queue.max_key());
}

#[test]
fn change_value_to_same_value_keeps_entry() {
    let mut queue = PriorityQueue::from([("a", 1), ("b", 1)]);
    assert_eq!(queue.change_value("a", 1), Ok(1));
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.iter().collect::<Vec<_>>(), [(&"a", &1), (&"b", &1)]);
}

#[test]
fn change_value_targets_smallest_value_under_key() {
    let mut queue = PriorityQueue::from([("job", 8), ("job", 2), ("job", 5)]);

    assert_eq!(queue.get("job"), Some(&2));
    assert_eq!(queue.change_value("job", 9), Ok(2));
    assert_eq!(queue.change_value("job", 1), Ok(5));

    let values: Vec<u32> = queue.iter().map(|(_, v)| *v).collect();
    assert_eq!(values, [1, 8, 9]);
}

#[test]
fn merge_is_destructive_and_additive() {
    let mut a: PriorityQueue<u32, u32> = (0..500).map(|i| (i, i % 17)).collect();
    let mut b: PriorityQueue<u32, u32> = (0..300).map(|i| (i, i % 11)).collect();

    a.merge(&mut b);
    assert_eq!(a.len(), 800);
    assert!(b.is_empty());

    // Merging an empty queue changes nothing.
    let before = a.clone();
    a.merge(&mut b);
    assert_eq!(a, before);

    // Merging into an empty queue moves everything.
    b.merge(&mut a);
    assert_eq!(b, before);
    assert!(a.is_empty());

    // Both sides stay usable.
    a.insert(1, 1);
    b.insert(1, 1);
    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 801);
}

#[test]
fn repeated_merges_with_own_clone_stay_consistent() {
    let mut queue = PriorityQueue::new();
    queue.insert(1, 1);

    for round in 0..200 {
        let mut copy = queue.clone();
        while copy.len() > 1 {
            copy.delete_min();
        }
        queue.merge(&mut copy);
        assert_eq!(queue.len(), 2, "round {round}");
        queue.delete_max();
        assert_eq!(queue.len(), 1, "round {round}");
    }

    assert_eq!(queue.change_value(&1, 7), Ok(1));
    assert_eq!(queue.pop_min(), Some((1, 7)));
    assert!(queue.is_empty());
}

#[test]
fn copy_is_independent() {
    let original: PriorityQueue<String, i32> = (0..200).map(|i| (format!("task-{i}"), i % 13)).collect();
    let mut copy = original.clone();

    while copy.pop_min().is_some() {}
    assert!(copy.is_empty());
    assert_eq!(original.len(), 200);

    let mut target = PriorityQueue::from([("stale".to_owned(), 0)]);
    target.clone_from(&original);
    assert_eq!(target, original);
}

#[test]
fn move_and_swap_leave_valid_queues() {
    let mut source = PriorityQueue::from([("a", 1), ("b", 2)]);
    let moved = std::mem::take(&mut source);
    assert!(source.is_empty());
    assert_eq!(moved.len(), 2);

    source.insert("c", 3);
    let mut other = moved;
    source.swap(&mut other);
    assert_eq!(source.len(), 2);
    assert_eq!(other.peek_min(), Some((&"c", &3)));
}

#[test]
fn exact_duplicates_are_counted_separately() {
    let mut queue = PriorityQueue::new();
    for _ in 0..1_000 {
        queue.insert("same", 7);
    }
    assert_eq!(queue.len(), 1_000);

    for remaining in (0..1_000).rev() {
        queue.delete_max();
        assert_eq!(queue.len(), remaining);
    }
    assert_eq!(queue.peek_max(), None);
}

#[test]
fn large_queue_drains_in_order_from_both_ends() {
    // Deterministic pseudo-random values from a simple LCG.
    let mut x: u64 = 12345;
    let mut pairs = Vec::with_capacity(20_000);
    for key in 0..20_000u64 {
        x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
        pairs.push((key, x >> 40));
    }

    let mut queue: PriorityQueue<u64, u64> = pairs.iter().copied().collect();
    let mut sorted = pairs.clone();
    sorted.sort_by_key(|&(k, v)| (v, k));

    let mut low = 0;
    let mut high = sorted.len();
    while low < high {
        assert_eq!(queue.pop_min(), Some(sorted[low]));
        low += 1;
        if low < high {
            high -= 1;
            assert_eq!(queue.pop_max(), Some(sorted[high]));
        }
    }
    assert!(queue.is_empty());
}

#[test]
fn debug_lists_entries_in_value_order() {
    let queue = PriorityQueue::from([(1, 5), (2, 3)]);
    assert_eq!(format!("{queue:?}"), "{2: 3, 1: 5}");
    assert_eq!(format!("{:?}", queue.iter()), "[(2, 3), (1, 5)]");
    assert_eq!(format!("{:?}", queue.into_iter()), "[(2, 3), (1, 5)]");
}

#[test]
fn extend_adds_every_pair() {
    let source = PriorityQueue::from([(1, 10), (2, 20)]);
    let mut queue = PriorityQueue::new();
    queue.extend(source);
    queue.extend([(3, 5)]);
    assert_eq!(queue.peek_min(), Some((&3, &5)));
    assert_eq!(queue.len(), 3);
}

#[test]
fn with_capacity_reserves_room() {
    let mut queue: PriorityQueue<u32, u32> = PriorityQueue::with_capacity(64);
    assert!(queue.capacity() >= 64);
    for i in 0..64 {
        queue.insert(i, i);
    }
    assert_eq!(queue.len(), 64);
}

#[test]
fn empty_iterators_are_well_formed() {
    let queue: PriorityQueue<i32, i32> = PriorityQueue::new();
    assert_eq!(queue.iter().size_hint(), (0, Some(0)));
    assert_eq!(queue.iter().next_back(), None);

    let mut into_iter = PriorityQueue::<i32, i32>::new().into_iter();
    assert_eq!(into_iter.next(), None);
    let empty: priority_queue::IntoIter<i32, i32> = Default::default();
    assert_eq!(empty.len(), 0);
}

// ─── Failure safety ──────────────────────────────────────────────────────────

thread_local! {
    /// Comparisons left before `Fuse` panics; `None` while disarmed.
    static FUSE: Cell<Option<u32>> = const { Cell::new(None) };
}

/// A value whose comparisons panic once the armed budget runs out.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Fuse(u32);

impl PartialOrd for Fuse {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fuse {
    fn cmp(&self, other: &Self) -> Ordering {
        FUSE.with(|fuse| match fuse.get() {
            Some(0) => panic!("comparison budget exhausted"),
            Some(left) => fuse.set(Some(left - 1)),
            None => {}
        });
        self.0.cmp(&other.0)
    }
}

/// Runs `f` allowing only `budget` comparisons of `Fuse` values.
fn with_budget<R>(budget: u32, f: impl FnOnce() -> R) -> std::thread::Result<R> {
    FUSE.with(|fuse| fuse.set(Some(budget)));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    FUSE.with(|fuse| fuse.set(None));
    result
}

fn snapshot(queue: &PriorityQueue<u32, Fuse>) -> Vec<(u32, u32)> {
    queue.iter().map(|(k, v)| (*k, v.0)).collect()
}

#[test]
fn panicking_insert_leaves_queue_unchanged() {
    let mut queue: PriorityQueue<u32, Fuse> = (0..300).map(|i| (i, Fuse(i * 7 % 101))).collect();
    let before = snapshot(&queue);

    assert!(with_budget(0, || queue.insert(1_000, Fuse(50))).is_err());
    assert_eq!(snapshot(&queue), before);

    // Still fully usable afterwards.
    queue.insert(1_000, Fuse(50));
    assert_eq!(queue.len(), 301);
    assert_eq!(queue.pop_min().map(|(_, v)| v), Some(Fuse(0)));
}

#[test]
fn panicking_change_value_leaves_queue_unchanged() {
    // Keys repeat so that locating the entry compares values too.
    let queue: PriorityQueue<u32, Fuse> = (0..400).map(|i| (i % 50, Fuse(i * 13 % 97))).collect();

    let mut completed = false;
    for budget in 0..400 {
        let mut expected = queue.clone();
        let replaced = expected.change_value(&25, Fuse(40)).map(|v| v.0);

        let mut attempt = queue.clone();
        match with_budget(budget, || attempt.change_value(&25, Fuse(40))) {
            Ok(result) => {
                assert_eq!(result.map(|v| v.0), replaced);
                assert_eq!(snapshot(&attempt), snapshot(&expected));
                completed = true;
                break;
            }
            Err(_) => assert_eq!(snapshot(&attempt), snapshot(&queue), "budget {budget}"),
        }

        // Whatever happened, the queue keeps working.
        attempt.insert(999, Fuse(0));
        assert!(attempt.contains_key(&999));
        assert_eq!(attempt.change_value(&25, Fuse(96)).map(|v| v.0), replaced);
    }
    assert!(completed, "change_value never ran to completion");
}

#[test]
fn panicking_merge_leaves_both_queues_unchanged() {
    let mut left: PriorityQueue<u32, Fuse> = (0..200).map(|i| (i, Fuse(i % 37))).collect();
    let mut right: PriorityQueue<u32, Fuse> = (0..150).map(|i| (i, Fuse(i % 23))).collect();
    let left_before = snapshot(&left);
    let right_before = snapshot(&right);

    assert!(with_budget(0, || left.merge(&mut right)).is_err());
    assert_eq!(snapshot(&left), left_before);
    assert_eq!(snapshot(&right), right_before);

    left.merge(&mut right);
    assert_eq!(left.len(), 350);
    assert!(right.is_empty());
}
