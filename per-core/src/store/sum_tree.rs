//! Sum tree for prioritized sampling.
//!
//! Leaves are the slots of the store. The number of leaves is padded to a power of two
//! so that the in-order leaf sequence equals the slot order; padding leaves hold zero.
//! Minimum and maximum over slots are kept in separate segment trees.
use segment_tree::{
    ops::{MaxIgnoreNaN, MinIgnoreNaN},
    SegmentPoint,
};

#[derive(Debug)]
pub(crate) struct SumTree {
    capacity: usize,
    first_leaf: usize,
    tree: Vec<f32>,
    min_tree: SegmentPoint<f32, MinIgnoreNaN>,
    max_tree: SegmentPoint<f32, MaxIgnoreNaN>,
}

impl SumTree {
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        let n_leaves = capacity.next_power_of_two();

        Self {
            capacity,
            first_leaf: n_leaves - 1,
            tree: vec![0f32; 2 * n_leaves - 1],
            min_tree: SegmentPoint::build(vec![f32::MAX; capacity], MinIgnoreNaN),
            max_tree: SegmentPoint::build(vec![0f32; capacity], MaxIgnoreNaN),
        }
    }

    fn propagate(&mut self, leaf: usize) {
        let mut node = leaf;
        while node != 0 {
            node = (node - 1) / 2;
            let left = 2 * node + 1;
            self.tree[node] = self.tree[left] + self.tree[left + 1];
        }
    }

    /// Sum of all leaves.
    pub fn total(&self) -> f32 {
        self.tree[0]
    }

    /// Maximum over the first `n` slots, `0` if `n == 0`.
    pub fn max(&self, n: usize) -> f32 {
        if n == 0 {
            0f32
        } else {
            self.max_tree.query(0, n.min(self.capacity))
        }
    }

    /// Minimum over the first `n` slots, `0` if `n == 0`.
    pub fn min(&self, n: usize) -> f32 {
        if n == 0 {
            0f32
        } else {
            self.min_tree.query(0, n.min(self.capacity))
        }
    }

    /// Value stored at slot `ix`.
    pub fn leaf(&self, ix: usize) -> f32 {
        self.tree[self.first_leaf + ix]
    }

    /// Sets the value of slot `ix`.
    pub fn set(&mut self, ix: usize, p: f32) {
        debug_assert!(ix < self.capacity);
        debug_assert!(p.is_finite());

        self.min_tree.modify(ix, p);
        self.max_tree.modify(ix, p);
        let leaf = self.first_leaf + ix;
        self.tree[leaf] = p;
        self.propagate(leaf);
    }

    /// Returns the first slot whose cumulative sum reaches or exceeds `s`.
    ///
    /// Never descends into a subtree whose sum is zero, so the returned slot
    /// always holds a positive value as long as `total() > 0`.
    pub fn find(&self, s: f32) -> usize {
        let mut node = 0;
        let mut s = s;

        while node < self.first_leaf {
            let left = 2 * node + 1;
            let right = left + 1;
            if s <= self.tree[left] || self.tree[right] <= 0f32 {
                node = left;
            } else {
                s -= self.tree[left];
                node = right;
            }
        }

        node - self.first_leaf
    }
}

#[cfg(test)]
mod tests {
    use super::SumTree;

    #[test]
    fn test_sum_tree_odd() {
        let data = vec![0.5f32, 0.2, 0.8, 0.3, 1.1, 2.5, 3.9];
        let mut sum_tree = SumTree::new(8);
        for ix in 0..data.len() {
            sum_tree.set(ix, data[ix]);
        }

        assert_eq!(sum_tree.find(0.0), 0);
        assert_eq!(sum_tree.find(0.4), 0);
        assert_eq!(sum_tree.find(0.5), 0);
        assert_eq!(sum_tree.find(0.6), 1);
        assert_eq!(sum_tree.find(1.2), 2);
        assert_eq!(sum_tree.find(1.6), 3);
        assert_eq!(sum_tree.find(2.0), 4);
        assert_eq!(sum_tree.find(2.8), 4);
        assert_eq!(sum_tree.find(9.0), 6);

        // Past the total, the search stays within the filled slots.
        assert_eq!(sum_tree.find(100.0), 6);
        assert!((sum_tree.total() - 9.3).abs() < 1e-5);
    }

    #[test]
    fn test_sum_tree_slot_order_without_power_of_two_capacity() {
        let mut sum_tree = SumTree::new(3);
        sum_tree.set(0, 1.0);
        sum_tree.set(1, 2.0);
        sum_tree.set(2, 3.0);

        assert_eq!(sum_tree.find(0.5), 0);
        assert_eq!(sum_tree.find(1.0), 0);
        assert_eq!(sum_tree.find(1.5), 1);
        assert_eq!(sum_tree.find(3.5), 2);
        assert_eq!(sum_tree.total(), 6.0);
    }

    #[test]
    fn test_min_max_follow_updates() {
        let mut sum_tree = SumTree::new(4);
        assert_eq!(sum_tree.max(0), 0.0);

        sum_tree.set(0, 0.1);
        sum_tree.set(1, 0.9);
        sum_tree.set(2, 0.2);
        assert_eq!(sum_tree.max(3), 0.9);
        assert_eq!(sum_tree.min(3), 0.1);

        sum_tree.set(1, 0.01);
        assert_eq!(sum_tree.max(3), 0.2);
        assert_eq!(sum_tree.min(3), 0.01);
        assert!((sum_tree.total() - 0.31).abs() < 1e-6);
        assert_eq!(sum_tree.leaf(1), 0.01);
    }
}
