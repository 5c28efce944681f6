//! Sum tree for proportional sampling.
//!
//! Leaves hold the (already exponentiated) priorities, every inner node holds
//! the sum of its two children, so the root is the total mass and a prefix sum
//! can be located in `O(log n)`.

#[derive(Debug, Clone)]
pub struct SumTree {
    capacity: usize,
    tree: Vec<f64>,
}

impl SumTree {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            tree: vec![0.0; 2 * capacity - 1],
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn total(&self) -> f64 {
        self.tree[0]
    }

    /// The value stored at leaf `ix`.
    pub fn get(&self, ix: usize) -> f64 {
        self.tree[ix + self.capacity - 1]
    }

    /// Overwrite leaf `ix` and fix up the sums on the path to the root.
    pub fn set(&mut self, ix: usize, value: f64) {
        debug_assert!(ix < self.capacity);

        let mut node = ix + self.capacity - 1;
        let change = value - self.tree[node];
        self.tree[node] = value;
        while node != 0 {
            node = (node - 1) / 2;
            self.tree[node] += change;
        }
    }

    /// The leaf whose cumulative range contains `mass`.
    ///
    /// `mass` is expected in `[0, total)`; values outside are clamped to the
    /// first or last non-empty leaf.
    pub fn find(&self, mass: f64) -> usize {
        let mut node = 0;
        let mut mass = mass.max(0.0);
        loop {
            let left = 2 * node + 1;
            if left >= self.tree.len() {
                break;
            }
            let right = left + 1;
            if mass < self.tree[left] || self.tree[right] <= 0.0 {
                node = left;
            } else {
                mass -= self.tree[left];
                node = right;
            }
        }
        node + 1 - self.capacity
    }
}
