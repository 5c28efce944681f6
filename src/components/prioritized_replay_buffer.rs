use {
    super::{
        replay::{
            Batch,
            ReplayStrategy,
            Transition,
        },
        sum_tree::SumTree,
    },
    crate::error::AgentError,
    anyhow::Result,
    candle_core::Device,
    rand::{
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    tracing::trace,
};

/// Linear schedule of the importance-sampling exponent.
///
/// `beta` starts at `beta_0` and reaches `beta_final` after `n_final` calls to
/// [`IwScheduler::step`], staying there afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IwScheduler {
    pub beta_0: f64,
    pub beta_final: f64,
    pub n_final: usize,
    n: usize,
}
impl IwScheduler {
    pub fn new(
        beta_0: f64,
        beta_final: f64,
        n_final: usize,
    ) -> Self {
        Self {
            beta_0,
            beta_final,
            n_final,
            n: 0,
        }
    }

    pub fn beta(&self) -> f64 {
        if self.n >= self.n_final {
            self.beta_final
        } else {
            let d = self.beta_final - self.beta_0;
            self.beta_0 + d * (self.n as f64 / self.n_final as f64)
        }
    }

    pub fn step(&mut self) {
        self.n += 1;
    }
}

/// Replay buffer that samples transitions in proportion to their priority.
///
/// Transitions live in a ring of `capacity` slots, so a slot index stays a
/// valid handle until the transition in it is overwritten. Sampling
/// probabilities are `p_i^alpha / sum_j p_j^alpha`, kept in a [`SumTree`].
///
/// # Fields
///
/// * `buffer` - The stored transitions; slot `next` is overwritten next once full.
/// * `priorities` - The raw priority of every occupied slot.
/// * `tree` - `priority^alpha` of every slot.
/// * `max_priority` - Largest priority handed out so far; new transitions get it.
/// * `alpha` - How strongly priorities skew the sampling (0 is uniform).
/// * `eps` - Added to every reported error so no transition starves.
/// * `iw_scheduler` - Schedule of the importance-sampling exponent.
#[derive(Clone)]
pub struct PrioritizedReplayBuffer {
    buffer: Vec<Transition>,
    priorities: Vec<f64>,
    tree: SumTree,
    capacity: usize,
    next: usize,
    max_priority: f64,
    alpha: f64,
    eps: f64,
    iw_scheduler: IwScheduler,
    rng: StdRng,
}
impl PrioritizedReplayBuffer {
    pub fn new(
        capacity: usize,
        alpha: f64,
        eps: f64,
        iw_scheduler: IwScheduler,
        seed: u64,
    ) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            priorities: Vec::with_capacity(capacity),
            tree: SumTree::new(capacity),
            capacity,
            next: 0,
            max_priority: 1.0,
            alpha,
            eps,
            iw_scheduler,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() == self.capacity
    }

    /// Push a transition with the largest priority seen so far.
    pub fn push(
        &mut self,
        transition: Transition,
    ) {
        if self.capacity == 0 {
            return;
        }
        let ix = self.next;
        if self.is_full() {
            self.buffer[ix] = transition;
            self.priorities[ix] = self.max_priority;
        } else {
            self.buffer.push(transition);
            self.priorities.push(self.max_priority);
        }
        self.tree.set(ix, self.max_priority.powf(self.alpha));
        self.next = (self.next + 1) % self.capacity;
    }

    /// The raw priority at slot `index`.
    pub fn priority(
        &self,
        index: usize,
    ) -> Result<f64> {
        Ok(self
            .priorities
            .get(index)
            .copied()
            .ok_or(AgentError::IndexOutOfRange { index, len: self.buffer.len() })?)
    }

    /// The probability of drawing slot `index` in a single draw.
    pub fn probability(
        &self,
        index: usize,
    ) -> Result<f64> {
        self.priority(index)?;
        Ok(self.tree.get(index) / self.tree.total())
    }

    pub fn max_priority(&self) -> f64 {
        self.max_priority
    }

    pub fn beta(&self) -> f64 {
        self.iw_scheduler.beta()
    }

    /// Iterate over the stored transitions, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        let split = if self.is_full() { self.next } else { 0 };
        self.buffer[split..].iter().chain(self.buffer[..split].iter())
    }

    /// Set the priority of slot `index` to `|error| + eps`.
    pub fn update_priority(
        &mut self,
        index: usize,
        error: f64,
    ) -> Result<()> {
        if index >= self.buffer.len() {
            Err(AgentError::IndexOutOfRange { index, len: self.buffer.len() })?
        }
        let priority = error.abs() + self.eps;
        self.priorities[index] = priority;
        self.tree.set(index, priority.powf(self.alpha));
        self.max_priority = self.max_priority.max(priority);
        Ok(())
    }

    /// Sample a batch in proportion to the priorities.
    ///
    /// The weights are `(N * P(i))^-beta`, normalised by their maximum within
    /// the batch. Every call advances the `beta` schedule by one step.
    pub fn prioritized_batch(
        &mut self,
        batch_size: usize,
        device: &Device,
    ) -> Result<Batch> {
        let size = self.buffer.len();
        if size < batch_size || size == 0 {
            Err(AgentError::InsufficientSamples { batch_size, len: size })?
        }

        let total = self.tree.total();
        let indices: Vec<usize> = (0..batch_size)
            .map(|_| {
                let ix = self.tree.find(self.rng.gen::<f64>() * total);
                // float drift in the tree can point past the filled slots
                ix.min(size - 1)
            })
            .collect();

        let beta = self.iw_scheduler.beta();
        let weights: Vec<f64> = indices
            .iter()
            .map(|&ix| (size as f64 * self.tree.get(ix) / total).powf(-beta))
            .collect();
        let w_max = weights.iter().cloned().fold(f64::MIN_POSITIVE, f64::max);
        let weights: Vec<f32> = weights.iter().map(|w| (w / w_max) as f32).collect();

        trace!(beta, total, "sampled prioritized batch");
        self.iw_scheduler.step();

        Batch::from_transitions(
            indices.iter().map(|&i| &self.buffer[i]),
            indices.clone(),
            weights,
            device,
        )
    }
}

impl ReplayStrategy for PrioritizedReplayBuffer {
    fn add(&mut self, transition: Transition) {
        self.push(transition)
    }

    fn sample(
        &mut self,
        batch_size: usize,
        device: &Device,
    ) -> Result<Batch> {
        self.prioritized_batch(batch_size, device)
    }

    fn update(
        &mut self,
        indices: &[usize],
        errors: &[f32],
    ) -> Result<()> {
        for (&index, &error) in indices.iter().zip(errors.iter()) {
            self.update_priority(index, error as f64)?;
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
