use {
    super::replay::{
        Batch,
        ReplayStrategy,
        Transition,
    },
    crate::error::AgentError,
    anyhow::Result,
    candle_core::Device,
    rand::{
        distributions::Uniform,
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    std::collections::VecDeque,
};

/// A replay buffer for off-policy algorithms.
///
/// The replay buffer is implemented as a simple ring buffer / VecDeque and
/// samples uniformly with replacement.
///
/// # Fields
///
/// * `buffer` - The buffer of transitions, oldest first.
/// * `capacity` - The capacity of the buffer.
/// * `rng` - Seeded generator for the sampled indices.
pub struct ReplayBuffer {
    buffer: VecDeque<Transition>,
    capacity: usize,
    rng: StdRng,
}
impl ReplayBuffer {
    /// Create a new replay buffer with the given capacity.
    pub fn new(
        capacity: usize,
        seed: u64,
    ) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Check if the buffer is full.
    pub fn is_full(&self) -> bool {
        self.buffer.len() == self.capacity
    }

    /// Push a transition into the buffer.
    ///
    /// If the buffer is full, the oldest transition is removed to make room for
    /// the new transition.
    pub fn push(
        &mut self,
        transition: Transition,
    ) {
        if self.capacity == 0 {
            return;
        }
        if self.is_full() {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    /// Iterate over the stored transitions, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
    }

    /// Sample a random batch of transitions from the buffer.
    ///
    /// Fails with [`AgentError::InsufficientSamples`] when the buffer holds
    /// fewer than `batch_size` transitions.
    pub fn random_batch(
        &mut self,
        batch_size: usize,
        device: &Device,
    ) -> Result<Batch> {
        let size = self.buffer.len();
        if size < batch_size || size == 0 {
            Err(AgentError::InsufficientSamples { batch_size, len: size })?
        }

        let indices: Vec<usize> = (&mut self.rng)
            .sample_iter(Uniform::from(0..size))
            .take(batch_size)
            .collect();

        Batch::from_transitions(
            indices.iter().map(|&i| &self.buffer[i]),
            indices.clone(),
            vec![1.0; batch_size],
            device,
        )
    }
}

impl ReplayStrategy for ReplayBuffer {
    fn add(&mut self, transition: Transition) {
        self.push(transition)
    }

    fn sample(
        &mut self,
        batch_size: usize,
        device: &Device,
    ) -> Result<Batch> {
        self.random_batch(batch_size, device)
    }

    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn transition(i: usize) -> Transition {
        Transition::new(
            &[i as f32; 3],
            &[0.5, -0.5],
            i as f32,
            &[i as f32 + 1.0; 3],
            false,
        )
    }

    #[test]
    fn evicts_oldest_first() {
        let mut buffer = ReplayBuffer::new(5, 0);
        for i in 0..12 {
            buffer.add(transition(i));
            assert!(buffer.len() <= 5);
        }
        assert!(buffer.is_full());
        let rewards: Vec<f32> = buffer.iter().map(|t| t.reward).collect();
        assert_eq!(rewards, vec![7.0, 8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn sample_has_batch_shapes() -> Result<()> {
        let mut buffer = ReplayBuffer::new(100, 3);
        for i in 0..40 {
            buffer.add(transition(i));
        }
        let batch = buffer.sample(32, &Device::Cpu)?;
        assert_eq!(batch.len(), 32);
        assert_eq!(batch.states.dims(), &[32, 3]);
        assert_eq!(batch.actions.dims(), &[32, 2]);
        assert_eq!(batch.rewards.dims(), &[32, 1]);
        assert_eq!(batch.next_states.dims(), &[32, 3]);
        assert_eq!(batch.dones.dims(), &[32, 1]);
        assert_eq!(batch.weights.dims(), &[32, 1]);
        assert!(batch.indices.iter().all(|&i| i < 40));

        // rows stay aligned across the columns
        let states = batch.states.to_vec2::<f32>()?;
        let rewards = batch.rewards.to_vec2::<f32>()?;
        for (s, r) in states.iter().zip(rewards.iter()) {
            assert_eq!(s[0], r[0]);
        }
        Ok(())
    }

    #[test]
    fn sample_fails_when_short() {
        let mut buffer = ReplayBuffer::new(100, 3);
        for i in 0..10 {
            buffer.add(transition(i));
        }
        let err = buffer.sample(32, &Device::Cpu).err().and_then(|e| {
            e.downcast::<AgentError>().ok()
        });
        assert!(matches!(
            err,
            Some(AgentError::InsufficientSamples { batch_size: 32, len: 10 })
        ));
    }

    #[test]
    fn update_is_a_no_op() -> Result<()> {
        let mut buffer = ReplayBuffer::new(10, 3);
        buffer.add(transition(0));
        buffer.update(&[0, 99], &[1.0, 2.0])?;
        assert_eq!(buffer.len(), 1);
        Ok(())
    }
}
