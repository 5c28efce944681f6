use {
    anyhow::Result,
    candle_core::{
        Device,
        Tensor,
    },
    unzip_n::unzip_n,
};

unzip_n!(5);

/// A single step of experience.
///
/// # Fields
///
/// * `state` - The observation the action was taken in.
/// * `action` - The action that was taken.
/// * `reward` - The reward received for the action.
/// * `next_state` - The observation after the action.
/// * `done` - Whether the episode ended with this step.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: Vec<f32>,
    pub action: Vec<f32>,
    pub reward: f32,
    pub next_state: Vec<f32>,
    pub done: bool,
}
impl Transition {
    pub fn new(
        state: &[f32],
        action: &[f32],
        reward: f32,
        next_state: &[f32],
        done: bool,
    ) -> Self {
        Self {
            state: state.to_vec(),
            action: action.to_vec(),
            reward,
            next_state: next_state.to_vec(),
            done,
        }
    }
}

/// A sampled batch, stacked into tensors with the batch along dimension 0.
///
/// `indices` are the buffer slots the rows were drawn from and `weights` are
/// the importance-sampling weights of the rows (all ones for uniform replay).
pub struct Batch {
    pub states: Tensor,
    pub actions: Tensor,
    pub rewards: Tensor,
    pub next_states: Tensor,
    pub dones: Tensor,
    pub weights: Tensor,
    pub indices: Vec<usize>,
}
impl Batch {
    /// Stack the transitions at `indices` into a batch.
    pub fn from_transitions<'a>(
        transitions: impl Iterator<Item = &'a Transition>,
        indices: Vec<usize>,
        weights: Vec<f32>,
        device: &Device,
    ) -> Result<Self> {
        let (states, actions, rewards, next_states, dones) = transitions
            .map(|t| {
                (
                    t.state.as_slice(),
                    t.action.as_slice(),
                    t.reward,
                    t.next_state.as_slice(),
                    if t.done { 1.0f32 } else { 0.0 },
                )
            })
            .unzip_n_vec();

        let n = rewards.len();
        let stack = |rows: Vec<&[f32]>| -> Result<Tensor> {
            let flat = rows.concat();
            let width = flat.len() / n.max(1);
            Ok(Tensor::from_vec(flat, (n, width), device)?)
        };

        Ok(Self {
            states: stack(states)?,
            actions: stack(actions)?,
            rewards: Tensor::from_vec(rewards, (n, 1), device)?,
            next_states: stack(next_states)?,
            dones: Tensor::from_vec(dones, (n, 1), device)?,
            weights: Tensor::from_vec(weights, (n, 1), device)?,
            indices,
        })
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// How an off-policy agent stores and replays its experience.
///
/// The update engine only talks to this trait, so uniform and prioritized
/// replay are interchangeable without the learning step knowing which one it
/// is using.
pub trait ReplayStrategy {
    /// Store a transition, evicting the oldest one when full.
    fn add(&mut self, transition: Transition);

    /// Draw a batch of `batch_size` transitions.
    fn sample(
        &mut self,
        batch_size: usize,
        device: &Device,
    ) -> Result<Batch>;

    /// Report the absolute TD errors of a previously sampled batch.
    fn update(
        &mut self,
        _indices: &[usize],
        _errors: &[f32],
    ) -> Result<()> {
        Ok(())
    }

    fn len(&self) -> usize;

    fn capacity(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
