//! # Components
//!
//! This module contains the components that the agent is built from.
//!
//! ## Noise
//!
//! The [`OuNoise`] struct implements the Ornstein-Uhlenbeck process, which
//! provides the temporally correlated exploration noise of
//! [`crate::agents::DDPG`].
//!
//! ## Replay
//!
//! The [`ReplayStrategy`] trait is how the agent stores and replays its
//! experience. [`ReplayBuffer`] samples uniformly, while
//! [`PrioritizedReplayBuffer`] samples in proportion to the TD error of each
//! transition (backed by a [`SumTree`]) and returns importance-sampling weights
//! that undo the resulting bias.

mod ou_noise;
mod prioritized_replay_buffer;
mod replay;
mod replay_buffer;
mod sum_tree;

pub use ou_noise::OuNoise;
pub use prioritized_replay_buffer::{
    IwScheduler,
    PrioritizedReplayBuffer,
};
pub use replay::{
    Batch,
    ReplayStrategy,
    Transition,
};
pub use replay_buffer::ReplayBuffer;
pub use sum_tree::SumTree;
