mod configs;
mod ddpg;
mod networks;
mod update;

pub use configs::{
    DDPGConfig,
    TrainConfig,
};
pub use ddpg::DDPG;
pub use networks::{
    track,
    Actor,
    Checkpoint,
    Critic,
};
pub use update::{
    clip_grad_norm,
    ActorCritic,
    LearnStats,
};


use {
    crate::components::Transition,
    anyhow::Result,
    candle_core::Device,
    std::{
        fmt::Display,
        path::Path,
    },
};


/// The execution mode of an agent is either training or testing.
///
/// Only training adds exploration noise to the actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    Train,
    Test,
}

impl Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Train => write!(f, "Train"),
            RunMode::Test => write!(f, "Test"),
        }
    }
}

pub trait Algorithm {
    type Config;

    fn config(&self) -> &Self::Config;
    fn from_config(
        device: &Device,
        config: &Self::Config,
        size_state: usize,
        size_action: usize,
    ) -> Result<Box<Self>>;

    fn actions(
        &mut self,
        state: &[f32],
        mode: RunMode,
    ) -> Result<Vec<f32>>;

    /// Called at every episode boundary.
    fn reset(&mut self) -> Result<()>;

    /// Run the learning updates, `None` when there was nothing to learn from.
    fn train(&mut self) -> Result<Option<LearnStats>>;

    fn save(
        &self,
        actor_path: &dyn AsRef<Path>,
        critic_path: &dyn AsRef<Path>,
    ) -> Result<()>;

    fn load(
        &mut self,
        actor_path: &dyn AsRef<Path>,
        critic_path: &dyn AsRef<Path>,
    ) -> Result<()>;
}

pub trait OffPolicyAlgorithm: Algorithm {
    fn remember(
        &mut self,
        transition: Transition,
    );

    fn replay_len(&self) -> usize;
}
