mod reacher;

use anyhow::Result;

pub use reacher::{
    ReacherConfig,
    ReacherEnv,
};


#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub observation: Vec<f32>,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
}

impl Step {
    /// Whether the episode is over, for either reason.
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

pub trait Environment {
    type Config;

    fn config(&self) -> &Self::Config;
    fn new(config: Self::Config) -> Result<Box<Self>>;
    fn reset(
        &mut self,
        seed: u64,
    ) -> Result<Vec<f32>>;
    fn step(
        &mut self,
        action: &[f32],
    ) -> Result<Step>;
    fn timelimit(&self) -> usize;
    fn action_space(&self) -> usize;
    fn observation_space(&self) -> usize;
    fn current_observation(&self) -> Vec<f32>;
}
