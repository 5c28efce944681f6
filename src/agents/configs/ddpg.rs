use {
    anyhow::Result,
    serde::{
        Deserialize,
        Serialize,
    },
    std::{
        fs::read_to_string,
        path::Path,
    },
};


#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DDPGConfig {
    // The learning rates for the Actor and Critic networks
    pub actor_learning_rate: f64,
    pub critic_learning_rate: f64,
    // L2 weight decay on the Critic parameters.
    pub critic_weight_decay: f64,
    // The impact of the q value of the next state on the current state's q value.
    pub gamma: f64,
    // The weight for updating the target networks.
    pub tau: f64,
    // The number of neurons in the hidden layers of the Actor and Critic networks.
    pub hidden_1_size: usize,
    pub hidden_2_size: usize,
    // The largest absolute value the Actor can output.
    pub max_action: f64,
    // Gradients of the Critic are rescaled to at most this global norm.
    pub max_grad_norm: f64,
    // The capacity of the replay buffer used for sampling training data.
    pub replay_buffer_capacity: usize,
    // The training batch size for each training iteration.
    pub training_batch_size: usize,
    // The number of training iterations per call to learn().
    pub update_iterations: usize,
    // Ornstein-Uhlenbeck process parameters.
    pub ou_mu: f64,
    pub ou_theta: f64,
    pub ou_sigma: f64,
    // Prioritized experience replay.
    pub prioritized: bool,
    pub per_alpha: f64,
    pub per_beta_0: f64,
    pub per_beta_final: f64,
    pub per_beta_steps: usize,
    pub per_eps: f64,
    // Seeds the noise process and the replay sampling.
    pub seed: u64,
}
impl Default for DDPGConfig {
    fn default() -> Self {
        Self::reacher()
    }
}
impl DDPGConfig {
    pub fn reacher() -> Self {
        Self {
            actor_learning_rate: 1e-4,
            critic_learning_rate: 1e-3,
            critic_weight_decay: 0.0,
            gamma: 0.99,
            tau: 1e-3,
            hidden_1_size: 400,
            hidden_2_size: 300,
            max_action: 1.0,
            max_grad_norm: 1.0,
            replay_buffer_capacity: 100_000,
            training_batch_size: 128,
            update_iterations: 10,
            ou_mu: 0.0,
            ou_theta: 0.15,
            ou_sigma: 0.2,
            prioritized: false,
            per_alpha: 0.6,
            per_beta_0: 0.4,
            per_beta_final: 1.0,
            per_beta_steps: 100_000,
            per_eps: 1e-5,
            seed: 0,
        }
    }

    /// Read a config from a RON file, missing fields fall back to [`DDPGConfig::reacher`].
    pub fn from_ron(path: &dyn AsRef<Path>) -> Result<Self> {
        Ok(ron::from_str(&read_to_string(path)?)?)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_ron_uses_defaults() -> Result<()> {
        let config: DDPGConfig = ron::from_str("(prioritized: true, training_batch_size: 64)")?;
        assert!(config.prioritized);
        assert_eq!(config.training_batch_size, 64);
        assert_eq!(config.gamma, 0.99);
        assert_eq!(config.replay_buffer_capacity, 100_000);
        Ok(())
    }

    #[test]
    fn ron_roundtrip() -> Result<()> {
        let config = DDPGConfig::reacher();
        let text = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default())?;
        assert_eq!(ron::from_str::<DDPGConfig>(&text)?, config);
        Ok(())
    }
}
