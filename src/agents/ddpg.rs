use {
    super::{
        configs::DDPGConfig,
        networks::{
            Actor,
            Critic,
        },
        update::{
            ActorCritic,
            LearnStats,
        },
        Algorithm,
        OffPolicyAlgorithm,
        RunMode,
    },
    crate::components::{
        IwScheduler,
        OuNoise,
        PrioritizedReplayBuffer,
        ReplayBuffer,
        ReplayStrategy,
        Transition,
    },
    anyhow::Result,
    candle_core::Device,
    std::path::Path,
    tracing::{
        info,
        trace,
    },
};

/// Deep Deterministic Policy Gradient agent.
///
/// The agent only stores transitions in [`DDPG::step`]; learning happens when
/// the caller asks for it with [`DDPG::learn`]. The training loop in
/// [`crate::engines`] does that once at the end of every episode.
#[allow(clippy::upper_case_acronyms)]
pub struct DDPG {
    config: DDPGConfig,
    actor_critic: ActorCritic,
    replay: Box<dyn ReplayStrategy>,
    ou_noise: OuNoise,
    size_state: usize,
    size_action: usize,
}

impl DDPG {
    pub fn new(
        device: &Device,
        config: &DDPGConfig,
        size_state: usize,
        size_action: usize,
    ) -> Result<Self> {
        let actor = Actor::new(
            device,
            size_state,
            size_action,
            config.hidden_1_size,
            config.hidden_2_size,
            config.max_action,
        )?;
        let critic = Critic::new(
            device,
            size_state,
            size_action,
            config.hidden_1_size,
            config.hidden_2_size,
        )?;
        let actor_critic = ActorCritic::new(
            device,
            actor,
            critic,
            config.actor_learning_rate,
            config.critic_learning_rate,
            config.critic_weight_decay,
            config.gamma,
            config.tau,
            config.max_grad_norm,
        )?;

        let replay: Box<dyn ReplayStrategy> = if config.prioritized {
            Box::new(PrioritizedReplayBuffer::new(
                config.replay_buffer_capacity,
                config.per_alpha,
                config.per_eps,
                IwScheduler::new(config.per_beta_0, config.per_beta_final, config.per_beta_steps),
                config.seed,
            ))
        } else {
            Box::new(ReplayBuffer::new(config.replay_buffer_capacity, config.seed))
        };

        let ou_noise = OuNoise::new(
            config.ou_mu,
            config.ou_theta,
            config.ou_sigma,
            size_action,
            config.seed.wrapping_add(1),
            device,
        )?;

        info!(
            size_state,
            size_action,
            prioritized = config.prioritized,
            "created DDPG agent"
        );

        Ok(Self {
            config: config.clone(),
            actor_critic,
            replay,
            ou_noise,
            size_state,
            size_action,
        })
    }

    /// Action for `state`, with exploration noise when `explore` is set.
    ///
    /// Every coordinate is clipped to `[-1, 1]`.
    pub fn act(
        &mut self,
        state: &[f32],
        explore: bool,
    ) -> Result<Vec<f32>> {
        let action = self.actor_critic.policy(state)?;
        let action = if explore {
            (action + self.ou_noise.sample()?)?
        } else {
            action
        };
        Ok(action.clamp(-1f32, 1f32)?.to_vec1::<f32>()?)
    }

    /// Store a transition, without learning from it.
    pub fn step(
        &mut self,
        transition: Transition,
    ) {
        trace!(
            reward = transition.reward,
            done = transition.done,
            "pushing to replay buffer"
        );
        self.replay.add(transition)
    }

    /// Run `update_iterations` updates once the buffer holds more than a
    /// batch, and return their mean losses.
    pub fn learn(&mut self) -> Result<Option<LearnStats>> {
        let batch_size = self.config.training_batch_size;
        if self.replay.len() <= batch_size || self.config.update_iterations == 0 {
            return Ok(None);
        }

        let mut critic_loss = 0.0;
        let mut actor_loss = 0.0;
        for _ in 0..self.config.update_iterations {
            let stats = self.actor_critic.update(self.replay.as_mut(), batch_size)?;
            critic_loss += stats.critic_loss;
            actor_loss += stats.actor_loss;
        }
        let n = self.config.update_iterations as f64;
        let stats = LearnStats {
            critic_loss: critic_loss / n,
            actor_loss: actor_loss / n,
        };
        info!(
            critic_loss = stats.critic_loss,
            actor_loss = stats.actor_loss,
            "learned from replay buffer"
        );
        Ok(Some(stats))
    }

    /// Alias of [`DDPG::learn`].
    pub fn sample_and_learn(&mut self) -> Result<Option<LearnStats>> {
        self.learn()
    }

    /// Reset the exploration noise, at the start of an episode.
    pub fn reset(&mut self) -> Result<()> {
        Ok(self.ou_noise.reset()?)
    }

    /// Write the online actor and critic parameters to two files.
    ///
    /// Target networks are not saved; [`DDPG::load`] recreates them as copies
    /// of the loaded networks.
    pub fn save(
        &self,
        actor_path: &dyn AsRef<Path>,
        critic_path: &dyn AsRef<Path>,
    ) -> Result<()> {
        self.actor_critic.actor().save(actor_path.as_ref())?;
        self.actor_critic.critic().save(critic_path.as_ref())?;
        info!("saved checkpoint to {:?} and {:?}", actor_path.as_ref(), critic_path.as_ref());
        Ok(())
    }

    /// Load the actor and critic written by [`DDPG::save`].
    ///
    /// Both files are read and checked before either network changes, so a
    /// failed load leaves the agent as it was.
    pub fn load(
        &mut self,
        actor_path: &dyn AsRef<Path>,
        critic_path: &dyn AsRef<Path>,
    ) -> Result<()> {
        let actor = self.actor_critic.actor().read(actor_path.as_ref())?;
        let critic = self.actor_critic.critic().read(critic_path.as_ref())?;
        self.actor_critic.actor_mut().restore(&actor)?;
        self.actor_critic.critic_mut().restore(&critic)?;
        info!("loaded checkpoint from {:?} and {:?}", actor_path.as_ref(), critic_path.as_ref());
        Ok(())
    }

    pub fn actor_critic(&self) -> &ActorCritic {
        &self.actor_critic
    }

    pub fn replay(&self) -> &dyn ReplayStrategy {
        self.replay.as_ref()
    }

    pub fn size_state(&self) -> usize {
        self.size_state
    }

    pub fn size_action(&self) -> usize {
        self.size_action
    }
}

impl Algorithm for DDPG {
    type Config = DDPGConfig;

    fn config(&self) -> &DDPGConfig {
        &self.config
    }

    fn from_config(
        device: &Device,
        config: &DDPGConfig,
        size_state: usize,
        size_action: usize,
    ) -> Result<Box<Self>> {
        Ok(Box::new(Self::new(device, config, size_state, size_action)?))
    }

    fn actions(
        &mut self,
        state: &[f32],
        mode: RunMode,
    ) -> Result<Vec<f32>> {
        self.act(state, mode == RunMode::Train)
    }

    fn reset(&mut self) -> Result<()> {
        DDPG::reset(self)
    }

    fn train(&mut self) -> Result<Option<LearnStats>> {
        self.learn()
    }

    fn save(
        &self,
        actor_path: &dyn AsRef<Path>,
        critic_path: &dyn AsRef<Path>,
    ) -> Result<()> {
        DDPG::save(self, actor_path, critic_path)
    }

    fn load(
        &mut self,
        actor_path: &dyn AsRef<Path>,
        critic_path: &dyn AsRef<Path>,
    ) -> Result<()> {
        DDPG::load(self, actor_path, critic_path)
    }
}

impl OffPolicyAlgorithm for DDPG {
    fn remember(
        &mut self,
        transition: Transition,
    ) {
        self.step(transition)
    }

    fn replay_len(&self) -> usize {
        self.replay.len()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const SIZE_STATE: usize = 33;
    const SIZE_ACTION: usize = 4;

    fn state(i: usize) -> Vec<f32> {
        (0..SIZE_STATE).map(|j| ((i * SIZE_STATE + j) as f32 * 0.01).sin()).collect()
    }

    fn feed(agent: &mut DDPG, n: usize) -> Result<()> {
        for i in 0..n {
            let action = agent.act(&state(i), true)?;
            agent.step(Transition::new(&state(i), &action, 1.0, &state(i + 1), false));
        }
        Ok(())
    }

    #[test]
    fn learn_is_gated_on_batch_size() -> Result<()> {
        let config = DDPGConfig {
            training_batch_size: 16,
            hidden_1_size: 32,
            hidden_2_size: 32,
            ..DDPGConfig::reacher()
        };
        let mut agent = DDPG::new(&Device::Cpu, &config, SIZE_STATE, SIZE_ACTION)?;
        feed(&mut agent, 16)?;
        assert!(agent.learn()?.is_none());
        feed(&mut agent, 1)?;
        assert!(agent.sample_and_learn()?.is_some());
        Ok(())
    }

    #[test]
    fn step_does_not_learn() -> Result<()> {
        let config = DDPGConfig {
            training_batch_size: 4,
            hidden_1_size: 8,
            hidden_2_size: 8,
            ..DDPGConfig::reacher()
        };
        let mut agent = DDPG::new(&Device::Cpu, &config, SIZE_STATE, SIZE_ACTION)?;
        let before = agent.actor_critic().critic().parameters()?;
        feed(&mut agent, 50)?;
        assert_eq!(agent.replay().len(), 50);
        assert_eq!(agent.actor_critic().critic().parameters()?, before);
        Ok(())
    }

    #[test]
    fn actions_are_clipped() -> Result<()> {
        let config = DDPGConfig {
            ou_sigma: 50.0,
            hidden_1_size: 16,
            hidden_2_size: 16,
            ..DDPGConfig::reacher()
        };
        let mut agent = DDPG::new(&Device::Cpu, &config, SIZE_STATE, SIZE_ACTION)?;
        for i in 0..100 {
            let action = agent.act(&state(i), true)?;
            assert_eq!(action.len(), SIZE_ACTION);
            assert!(action.iter().all(|a| (-1.0..=1.0).contains(a)));
        }
        Ok(())
    }

    #[test]
    fn acting_without_noise_is_deterministic() -> Result<()> {
        let mut agent = DDPG::new(&Device::Cpu, &DDPGConfig::reacher(), SIZE_STATE, SIZE_ACTION)?;
        let a = agent.act(&state(3), false)?;
        agent.act(&state(3), true)?;
        let b = agent.act(&state(3), false)?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn learning_moves_targets_towards_networks() -> Result<()> {
        let config = DDPGConfig {
            update_iterations: 1,
            ..DDPGConfig::reacher()
        };
        let tau = config.tau as f32;
        let mut agent = DDPG::new(&Device::Cpu, &config, SIZE_STATE, SIZE_ACTION)?;

        feed(&mut agent, 200)?;
        agent.step(Transition::new(&state(200), &[0.0; SIZE_ACTION], 1.0, &state(201), true));
        assert!(agent.replay().len() > config.training_batch_size);

        let ac = agent.actor_critic();
        let targets_before = [ac.actor().target_parameters()?, ac.critic().target_parameters()?];

        let stats = agent.learn()?.ok_or(anyhow::anyhow!("no update ran"))?;
        assert!(stats.critic_loss.is_finite());
        assert!(stats.actor_loss.is_finite());

        let ac = agent.actor_critic();
        let targets_after = [ac.actor().target_parameters()?, ac.critic().target_parameters()?];
        let online_after = [ac.actor().parameters()?, ac.critic().parameters()?];

        let mut largest_delta = 0.0f32;
        for ((before, after), online) in targets_before
            .iter()
            .zip(targets_after.iter())
            .zip(online_after.iter())
        {
            for (name, before) in before {
                for ((b, a), o) in before.iter().zip(after[name].iter()).zip(online[name].iter()) {
                    let delta = (a - b).abs();
                    largest_delta = largest_delta.max(delta);
                    assert!(delta <= tau * (o - b).abs() + 1e-6, "{name}: {delta}");
                }
            }
        }
        assert!(largest_delta > 0.0);
        Ok(())
    }

    #[test]
    fn prioritized_learning_runs() -> Result<()> {
        let config = DDPGConfig {
            prioritized: true,
            training_batch_size: 32,
            hidden_1_size: 32,
            hidden_2_size: 32,
            update_iterations: 3,
            ..DDPGConfig::reacher()
        };
        let mut agent = DDPG::new(&Device::Cpu, &config, SIZE_STATE, SIZE_ACTION)?;
        feed(&mut agent, 64)?;
        let stats = agent.learn()?.ok_or(anyhow::anyhow!("no update ran"))?;
        assert!(stats.critic_loss.is_finite());
        assert_eq!(agent.replay_len(), 64);
        Ok(())
    }
}
