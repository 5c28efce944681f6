use {
    crate::{
        agents::{
            OffPolicyAlgorithm,
            RunMode,
            TrainConfig,
        },
        components::Transition,
        envs::Environment,
    },
    anyhow::Result,
    rand::{
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    std::{
        collections::VecDeque,
        path::{
            Path,
            PathBuf,
        },
    },
    tracing::{
        info,
        warn,
    },
};

/// What a training run produced.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainOutcome {
    /// Total reward of every episode, in order.
    pub scores: Vec<f64>,
    /// The episode the task counts as solved in, i.e. the first episode of the
    /// window whose mean score crossed the threshold.
    pub solved_in: Option<usize>,
    /// Actor and critic checkpoint written when the task was solved.
    pub checkpoint: Option<(PathBuf, PathBuf)>,
}

/// Mean over the last `window` scores.
pub fn window_mean(window: &VecDeque<f64>) -> f64 {
    if window.is_empty() {
        0.0
    } else {
        window.iter().sum::<f64>() / window.len() as f64
    }
}

/// Train a single run on an environment with an off-policy algorithm.
///
/// Every episode the agent acts with exploration noise and stores each
/// transition; learning happens once the episode is over. Training stops
/// after `config.max_episodes` episodes, or as soon as the mean score over
/// the last `config.score_window` episodes reaches `config.solved_score`,
/// in which case a checkpoint is written to `checkpoint_dir`.
///
/// # Arguments
///
/// * `env` - The environment to train on.
/// * `alg` - The agent to train with.
/// * `config` - The configuration of the training loop.
/// * `checkpoint_dir` - Where to save the agent once solved.
/// * `seed` - Seeds the environment resets.
pub fn loop_off_policy<Alg, Env>(
    env: &mut Env,
    alg: &mut Alg,
    config: &TrainConfig,
    checkpoint_dir: &dyn AsRef<Path>,
    seed: u64,
) -> Result<TrainOutcome>
where
    Env: Environment,
    Alg: OffPolicyAlgorithm,
{
    config.validate()?;
    warn!("action space: {:?}", env.action_space());
    warn!("observation space: {:?}", env.observation_space());

    let mut rng = StdRng::seed_from_u64(seed);
    let mut scores = Vec::new();
    let mut window = VecDeque::with_capacity(config.score_window);

    for episode in 1..=config.max_episodes {
        let mut state = env.reset(rng.gen::<u64>())?;
        alg.reset()?;
        let mut total_reward = 0.0;

        for _ in 0..config.max_steps {
            let action = alg.actions(&state, RunMode::Train)?;
            let step = env.step(&action)?;
            total_reward += step.reward;

            alg.remember(Transition::new(
                &state,
                &action,
                step.reward as f32,
                &step.observation,
                step.done(),
            ));

            state = step.observation;
            if step.terminated || step.truncated {
                break;
            }
        }

        if let Some(stats) = alg.train()? {
            info!(
                episode,
                critic_loss = stats.critic_loss,
                actor_loss = stats.actor_loss,
                "training step"
            );
        }

        scores.push(total_reward);
        if window.len() == config.score_window {
            window.pop_front();
        }
        window.push_back(total_reward);
        let mean_score = window_mean(&window);

        info!("episode {episode} with total reward of {total_reward}");
        if config.report_every > 0 && episode % config.report_every == 0 {
            warn!("episode {episode}\tmean score: {mean_score:.2}");
        }

        if window.len() == config.score_window && mean_score >= config.solved_score {
            let solved_in = episode.saturating_sub(config.score_window);
            warn!("environment solved in {solved_in} episodes!\tmean score: {mean_score:.2}");

            let dir = checkpoint_dir.as_ref();
            let actor_path = dir.join(format!("actor_checkpoint_{solved_in}.safetensors"));
            let critic_path = dir.join(format!("critic_checkpoint_{solved_in}.safetensors"));
            alg.save(&actor_path, &critic_path)?;

            return Ok(TrainOutcome {
                scores,
                solved_in: Some(solved_in),
                checkpoint: Some((actor_path, critic_path)),
            });
        }
    }

    Ok(TrainOutcome {
        scores,
        solved_in: None,
        checkpoint: None,
    })
}


#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            agents::{
                DDPGConfig,
                DDPG,
            },
            envs::Step,
        },
        candle_core::Device,
        tempdir::TempDir,
    };

    /// Pays 1.0 per step and truncates after `timelimit` steps.
    struct CountingEnv {
        timelimit: usize,
        t: usize,
    }

    impl Environment for CountingEnv {
        type Config = usize;

        fn config(&self) -> &usize {
            &self.timelimit
        }

        fn new(timelimit: usize) -> Result<Box<Self>> {
            Ok(Box::new(Self { timelimit, t: 0 }))
        }

        fn reset(&mut self, _seed: u64) -> Result<Vec<f32>> {
            self.t = 0;
            Ok(vec![0.0; 3])
        }

        fn step(&mut self, action: &[f32]) -> Result<Step> {
            assert_eq!(action.len(), 2);
            self.t += 1;
            Ok(Step {
                observation: vec![self.t as f32; 3],
                reward: 1.0,
                terminated: false,
                truncated: self.t >= self.timelimit,
            })
        }

        fn timelimit(&self) -> usize {
            self.timelimit
        }

        fn action_space(&self) -> usize {
            2
        }

        fn observation_space(&self) -> usize {
            3
        }

        fn current_observation(&self) -> Vec<f32> {
            vec![self.t as f32; 3]
        }
    }

    fn small_agent() -> Result<DDPG> {
        let config = DDPGConfig {
            hidden_1_size: 8,
            hidden_2_size: 8,
            training_batch_size: 4,
            update_iterations: 2,
            ..DDPGConfig::reacher()
        };
        DDPG::new(&Device::Cpu, &config, 3, 2)
    }

    #[test]
    fn one_score_per_episode() -> Result<()> {
        let dir = TempDir::new("train")?;
        let mut env = *CountingEnv::new(5)?;
        let mut agent = small_agent()?;
        let config = TrainConfig::new(4, 100, 10, 1e9, 0);

        let outcome = loop_off_policy(&mut env, &mut agent, &config, &dir.path(), 0)?;
        assert_eq!(outcome.scores, vec![5.0; 4]);
        assert_eq!(outcome.solved_in, None);
        assert_eq!(agent.replay().len(), 20);
        Ok(())
    }

    #[test]
    fn max_steps_cuts_episodes() -> Result<()> {
        let dir = TempDir::new("train")?;
        let mut env = *CountingEnv::new(50)?;
        let mut agent = small_agent()?;
        let config = TrainConfig::new(2, 7, 10, 1e9, 0);

        let outcome = loop_off_policy(&mut env, &mut agent, &config, &dir.path(), 0)?;
        assert_eq!(outcome.scores, vec![7.0, 7.0]);
        Ok(())
    }

    #[test]
    fn stops_and_saves_when_solved() -> Result<()> {
        let dir = TempDir::new("train")?;
        let mut env = *CountingEnv::new(3)?;
        let mut agent = small_agent()?;
        let config = TrainConfig::new(50, 100, 2, 3.0, 1);

        let outcome = loop_off_policy(&mut env, &mut agent, &config, &dir.path(), 0)?;
        assert_eq!(outcome.scores.len(), 2);
        assert_eq!(outcome.solved_in, Some(0));

        let (actor, critic) = outcome.checkpoint.ok_or(anyhow::anyhow!("no checkpoint"))?;
        assert!(actor.exists());
        assert!(critic.exists());
        Ok(())
    }

    #[test]
    fn zero_score_window_is_refused() -> Result<()> {
        let dir = TempDir::new("train")?;
        let mut env = *CountingEnv::new(3)?;
        let mut agent = small_agent()?;
        let config = TrainConfig::new(5, 100, 0, 3.0, 0);

        assert!(loop_off_policy(&mut env, &mut agent, &config, &dir.path(), 0).is_err());
        assert_eq!(agent.replay().len(), 0);
        Ok(())
    }

    #[test]
    fn window_mean_of_empty_is_zero() {
        assert_eq!(window_mean(&VecDeque::new()), 0.0);
        assert_eq!(window_mean(&VecDeque::from(vec![1.0, 2.0, 3.0])), 2.0);
    }
}
