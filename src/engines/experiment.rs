use {
    super::train::loop_off_policy,
    crate::{
        agents::{
            Algorithm,
            OffPolicyAlgorithm,
            TrainConfig,
        },
        envs::Environment,
        util::write_config,
    },
    anyhow::{
        anyhow,
        Result,
    },
    candle_core::Device,
    polars::prelude::{
        DataFrame,
        NamedFrom,
        ParquetWriter,
        Series,
    },
    serde::Serialize,
    std::{
        fs::{
            create_dir_all,
            File,
        },
        path::{
            Path,
            PathBuf,
        },
    },
    tracing::warn,
};

/// Run an experiment with an off-policy algorithm.
///
/// The configs are written to `path` as RON, then every repetition trains a
/// fresh agent and writes its per-episode scores to `run_{n}_data.parquet`.
/// Checkpoints of solved runs land in `run_{n}/`.
///
/// # Arguments
///
/// * `path` - The directory where the collected data will be stored.
/// * `n_repetitions` - The number of repeated runs to perform.
/// * `env_config` - The configuration for the environment.
/// * `alg_config` - The configuration for the algorithm.
/// * `train_config` - The configuration for the training loop.
/// * `load_model` - Actor and critic weights to start every run from.
/// * `seed` - Base seed, run `n` uses `seed + n`.
/// * `device` - The device to run the experiment on.
#[allow(clippy::too_many_arguments)]
pub fn run_experiment_off_policy<Alg, Env>(
    path: &dyn AsRef<Path>,
    n_repetitions: usize,
    env_config: Env::Config,
    alg_config: Alg::Config,
    train_config: TrainConfig,
    load_model: Option<(PathBuf, PathBuf)>,
    seed: u64,
    device: &Device,
) -> Result<Vec<Vec<f64>>>
where
    Env: Environment,
    Env::Config: Clone + Serialize,
    Alg: Algorithm + OffPolicyAlgorithm,
    Alg::Config: Clone + Serialize,
{
    let path = path.as_ref();
    train_config.validate()?;

    let alg_config_exists = path.join("config_algorithm.ron").try_exists()?;
    let env_config_exists = path.join("config_environment.ron").try_exists()?;
    if alg_config_exists || env_config_exists {
        Err(anyhow!(concat!(
            "Config files already exist in this directory!\n",
            "I am assuming I would be overwriting existing data!",
        )))?
    }

    create_dir_all(path)?;
    write_config(&alg_config, path.join("config_algorithm.ron"))?;
    write_config(&env_config, path.join("config_environment.ron"))?;
    write_config(&train_config, path.join("config_training.ron"))?;

    let mut all_scores = Vec::with_capacity(n_repetitions);
    for n in 0..n_repetitions {
        warn!("Collecting data, run {n}/{n_repetitions}");

        let mut env = *Env::new(env_config.clone())?;
        let mut alg = *Alg::from_config(
            device,
            &alg_config,
            env.observation_space(),
            env.action_space(),
        )?;

        if let Some((actor_path, critic_path)) = &load_model {
            warn!("Loading model weights from {actor_path:?} and {critic_path:?}");
            alg.load(actor_path, critic_path)?;
        }

        let run_dir = path.join(format!("run_{n}"));
        create_dir_all(&run_dir)?;
        let outcome = loop_off_policy(
            &mut env,
            &mut alg,
            &train_config,
            &run_dir,
            seed.wrapping_add(n as u64),
        )?;

        match outcome.solved_in {
            Some(episode) => warn!("run {n} solved in {episode} episodes"),
            None => warn!("run {n} did not reach the target score"),
        }

        let episodes: Vec<u32> = (1..=outcome.scores.len() as u32).collect();
        let mut df = DataFrame::new(vec![
            Series::new(
                &format!("run_{n}_episode"),
                &episodes,
            ),
            Series::new(
                &format!("run_{n}_total_rewards"),
                &outcome.scores,
            ),
        ])?;

        ParquetWriter::new(
            File::create(path.join(format!("run_{n}_data.parquet")))?
        ).finish(&mut df)?;

        all_scores.push(outcome.scores);
    }
    Ok(all_scores)
}
