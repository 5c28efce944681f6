use {
    crate::{
        agents::{
            DDPGConfig,
            TrainConfig,
            DDPG,
        },
        engines::run_experiment_off_policy,
        envs::{
            ReacherConfig,
            ReacherEnv,
        },
        logging::setup_logging,
    },
    anyhow::Result,
    candle_core::Device,
    clap::{
        Parser,
        ValueEnum,
    },
    std::path::{
        Path,
        PathBuf,
    },
    tracing::{
        warn,
        Level,
    },
};


#[derive(ValueEnum, Debug, Clone)]
pub enum Loglevel {
    Error, // put these only during active debugging and then downgrade later
    Warn,  // main events in the program
    Info,  // all the little details
    None,  // don't log anything
}
impl Loglevel {
    pub fn level(&self) -> Option<Level> {
        match self {
            Loglevel::Error => Some(Level::ERROR),
            Loglevel::Warn => Some(Level::WARN),
            Loglevel::Info => Some(Level::INFO),
            Loglevel::None => None,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Run on CPU rather than on GPU.
    #[arg(long)]
    pub cpu: bool,

    /// Setup logging
    #[arg(long, value_enum, default_value_t=Loglevel::Warn)]
    pub log: Loglevel,

    /// RON file with the agent config, missing fields use the defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// RON file with the training config, missing fields use the defaults.
    #[arg(long)]
    pub train_config: Option<PathBuf>,

    /// Sample the replay buffer by TD error.
    #[arg(long)]
    pub prioritized: bool,

    /// Number of learning updates after every episode.
    #[arg(long)]
    pub update_iterations: Option<usize>,

    /// Maximum number of episodes per run.
    #[arg(long)]
    pub episodes: Option<usize>,

    /// Seed for the agent and the environment.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of repeated runs.
    #[arg(long, default_value_t = 1)]
    pub runs: usize,

    /// Start every run from these actor and critic weights.
    #[arg(long, num_args = 2, value_names = ["ACTOR", "CRITIC"])]
    pub load: Option<Vec<PathBuf>>,

    /// Directory under data/ to write the results to.
    #[arg(long, default_value = "reacher")]
    pub output: String,
}

impl Args {
    /// The agent config with the command line overrides applied.
    pub fn ddpg_config(&self) -> Result<DDPGConfig> {
        let mut config = match &self.config {
            Some(path) => DDPGConfig::from_ron(path)?,
            None => DDPGConfig::reacher(),
        };
        if self.prioritized {
            config.prioritized = true;
        }
        if let Some(n) = self.update_iterations {
            config.update_iterations = n;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        Ok(config)
    }

    /// The training config with the command line overrides applied.
    pub fn train_config(&self) -> Result<TrainConfig> {
        let mut config = match &self.train_config {
            Some(path) => TrainConfig::from_ron(path)?,
            None => TrainConfig::reacher(),
        };
        if let Some(n) = self.episodes {
            config.max_episodes = n;
        }
        Ok(config)
    }

    pub fn device(&self) -> Result<Device> {
        Ok(if self.cpu {
            Device::Cpu
        } else {
            Device::cuda_if_available(0)?
        })
    }
}

/// Set up logging and run the experiment described by `args`.
pub fn run(args: Args) -> Result<()> {
    let path = Path::new("data/").join(&args.output);
    setup_logging(
        &path.join("debug.log"),
        args.log.level(),
        args.log.level(),
    )?;

    let device = args.device()?;
    let ddpg_config = args.ddpg_config()?;
    let train_config = args.train_config()?;
    let load_model = args
        .load
        .as_ref()
        .map(|paths| (paths[0].clone(), paths[1].clone()));

    warn!("running on {device:?}");
    run_experiment_off_policy::<DDPG, ReacherEnv>(
        &path,
        args.runs,
        ReacherConfig::default(),
        ddpg_config.clone(),
        train_config,
        load_model,
        ddpg_config.seed,
        &device,
    )?;
    Ok(())
}
