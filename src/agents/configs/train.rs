use {
    anyhow::{
        ensure,
        Result,
    },
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
pub struct TrainConfig {
    // The total number of episodes.
    pub max_episodes: usize,
    // Episodes are cut off after this many steps.
    pub max_steps: usize,
    // The number of most recent episodes the score is averaged over.
    pub score_window: usize,
    // The averaged score at which the task counts as solved.
    pub solved_score: f64,
    // Progress is reported every this many episodes.
    pub report_every: usize,
}
impl Default for TrainConfig {
    fn default() -> Self {
        Self::reacher()
    }
}
impl TrainConfig {
    pub fn new(
        max_episodes: usize,
        max_steps: usize,
        score_window: usize,
        solved_score: f64,
        report_every: usize,
    ) -> Self {
        Self {
            max_episodes,
            max_steps,
            score_window,
            solved_score,
            report_every,
        }
    }

    pub fn reacher() -> Self {
        Self {
            max_episodes: 30_000,
            max_steps: 10_000,
            score_window: 100,
            solved_score: 30.0,
            report_every: 100,
        }
    }

    /// Read a config from a RON file, missing fields fall back to [`TrainConfig::reacher`].
    pub fn from_ron(path: &dyn AsRef<Path>) -> Result<Self> {
        let config: Self = ron::from_str(&read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    /// The mean score needs at least one episode to average over.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.score_window > 0, "score_window must be at least 1");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use {
        super::*,
        std::{
            fs::File,
            io::Write,
        },
        tempdir::TempDir,
    };

    #[test]
    fn partial_ron_uses_defaults() -> Result<()> {
        let dir = TempDir::new("train_config")?;
        let path = dir.path().join("train.ron");
        File::create(&path)?.write_all(b"(max_episodes: 5)")?;

        let config = TrainConfig::from_ron(&path)?;
        assert_eq!(config.max_episodes, 5);
        assert_eq!(config.score_window, 100);
        Ok(())
    }

    #[test]
    fn zero_score_window_is_rejected() -> Result<()> {
        let dir = TempDir::new("train_config")?;
        let path = dir.path().join("train.ron");
        File::create(&path)?.write_all(b"(score_window: 0)")?;

        assert!(TrainConfig::from_ron(&path).is_err());
        assert!(TrainConfig::new(10, 10, 0, 1.0, 0).validate().is_err());
        Ok(())
    }
}
