use {
    candle_core::{
        DType,
        Device,
        Result,
        Tensor,
    },
    rand::{
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    rand_distr::StandardNormal,
};

/// Ornstein-Uhlenbeck process used as exploration noise.
///
/// Every call to [`OuNoise::sample`] advances the state by
///
/// `x <- x + theta * (mu - x) + sigma * N(0, 1)`
///
/// so consecutive samples are correlated and drift back towards `mu`.
pub struct OuNoise {
    mu: f64,
    theta: f64,
    sigma: f64,
    size_action: usize,
    state: Tensor,
    rng: StdRng,
}
impl OuNoise {
    pub fn new(
        mu: f64,
        theta: f64,
        sigma: f64,
        size_action: usize,
        seed: u64,
        device: &Device,
    ) -> Result<Self> {
        Ok(Self {
            mu,
            theta,
            sigma,
            size_action,
            state: (Tensor::ones(size_action, DType::F32, device)? * mu)?,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Set the internal state back to the mean.
    pub fn reset(&mut self) -> Result<()> {
        self.state = (self.state.ones_like()? * self.mu)?;
        Ok(())
    }

    pub fn sample(&mut self) -> Result<Tensor> {
        let gaussian: Vec<f32> = (0..self.size_action)
            .map(|_| self.rng.sample::<f32, _>(StandardNormal))
            .collect();
        let rand = Tensor::from_vec(gaussian, self.size_action, self.state.device())?;
        let dx = ((self.theta * (self.mu - &self.state)?)? + (self.sigma * rand)?)?;
        self.state = (&self.state + dx)?;
        Ok(self.state.clone())
    }

    pub fn state(&self) -> &Tensor {
        &self.state
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_returns_to_mean() -> Result<()> {
        let mut noise = OuNoise::new(0.5, 0.15, 0.2, 4, 7, &Device::Cpu)?;
        for _ in 0..20 {
            noise.sample()?;
        }
        noise.reset()?;
        assert_eq!(noise.state().to_vec1::<f32>()?, vec![0.5; 4]);
        Ok(())
    }

    #[test]
    fn same_seed_same_noise() -> Result<()> {
        let mut a = OuNoise::new(0.0, 0.15, 0.2, 4, 42, &Device::Cpu)?;
        let mut b = OuNoise::new(0.0, 0.15, 0.2, 4, 42, &Device::Cpu)?;
        for _ in 0..10 {
            assert_eq!(a.sample()?.to_vec1::<f32>()?, b.sample()?.to_vec1::<f32>()?);
        }
        Ok(())
    }

    #[test]
    fn samples_revert_to_mean() -> Result<()> {
        let (mu, theta, sigma) = (0.0, 0.15, 0.2);
        let mut noise = OuNoise::new(mu, theta, sigma, 4, 1234, &Device::Cpu)?;
        noise.reset()?;

        let n = 10_000;
        let samples = (0..n)
            .map(|_| noise.sample()?.to_vec1::<f32>())
            .collect::<Result<Vec<_>>>()?
            .concat();

        let count = samples.len() as f64;
        let mean = samples.iter().map(|&x| x as f64).sum::<f64>() / count;
        let var = samples
            .iter()
            .map(|&x| (x as f64 - mean).powi(2))
            .sum::<f64>()
            / count;

        // stationary variance of the discretised process
        let stationary = sigma * sigma / (1.0 - (1.0 - theta) * (1.0 - theta));

        assert!((mean - mu).abs() < 0.1, "mean {mean}");
        assert!(var > 0.25 * stationary && var < 2.0 * stationary, "var {var}");
        Ok(())
    }
}
