use {
    super::networks::{
        Actor,
        Critic,
    },
    crate::components::ReplayStrategy,
    anyhow::Result,
    candle_core::{
        backprop::GradStore,
        Device,
        Tensor,
        Var,
    },
    candle_nn::{
        loss::mse,
        AdamW,
        Optimizer,
        ParamsAdamW,
    },
    tracing::trace,
};

/// Rescale all gradients so their joint L2 norm is at most `max_norm`.
///
/// Returns the norm before clipping.
pub fn clip_grad_norm(
    grads: &mut GradStore,
    vars: &[Var],
    max_norm: f64,
) -> Result<f64> {
    let mut total_norm_sq = 0.0;
    let mut found = vec![];
    for var in vars {
        if let Some(grad) = grads.get(var.as_tensor()) {
            total_norm_sq += grad.sqr()?.sum_all()?.to_scalar::<f32>()? as f64;
            found.push((var, grad.clone()));
        }
    }

    let total_norm = total_norm_sq.sqrt();
    if total_norm > max_norm {
        let scale = max_norm / (total_norm + 1e-6);
        for (var, grad) in found {
            grads.insert(var.as_tensor(), (grad * scale)?);
        }
    }
    Ok(total_norm)
}

/// Losses of one update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LearnStats {
    pub critic_loss: f64,
    pub actor_loss: f64,
}

/// Actor and critic with their optimizers, and the DDPG update between them.
pub struct ActorCritic {
    actor: Actor,
    actor_optim: AdamW,
    critic: Critic,
    critic_optim: AdamW,
    gamma: f64,
    tau: f64,
    max_grad_norm: f64,
    device: Device,
}

impl ActorCritic {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &Device,
        actor: Actor,
        critic: Critic,
        actor_lr: f64,
        critic_lr: f64,
        critic_weight_decay: f64,
        gamma: f64,
        tau: f64,
        max_grad_norm: f64,
    ) -> Result<Self> {
        let actor_optim = AdamW::new(
            actor.vars(),
            ParamsAdamW {
                lr: actor_lr,
                weight_decay: 0.0,
                ..Default::default()
            },
        )?;
        let critic_optim = AdamW::new(
            critic.vars(),
            ParamsAdamW {
                lr: critic_lr,
                weight_decay: critic_weight_decay,
                ..Default::default()
            },
        )?;
        Ok(Self {
            actor,
            actor_optim,
            critic,
            critic_optim,
            gamma,
            tau,
            max_grad_norm,
            device: device.clone(),
        })
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn actor_mut(&mut self) -> &mut Actor {
        &mut self.actor
    }

    pub fn critic(&self) -> &Critic {
        &self.critic
    }

    pub fn critic_mut(&mut self) -> &mut Critic {
        &mut self.critic
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Deterministic action for a single state, outside of any gradient graph.
    pub fn policy(
        &self,
        state: &[f32],
    ) -> Result<Tensor> {
        // Candle assumes a batch dimension, so when we don't have one we need
        // to pretend we do by un- and resqueezing the state tensor.
        let state = Tensor::from_slice(state, state.len(), &self.device)?.unsqueeze(0)?;
        Ok(self.actor.forward(&state)?.squeeze(0)?.detach())
    }

    /// One learning step on a batch drawn from `replay`.
    ///
    /// The absolute TD errors of the batch are handed back to `replay`, and the
    /// critic loss is weighted by the batch's importance-sampling weights.
    pub fn update(
        &mut self,
        replay: &mut dyn ReplayStrategy,
        batch_size: usize,
    ) -> Result<LearnStats> {
        let batch = replay.sample(batch_size, &self.device)?;

        let next_actions = self.actor.target_forward(&batch.next_states)?;
        let q_next = self.critic.target_forward(&batch.next_states, &next_actions)?;
        let not_done = (1.0 - &batch.dones)?;
        let q_target = (&batch.rewards + ((self.gamma * q_next)? * not_done)?)?.detach();

        let q = self.critic.forward(&batch.states, &batch.actions)?;

        let errors = (&q - &q_target)?.abs()?.flatten_all()?.to_vec1::<f32>()?;
        replay.update(&batch.indices, &errors)?;

        let critic_loss = mse(
            &(&q * &batch.weights)?,
            &(&q_target * &batch.weights)?,
        )?;
        let mut grads = critic_loss.backward()?;
        let grad_norm = clip_grad_norm(&mut grads, &self.critic.vars(), self.max_grad_norm)?;
        self.critic_optim.step(&grads)?;

        let actor_loss = self
            .critic
            .forward(&batch.states, &self.actor.forward(&batch.states)?)?
            .mean_all()?
            .neg()?;
        self.actor_optim.backward_step(&actor_loss)?;

        self.critic.track(self.tau)?;
        self.actor.track(self.tau)?;

        let stats = LearnStats {
            critic_loss: critic_loss.to_scalar::<f32>()? as f64,
            actor_loss: actor_loss.to_scalar::<f32>()? as f64,
        };
        trace!(
            critic_loss = stats.critic_loss,
            actor_loss = stats.actor_loss,
            grad_norm,
            "update"
        );
        Ok(stats)
    }
}
