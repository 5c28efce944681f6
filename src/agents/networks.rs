use {
    crate::error::AgentError,
    anyhow::{
        anyhow,
        Result,
    },
    candle_core::{
        DType,
        Device,
        Module,
        Tensor,
        Var,
    },
    candle_nn::{
        func,
        linear,
        sequential::seq,
        Activation,
        Sequential,
        VarBuilder,
        VarMap,
    },
    std::{
        collections::{
            BTreeMap,
            HashMap,
        },
        path::Path,
    },
    tracing::debug,
};

/// Soft update of the target parameters towards the online parameters.
///
/// `target = tau * online + (1 - tau) * target`, by parameter name. Names that
/// are missing from `target` are copied over as they are.
///
/// The online values are detached, so the target tensors never carry any
/// gradient history.
pub fn track(
    target: &mut HashMap<String, Tensor>,
    varmap: &VarMap,
    tau: f64,
) -> Result<()> {
    let online = varmap
        .data()
        .lock()
        .map_err(|_| anyhow!("variable map lock is poisoned"))?;

    for (name, var) in online.iter() {
        let network = var.as_tensor().detach();
        let updated = match target.get(name) {
            Some(current) => ((tau * &network)? + ((1.0 - tau) * current)?)?,
            None => network.copy()?,
        };
        target.insert(name.clone(), updated);
    }
    Ok(())
}

/// ReLU MLP with layers `fc0`, `fc1`, ... as given by `dims`.
///
/// With `max_action` set, the output is squashed by `tanh` and scaled into
/// `[-max_action, max_action]`.
fn make_network(
    vb: &VarBuilder,
    dims: &[(usize, usize)],
    max_action: Option<f64>,
) -> candle_core::Result<Sequential> {
    let mut network = seq();
    for (i, &(in_dim, out_dim)) in dims.iter().enumerate() {
        if i > 0 {
            network = network.add(Activation::Relu);
        }
        network = network.add(linear(in_dim, out_dim, vb.pp(format!("fc{i}")))?);
    }
    if let Some(max_action) = max_action {
        network = network.add(func(move |xs| xs.tanh()? * max_action));
    }
    Ok(network)
}

/// An online network together with its target twin.
///
/// The online parameters are trainable variables in `varmap`. The target
/// parameters are plain tensors, so forward passes through the target network
/// are pure numeric computations that build no backward graph.
struct Tracked {
    varmap: VarMap,
    network: Sequential,
    target: HashMap<String, Tensor>,
    target_network: Sequential,
    dims: Vec<(usize, usize)>,
    max_action: Option<f64>,
    device: Device,
}

impl Tracked {
    fn new(
        device: &Device,
        dims: &[(usize, usize)],
        max_action: Option<f64>,
    ) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let network = make_network(&vb, dims, max_action)?;

        // start with the target equal to the network
        let mut target = HashMap::new();
        track(&mut target, &varmap, 1.0)?;
        let target_network = Self::build_target(&target, dims, max_action, device)?;

        Ok(Self {
            varmap,
            network,
            target,
            target_network,
            dims: dims.to_vec(),
            max_action,
            device: device.clone(),
        })
    }

    fn build_target(
        target: &HashMap<String, Tensor>,
        dims: &[(usize, usize)],
        max_action: Option<f64>,
        device: &Device,
    ) -> Result<Sequential> {
        let vb = VarBuilder::from_tensors(target.clone(), DType::F32, device);
        Ok(make_network(&vb, dims, max_action)?)
    }

    fn track(
        &mut self,
        tau: f64,
    ) -> Result<()> {
        track(&mut self.target, &self.varmap, tau)?;
        self.target_network =
            Self::build_target(&self.target, &self.dims, self.max_action, &self.device)?;
        Ok(())
    }

    fn vars(&self) -> Vec<Var> {
        self.varmap.all_vars()
    }

    fn parameters(&self) -> Result<BTreeMap<String, Vec<f32>>> {
        let online = self
            .varmap
            .data()
            .lock()
            .map_err(|_| anyhow!("variable map lock is poisoned"))?;
        online
            .iter()
            .map(|(name, var)| -> Result<(String, Vec<f32>)> {
                Ok((name.clone(), var.as_tensor().flatten_all()?.to_vec1::<f32>()?))
            })
            .collect()
    }

    fn target_parameters(&self) -> Result<BTreeMap<String, Vec<f32>>> {
        self.target
            .iter()
            .map(|(name, t)| -> Result<(String, Vec<f32>)> {
                Ok((name.clone(), t.flatten_all()?.to_vec1::<f32>()?))
            })
            .collect()
    }

    fn save(
        &self,
        path: &Path,
    ) -> Result<()> {
        debug!("saving parameters to {path:?}");
        self.varmap.save(path)?;
        Ok(())
    }

    /// Read `path` into a separate variable map with this network's layout.
    ///
    /// Fails without touching the network when the file is missing or its
    /// parameters do not match.
    fn read(
        &self,
        path: &Path,
    ) -> Result<Checkpoint> {
        debug!("reading parameters from {path:?}");
        let mut staged = VarMap::new();
        let vb = VarBuilder::from_varmap(&staged, DType::F32, &self.device);
        make_network(&vb, &self.dims, self.max_action)?;
        staged
            .load(path)
            .map_err(|e| AgentError::Deserialization {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(Checkpoint(staged))
    }

    /// Copy a checkpoint into the online parameters and reset the target to
    /// a copy of them.
    fn restore(
        &mut self,
        checkpoint: &Checkpoint,
    ) -> Result<()> {
        {
            let staged = checkpoint
                .0
                .data()
                .lock()
                .map_err(|_| anyhow!("variable map lock is poisoned"))?;
            let online = self
                .varmap
                .data()
                .lock()
                .map_err(|_| anyhow!("variable map lock is poisoned"))?;
            for (name, var) in online.iter() {
                let value = staged
                    .get(name)
                    .ok_or(anyhow!("checkpoint has no parameter {name}"))?;
                var.set(value.as_tensor())?;
            }
        }
        self.target.clear();
        self.track(1.0)
    }
}

/// Parameters read from disk and checked against a network, not applied yet.
pub struct Checkpoint(VarMap);

/// The policy network, mapping states to actions in `[-max_action, max_action]`.
pub struct Actor(Tracked);

impl Actor {
    pub fn new(
        device: &Device,
        size_state: usize,
        size_action: usize,
        hidden_1_size: usize,
        hidden_2_size: usize,
        max_action: f64,
    ) -> Result<Self> {
        Ok(Self(Tracked::new(
            device,
            &[
                (size_state, hidden_1_size),
                (hidden_1_size, hidden_2_size),
                (hidden_2_size, size_action),
            ],
            Some(max_action),
        )?))
    }

    pub fn forward(
        &self,
        state: &Tensor,
    ) -> Result<Tensor> {
        Ok(self.0.network.forward(state)?)
    }

    pub fn target_forward(
        &self,
        state: &Tensor,
    ) -> Result<Tensor> {
        Ok(self.0.target_network.forward(state)?)
    }

    pub fn track(
        &mut self,
        tau: f64,
    ) -> Result<()> {
        self.0.track(tau)
    }

    pub fn vars(&self) -> Vec<Var> {
        self.0.vars()
    }

    pub fn parameters(&self) -> Result<BTreeMap<String, Vec<f32>>> {
        self.0.parameters()
    }

    pub fn target_parameters(&self) -> Result<BTreeMap<String, Vec<f32>>> {
        self.0.target_parameters()
    }

    pub fn save(
        &self,
        path: &Path,
    ) -> Result<()> {
        self.0.save(path)
    }

    pub fn read(
        &self,
        path: &Path,
    ) -> Result<Checkpoint> {
        self.0.read(path)
    }

    pub fn restore(
        &mut self,
        checkpoint: &Checkpoint,
    ) -> Result<()> {
        self.0.restore(checkpoint)
    }
}

/// The value network, mapping a state and an action to a scalar.
pub struct Critic(Tracked);

impl Critic {
    pub fn new(
        device: &Device,
        size_state: usize,
        size_action: usize,
        hidden_1_size: usize,
        hidden_2_size: usize,
    ) -> Result<Self> {
        Ok(Self(Tracked::new(
            device,
            &[
                (size_state + size_action, hidden_1_size),
                (hidden_1_size, hidden_2_size),
                (hidden_2_size, 1),
            ],
            None,
        )?))
    }

    pub fn forward(
        &self,
        state: &Tensor,
        action: &Tensor,
    ) -> Result<Tensor> {
        let xs = Tensor::cat(&[action, state], 1)?;
        Ok(self.0.network.forward(&xs)?)
    }

    pub fn target_forward(
        &self,
        state: &Tensor,
        action: &Tensor,
    ) -> Result<Tensor> {
        let xs = Tensor::cat(&[action, state], 1)?;
        Ok(self.0.target_network.forward(&xs)?)
    }

    pub fn track(
        &mut self,
        tau: f64,
    ) -> Result<()> {
        self.0.track(tau)
    }

    pub fn vars(&self) -> Vec<Var> {
        self.0.vars()
    }

    pub fn parameters(&self) -> Result<BTreeMap<String, Vec<f32>>> {
        self.0.parameters()
    }

    pub fn target_parameters(&self) -> Result<BTreeMap<String, Vec<f32>>> {
        self.0.target_parameters()
    }

    pub fn save(
        &self,
        path: &Path,
    ) -> Result<()> {
        self.0.save(path)
    }

    pub fn read(
        &self,
        path: &Path,
    ) -> Result<Checkpoint> {
        self.0.read(path)
    }

    pub fn restore(
        &mut self,
        checkpoint: &Checkpoint,
    ) -> Result<()> {
        self.0.restore(checkpoint)
    }
}
