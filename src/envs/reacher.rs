use {
    super::{
        Environment,
        Step,
    },
    anyhow::{
        anyhow,
        Result,
    },
    rand::{
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    std::f64::consts::{
        FRAC_PI_2,
        PI,
    },
    tracing::trace,
};

type Vec3 = [f64; 3];
type Quat = [f64; 4];

fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn scale(a: Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn distance(a: Vec3, b: Vec3) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
}

/// Unit vector pointing along `yaw` (around z) and `pitch` (up from the xy-plane).
fn direction(yaw: f64, pitch: f64) -> Vec3 {
    [pitch.cos() * yaw.cos(), pitch.cos() * yaw.sin(), pitch.sin()]
}

/// Rotation of the x-axis onto `direction(yaw, pitch)`, as (w, x, y, z).
fn orientation(yaw: f64, pitch: f64) -> Quat {
    // yaw about z, then pitch about the (rotated) negative y-axis
    let (cy, sy) = ((yaw / 2.0).cos(), (yaw / 2.0).sin());
    let (cp, sp) = ((-pitch / 2.0).cos(), (-pitch / 2.0).sin());
    [cy * cp, -sy * sp, cy * sp, sy * cp]
}

/// Angular velocity of a link given the rates of its absolute yaw and pitch.
fn angular_velocity(yaw: f64, yaw_rate: f64, pitch_rate: f64) -> Vec3 {
    add([0.0, 0.0, yaw_rate], scale([yaw.sin(), -yaw.cos(), 0.0], pitch_rate))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReacherConfig {
    // Length of the upper and the lower arm.
    pub link_lengths: (f64, f64),
    // Radius of the goal sphere the hand has to stay in.
    pub goal_radius: f64,
    // Goals are placed at a horizontal distance in this range from the base.
    pub goal_distance: (f64, f64),
    // Height range of the goal.
    pub goal_height: (f64, f64),
    // Angular speed range of the goal around the base.
    pub goal_speed: (f64, f64),
    // Reward for every step with the hand inside the goal.
    pub reward: f64,
    // Integration step in seconds.
    pub dt: f64,
    // Angular acceleration per unit of action.
    pub torque_gain: f64,
    // Fraction of joint velocity lost per second.
    pub damping: f64,
    // Episodes are truncated after this many steps.
    pub timelimit: usize,
}
impl Default for ReacherConfig {
    fn default() -> Self {
        Self {
            link_lengths: (1.0, 1.0),
            goal_radius: 0.3,
            goal_distance: (0.8, 1.8),
            goal_height: (-0.5, 0.5),
            goal_speed: (0.0, 0.5),
            reward: 0.1,
            dt: 0.05,
            torque_gain: 10.0,
            damping: 2.0,
            timelimit: 1000,
        }
    }
}

/// A two-link arm that has to keep its hand inside a goal sphere circling
/// around its base.
///
/// Both joints rotate freely in yaw and in pitch, so the action has four
/// torques: (yaw, pitch) of the shoulder followed by (yaw, pitch) of the elbow.
/// The observation has 33 values: for each link its centre, orientation,
/// angular velocity and velocity (13 values each), then the goal position,
/// the hand position and the speed of the goal.
pub struct ReacherEnv {
    config: ReacherConfig,

    // (yaw, pitch) of the shoulder and the elbow, the elbow relative to the shoulder
    angles: [f64; 4],
    rates: [f64; 4],
    link_velocities: [Vec3; 2],

    goal_angle: f64,
    goal_distance: f64,
    goal_height: f64,
    goal_speed: f64,

    timestep: usize,
    rng: StdRng,
}

impl ReacherEnv {
    pub const OBSERVATION_SIZE: usize = 33;
    pub const ACTION_SIZE: usize = 4;

    fn link_centres(&self) -> [Vec3; 2] {
        let (l1, l2) = self.config.link_lengths;
        let d1 = direction(self.angles[0], self.angles[1]);
        let d2 = direction(self.angles[0] + self.angles[2], self.angles[1] + self.angles[3]);
        let elbow = scale(d1, l1);
        [scale(d1, l1 / 2.0), add(elbow, scale(d2, l2 / 2.0))]
    }

    pub fn hand(&self) -> Vec3 {
        let (l1, l2) = self.config.link_lengths;
        let d1 = direction(self.angles[0], self.angles[1]);
        let d2 = direction(self.angles[0] + self.angles[2], self.angles[1] + self.angles[3]);
        add(scale(d1, l1), scale(d2, l2))
    }

    pub fn goal(&self) -> Vec3 {
        [
            self.goal_distance * self.goal_angle.cos(),
            self.goal_distance * self.goal_angle.sin(),
            self.goal_height,
        ]
    }

    pub fn hand_in_goal(&self) -> bool {
        distance(self.hand(), self.goal()) <= self.config.goal_radius
    }

    fn observe(&self) -> Vec<f32> {
        let centres = self.link_centres();
        let yaws = [self.angles[0], self.angles[0] + self.angles[2]];
        let pitches = [self.angles[1], self.angles[1] + self.angles[3]];
        let yaw_rates = [self.rates[0], self.rates[0] + self.rates[2]];
        let pitch_rates = [self.rates[1], self.rates[1] + self.rates[3]];

        let mut obs = Vec::with_capacity(Self::OBSERVATION_SIZE);
        for link in 0..2 {
            obs.extend(centres[link]);
            obs.extend(orientation(yaws[link], pitches[link]));
            obs.extend(angular_velocity(yaws[link], yaw_rates[link], pitch_rates[link]));
            obs.extend(self.link_velocities[link]);
        }
        obs.extend(self.goal());
        obs.extend(self.hand());
        obs.push(self.goal_speed);
        obs.into_iter().map(|x| x as f32).collect()
    }
}

impl Environment for ReacherEnv {
    type Config = ReacherConfig;

    fn config(&self) -> &ReacherConfig {
        &self.config
    }

    fn new(config: ReacherConfig) -> Result<Box<Self>> {
        if config.dt <= 0.0 || config.timelimit == 0 {
            Err(anyhow!("the reacher needs a positive dt and timelimit"))?
        }
        let mut env = Box::new(Self {
            config,
            angles: [0.0; 4],
            rates: [0.0; 4],
            link_velocities: [[0.0; 3]; 2],
            goal_angle: 0.0,
            goal_distance: 1.0,
            goal_height: 0.0,
            goal_speed: 0.0,
            timestep: 0,
            rng: StdRng::seed_from_u64(0),
        });
        env.reset(0)?;
        Ok(env)
    }

    fn reset(
        &mut self,
        seed: u64,
    ) -> Result<Vec<f32>> {
        self.rng = StdRng::seed_from_u64(seed);
        let c = &self.config;

        self.angles = [
            self.rng.gen_range(-PI..PI),
            self.rng.gen_range(-0.3..0.3),
            self.rng.gen_range(-1.0..1.0),
            self.rng.gen_range(-0.3..0.3),
        ];
        self.rates = [0.0; 4];
        self.link_velocities = [[0.0; 3]; 2];

        self.goal_angle = self.rng.gen_range(-PI..PI);
        self.goal_distance = self.rng.gen_range(c.goal_distance.0..=c.goal_distance.1);
        self.goal_height = self.rng.gen_range(c.goal_height.0..=c.goal_height.1);
        self.goal_speed = self.rng.gen_range(c.goal_speed.0..=c.goal_speed.1);
        self.timestep = 0;

        Ok(self.observe())
    }

    fn step(
        &mut self,
        action: &[f32],
    ) -> Result<Step> {
        if action.len() != Self::ACTION_SIZE {
            Err(anyhow!(
                "expected {} action values, got {}",
                Self::ACTION_SIZE,
                action.len(),
            ))?
        }
        let dt = self.config.dt;
        let before = self.link_centres();

        for (j, &a) in action.iter().enumerate() {
            let torque = (a as f64).clamp(-1.0, 1.0) * self.config.torque_gain;
            self.rates[j] += (torque - self.config.damping * self.rates[j]) * dt;
            self.angles[j] += self.rates[j] * dt;
        }
        // neither joint can pitch past vertical
        for j in [1, 3] {
            if self.angles[j].abs() > FRAC_PI_2 {
                self.angles[j] = self.angles[j].clamp(-FRAC_PI_2, FRAC_PI_2);
                self.rates[j] = 0.0;
            }
        }

        let after = self.link_centres();
        for link in 0..2 {
            for k in 0..3 {
                self.link_velocities[link][k] = (after[link][k] - before[link][k]) / dt;
            }
        }

        self.goal_angle = (self.goal_angle + self.goal_speed * dt) % (2.0 * PI);
        self.timestep += 1;

        let reward = if self.hand_in_goal() { self.config.reward } else { 0.0 };
        let truncated = self.timestep >= self.config.timelimit;

        trace!(timestep = self.timestep, reward, "reacher step");

        Ok(Step {
            observation: self.observe(),
            reward,
            terminated: false,
            truncated,
        })
    }

    fn timelimit(&self) -> usize {
        self.config.timelimit
    }

    fn action_space(&self) -> usize {
        Self::ACTION_SIZE
    }

    fn observation_space(&self) -> usize {
        Self::OBSERVATION_SIZE
    }

    fn current_observation(&self) -> Vec<f32> {
        self.observe()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observation_layout() -> Result<()> {
        let mut env = *ReacherEnv::new(ReacherConfig::default())?;
        let obs = env.reset(3)?;
        assert_eq!(obs.len(), ReacherEnv::OBSERVATION_SIZE);

        let goal = env.goal();
        let hand = env.hand();
        for k in 0..3 {
            assert!((obs[26 + k] - goal[k] as f32).abs() < 1e-6);
            assert!((obs[29 + k] - hand[k] as f32).abs() < 1e-6);
        }

        // orientations are unit quaternions
        for start in [3, 16] {
            let norm: f32 = obs[start..start + 4].iter().map(|q| q * q).sum();
            assert!((norm - 1.0).abs() < 1e-5);
        }
        Ok(())
    }

    #[test]
    fn orientation_rotates_x_axis_onto_direction() {
        let (yaw, pitch) = (0.7, -0.4);
        let [w, x, y, z] = orientation(yaw, pitch);
        // first column of the rotation matrix of (w, x, y, z)
        let rotated = [
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y + w * z),
            2.0 * (x * z - w * y),
        ];
        let expected = direction(yaw, pitch);
        for k in 0..3 {
            assert!((rotated[k] - expected[k]).abs() < 1e-9);
        }
    }

    #[test]
    fn truncates_at_timelimit() -> Result<()> {
        let mut env = *ReacherEnv::new(ReacherConfig {
            timelimit: 5,
            ..Default::default()
        })?;
        env.reset(0)?;
        for t in 1..=5 {
            let step = env.step(&[0.5, -0.5, 0.2, 0.0])?;
            assert!(!step.terminated);
            assert_eq!(step.truncated, t == 5);
            assert_eq!(step.done(), t == 5);
        }
        Ok(())
    }

    #[test]
    fn rewards_hand_inside_goal() -> Result<()> {
        let mut env = *ReacherEnv::new(ReacherConfig::default())?;
        env.reset(1)?;

        // park the goal on the hand
        let hand = env.hand();
        env.goal_distance = (hand[0] * hand[0] + hand[1] * hand[1]).sqrt();
        env.goal_angle = hand[1].atan2(hand[0]);
        env.goal_height = hand[2];
        env.goal_speed = 0.0;

        let step = env.step(&[0.0; 4])?;
        assert_eq!(step.reward, 0.1);

        env.goal_height += 10.0;
        let step = env.step(&[0.0; 4])?;
        assert_eq!(step.reward, 0.0);
        Ok(())
    }

    #[test]
    fn rejects_wrong_action_size() -> Result<()> {
        let mut env = *ReacherEnv::new(ReacherConfig::default())?;
        assert!(env.step(&[0.0; 3]).is_err());
        Ok(())
    }

    #[test]
    fn reset_is_seeded() -> Result<()> {
        let mut env = *ReacherEnv::new(ReacherConfig::default())?;
        let a = env.reset(42)?;
        env.step(&[1.0; 4])?;
        let b = env.reset(42)?;
        assert_eq!(a, b);
        Ok(())
    }
}
