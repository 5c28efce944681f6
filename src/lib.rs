pub mod error;
pub mod logging;
pub mod util;

pub mod envs;
pub mod components;
pub mod agents;
pub mod engines;

pub mod cli;
