use {
    anyhow::Result,
    clap::Parser,
    reacher_ddpg::cli::{
        run,
        Args,
    },
};

fn main() -> Result<()> {
    run(Args::parse())
}
