use clap::Parser;
use tracing_subscriber::{EnvFilter, Registry, filter::Directive, fmt, layer::SubscriberExt};

mod cli;

use cli::{CLI, Options};

fn init_tracing(opts: &Options) -> eyre::Result<()> {
    let log_filter = EnvFilter::builder()
        .with_default_directive(Directive::from(opts.log_level))
        .from_env_lossy();
    let subscriber = Registry::default().with(log_filter).with(fmt::layer());
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let CLI { opts, command } = CLI::parse();
    init_tracing(&opts)?;

    let summary = command.run().await?;
    summary.log();
    if !summary.is_success() {
        eyre::bail!(
            "{} of {} checks failed",
            summary.checks.len() - summary.passed(),
            summary.checks.len()
        );
    }
    Ok(())
}
