use anyhow::{Context, Result};
use clap::Parser;
use npubench::cli::Cli;
use npubench_backend_ort::OrtBackend;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log)?;

    let config = cli.run_config();
    let backend = OrtBackend::new();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    npubench::run(&backend, &config, &mut out)?;

    Ok(())
}

fn init_tracing(directive: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log filter `{directive}`"))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
