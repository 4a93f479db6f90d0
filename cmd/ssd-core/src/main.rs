use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    tracing_log::LogTracer::init().expect("Failed to set up LogTracer");

    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
    let cli = ssd_core::Cli::parse();
    let layout = ssd_core::app::layout_from(&cli.data_dir, cli.lock_timeout_secs);

    if let Err(e) = match &cli.command {
        ssd_core::Commands::Run { tokens } => {
            tracing::debug!("Running {:?} on {}", tokens, layout.root().display());
            ssd_core::app::run(layout, tokens).map(|_| ())
        }
        ssd_core::Commands::Serve => ssd_core::app::serve(layout).await,
        ssd_core::Commands::Format => ssd_core::app::format(layout),
        ssd_core::Commands::Debug => {
            tracing::info!("Debug info {}", layout.root().display());
            ssd_core::app::debug(layout)
        }
    } {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
