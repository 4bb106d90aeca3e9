use ascii_encoder::{Cli, Pipeline, RenderConfig};

use anyhow::Result;
use clap::Parser;
use log::{error, info};

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let cli = Cli::parse();

    // Validate CLI arguments
    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    info!("Starting ASCII Encoder v{}", env!("CARGO_PKG_VERSION"));

    let config = RenderConfig::default();
    let pipeline = match Pipeline::new(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    // Process all inputs as one batch; the first fatal error stops the run
    for input in &cli.inputs {
        match pipeline.process_file(input, None) {
            Ok(report) => {
                info!(
                    "Wrote {} ({} frames rendered, {} skipped)",
                    report.output_path.display(),
                    report.frames_rendered,
                    report.frames_skipped
                );
            }
            Err(e) => {
                error!("Failed to process {}: {}", input.display(), e);
                std::process::exit(1);
            }
        }
    }

    info!("Batch complete: {} file(s) processed", cli.inputs.len());
    Ok(())
}
