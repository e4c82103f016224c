//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::ShutdownToken;
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    // Load and parse configuration
    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(ref source) = args.source {
        info!(source = %source, "Overriding source URI from CLI");
        blueprint.source.uri = source.clone();
    }
    if let Some(ref camera_id) = args.camera_id {
        info!(camera_id = %camera_id, "Overriding camera id from CLI");
        blueprint.source.camera_id = camera_id.clone();
    }
    if let Some(ref model) = args.model {
        info!(model = %model, "Overriding model variant from CLI");
        blueprint.detection.model = model.clone();
    }
    if let Some(ref log_path) = args.log_path {
        info!(log_path = %log_path.display(), "Overriding count log path from CLI");
        blueprint.log.path = log_path.clone();
    }
    if let Some(fps) = args.target_fps {
        info!(fps, "Overriding publish rate from CLI");
        blueprint.source.target_fps = Some(fps);
    }

    info!(
        source = %blueprint.source.uri,
        camera_id = %blueprint.source.camera_id,
        model = %blueprint.detection.model,
        log = %blueprint.log.path.display(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        max_frames: if args.max_frames == 0 {
            None
        } else {
            Some(args.max_frames)
        },
        duration: if args.duration == 0 {
            None
        } else {
            Some(Duration::from_secs(args.duration))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
        ..PipelineConfig::new(blueprint)
    };

    // Create the pipeline and its shutdown token
    let pipeline = Pipeline::new(pipeline_config);
    let token = ShutdownToken::new();

    // Interrupt fires the token; the pipeline then drains and releases
    // its resources instead of being torn down mid-flight
    let signal_token = token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Received shutdown signal, stopping pipeline...");
        signal_token.shutdown();
    });

    info!("Starting pipeline...");

    let stats = pipeline
        .run(token)
        .await
        .map_err(|e| CliError::pipeline_execution(format!("{e:#}")))?;

    info!(
        frames_published = stats.frames_published,
        counts_published = stats.counts_published,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Pipeline completed successfully"
    );

    // Print detailed statistics
    stats.print_summary();

    info!("Crowdmeter finished");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::PipelineBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Source:");
    println!("  URI: {}", blueprint.source.uri);
    println!("  Camera: {}", blueprint.source.camera_id);
    if let Some(fps) = blueprint.source.target_fps {
        println!("  Target FPS: {fps}");
    }

    println!("\nDetection:");
    println!("  Model: {}", blueprint.detection.model);
    println!("  Target class: {}", blueprint.detection.target_class);
    println!(
        "  Confidence threshold: {}",
        blueprint.detection.confidence_threshold
    );

    println!("\nTopics:");
    println!(
        "  {} -> {} ({})",
        blueprint.topics.frames, blueprint.topics.counts, blueprint.qos
    );

    println!("\nMetrics:");
    println!(
        "  Window: {}s, history capacity: {}",
        blueprint.metrics.throughput_window_seconds, blueprint.metrics.throughput_history_capacity
    );

    println!("\nCount log: {}", blueprint.log.path.display());
    println!();
}
