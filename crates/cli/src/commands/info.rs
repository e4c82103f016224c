//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration information for display
#[derive(Serialize)]
struct ConfigInfo {
    config_path: String,
    source: SourceInfo,
    detection: DetectionInfo,
    qos: QosInfo,
    topics: TopicsInfo,
    metrics: MetricsInfo,
    log_path: String,
}

#[derive(Serialize)]
struct SourceInfo {
    uri: String,
    camera_id: String,
    target_fps: Option<f64>,
}

#[derive(Serialize)]
struct DetectionInfo {
    model: String,
    target_class: u32,
    confidence_threshold: f32,
    label: String,
}

#[derive(Serialize)]
struct QosInfo {
    reliability: String,
    durability: String,
    min_separation_seconds: f64,
    queue_depth: usize,
}

#[derive(Serialize)]
struct TopicsInfo {
    frames: String,
    counts: String,
}

#[derive(Serialize)]
struct MetricsInfo {
    throughput_window_seconds: f64,
    throughput_history_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Reading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let config_info = ConfigInfo {
        config_path: args.config.display().to_string(),
        source: SourceInfo {
            uri: blueprint.source.uri.clone(),
            camera_id: blueprint.source.camera_id.clone(),
            target_fps: blueprint.source.target_fps,
        },
        detection: DetectionInfo {
            model: blueprint.detection.model.clone(),
            target_class: blueprint.detection.target_class,
            confidence_threshold: blueprint.detection.confidence_threshold,
            label: blueprint.detection.label.clone(),
        },
        qos: QosInfo {
            reliability: blueprint.qos.reliability.to_string(),
            durability: blueprint.qos.durability.to_string(),
            min_separation_seconds: blueprint.qos.min_separation_seconds,
            queue_depth: blueprint.qos.queue_depth,
        },
        topics: TopicsInfo {
            frames: blueprint.topics.frames.clone(),
            counts: blueprint.topics.counts.clone(),
        },
        metrics: MetricsInfo {
            throughput_window_seconds: blueprint.metrics.throughput_window_seconds,
            throughput_history_capacity: blueprint.metrics.throughput_history_capacity,
        },
        log_path: blueprint.log.path.display().to_string(),
    };

    if args.json {
        let json =
            serde_json::to_string_pretty(&config_info).context("Failed to serialize info")?;
        println!("{}", json);
    } else {
        print_info(&config_info);
    }

    Ok(())
}

fn print_info(info: &ConfigInfo) {
    println!("\n=== Configuration: {} ===\n", info.config_path);

    println!("Source:");
    println!("  URI: {}", info.source.uri);
    println!("  Camera: {}", info.source.camera_id);
    match info.source.target_fps {
        Some(fps) => println!("  Target FPS: {fps}"),
        None => println!("  Target FPS: native"),
    }

    println!("\nDetection:");
    println!("  Model: {}", info.detection.model);
    println!("  Target class: {}", info.detection.target_class);
    println!(
        "  Confidence threshold: {}",
        info.detection.confidence_threshold
    );
    println!("  Label: {}", info.detection.label);

    println!("\nQoS:");
    println!("  Reliability: {}", info.qos.reliability);
    println!("  Durability: {}", info.qos.durability);
    println!("  Min separation: {}s", info.qos.min_separation_seconds);
    println!("  Queue depth: {}", info.qos.queue_depth);

    println!("\nTopics:");
    println!("  Frames: {}", info.topics.frames);
    println!("  Counts: {}", info.topics.counts);

    println!("\nMetrics:");
    println!(
        "  Throughput window: {}s",
        info.metrics.throughput_window_seconds
    );
    println!(
        "  History capacity: {}",
        info.metrics.throughput_history_capacity
    );

    println!("\nCount log: {}", info.log_path);
    println!();
}
