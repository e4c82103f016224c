//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    source_uri: String,
    camera_id: String,
    model: String,
    frames_topic: String,
    counts_topic: String,
    log_path: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    source_uri: blueprint.source.uri.clone(),
                    camera_id: blueprint.source.camera_id.clone(),
                    model: blueprint.detection.model.clone(),
                    frames_topic: blueprint.topics.frames.clone(),
                    counts_topic: blueprint.topics.counts.clone(),
                    log_path: blueprint.log.path.display().to_string(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn collect_warnings(blueprint: &contracts::PipelineBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.detection.confidence_threshold < 0.1 {
        warnings.push(format!(
            "confidence_threshold {} is very low; expect noisy counts",
            blueprint.detection.confidence_threshold
        ));
    }
    if blueprint.qos.min_separation_seconds > 0.0 {
        warnings.push(format!(
            "min_separation_seconds {} throttles deliveries; counts may undercount",
            blueprint.qos.min_separation_seconds
        ));
    }
    if blueprint.qos.queue_depth < 10 {
        warnings.push(format!(
            "queue_depth {} is small; best-effort drops are likely",
            blueprint.qos.queue_depth
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("Configuration is valid: {}", result.config_path);
        if let Some(ref summary) = result.summary {
            println!("  Source: {} ({})", summary.source_uri, summary.camera_id);
            println!("  Model: {}", summary.model);
            println!(
                "  Topics: {} -> {}",
                summary.frames_topic, summary.counts_topic
            );
            println!("  Count log: {}", summary.log_path);
        }
        if let Some(ref warnings) = result.warnings {
            println!("Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("Configuration is INVALID: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("  Error: {}", error);
        }
    }
}
