//! Configuration validation
//!
//! Rules:
//! - source.uri and source.camera_id non-empty
//! - target_fps, when set, > 0
//! - detection.model is a known variant
//! - confidence_threshold within [0, 1]
//! - qos bounds: min_separation_seconds >= 0 and finite, queue_depth >= 1
//! - topic names non-empty and distinct
//! - metrics window > 0, history capacity >= 1
//! - log path non-empty

use contracts::{ContractError, ModelVariant, PipelineBlueprint};

/// Validate a PipelineBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    validate_source(blueprint)?;
    validate_detection(blueprint)?;
    validate_qos(blueprint)?;
    validate_topics(blueprint)?;
    validate_metrics(blueprint)?;
    validate_log(blueprint)?;
    Ok(())
}

fn validate_source(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    let source = &blueprint.source;
    if source.uri.is_empty() {
        return Err(ContractError::config_validation(
            "source.uri",
            "source uri cannot be empty",
        ));
    }
    if source.camera_id.is_empty() {
        return Err(ContractError::config_validation(
            "source.camera_id",
            "camera_id cannot be empty",
        ));
    }
    if let Some(fps) = source.target_fps {
        if !(fps > 0.0) || !fps.is_finite() {
            return Err(ContractError::config_validation(
                "source.target_fps",
                format!("target_fps must be > 0, got {fps}"),
            ));
        }
    }
    Ok(())
}

fn validate_detection(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    let detection = &blueprint.detection;
    ModelVariant::parse(&detection.model).map_err(|e| {
        ContractError::config_validation("detection.model", e.to_string())
    })?;
    if !(0.0..=1.0).contains(&detection.confidence_threshold) {
        return Err(ContractError::config_validation(
            "detection.confidence_threshold",
            format!(
                "confidence_threshold must be within [0, 1], got {}",
                detection.confidence_threshold
            ),
        ));
    }
    Ok(())
}

fn validate_qos(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    let qos = &blueprint.qos;
    if qos.min_separation_seconds < 0.0 || !qos.min_separation_seconds.is_finite() {
        return Err(ContractError::config_validation(
            "qos.min_separation_seconds",
            format!(
                "min_separation_seconds must be >= 0, got {}",
                qos.min_separation_seconds
            ),
        ));
    }
    if qos.queue_depth == 0 {
        return Err(ContractError::config_validation(
            "qos.queue_depth",
            "queue_depth must be >= 1",
        ));
    }
    Ok(())
}

fn validate_topics(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    let topics = &blueprint.topics;
    if topics.frames.is_empty() {
        return Err(ContractError::config_validation(
            "topics.frames",
            "topic name cannot be empty",
        ));
    }
    if topics.counts.is_empty() {
        return Err(ContractError::config_validation(
            "topics.counts",
            "topic name cannot be empty",
        ));
    }
    if topics.frames == topics.counts {
        return Err(ContractError::config_validation(
            "topics",
            format!(
                "frames and counts topics must be distinct, both are '{}'",
                topics.frames
            ),
        ));
    }
    Ok(())
}

fn validate_metrics(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    let metrics = &blueprint.metrics;
    if !(metrics.throughput_window_seconds > 0.0) || !metrics.throughput_window_seconds.is_finite()
    {
        return Err(ContractError::config_validation(
            "metrics.throughput_window_seconds",
            format!(
                "throughput_window_seconds must be > 0, got {}",
                metrics.throughput_window_seconds
            ),
        ));
    }
    if metrics.throughput_history_capacity == 0 {
        return Err(ContractError::config_validation(
            "metrics.throughput_history_capacity",
            "throughput_history_capacity must be >= 1",
        ));
    }
    Ok(())
}

fn validate_log(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    if blueprint.log.path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "log.path",
            "log path cannot be empty",
        ));
    }
    Ok(())
}
