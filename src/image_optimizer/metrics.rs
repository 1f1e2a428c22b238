//! Per-transform measurements
//!
//! Filled in by the processor and forwarded to the Prometheus registry and
//! the request log by the gateway.

use super::params::TargetFormat;
use std::time::Duration;

/// What a single transform did and how long it took
#[derive(Debug, Clone)]
pub struct TransformMetrics {
    /// Input size in bytes
    pub original_size: usize,
    /// Output size in bytes
    pub processed_size: usize,
    /// Decoded dimensions (width, height)
    pub original_dimensions: (u32, u32),
    /// Encoded dimensions (width, height)
    pub processed_dimensions: (u32, u32),
    /// Output format used
    pub output_format: TargetFormat,
    /// Time spent in the pipeline
    pub processing_time: Duration,
    /// Steps that were applied, in order
    pub transformations: Vec<TransformationType>,
}

/// Pipeline steps that can be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformationType {
    Resize,
    QualityRescale,
    FormatConversion,
}

impl TransformationType {
    /// Get the metric label for this transformation type
    pub fn as_label(&self) -> &'static str {
        match self {
            TransformationType::Resize => "resize",
            TransformationType::QualityRescale => "quality_rescale",
            TransformationType::FormatConversion => "format_conversion",
        }
    }
}

impl TransformMetrics {
    /// Output size divided by input size
    pub fn compression_ratio(&self) -> f64 {
        if self.original_size == 0 {
            0.0
        } else {
            self.processed_size as f64 / self.original_size as f64
        }
    }

    pub fn was_resized(&self) -> bool {
        self.original_dimensions != self.processed_dimensions
    }

    /// Labels of the applied steps, comma separated, for log fields
    pub fn transformation_labels(&self) -> String {
        self.transformations
            .iter()
            .map(|t| t.as_label())
            .collect::<Vec<_>>()
            .join(",")
    }
}
