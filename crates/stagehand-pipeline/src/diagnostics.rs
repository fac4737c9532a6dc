//! Render pass diagnostics: timing, frame shapes and bound keyword values
//! for each stage.
//!
//! Collected by [`Pipeline::render_with_diagnostics`](crate::Pipeline::render_with_diagnostics)
//! for parameter experimentation. Time is read through a [`Clock`] so the
//! library never touches the system clock itself.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::kwargs::Kwargs;
use crate::param::Value;
use crate::types::Frame;

/// Source of timestamps for diagnostics.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Shape of a frame entering or leaving a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSummary {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Channel count, for images.
    pub channels: Option<u8>,
    /// Segment count, for line sets.
    pub segments: Option<usize>,
}

impl FrameSummary {
    /// Summarize `frame`.
    #[must_use]
    pub fn of(frame: &Frame) -> Self {
        let dimensions = frame.dimensions();
        Self {
            width: dimensions.width,
            height: dimensions.height,
            channels: frame.channel_count(),
            segments: match frame {
                Frame::Lines { segments, .. } => Some(segments.len()),
                Frame::Image(_) => None,
            },
        }
    }
}

impl std::fmt::Display for FrameSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)?;
        if let Some(channels) = self.channels {
            write!(f, "x{channels}")?;
        }
        if let Some(segments) = self.segments {
            write!(f, " ({segments} lines)")?;
        }
        Ok(())
    }
}

/// One keyword argument as bound for a stage run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    /// Keyword name.
    pub name: String,
    /// Bound value.
    pub value: Value,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Display name of the stage.
    pub name: String,
    /// Wall-clock duration of bind + run + display (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Shape of the input frame.
    pub input: FrameSummary,
    /// Shape of the output frame.
    pub output: FrameSummary,
    /// Keyword arguments the operation was called with.
    pub kwargs: Vec<Keyword>,
}

impl StageDiagnostics {
    pub(crate) fn new(name: &str, duration: Duration, input: &Frame, output: &Frame, kwargs: &Kwargs) -> Self {
        Self {
            name: name.to_string(),
            duration,
            input: FrameSummary::of(input),
            output: FrameSummary::of(output),
            kwargs: kwargs
                .iter()
                .map(|(name, value)| Keyword {
                    name: name.to_string(),
                    value: *value,
                })
                .collect(),
        }
    }
}

/// Diagnostics collected from one render pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassDiagnostics {
    /// Per-stage diagnostics, in pipeline order.
    pub stages: Vec<StageDiagnostics>,
    /// Total wall-clock duration of the pass (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

impl PassDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Render Pass Diagnostics\n{}", "=".repeat(60)));
        lines.push(format!(
            "Stages: {}  |  Total duration: {:.3}ms",
            self.stages.len(),
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for stage in &self.stages {
            let ms = duration_ms(stage.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let kwargs: Vec<String> = stage
                .kwargs
                .iter()
                .map(|k| format!("{}={}", k.name, k.value))
                .collect();
            lines.push(format!(
                "{:<24} {ms:>8.3}ms {pct:>9.1}%  {} -> {}  {}",
                stage.name,
                stage.input,
                stage.output,
                kwargs.join(" "),
            ));
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Dimensions, GrayImage, LineSegment};

    fn sample() -> PassDiagnostics {
        let gray = Frame::from(GrayImage::new(100, 80));
        let lines = Frame::Lines {
            dimensions: Dimensions {
                width: 100,
                height: 80,
            },
            segments: vec![LineSegment::new(0, 0, 10, 0)],
        };
        let kwargs: Kwargs = [("threshold", Value::Int(100)), ("ksize", Value::Pair(5, 5))]
            .into_iter()
            .collect();
        PassDiagnostics {
            stages: vec![StageDiagnostics::new(
                "HoughLinesP",
                Duration::from_millis(10),
                &gray,
                &lines,
                &kwargs,
            )],
            total_duration: Duration::from_millis(40),
        }
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let ms = duration_ms(Duration::from_millis(1234));
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn frame_summary_describes_both_shapes() {
        let diag = sample();
        assert_eq!(diag.stages[0].input.to_string(), "100x80x1");
        assert_eq!(diag.stages[0].output.to_string(), "100x80 (1 lines)");
    }

    #[test]
    fn report_lists_stages_and_keywords() {
        let report = sample().report();
        assert!(report.contains("Render Pass Diagnostics"));
        assert!(report.contains("HoughLinesP"));
        assert!(report.contains("threshold=100"));
        assert!(report.contains("ksize=(5, 5)"));
        assert!(report.contains("25.0%"));
    }

    #[test]
    fn json_round_trip_keeps_durations() {
        let json = serde_json::to_string(&sample()).unwrap();
        let back: PassDiagnostics = serde_json::from_str(&json).unwrap();
        assert!((duration_ms(back.total_duration) - 40.0).abs() < 1e-6);
        assert_eq!(back.stages[0].kwargs[1].value, Value::Pair(5, 5));
    }
}
