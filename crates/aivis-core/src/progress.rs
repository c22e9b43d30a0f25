//! Completion progress of a project's background prompt analysis.

use serde::{Deserialize, Serialize};

/// Highest progress value a non-terminal check may report. The remaining
/// range is reserved for the completion staging (95, 98, 100).
pub const PROGRESS_CEILING: f64 = 90.0;

/// How many of a project's prompts have been analyzed.
///
/// Serialized with the wire names used by the completion check endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    #[serde(rename = "processedPrompts")]
    pub processed_units: u32,
    #[serde(rename = "totalPrompts")]
    pub total_units: u32,
    pub all_processed: bool,
}

impl JobProgress {
    /// Builds a progress value with `all_processed` derived from the counts.
    ///
    /// `processed` is clamped to `total`. A job with zero total units is never
    /// complete; it is still waiting for prompts to be queued.
    #[must_use]
    pub fn new(processed: u32, total: u32) -> Self {
        let processed_units = processed.min(total);
        Self {
            processed_units,
            total_units: total,
            all_processed: total > 0 && processed_units == total,
        }
    }

    /// Returns `true` if the reported flag agrees with the counts.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.all_processed == (self.total_units > 0 && self.processed_units == self.total_units)
    }
}

/// Progress estimate for a non-terminal check: `min(90, processed/total * 90)`.
///
/// Returns `None` when `total_units == 0`, meaning "leave progress unchanged".
#[must_use]
pub fn estimate_progress(progress: &JobProgress) -> Option<f64> {
    if progress.total_units == 0 {
        return None;
    }
    let ratio = f64::from(progress.processed_units) / f64::from(progress.total_units);
    Some((ratio * PROGRESS_CEILING).min(PROGRESS_CEILING))
}

/// Human-readable status line for a check result.
#[must_use]
pub fn status_message(progress: &JobProgress) -> String {
    if progress.total_units == 0 {
        "Waiting for prompts to be queued...".to_string()
    } else {
        format!(
            "Analyzed {} of {} prompts",
            progress.processed_units, progress.total_units
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_total_is_never_all_processed() {
        let p = JobProgress::new(0, 0);
        assert!(!p.all_processed);
        assert!(p.is_consistent());
    }

    #[test]
    fn all_processed_when_counts_match() {
        let p = JobProgress::new(10, 10);
        assert!(p.all_processed);
    }

    #[test]
    fn processed_is_clamped_to_total() {
        let p = JobProgress::new(12, 10);
        assert_eq!(p.processed_units, 10);
        assert!(p.all_processed);
    }

    #[test]
    fn estimate_scales_to_ninety() {
        let p = JobProgress::new(3, 10);
        let estimate = estimate_progress(&p).unwrap();
        assert!((estimate - 27.0).abs() < 1e-9);
    }

    #[test]
    fn estimate_never_exceeds_ceiling() {
        let p = JobProgress::new(10, 10);
        assert!((estimate_progress(&p).unwrap() - PROGRESS_CEILING).abs() < 1e-9);
    }

    #[test]
    fn estimate_is_none_without_units() {
        assert!(estimate_progress(&JobProgress::new(0, 0)).is_none());
    }

    #[test]
    fn estimate_is_monotonic_in_processed_count() {
        let mut last = 0.0;
        for processed in 0..=40 {
            let estimate = estimate_progress(&JobProgress::new(processed, 40)).unwrap();
            assert!(estimate >= last, "{estimate} < {last} at {processed}");
            last = estimate;
        }
    }

    #[test]
    fn status_message_reports_counts_or_waiting() {
        assert_eq!(
            status_message(&JobProgress::new(3, 10)),
            "Analyzed 3 of 10 prompts"
        );
        assert!(status_message(&JobProgress::new(0, 0)).starts_with("Waiting"));
    }

    #[test]
    fn serializes_with_wire_names() {
        let json = serde_json::to_value(JobProgress::new(3, 10)).unwrap();
        assert_eq!(json["processedPrompts"], 3);
        assert_eq!(json["totalPrompts"], 10);
        assert_eq!(json["allProcessed"], false);
    }

    #[test]
    fn inconsistent_wire_payload_is_detected() {
        let p: JobProgress = serde_json::from_value(serde_json::json!({
            "processedPrompts": 0,
            "totalPrompts": 0,
            "allProcessed": true
        }))
        .unwrap();
        assert!(!p.is_consistent());
    }
}
