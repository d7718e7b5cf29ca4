//! Segment validation: clamp, filter, dedup, cap, order.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use vshort_models::{CandidateSegment, SegmentLimits, SelectedSegment};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid source duration {0}")]
    InvalidDuration(f64),

    #[error("None of the {candidates} candidates is usable")]
    NoUsableSegments { candidates: usize },
}

/// Which candidates win when the cap or an overlap forces a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Earlier entries win (analysis returns best first).
    InputOrder,
    /// Higher score wins; ties keep input order.
    Score,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    NotFinite,
    Empty,
    OutOfBounds,
    Duplicate,
    Overlap,
}

/// Turn candidates into the final, start-ordered segment list.
///
/// Every returned segment satisfies `0 <= start < end <= duration` and
/// `limits.accepts(end - start)`. No two returned segments overlap.
pub fn validate(
    candidates: Vec<CandidateSegment>,
    duration: f64,
    limits: &SegmentLimits,
    priority: Priority,
) -> Result<Vec<SelectedSegment>, ValidationError> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(ValidationError::InvalidDuration(duration));
    }
    let total = candidates.len();

    let mut ordered = candidates;
    if priority == Priority::Score {
        // Stable: equal scores keep input order
        ordered.sort_by(|a, b| {
            let a = a.score.unwrap_or(f64::NEG_INFINITY);
            let b = b.score.unwrap_or(f64::NEG_INFINITY);
            b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    let mut accepted: Vec<CandidateSegment> = Vec::new();
    for (position, candidate) in ordered.into_iter().enumerate() {
        if accepted.len() >= limits.max_segments {
            break;
        }
        match check(candidate, duration, limits, &accepted) {
            Ok(candidate) => accepted.push(candidate),
            Err(reason) => debug!(position, reason = ?reason, "Discarded candidate"),
        }
    }

    if accepted.is_empty() {
        return Err(ValidationError::NoUsableSegments { candidates: total });
    }

    accepted.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
    debug!(candidates = total, selected = accepted.len(), "Validated segments");

    Ok(accepted
        .into_iter()
        .enumerate()
        .map(|(i, c)| SelectedSegment::from_candidate(i + 1, c))
        .collect())
}

fn check(
    mut candidate: CandidateSegment,
    duration: f64,
    limits: &SegmentLimits,
    accepted: &[CandidateSegment],
) -> Result<CandidateSegment, Rejection> {
    if !candidate.start.is_finite() || !candidate.end.is_finite() {
        return Err(Rejection::NotFinite);
    }
    candidate.start = candidate.start.max(0.0);
    candidate.end = candidate.end.min(duration);
    if candidate.end <= candidate.start {
        return Err(Rejection::Empty);
    }
    if !limits.accepts(candidate.duration()) {
        return Err(Rejection::OutOfBounds);
    }
    if accepted
        .iter()
        .any(|a| a.start == candidate.start && a.end == candidate.end)
    {
        return Err(Rejection::Duplicate);
    }
    if accepted.iter().any(|a| a.overlaps(&candidate)) {
        return Err(Rejection::Overlap);
    }
    Ok(candidate)
}
