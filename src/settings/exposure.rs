//! Location exposure analysis over a user's post history.
//!
//! Each post is weighted by the precision it was disclosed at: an exact post
//! counts fully, an approximate post half, an area-only post not at all. The
//! score is the weighted share of posts, scaled to `0..=100`.

use serde::Serialize;

use super::types::PrecisionTier;

/// Upper bound of a `Low` score (exclusive).
const LOW_THRESHOLD: f64 = 30.0;

/// Upper bound of a `Medium` score (inclusive).
const MEDIUM_THRESHOLD: f64 = 70.0;

/// Coarse classification of an exposure score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExposureLevel {
    /// Score below 30.
    Low,
    /// Score from 30 up to and including 70.
    Medium,
    /// Score above 70.
    High,
}

impl ExposureLevel {
    /// Classifies a score.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score < LOW_THRESHOLD {
            Self::Low
        } else if score <= MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::High
        }
    }

    /// Converts to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Human-readable explanation of the level.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Low => "Your privacy is well protected",
            Self::Medium => "Some of your whereabouts could be inferred",
            Self::High => "Your location is highly exposed",
        }
    }

    /// Indicator color for UI.
    #[must_use]
    pub const fn color(&self) -> &'static str {
        match self {
            Self::Low => "green",
            Self::Medium => "orange",
            Self::High => "red",
        }
    }
}

/// Per-tier post counts and the derived exposure score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExposureReport {
    /// Number of posts analyzed.
    pub total_posts: usize,
    /// Posts disclosed at `Exact`.
    pub exact_posts: usize,
    /// Posts disclosed at `Approximate`.
    pub approximate_posts: usize,
    /// Posts disclosed at `AreaOnly`.
    pub area_only_posts: usize,
    /// Exposure score in `0..=100`.
    pub score: f64,
    /// Level derived from `score`.
    pub level: ExposureLevel,
}

impl ExposureReport {
    /// Report for an empty post history.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            total_posts: 0,
            exact_posts: 0,
            approximate_posts: 0,
            area_only_posts: 0,
            score: 0.0,
            level: ExposureLevel::Low,
        }
    }
}

/// Analyzes `posts`, asking `effective_tier_of` for the tier each post was
/// disclosed at.
///
/// # Examples
///
/// ```
/// use whereabouts_core::settings::{analyze, ExposureLevel, PrecisionTier};
///
/// let tiers = [PrecisionTier::Exact, PrecisionTier::AreaOnly];
/// let report = analyze(&tiers, |tier| *tier);
///
/// assert_eq!(report.score, 50.0);
/// assert_eq!(report.level, ExposureLevel::Medium);
/// ```
#[allow(clippy::cast_precision_loss)]
pub fn analyze<T>(posts: &[T], effective_tier_of: impl Fn(&T) -> PrecisionTier) -> ExposureReport {
    if posts.is_empty() {
        return ExposureReport::empty();
    }

    let mut report = ExposureReport {
        total_posts: posts.len(),
        ..ExposureReport::empty()
    };
    for post in posts {
        match effective_tier_of(post) {
            PrecisionTier::Exact => report.exact_posts += 1,
            PrecisionTier::Approximate => report.approximate_posts += 1,
            PrecisionTier::AreaOnly => report.area_only_posts += 1,
        }
    }

    let total = report.total_posts as f64;
    let exact_ratio = report.exact_posts as f64 / total;
    let approximate_ratio = report.approximate_posts as f64 / total;
    report.score = 50.0f64
        .mul_add(approximate_ratio, 100.0 * exact_ratio)
        .clamp(0.0, 100.0);
    report.level = ExposureLevel::from_score(report.score);

    tracing::debug!(
        total = report.total_posts,
        score = report.score,
        level = report.level.as_str(),
        "Analyzed location exposure"
    );
    report
}
