//! Lecture segments and the pipeline that derives them from analysis output
//!
//! Raw analysis results are decoded entry by entry (`parser`), timestamps are
//! coerced to seconds (`timestamp`), and the synthesizer sorts and clips the
//! accepted entries into a [`SegmentList`].

pub mod parser;
pub mod synthesizer;
pub mod timestamp;

pub use parser::{DiscardReason, EntryOutcome};
pub use synthesizer::{normalize_segments, NormalizationReport, SegmentSynthesizer};
pub use timestamp::parse_timestamp;

use serde::{Deserialize, Serialize};

/// A titled time interval within a video
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    /// Start offset in seconds
    pub start: f64,
    /// End offset in seconds, always after `start`
    pub end: f64,
    /// Segment title
    pub title: String,
}

impl Segment {
    pub fn new(title: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            title: title.into(),
            start,
            end,
        }
    }
}

/// Chronologically ordered, non-overlapping segments
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct SegmentList {
    segments: Vec<Segment>,
}

impl SegmentList {
    /// Wrap segments that are already sorted and clipped
    pub(crate) fn from_normalized(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    pub fn as_slice(&self) -> &[Segment] {
        &self.segments
    }

    /// Check ordering, bounds and overlap (beyond `epsilon`) across the list
    pub fn is_well_formed(&self, epsilon: f64) -> bool {
        let bounded = self
            .segments
            .iter()
            .all(|s| s.start >= 0.0 && s.start < s.end && !s.title.trim().is_empty());

        let ordered = self
            .segments
            .windows(2)
            .all(|pair| pair[0].start <= pair[1].start && pair[0].end - pair[1].start <= epsilon);

        bounded && ordered
    }
}

impl<'a> IntoIterator for &'a SegmentList {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
