//! Segmentation synthesizer: analysis queries in, validated segment list out

use super::parser::{decode_entry, raw_entries, DiscardReason, EntryOutcome};
use super::{Segment, SegmentList};
use crate::config::SegmentationConfig;
use crate::error::{Result, SegmenterError};
use crate::indexing::{AnalysisQuery, VideoIndexService};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of normalizing one raw analysis result
#[derive(Debug, Clone, Default)]
pub struct NormalizationReport {
    pub segments: SegmentList,
    pub discarded: Vec<(usize, DiscardReason)>,
}

/// Decode, sort and clip the entries of one raw analysis result
pub fn normalize_segments(raw: &Value, config: &SegmentationConfig) -> NormalizationReport {
    let mut accepted: Vec<(usize, Segment)> = Vec::new();
    let mut discarded = Vec::new();

    for (index, entry) in raw_entries(raw).iter().enumerate() {
        match decode_entry(index, entry, config.max_title_chars) {
            EntryOutcome::Accepted(segment) => accepted.push((index, segment)),
            EntryOutcome::Discarded { index, reason } => discarded.push((index, reason)),
        }
    }

    // stable sort keeps source order for identical intervals
    accepted.sort_by(|(_, a), (_, b)| {
        a.start
            .partial_cmp(&b.start)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.end.partial_cmp(&b.end).unwrap_or(std::cmp::Ordering::Equal))
    });

    let epsilon = config.overlap_epsilon_seconds;
    let mut kept: Vec<(usize, Segment)> = Vec::with_capacity(accepted.len());

    for (index, segment) in accepted {
        while let Some((last_index, last)) = kept.last_mut() {
            if last.end - segment.start <= epsilon {
                break;
            }
            last.end = segment.start;
            if last.end > last.start {
                break;
            }
            discarded.push((*last_index, DiscardReason::Overlapped));
            kept.pop();
        }
        kept.push((index, segment));
    }

    discarded.sort_by_key(|(index, _)| *index);

    NormalizationReport {
        segments: SegmentList::from_normalized(kept.into_iter().map(|(_, s)| s).collect()),
        discarded,
    }
}

/// Issues analysis queries for an asset and turns the answers into segments
#[derive(Clone)]
pub struct SegmentSynthesizer {
    service: Arc<dyn VideoIndexService>,
    config: SegmentationConfig,
}

impl SegmentSynthesizer {
    pub fn new(service: Arc<dyn VideoIndexService>, config: SegmentationConfig) -> Self {
        Self { service, config }
    }

    fn queries(&self) -> Vec<AnalysisQuery> {
        let mut queries = vec![AnalysisQuery::Chapters];
        if self.config.enable_prompt_fallback && !self.config.topic_prompt.trim().is_empty() {
            queries.push(AnalysisQuery::Prompt(self.config.topic_prompt.clone()));
        }
        queries
    }

    /// Query the asset and return its chronological, non-overlapping segments.
    ///
    /// Queries run in order until one yields at least one valid segment.
    /// Query failures are not retried.
    pub async fn synthesize_segments(&self, asset_id: &str) -> Result<SegmentList> {
        let mut discarded_total = 0;

        for query in self.queries() {
            let raw = self
                .service
                .analyze(asset_id, &query)
                .await
                .map_err(SegmenterError::AnalysisQuery)?;

            let report = normalize_segments(&raw, &self.config);

            for (index, reason) in &report.discarded {
                warn!("⚠️ Discarded {} entry #{} for asset {}: {}", query.label(), index, asset_id, reason);
            }
            discarded_total += report.discarded.len();

            if !report.segments.is_empty() {
                info!(
                    "✅ {} segments from {} query for asset {}",
                    report.segments.len(),
                    query.label(),
                    asset_id
                );
                return Ok(report.segments);
            }

            debug!("No usable segments from {} query for asset {}", query.label(), asset_id);
        }

        Err(SegmenterError::EmptySegmentation {
            asset_id: asset_id.to_string(),
            discarded: discarded_total,
        })
    }
}
