//! Startup check that the configured index exists with the required models

use super::{IndexConfig, IndexInfo, IndexSpec, VideoIndexService};
use crate::config::IndexSettings;
use crate::error::{Result, SegmenterError};
use tracing::{info, warn};

/// Resolve the configured index by name, creating it when absent.
///
/// Re-running against an index that already satisfies `settings` makes no
/// changes. An unreachable service, an ambiguous name or an index whose models
/// lack a required capability tag is a [`SegmenterError::Configuration`].
pub async fn verify_index_configuration(
    service: &dyn VideoIndexService,
    settings: &IndexSettings,
) -> Result<IndexConfig> {
    let required = settings.required_capabilities();

    let indexes = service
        .list_indexes()
        .await
        .map_err(|e| SegmenterError::Configuration(format!("cannot list indexes: {}", e)))?;

    let matching: Vec<&IndexInfo> = indexes.iter().filter(|index| index.name == settings.name).collect();

    if matching.len() > 1 {
        let ids: Vec<&str> = matching.iter().map(|index| index.index_id.as_str()).collect();
        warn!("⚠️ Several indexes named '{}': {}", settings.name, ids.join(", "));
        return Err(SegmenterError::Configuration(format!(
            "index name '{}' is ambiguous, matching ids: {}",
            settings.name,
            ids.join(", ")
        )));
    }

    if let Some(index) = matching.first() {

        let available = index.capabilities();
        let missing: Vec<&String> = required.difference(&available).collect();
        if !missing.is_empty() {
            return Err(SegmenterError::Configuration(format!(
                "index '{}' ({}) lacks required capabilities: {}",
                index.name,
                index.index_id,
                missing
                    .iter()
                    .map(|tag| tag.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        info!("✅ Using existing index '{}' ({})", index.name, index.index_id);
        return Ok(IndexConfig {
            index_id: index.index_id.clone(),
            name: index.name.clone(),
            required_engines: required,
        });
    }

    info!("🆕 Index '{}' not found, creating it", settings.name);

    let spec = IndexSpec {
        name: settings.name.clone(),
        engines: settings.engines.clone(),
    };
    let index_id = service
        .create_index(&spec)
        .await
        .map_err(|e| SegmenterError::Configuration(format!("cannot create index '{}': {}", settings.name, e)))?;

    if index_id.trim().is_empty() {
        return Err(SegmenterError::Configuration(format!(
            "service returned an empty id for index '{}'",
            settings.name
        )));
    }

    info!("✅ Created index '{}' ({})", settings.name, index_id);
    Ok(IndexConfig {
        index_id,
        name: settings.name.clone(),
        required_engines: required,
    })
}
