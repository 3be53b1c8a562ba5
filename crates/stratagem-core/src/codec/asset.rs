//! Plan asset wrapper for file storage.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::PlanRecord;
use super::CodecError;

/// A plan record plus authoring metadata, stored as JSON.
///
/// Timestamps serialize as ISO-8601 strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanAsset {
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub record: PlanRecord,
}

impl PlanAsset {
    pub fn new(description: impl Into<String>, record: PlanRecord) -> Self {
        let now = Utc::now();
        Self {
            description: description.into(),
            tags: Vec::new(),
            created_at: now,
            modified_at: now,
            record,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Refresh the modification timestamp.
    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }

    pub fn to_json(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, CodecError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the asset to a file as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CodecError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        tracing::debug!(path = %path.display(), "plan asset saved");
        Ok(())
    }

    /// Load an asset from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CodecError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let asset = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), "plan asset loaded");
        Ok(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::super::record::tests::{recorded_task_registry, sample_plan};
    use super::*;
    use crate::types::Plan;

    #[test]
    fn test_json_round_trip() {
        let asset = PlanAsset::new("patrol the walls", sample_plan().to_record())
            .with_tag("guard")
            .with_tag("night");

        let json = asset.to_json().expect("json");
        // ISO-8601 timestamps, not epoch integers.
        let date_prefix = asset.created_at.format("%Y-%m-%dT").to_string();
        assert!(json.contains(&date_prefix));

        let loaded = PlanAsset::from_json(&json).expect("parse");
        assert_eq!(loaded, asset);
        assert_eq!(loaded.tags, vec!["guard", "night"]);
    }

    #[test]
    fn test_save_load_and_rehydrate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("patrol.plan.json");

        let asset = PlanAsset::new("patrol", sample_plan().to_record());
        asset.save(&path).expect("save");

        let loaded = PlanAsset::load(&path).expect("load");
        assert_eq!(loaded.description, "patrol");
        let plan = Plan::from_record(loaded.record, &recorded_task_registry()).expect("plan");
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        assert!(matches!(
            PlanAsset::load("/nonexistent/plan.json"),
            Err(CodecError::Io(_))
        ));
    }

    #[test]
    fn test_touch_moves_modified_at() {
        let mut asset = PlanAsset::new("p", sample_plan().to_record());
        let before = asset.modified_at;
        asset.touch();
        assert!(asset.modified_at >= before);
    }
}
