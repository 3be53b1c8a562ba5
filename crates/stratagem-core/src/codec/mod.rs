//! Plan persistence
//!
//! Plans serialize as records of task *references*, not task objects; a
//! `TaskRegistry` rebuilds the live tasks on load. Two encodings carry the
//! same logical record: a versioned binary form (explicit version tag, then a
//! bincode body) and JSON for asset storage.

pub mod asset;
pub mod binary;
pub mod record;

use thiserror::Error;

pub use asset::PlanAsset;
pub use binary::{decode_plan, decode_record, encode_plan, encode_record};
pub use record::{PlanRecord, PLAN_RECORD_VERSION};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unsupported plan record version {0}")]
    UnsupportedVersion(u32),
    #[error("encoded plan is truncated")]
    Truncated,
    #[error("no task constructor registered for class path `{0}`")]
    UnknownClassPath(String),
    #[error("binary encoding failed: {0}")]
    Binary(#[from] bincode::Error),
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("asset io failed: {0}")]
    Io(#[from] std::io::Error),
}
