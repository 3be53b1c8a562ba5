//! Versioned binary plan encoding.
//!
//! Layout: a little-endian `u32` version tag, then a bincode body. The tag is
//! written outside the body so a reader can reject an unknown layout before
//! attempting to decode it.
//!
//! The body is not the JSON-facing record verbatim: bincode rejects serde's
//! tagged enum representations, so property values travel as an
//! externally-tagged mirror and the ordered rows as key/value tuple lists.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::registry::TaskRegistry;
use crate::types::{
    Name, ObjectRef, Plan, PlanExecutionSettings, PlanStatus, PropertyMap, PropertyValue, TaskRef,
    Vector3,
};

use super::record::{PlanRecord, PLAN_RECORD_VERSION};
use super::CodecError;

const VERSION_TAG_LEN: usize = std::mem::size_of::<u32>();

/// Encode a record, version tag first.
pub fn encode_record(record: &PlanRecord) -> Result<Vec<u8>, CodecError> {
    let mut bytes = PLAN_RECORD_VERSION.to_le_bytes().to_vec();
    bytes.extend(bincode::serialize(&BinaryRecord::from(record.clone()))?);
    Ok(bytes)
}

/// Decode a record, verifying the version tag.
pub fn decode_record(bytes: &[u8]) -> Result<PlanRecord, CodecError> {
    if bytes.len() < VERSION_TAG_LEN {
        return Err(CodecError::Truncated);
    }
    let (tag, body) = bytes.split_at(VERSION_TAG_LEN);
    let mut tag_bytes = [0u8; VERSION_TAG_LEN];
    tag_bytes.copy_from_slice(tag);
    let version = u32::from_le_bytes(tag_bytes);
    if version != PLAN_RECORD_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let record: BinaryRecord = bincode::deserialize(body)?;
    Ok(record.into())
}

/// Snapshot and encode a plan.
pub fn encode_plan(plan: &Plan) -> Result<Vec<u8>, CodecError> {
    encode_record(&plan.to_record())
}

/// Decode and rehydrate a plan through the registry.
pub fn decode_plan(bytes: &[u8], registry: &TaskRegistry) -> Result<Plan, CodecError> {
    Plan::from_record(decode_record(bytes)?, registry)
}

/// Externally-tagged stand-in for `PropertyValue` in the binary body.
#[derive(Debug, Serialize, Deserialize)]
enum BinaryValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Name(Name),
    ObjectRef(ObjectRef),
    Vector(Vector3),
    Invalid,
}

impl From<PropertyValue> for BinaryValue {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Bool(v) => Self::Bool(v),
            PropertyValue::Int(v) => Self::Int(v),
            PropertyValue::Float(v) => Self::Float(v),
            PropertyValue::Str(v) => Self::Str(v),
            PropertyValue::Name(v) => Self::Name(v),
            PropertyValue::ObjectRef(v) => Self::ObjectRef(v),
            PropertyValue::Vector(v) => Self::Vector(v),
            PropertyValue::Invalid => Self::Invalid,
        }
    }
}

impl From<BinaryValue> for PropertyValue {
    fn from(value: BinaryValue) -> Self {
        match value {
            BinaryValue::Bool(v) => Self::Bool(v),
            BinaryValue::Int(v) => Self::Int(v),
            BinaryValue::Float(v) => Self::Float(v),
            BinaryValue::Str(v) => Self::Str(v),
            BinaryValue::Name(v) => Self::Name(v),
            BinaryValue::ObjectRef(v) => Self::ObjectRef(v),
            BinaryValue::Vector(v) => Self::Vector(v),
            BinaryValue::Invalid => Self::Invalid,
        }
    }
}

/// One parameter/result row as an ordered key/value list.
type BinaryRow = Vec<(Name, BinaryValue)>;

fn pack_rows(rows: Vec<PropertyMap>) -> Vec<BinaryRow> {
    rows.into_iter()
        .map(|row| row.into_iter().map(|(k, v)| (k, v.into())).collect())
        .collect()
}

fn unpack_rows(rows: Vec<BinaryRow>) -> Vec<PropertyMap> {
    rows.into_iter()
        .map(|row| row.into_iter().map(|(k, v)| (k, v.into())).collect())
        .collect()
}

/// The binary body; field order is the wire layout.
#[derive(Serialize, Deserialize)]
struct BinaryRecord {
    version: u32,
    total_cost: f64,
    current_task_index: u32,
    execution: PlanExecutionSettings,
    status: PlanStatus,
    tasks: Vec<TaskRef>,
    parameters: Vec<BinaryRow>,
    results: Vec<BinaryRow>,
    dependencies: BTreeMap<u32, Vec<u32>>,
}

impl From<PlanRecord> for BinaryRecord {
    fn from(record: PlanRecord) -> Self {
        Self {
            version: record.version,
            total_cost: record.total_cost,
            current_task_index: record.current_task_index,
            execution: record.execution,
            status: record.status,
            tasks: record.tasks,
            parameters: pack_rows(record.parameters),
            results: pack_rows(record.results),
            dependencies: record.dependencies,
        }
    }
}

impl From<BinaryRecord> for PlanRecord {
    fn from(record: BinaryRecord) -> Self {
        Self {
            version: record.version,
            total_cost: record.total_cost,
            current_task_index: record.current_task_index,
            execution: record.execution,
            status: record.status,
            tasks: record.tasks,
            parameters: unpack_rows(record.parameters),
            results: unpack_rows(record.results),
            dependencies: record.dependencies,
        }
    }
}
