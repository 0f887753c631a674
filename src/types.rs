//! Common types for C-FIND query execution

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One side of a DICOM exchange as described by the caller.
///
/// The source endpoint needs an AE title and a port; the target endpoint
/// additionally needs a host address. Ports are kept as strings because that
/// is how they arrive in the query description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Application Entity Title
    #[serde(default)]
    pub aet: String,

    /// Host address (target only)
    #[serde(default)]
    pub ip: String,

    /// TCP port
    #[serde(default)]
    pub port: String,
}

impl Endpoint {
    /// Whether this endpoint is usable as the calling side
    pub fn is_valid_source(&self) -> bool {
        !self.aet.is_empty() && !self.port.is_empty()
    }

    /// Whether this endpoint is usable as the called side
    pub fn is_valid_target(&self) -> bool {
        !self.aet.is_empty() && !self.ip.is_empty() && !self.port.is_empty()
    }

    /// Socket address string for the target side
    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

/// One matching key of the outbound query dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTag {
    /// Group and element as up to 8 hex digits, e.g. "00100010"
    pub key: String,

    /// Requested match value; empty requests universal matching
    #[serde(default)]
    pub value: String,
}

/// A validated C-FIND query, owned by one driver run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub source: Endpoint,
    pub target: Endpoint,
    pub tags: Vec<QueryTag>,
}

/// A validated C-ECHO request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoRequest {
    pub source: Endpoint,
    pub target: Endpoint,
}

/// DIMSE operation status as reported in a command response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimseStatus {
    /// Operation completed successfully
    Success,
    /// Operation is pending (more responses to follow)
    Pending,
    /// Operation cancelled
    Cancel,
    /// Operation failed or produced a warning (DICOM status code)
    Failure(u16),
}

impl DimseStatus {
    /// Classify a raw DIMSE status code (DICOM PS3.7 / PS3.4).
    pub fn from_code(code: u16) -> Self {
        match code {
            0x0000 => DimseStatus::Success,
            0xFF00 | 0xFF01 => DimseStatus::Pending,
            0xFE00 => DimseStatus::Cancel,
            other => DimseStatus::Failure(other),
        }
    }

    /// The raw status code this classification came from
    pub fn code(&self) -> u16 {
        match self {
            DimseStatus::Success => 0x0000,
            DimseStatus::Pending => 0xFF00,
            DimseStatus::Cancel => 0xFE00,
            DimseStatus::Failure(code) => *code,
        }
    }
}

/// One decoded PENDING response: group+element key ("GGGGEEEE") to
/// `{"vr": ..., "Value": [...]}`, unique per key
pub type ResultEntry = Map<String, Value>;

/// All decoded PENDING responses of one query, in arrival order
pub type QueryResults = Vec<ResultEntry>;
