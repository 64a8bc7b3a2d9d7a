//! Transfer identity and lifecycle types.

use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// Length of a generated transfer id.
const ID_LEN: usize = 12;

/// Maximum accepted id length when parsing external input.
const MAX_ID_LEN: usize = 64;

/// Unique, unguessable identifier for a transfer.
///
/// Generated as 12 alphanumeric characters from a CSPRNG (~71 bits of
/// entropy), short enough to live in a share URL.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(String);

impl TransferId {
    /// Generate a new random transfer ID.
    pub fn new() -> Self {
        let id: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(ID_LEN)
            .map(char::from)
            .collect();
        Self(id)
    }

    /// Parse from a string.
    ///
    /// Ids are embedded in storage keys, so only alphanumeric input is
    /// accepted (rules out separators and traversal sequences).
    pub fn parse(s: &str) -> crate::Result<Self> {
        if s.is_empty() || s.len() > MAX_ID_LEN {
            return Err(crate::Error::InvalidTransferId(format!(
                "id must be 1..={MAX_ID_LEN} characters"
            )));
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(crate::Error::InvalidTransferId(
                "id must be alphanumeric".to_string(),
            ));
        }
        Ok(Self(s.to_string()))
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransferId({})", self.0)
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transfer lifecycle status as stored.
///
/// Expiry is not a stored status: a transfer whose `expires_at` has passed
/// is reported as expired at read time regardless of this value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    /// Created, no data received yet.
    Pending,
    /// At least one chunk or file received.
    Uploading,
    /// Finalized and downloadable.
    Ready,
}

impl TransferStatus {
    /// Check if the transfer is still receiving data.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Uploading)
    }

    /// Database column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Ready => "ready",
        }
    }

    /// Parse a database column value.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "uploading" => Ok(Self::Uploading),
            "ready" => Ok(Self::Ready),
            other => Err(crate::Error::InvalidTransferStatus(other.to_string())),
        }
    }
}

/// How a transfer's payload is delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// One pre-packaged artifact, uploaded as ordered chunks and
    /// reassembled server-side.
    Archive,
    /// Individually addressable files with no client-side packaging.
    #[serde(rename = "multifile")]
    MultiFile,
}

impl TransferMode {
    /// Database column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::MultiFile => "multifile",
        }
    }

    /// Parse a database column value.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "archive" => Ok(Self::Archive),
            "multifile" => Ok(Self::MultiFile),
            other => Err(crate::Error::InvalidTransferMode(other.to_string())),
        }
    }
}

/// Percentage of chunks completed, rounded to the nearest integer.
///
/// Returns 0 when `chunks_total` is 0 (multi-file transfers track bytes,
/// not chunks).
pub fn progress_percent(chunks_completed: i64, chunks_total: i64) -> u8 {
    if chunks_total <= 0 {
        return 0;
    }
    let pct = (chunks_completed as f64 / chunks_total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Check whether an expiry timestamp has passed.
pub fn is_expired(expires_at: OffsetDateTime) -> bool {
    OffsetDateTime::now_utc() > expires_at
}
