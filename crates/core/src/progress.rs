//! Live progress events pushed to transfer watchers.
//!
//! Events are transient: they are serialized once, fanned out to whoever is
//! subscribed at that moment, and never persisted or replayed.

use crate::transfer::{progress_percent, TransferId, TransferStatus};
use serde::{Deserialize, Serialize};

/// An event published on a transfer's fan-out channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// Incremental upload progress.
    #[serde(rename_all = "camelCase")]
    Progress {
        transfer_id: TransferId,
        /// Rounded percentage of chunks completed (byte-based for
        /// multi-file transfers).
        progress: u8,
        uploaded_size: i64,
        total_size: i64,
        chunks_completed: i64,
        chunks_total: i64,
    },
    /// The transfer finalized successfully.
    #[serde(rename_all = "camelCase")]
    Complete {
        transfer_id: TransferId,
        progress: u8,
        status: TransferStatus,
    },
    /// The transfer failed.
    #[serde(rename_all = "camelCase")]
    Error {
        transfer_id: TransferId,
        error: String,
    },
}

impl ProgressEvent {
    /// Build a progress event from current counters.
    pub fn progress(
        transfer_id: &TransferId,
        uploaded_size: i64,
        total_size: i64,
        chunks_completed: i64,
        chunks_total: i64,
    ) -> Self {
        let progress = if chunks_total > 0 {
            progress_percent(chunks_completed, chunks_total)
        } else if total_size > 0 {
            // Multi-file transfers have no chunk counts; derive from bytes.
            progress_percent(uploaded_size, total_size)
        } else {
            0
        };
        Self::Progress {
            transfer_id: transfer_id.clone(),
            progress,
            uploaded_size,
            total_size,
            chunks_completed,
            chunks_total,
        }
    }

    /// Build a completion event.
    pub fn complete(transfer_id: &TransferId) -> Self {
        Self::Complete {
            transfer_id: transfer_id.clone(),
            progress: 100,
            status: TransferStatus::Ready,
        }
    }

    /// Build an error event.
    pub fn error(transfer_id: &TransferId, message: impl Into<String>) -> Self {
        Self::Error {
            transfer_id: transfer_id.clone(),
            error: message.into(),
        }
    }

    /// The transfer this event belongs to.
    pub fn transfer_id(&self) -> &TransferId {
        match self {
            Self::Progress { transfer_id, .. }
            | Self::Complete { transfer_id, .. }
            | Self::Error { transfer_id, .. } => transfer_id,
        }
    }

    /// Serialize to the wire representation.
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(|e| crate::Error::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn sample_id() -> TransferId {
        TransferId::parse("abc123def456").unwrap()
    }

    #[test]
    fn test_progress_event_wire_shape() {
        let event = ProgressEvent::progress(&sample_id(), 5_000_000, 10_000_000, 1, 2);
        let json: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["transferId"], "abc123def456");
        assert_eq!(json["progress"], 50);
        assert_eq!(json["uploadedSize"], 5_000_000);
        assert_eq!(json["totalSize"], 10_000_000);
        assert_eq!(json["chunksCompleted"], 1);
        assert_eq!(json["chunksTotal"], 2);
    }

    #[test]
    fn test_progress_event_byte_based_when_no_chunks() {
        let event = ProgressEvent::progress(&sample_id(), 300, 1200, 0, 0);
        match event {
            ProgressEvent::Progress { progress, .. } => assert_eq!(progress, 25),
            _ => panic!("expected progress event"),
        }
    }

    #[test]
    fn test_complete_event_wire_shape() {
        let event = ProgressEvent::complete(&sample_id());
        let json: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "complete");
        assert_eq!(json["progress"], 100);
        assert_eq!(json["status"], "ready");
    }

    #[test]
    fn test_error_event_wire_shape() {
        let event = ProgressEvent::error(&sample_id(), "disk full");
        let json: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["error"], "disk full");
    }
}
