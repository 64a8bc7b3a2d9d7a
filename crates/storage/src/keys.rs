//! Storage key layout.
//!
//! One artifact slot per transfer, one chunk scratch prefix per in-progress
//! archive transfer, one files prefix per multi-file transfer:
//!
//! ```text
//! artifacts/{transfer_id}.zip
//! chunks/{transfer_id}/chunk_000000
//! files/{transfer_id}/{stored_name}
//! ```

use freight_core::TransferId;

/// Prefix under which all chunk scratch areas live.
pub const CHUNKS_ROOT: &str = "chunks";

/// Key of a transfer's finalized artifact.
pub fn artifact_key(transfer_id: &TransferId) -> String {
    format!("artifacts/{transfer_id}.zip")
}

/// Key of one chunk slot. Zero-padded so lexicographic listing order equals
/// index order.
pub fn chunk_key(transfer_id: &TransferId, chunk_index: u32) -> String {
    format!("{CHUNKS_ROOT}/{transfer_id}/chunk_{chunk_index:06}")
}

/// Prefix holding a transfer's chunk slots.
pub fn chunk_prefix(transfer_id: &TransferId) -> String {
    format!("{CHUNKS_ROOT}/{transfer_id}")
}

/// Key of an individually uploaded file.
pub fn file_key(transfer_id: &TransferId, stored_name: &str) -> String {
    format!("files/{transfer_id}/{stored_name}")
}

/// Prefix holding a transfer's individually uploaded files.
pub fn files_prefix(transfer_id: &TransferId) -> String {
    format!("files/{transfer_id}")
}

/// Extract the transfer id from a key under [`CHUNKS_ROOT`].
///
/// Used by the retention sweeper to map orphaned chunk slots back to the
/// transfer they belonged to.
pub fn transfer_id_of_chunk_key(key: &str) -> Option<&str> {
    let rest = key.strip_prefix(CHUNKS_ROOT)?.strip_prefix('/')?;
    let (id, _) = rest.split_once('/')?;
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> TransferId {
        TransferId::parse("abc123def456").unwrap()
    }

    #[test]
    fn test_chunk_keys_are_zero_padded() {
        assert_eq!(chunk_key(&id(), 0), "chunks/abc123def456/chunk_000000");
        assert_eq!(chunk_key(&id(), 42), "chunks/abc123def456/chunk_000042");
        assert!(chunk_key(&id(), 7) < chunk_key(&id(), 10));
    }

    #[test]
    fn test_artifact_and_file_keys() {
        assert_eq!(artifact_key(&id()), "artifacts/abc123def456.zip");
        assert_eq!(
            file_key(&id(), "photo.jpg"),
            "files/abc123def456/photo.jpg"
        );
    }

    #[test]
    fn test_transfer_id_of_chunk_key() {
        assert_eq!(
            transfer_id_of_chunk_key("chunks/abc123def456/chunk_000000"),
            Some("abc123def456")
        );
        assert_eq!(transfer_id_of_chunk_key("artifacts/abc.zip"), None);
        assert_eq!(transfer_id_of_chunk_key("chunks/"), None);
    }
}
