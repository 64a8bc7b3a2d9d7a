//! Repository traits for metadata operations.

pub mod files;
pub mod stats;
pub mod transfers;

pub use files::TransferFileRepo;
pub use stats::StatsRepo;
pub use transfers::{ChunkReceipt, TransferRepo};
