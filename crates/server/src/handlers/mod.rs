//! HTTP request handlers.

pub mod download;
pub mod stats;
pub mod transfers;

pub use download::*;
pub use stats::*;
pub use transfers::*;
