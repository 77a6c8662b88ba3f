//! Driver-ABI adapters for the statistics and parameter buffers.

pub mod layout;
pub mod params;
pub mod stats;
