//! Power grid balancing engine for a Mars surface settlement.

pub mod config;
/// Dust soiling models for solar collectors.
pub mod efficiency;
pub mod io;
/// Grid, structures, clock and balancing engine.
pub mod sim;
/// Generation sources and the shared source traits.
pub mod sources;
pub mod storage;
pub mod telemetry;
pub mod weather;
