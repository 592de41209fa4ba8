/// Per-structure generation aggregation.
pub mod aggregator;
/// Mars clock and tick pulses.
pub mod clock;
pub mod engine;
pub mod environment;
/// Grid change notifications.
pub mod event;
/// Settlement grid and the balancing stages.
pub mod grid;
pub mod kpi;
pub mod resources;
pub mod structure;
pub mod types;
