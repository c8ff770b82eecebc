//! Fallback orchestration: cache check, tier walk, batch fan-out.

mod fallback;
mod single_flight;

pub use fallback::{FallbackOrchestrator, OrchestratorConfig, Resolution};
pub use single_flight::KeyedLocks;
