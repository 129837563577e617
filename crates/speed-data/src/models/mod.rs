//! Speed data models
//!
//! This module contains the value types that flow through a polling round:
//! - `provider_result` - Normalized outcome of a single provider fetch (ProviderResult)
//! - `round_result` - Outcome of one orchestrator round (OrchestratorResult)

mod provider_result;
mod round_result;

pub use provider_result::ProviderResult;
pub use round_result::OrchestratorResult;
