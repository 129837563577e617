//! Speed provider abstractions and implementations.
//!
//! This module contains:
//! - The `SpeedProvider` trait every data source implements
//! - `dispatch`/`PendingFetch`, the cancellable handle the orchestrator races
//! - `wrap_fetch`, the helper that normalizes any fetch into a `ProviderResult`
//! - A small reqwest-based `HttpClient` and the concrete on-board endpoints
//!
//! # Failure normalization
//!
//! A provider never returns an error. Transport errors, non-200 statuses,
//! unparsable payloads and non-finite numbers all become
//! `ProviderResult::Failure` with the measured latency.

mod http;
mod normalize;
mod traits;

pub mod iceportal;
pub mod oebb;
pub mod test_endpoint;

pub use http::{HttpClient, DEFAULT_REQUEST_TIMEOUT};
pub use normalize::{parse_plain_number, wrap_fetch};
pub use traits::{dispatch, PendingFetch, SpeedProvider};
