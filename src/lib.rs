//! Azure resource-group walkthrough.
//!
//! Reads service-principal settings from the environment, discovers the
//! target cloud, then creates, tags, fills, exports and deletes a resource
//! group while printing what the service returns.

pub mod config;
pub mod logging;
pub mod naming;
pub mod output;
pub mod sample;

pub use config::SampleConfig;
pub use sample::{run_sample, ResourceManagement, SamplePlan, SampleReport};
