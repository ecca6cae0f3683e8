//! # Atelier Telemetry
//!
//! Model pricing and per-run usage accounting. The agent loop feeds every
//! model turn's token usage into a [`UsageMeter`], which accumulates
//! additively and prices the run against a [`PricingTable`].

pub mod logging;
pub mod meter;
pub mod pricing;

pub use logging::init_tracing;
pub use meter::{RunUsage, UsageMeter};
pub use pricing::{ModelPricing, PricingTable};
