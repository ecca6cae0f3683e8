//! Per-run usage accumulation and pricing.

use crate::pricing::PricingTable;
use atelier_core::provider::Usage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Accumulated usage for one run, tagged with where it came from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub provider: String,
    pub model: String,
}

/// Accumulates token usage across every model turn in a run and prices it.
pub struct UsageMeter {
    pricing: PricingTable,
    usage: RunUsage,
    total_cost: f64,
}

impl UsageMeter {
    pub fn new(pricing: PricingTable, provider: &str, model: &str) -> Self {
        Self {
            pricing,
            usage: RunUsage {
                provider: provider.to_string(),
                model: model.to_string(),
                ..Default::default()
            },
            total_cost: 0.0,
        }
    }

    /// Record one turn's usage. Unknown models cost zero.
    pub fn record(&mut self, usage: &Usage) -> f64 {
        self.usage.prompt_tokens += usage.prompt_tokens;
        self.usage.completion_tokens += usage.completion_tokens;
        self.usage.total_tokens += usage.total_tokens;

        let turn_cost = match self.pricing.get(&self.usage.model) {
            Some(pricing) => pricing.cost(usage.prompt_tokens, usage.completion_tokens),
            None => {
                debug!(model = %self.usage.model, "no pricing for model; cost recorded as 0");
                0.0
            }
        };
        self.total_cost += turn_cost;
        turn_cost
    }

    /// Accumulated usage so far.
    pub fn usage(&self) -> &RunUsage {
        &self.usage
    }

    /// Accumulated cost in USD so far.
    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }
}
