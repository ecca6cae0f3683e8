//! Built-in pricing table for common LLM models.
//!
//! Prices are in USD per 1 million tokens. Each model has an input and
//! output price. Custom pricing can be added at runtime.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Per-million-token pricing for a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Price per 1M input tokens in USD.
    pub input_per_m: f64,
    /// Price per 1M output tokens in USD.
    pub output_per_m: f64,
}

impl ModelPricing {
    /// Create a new pricing entry.
    pub fn new(input_per_m: f64, output_per_m: f64) -> Self {
        Self {
            input_per_m,
            output_per_m,
        }
    }

    /// Compute cost for the given token counts.
    pub fn cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        (input_tokens as f64 * self.input_per_m + output_tokens as f64 * self.output_per_m)
            / 1_000_000.0
    }
}

/// Thread-safe pricing table with built-in defaults and custom overrides.
/// Cloning shares the underlying table.
#[derive(Clone)]
pub struct PricingTable {
    prices: Arc<RwLock<HashMap<String, ModelPricing>>>,
}

impl PricingTable {
    /// Create an empty pricing table.
    pub fn new() -> Self {
        Self {
            prices: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a pricing table with built-in model prices.
    pub fn with_defaults() -> Self {
        let mut prices = HashMap::new();

        // ── Anthropic ──────────────────────────────────────────────
        prices.insert(
            "anthropic/claude-sonnet-4".into(),
            ModelPricing::new(3.0, 15.0),
        );
        prices.insert(
            "anthropic/claude-opus-4".into(),
            ModelPricing::new(15.0, 75.0),
        );
        prices.insert(
            "anthropic/claude-3.5-haiku".into(),
            ModelPricing::new(0.8, 4.0),
        );

        // ── OpenAI ─────────────────────────────────────────────────
        prices.insert("openai/gpt-4o".into(), ModelPricing::new(2.5, 10.0));
        prices.insert("openai/gpt-4o-mini".into(), ModelPricing::new(0.15, 0.6));
        prices.insert("openai/o3-mini".into(), ModelPricing::new(1.1, 4.4));

        // ── Google ─────────────────────────────────────────────────
        prices.insert(
            "google/gemini-2.0-flash".into(),
            ModelPricing::new(0.1, 0.4),
        );

        Self {
            prices: Arc::new(RwLock::new(prices)),
        }
    }

    /// Look up pricing for a model.
    pub fn get(&self, model: &str) -> Option<ModelPricing> {
        self.prices
            .read()
            .map(|p| p.get(model).cloned())
            .unwrap_or(None)
    }

    /// Add or override a model's pricing.
    pub fn set(&self, model: impl Into<String>, pricing: ModelPricing) {
        if let Ok(mut prices) = self.prices.write() {
            prices.insert(model.into(), pricing);
        }
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}
