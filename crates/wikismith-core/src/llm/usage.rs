//! Usage accounting and cost estimation

use super::types::{Usage, UsageStats};
use std::sync::RwLock;

/// Approximate token count (characters / 4)
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

/// Price per million tokens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPricing {
    pub const FREE: ModelPricing = ModelPricing::new(0.0, 0.0);

    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    pub fn cost(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        (prompt_tokens as f64 * self.input_per_million
            + completion_tokens as f64 * self.output_per_million)
            / 1_000_000.0
    }
}

/// Look up a model by prefix; the table must list more specific prefixes first
pub fn lookup_by_prefix<T: Copy>(table: &[(&str, T)], model: &str, default: T) -> T {
    let model = model.trim_start_matches("models/");
    table
        .iter()
        .find(|(prefix, _)| model.starts_with(prefix))
        .map(|(_, value)| *value)
        .unwrap_or(default)
}

/// Per-instance usage counters
///
/// Writers take the write lock once per completed call, so a snapshot only
/// ever reflects calls that have returned.
#[derive(Debug, Default)]
pub struct UsageTracker {
    stats: RwLock<UsageStats>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful call
    pub fn record(&self, usage: &Usage, cost: f64) {
        let mut stats = self.stats.write().unwrap_or_else(|e| e.into_inner());
        stats.prompt_tokens += usage.prompt_tokens;
        stats.completion_tokens += usage.completion_tokens;
        stats.total_tokens += usage.total_tokens;
        stats.estimated_cost += cost;
        stats.requests += 1;
    }

    pub fn snapshot(&self) -> UsageStats {
        *self.stats.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn reset(&self) {
        *self.stats.write().unwrap_or_else(|e| e.into_inner()) = UsageStats::default();
    }
}
