//! Probabilistic loot generation scaled to the player deficit

use serde::{Deserialize, Serialize};

/// Generator parameters from the game config
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LootGeneratorConfig {
    /// Base generation period in milliseconds
    pub period_ms: f64,
    /// Probability of an item appearing per deficit slot per full period
    pub probability: f64,
}

impl Default for LootGeneratorConfig {
    fn default() -> Self {
        LootGeneratorConfig {
            period_ms: 0.0,
            probability: 0.0,
        }
    }
}

/// Decides how many new loot items appear on a map each tick
///
/// The generator accumulates elapsed time and scales the base probability to
/// the fraction of the period that passed, so a sequence of small deltas
/// behaves like one period-aligned step. The number of candidates is the
/// deficit between players on the map and items already on the ground.
#[derive(Debug, Clone)]
pub struct LootGenerator {
    period_ms: f64,
    probability: f64,
    accumulated_ms: f64,
}

impl LootGenerator {
    pub fn new(config: LootGeneratorConfig) -> Self {
        LootGenerator {
            period_ms: config.period_ms,
            probability: config.probability,
            accumulated_ms: 0.0,
        }
    }

    /// Returns how many items to materialize after `delta_ms` of game time
    pub fn generate(&mut self, delta_ms: f64, loot_count: usize, looter_count: usize) -> usize {
        self.accumulated_ms += delta_ms;

        let ratio = if self.period_ms > 0.0 {
            (self.accumulated_ms / self.period_ms).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let probability_now = 1.0 - (1.0 - self.probability).powf(ratio);

        let deficit = looter_count as f64 - loot_count as f64;
        let generated = (deficit * probability_now).floor().max(0.0) as usize;

        self.accumulated_ms -= ratio * self.period_ms;
        generated
    }
}
