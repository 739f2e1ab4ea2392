//! Flat per-millilitre estimates for non-alcoholic ingredients.

use serde::{Deserialize, Serialize};

use crate::aliases::{contains_phrase, normalize};

/// Estimated cost per millilitre of common mixers, in dollars.
pub const DEFAULT_MIXER_COSTS: &[(&str, f64)] = &[
    ("simple syrup", 0.002),
    ("lime juice", 0.02),
    ("lemon juice", 0.02),
    ("orange juice", 0.005),
    ("cranberry juice", 0.004),
    ("pineapple juice", 0.004),
    ("club soda", 0.001),
    ("soda water", 0.001),
    ("tonic water", 0.002),
    ("ginger beer", 0.003),
    ("grenadine", 0.01),
    ("angostura bitters", 0.20),
    ("salt", 0.0001),
    ("sugar", 0.001),
];

/// Per-ml estimate for juices not in the table.
pub const JUICE_COST_PER_ML: f64 = 0.01;
/// Per-ml estimate for syrups not in the table.
pub const SYRUP_COST_PER_ML: f64 = 0.005;
/// Per-ml estimate for bitters not in the table.
pub const BITTERS_COST_PER_ML: f64 = 0.15;
/// Per-ml estimate for anything else.
pub const GENERIC_COST_PER_ML: f64 = 0.005;

/// Lookup table of mixer estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerEstimates {
    /// Known mixers and their per-ml cost.
    pub known: Vec<(String, f64)>,
    /// Fallback for juices.
    pub juice: f64,
    /// Fallback for syrups.
    pub syrup: f64,
    /// Fallback for bitters.
    pub bitters: f64,
    /// Fallback for everything else.
    pub generic: f64,
}

impl MixerEstimates {
    /// Returns the estimated cost per millilitre for an ingredient name.
    ///
    /// The longest known mixer named in the text wins; otherwise the
    /// juice, syrup and bitters fallbacks apply, then the generic rate.
    pub fn cost_per_ml(&self, name: &str) -> f64 {
        let text = normalize(name);
        if let Some((_, cost)) = self
            .known
            .iter()
            .filter(|(mixer, _)| contains_phrase(&text, mixer))
            .max_by_key(|(mixer, _)| mixer.len())
        {
            return *cost;
        }

        let has = |word: &str| text.split(' ').any(|w| w == word);
        if has("juice") {
            self.juice
        } else if has("syrup") {
            self.syrup
        } else if has("bitters") {
            self.bitters
        } else {
            self.generic
        }
    }

    /// Adds or replaces a known mixer.
    #[must_use]
    pub fn with_mixer(mut self, name: &str, cost_per_ml: f64) -> Self {
        let name = normalize(name);
        self.known.retain(|(mixer, _)| *mixer != name);
        self.known.push((name, cost_per_ml));
        self
    }
}

impl Default for MixerEstimates {
    fn default() -> Self {
        Self {
            known: DEFAULT_MIXER_COSTS
                .iter()
                .map(|(name, cost)| ((*name).to_string(), *cost))
                .collect(),
            juice: JUICE_COST_PER_ML,
            syrup: SYRUP_COST_PER_ML,
            bitters: BITTERS_COST_PER_ML,
            generic: GENERIC_COST_PER_ML,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_mixers() {
        let mixers = MixerEstimates::default();
        assert_eq!(mixers.cost_per_ml("Fresh Lime Juice"), 0.02);
        assert_eq!(mixers.cost_per_ml("Angostura Bitters"), 0.20);
        assert_eq!(mixers.cost_per_ml("Ginger Beer"), 0.003);
    }

    #[test]
    fn test_fallbacks() {
        let mixers = MixerEstimates::default();
        assert_eq!(mixers.cost_per_ml("Grapefruit Juice"), JUICE_COST_PER_ML);
        assert_eq!(mixers.cost_per_ml("Honey Syrup"), SYRUP_COST_PER_ML);
        assert_eq!(mixers.cost_per_ml("Peychaud's Bitters"), BITTERS_COST_PER_ML);
        assert_eq!(mixers.cost_per_ml("Egg White"), GENERIC_COST_PER_ML);
    }

    #[test]
    fn test_with_mixer_overrides() {
        let mixers = MixerEstimates::default().with_mixer("Lime Juice", 0.03);
        assert_eq!(mixers.cost_per_ml("lime juice"), 0.03);
    }
}
