//! Analysis configuration.
//!
//! Every heuristic threshold in the pipeline lives here so that tuning runs
//! and tests can override them. Defaults match the documented calibration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::AnalysisError;

/// Tunable thresholds for the analysis pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Minimum total mentions for a name to become a character or location.
    pub min_mentions: usize,
    /// Same-sentence co-occurrences required before a suffix pair merges.
    pub alias_cooccur_min: usize,
    /// Sentence window for relation co-occurrence evidence.
    pub cooccur_window: usize,
    /// Base weight of one relation-pattern match (3:1 over co-occurrence).
    pub pattern_weight: f64,
    /// Weight of one dialogue address-term match.
    pub dialogue_weight: f64,
    /// K in strength = tanh(sum_of_weights / K). With `pattern_weight` 3.0
    /// a single pattern match reaches tanh(1.0) ≈ 0.76.
    pub strength_scale: f64,
    /// Importance above which a character is classified as main.
    pub main_threshold: f64,
    /// Chapter-presence fraction that also classifies a character as main.
    pub main_presence_fraction: f64,
    /// Importance gap a parent event needs over a sub-event.
    pub sub_event_importance_gap: f64,
    /// Maximum sentence distance between a parent event and its sub-event.
    pub sub_event_window: u32,
    /// Minimum importance for either end of a causal link.
    pub causal_importance_floor: f64,
    /// How many later events a causal-cue search looks ahead.
    pub causal_horizon: usize,
    /// Contribution score at or above which an event belongs to the main plot.
    pub main_plot_threshold: f64,
    /// Restart probability complement (damping) for the contribution walk.
    pub rwr_damping: f64,
    /// Iteration cap for the contribution walk.
    pub rwr_max_iterations: usize,
    /// How many sentences back an event looks for its location.
    pub location_back_window: usize,
    /// Moving-average window for the emotional-peak baseline.
    pub peak_ma_window: usize,
    /// Absolute per-chapter state delta that emits a transition.
    pub state_transition_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_mentions: 3,
            alias_cooccur_min: 2,
            cooccur_window: 3,
            pattern_weight: 3.0,
            dialogue_weight: 2.0,
            strength_scale: 3.0,
            main_threshold: 0.5,
            main_presence_fraction: 0.6,
            sub_event_importance_gap: 0.15,
            sub_event_window: 10,
            causal_importance_floor: 0.3,
            causal_horizon: 20,
            main_plot_threshold: 0.7,
            rwr_damping: 0.85,
            rwr_max_iterations: 100,
            location_back_window: 5,
            peak_ma_window: 3,
            state_transition_threshold: 0.1,
        }
    }
}

impl AnalysisConfig {
    /// Load a config from a TOML file. Unspecified keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, AnalysisError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::InvalidInput(format!("cannot read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents)
            .map_err(|e| AnalysisError::InvalidInput(format!("malformed config: {}", e)))
    }
}
