//! Static source weights and the transient veto guardrail.
//!
//! The guardrail protects the consensus from a normally high-trust source
//! (typically the nowcast feed) that disagrees sharply with everyone else
//! for one hour. It is a pure transform: the configured table is never
//! mutated, only the derived working copy for one evaluation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ConsensusConfig;
use crate::consensus::median;

/// Outcome of one veto evaluation, carried into consensus diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VetoOutcome {
    /// Median of all present peers (primary excluded). None when fewer than
    /// two peers reported, in which case no veto is evaluated.
    pub peer_median: Option<f64>,
    /// The primary's absolute deviation from the peer median, °F.
    pub primary_deviation: Option<f64>,
    /// True once the deviation exceeds the moderate threshold.
    pub triggered: bool,
    /// Effective weight the primary was demoted to, when triggered.
    pub demoted_to: Option<f64>,
}

/// Derive the effective per-source weight map for one evaluation.
///
/// Demotion only ever lowers a weight: a primary already configured below
/// the floor keeps its configured weight.
pub fn effective_weights(
    config: &ConsensusConfig,
    present: &[(String, f64)],
    primary: &str,
) -> (BTreeMap<String, f64>, VetoOutcome) {
    let mut weights: BTreeMap<String, f64> = present
        .iter()
        .map(|(source, _)| (source.clone(), config.weight_for(source)))
        .collect();
    let mut outcome = VetoOutcome::default();

    let peers: Vec<f64> = present
        .iter()
        .filter(|(source, _)| source != primary)
        .map(|(_, value)| *value)
        .collect();
    let primary_value = present
        .iter()
        .find(|(source, _)| source == primary)
        .map(|(_, value)| *value);

    if peers.len() < 2 {
        return (weights, outcome);
    }
    let Some(value) = primary_value else {
        return (weights, outcome);
    };

    let peer_median = median(&peers);
    let deviation = (value - peer_median).abs();
    outcome.peer_median = Some(peer_median);
    outcome.primary_deviation = Some(deviation);

    let floor = if deviation > config.veto_critical_f {
        Some(config.veto_low_floor)
    } else if deviation > config.veto_moderate_f {
        Some(config.veto_mid_floor)
    } else {
        None
    };

    if let Some(floor) = floor {
        if let Some(weight) = weights.get_mut(primary) {
            *weight = weight.min(floor);
            outcome.triggered = true;
            outcome.demoted_to = Some(*weight);
        }
    }

    (weights, outcome)
}
