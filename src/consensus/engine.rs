//! Multi-source weighted consensus.
//!
//! Warn-only: outliers and high variance annotate the result but
//! never remove a source or block a value. Every intermediate quantity is
//! carried in the diagnostics so any consensus value can be explained after
//! the fact.

use itertools::{Itertools, MinMaxResult};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::config::{ConfigError, ConsensusConfig};
use crate::consensus::median;
use crate::consensus::weights::{effective_weights, VetoOutcome};
use crate::domain::SourceReading;

/// Three-tier classification of how much the present sources disagree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum VarianceLevel {
    Low,
    Moderate,
    Critical,
}

/// A reading statistically far from the group median. Flag-only: the source
/// still participates in the weighted computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierFlag {
    pub source: String,
    pub value: f64,
    /// Absolute deviation from the unweighted median, °F.
    pub deviation: f64,
}

/// Audit trail for one consensus computation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsensusDiagnostics {
    pub present_count: usize,
    pub unweighted_median: Option<f64>,
    pub stdev: Option<f64>,
    /// Configured base weights of the present sources.
    pub raw_weights: BTreeMap<String, f64>,
    /// Weights actually used, after any veto demotion.
    pub effective_weights: BTreeMap<String, f64>,
    pub veto: VetoOutcome,
    pub outlier_count: usize,
    pub note: Option<String>,
}

/// Output of one consensus computation. Immutable once produced; one
/// instance per (timestamp, quantity) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusResult {
    /// Weighted-median consensus in °F. None when no source reported:
    /// the explicit no-data verdict, never an error.
    pub value: Option<f64>,
    pub variance: VarianceLevel,
    /// max − min across present readings, °F.
    pub spread: f64,
    pub outliers: Vec<OutlierFlag>,
    /// Agreement score in [0, 1]; 1.0 means perfect agreement.
    pub confidence: f64,
    /// Each source's effective weight normalized by the total.
    pub source_contributions: BTreeMap<String, f64>,
    pub diagnostics: ConsensusDiagnostics,
}

impl ConsensusResult {
    fn no_data() -> Self {
        Self {
            value: None,
            variance: VarianceLevel::Critical,
            spread: 0.0,
            outliers: Vec::new(),
            confidence: 0.0,
            source_contributions: BTreeMap::new(),
            diagnostics: ConsensusDiagnostics {
                note: Some("no source reported a value".to_string()),
                ..Default::default()
            },
        }
    }
}

/// Weighted robust consensus over named source readings.
pub struct ConsensusEngine {
    config: ConsensusConfig,
}

impl ConsensusEngine {
    /// Validates the configuration once, up front.
    pub fn new(config: ConsensusConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// Compute the consensus for one (timestamp, quantity) pair.
    ///
    /// `designated_primary` names the high-trust source the veto guardrail
    /// watches. The result is identical under any permutation of `readings`.
    pub fn compute(&self, readings: &[SourceReading], designated_primary: &str) -> ConsensusResult {
        let mut present: Vec<(String, f64)> = readings
            .iter()
            .filter_map(|r| r.value_f().map(|v| (r.source.clone(), v)))
            .collect();
        if present.is_empty() {
            return ConsensusResult::no_data();
        }
        // Canonical (value, name) order makes every downstream sum and scan
        // independent of the caller's input order.
        present.sort_by(|a, b| OrderedFloat(a.1).cmp(&OrderedFloat(b.1)).then(a.0.cmp(&b.0)));

        let raw_weights: BTreeMap<String, f64> = present
            .iter()
            .map(|(source, _)| (source.clone(), self.config.weight_for(source)))
            .collect();
        let (effective, veto) = effective_weights(&self.config, &present, designated_primary);

        let values: Vec<f64> = present.iter().map(|(_, value)| *value).collect();
        let unweighted_median = median(&values);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let variance_sum = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
        let stdev = (variance_sum / values.len() as f64).sqrt();

        let outliers: Vec<OutlierFlag> = if stdev > 0.0 {
            present
                .iter()
                .filter_map(|(source, value)| {
                    let deviation = (value - unweighted_median).abs();
                    (deviation > self.config.outlier_stdev_k * stdev).then(|| OutlierFlag {
                        source: source.clone(),
                        value: *value,
                        deviation,
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        let total_weight: f64 = present.iter().map(|(source, _)| effective[source]).sum();
        let consensus = Self::weighted_median(&present, &effective, total_weight);

        let spread = match values.iter().copied().minmax() {
            MinMaxResult::MinMax(lo, hi) => hi - lo,
            MinMaxResult::OneElement(_) => 0.0,
            MinMaxResult::NoElements => 0.0,
        };
        let variance = if spread < self.config.variance_low_f {
            VarianceLevel::Low
        } else if spread < self.config.variance_critical_f {
            VarianceLevel::Moderate
        } else {
            VarianceLevel::Critical
        };

        let confidence = if present.len() == 1 {
            1.0
        } else {
            let weighted_mad = if total_weight > 0.0 {
                present
                    .iter()
                    .map(|(source, value)| effective[source] * (value - consensus).abs())
                    .sum::<f64>()
                    / total_weight
            } else {
                values.iter().map(|v| (v - consensus).abs()).sum::<f64>() / values.len() as f64
            };
            1.0 / (1.0 + weighted_mad / self.config.confidence_scale_f)
        };

        let source_contributions: BTreeMap<String, f64> = if total_weight > 0.0 {
            effective
                .iter()
                .map(|(source, weight)| (source.clone(), weight / total_weight))
                .collect()
        } else {
            let share = 1.0 / present.len() as f64;
            effective
                .keys()
                .map(|source| (source.clone(), share))
                .collect()
        };

        ConsensusResult {
            value: Some(consensus),
            variance,
            spread,
            outliers: outliers.clone(),
            confidence,
            source_contributions,
            diagnostics: ConsensusDiagnostics {
                present_count: present.len(),
                unweighted_median: Some(unweighted_median),
                stdev: Some(stdev),
                raw_weights,
                effective_weights: effective,
                veto,
                outlier_count: outliers.len(),
                note: None,
            },
        }
    }

    /// Value at which the cumulative effective weight first reaches half the
    /// total. `present` is already sorted by (value, name).
    fn weighted_median(
        present: &[(String, f64)],
        effective: &BTreeMap<String, f64>,
        total_weight: f64,
    ) -> f64 {
        let half = total_weight / 2.0;
        let mut cumulative = 0.0;
        for (source, value) in present {
            cumulative += effective[source];
            if cumulative >= half {
                return *value;
            }
        }
        // Reachable only on an all-zero weight table; the scan above already
        // returned the smallest value in that case.
        present[present.len() - 1].1
    }
}
