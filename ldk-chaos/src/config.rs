//! Per-service chaos configuration (spec §4.2), mirroring `ChaosConfig` in
//! `mockserver/models.py`.

use serde::{Deserialize, Serialize};

/// A single weighted error outcome, sampled via cumulative roll when
/// `error_rate` fires (spec §4.4 step 3d).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSpec {
    pub exception: String,
    pub message: String,
    pub status: u16,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChaosConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub error_rate: f64,
    #[serde(default)]
    pub latency_min_ms: u64,
    #[serde(default)]
    pub latency_max_ms: u64,
    #[serde(default)]
    pub error_specs: Vec<ErrorSpec>,
    #[serde(default)]
    pub connection_reset_rate: f64,
    #[serde(default)]
    pub timeout_rate: f64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        ChaosConfig {
            enabled: false,
            error_rate: 0.0,
            latency_min_ms: 0,
            latency_max_ms: 0,
            error_specs: Vec::new(),
            connection_reset_rate: 0.0,
            timeout_rate: 0.0,
        }
    }
}

/// Partial update applied via the management plane (`PATCH /_ldk/chaos`):
/// only fields present in the patch override the current snapshot: the
/// rest are preserved (spec §4.2).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChaosPatch {
    pub enabled: Option<bool>,
    pub error_rate: Option<f64>,
    pub latency_min_ms: Option<u64>,
    pub latency_max_ms: Option<u64>,
    pub error_specs: Option<Vec<ErrorSpec>>,
    pub connection_reset_rate: Option<f64>,
    pub timeout_rate: Option<f64>,
}

impl ChaosConfig {
    pub fn apply_patch(&self, patch: &ChaosPatch) -> ChaosConfig {
        ChaosConfig {
            enabled: patch.enabled.unwrap_or(self.enabled),
            error_rate: patch.error_rate.unwrap_or(self.error_rate),
            latency_min_ms: patch.latency_min_ms.unwrap_or(self.latency_min_ms),
            latency_max_ms: patch.latency_max_ms.unwrap_or(self.latency_max_ms),
            error_specs: patch
                .error_specs
                .clone()
                .unwrap_or_else(|| self.error_specs.clone()),
            connection_reset_rate: patch
                .connection_reset_rate
                .unwrap_or(self.connection_reset_rate),
            timeout_rate: patch.timeout_rate.unwrap_or(self.timeout_rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_preserves_unmentioned_fields() {
        let base = ChaosConfig {
            enabled: true,
            error_rate: 0.1,
            ..Default::default()
        };
        let patch = ChaosPatch {
            latency_max_ms: Some(500),
            ..Default::default()
        };
        let merged = base.apply_patch(&patch);
        assert!(merged.enabled);
        assert_eq!(merged.error_rate, 0.1);
        assert_eq!(merged.latency_max_ms, 500);
    }
}
