//! The ordered chaos sampling rolls from spec §4.4 step 3: connection
//! reset, timeout, latency, then weighted error injection. One function
//! per roll so the middleware pipeline composes them in the mandated order.

use std::time::Duration;

use rand::Rng;

use crate::config::{ChaosConfig, ErrorSpec};

#[derive(Debug, Clone, PartialEq)]
pub enum ChaosOutcome {
    ConnectionReset,
    Timeout,
    Error(ErrorSpec),
    None,
}

/// Roll every chaos condition in mandated order, returning the first one
/// that fires. `latency` is returned separately since it doesn't
/// short-circuit — the caller sleeps it and then still rolls for an error.
pub fn roll(cfg: &ChaosConfig) -> (ChaosOutcome, Duration) {
    if !cfg.enabled {
        return (ChaosOutcome::None, Duration::ZERO);
    }

    let mut rng = rand::thread_rng();

    if cfg.connection_reset_rate > 0.0 && rng.gen::<f64>() < cfg.connection_reset_rate {
        return (ChaosOutcome::ConnectionReset, Duration::ZERO);
    }

    if cfg.timeout_rate > 0.0 && rng.gen::<f64>() < cfg.timeout_rate {
        return (ChaosOutcome::Timeout, Duration::ZERO);
    }

    let latency = if cfg.latency_max_ms > 0 {
        let min = cfg.latency_min_ms.min(cfg.latency_max_ms);
        let max = cfg.latency_max_ms;
        let ms = if min == max {
            max
        } else {
            rng.gen_range(min..=max)
        };
        Duration::from_millis(ms)
    } else {
        Duration::ZERO
    };

    if cfg.error_rate > 0.0 && rng.gen::<f64>() < cfg.error_rate {
        if let Some(spec) = pick_weighted(&cfg.error_specs, rng.gen::<f64>()) {
            return (ChaosOutcome::Error(spec.clone()), latency);
        }
    }

    (ChaosOutcome::None, latency)
}

/// Cumulative-roll weighted sampling over `specs`, mirroring
/// `_pick_error_status` in `mockserver/chaos.py`.
fn pick_weighted(specs: &[ErrorSpec], roll: f64) -> Option<&ErrorSpec> {
    let mut cumulative = 0.0;
    for spec in specs {
        cumulative += spec.weight;
        if roll < cumulative {
            return Some(spec);
        }
    }
    specs.last()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_config_never_rolls() {
        let cfg = ChaosConfig {
            enabled: false,
            error_rate: 1.0,
            ..Default::default()
        };
        let (outcome, latency) = roll(&cfg);
        assert_eq!(outcome, ChaosOutcome::None);
        assert_eq!(latency, Duration::ZERO);
    }

    #[test]
    fn zero_error_rate_never_injects_error() {
        let cfg = ChaosConfig {
            enabled: true,
            error_rate: 0.0,
            ..Default::default()
        };
        for _ in 0..50 {
            let (outcome, _) = roll(&cfg);
            assert!(!matches!(outcome, ChaosOutcome::Error(_)));
        }
    }

    #[test]
    fn certain_connection_reset_fires() {
        let cfg = ChaosConfig {
            enabled: true,
            connection_reset_rate: 1.0,
            ..Default::default()
        };
        let (outcome, _) = roll(&cfg);
        assert_eq!(outcome, ChaosOutcome::ConnectionReset);
    }

    #[test]
    fn weighted_pick_respects_cumulative_bounds() {
        let specs = vec![
            ErrorSpec {
                exception: "A".into(),
                message: "a".into(),
                status: 500,
                weight: 0.3,
            },
            ErrorSpec {
                exception: "B".into(),
                message: "b".into(),
                status: 503,
                weight: 0.7,
            },
        ];
        assert_eq!(pick_weighted(&specs, 0.1).unwrap().exception, "A");
        assert_eq!(pick_weighted(&specs, 0.5).unwrap().exception, "B");
    }
}
