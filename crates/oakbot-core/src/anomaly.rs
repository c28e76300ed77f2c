//! Dwell anomaly scoring against learned duration profiles.

use crate::config::AnomalySection;
use crate::profile::DurationProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Alarm {
    None,
    Warn,
    Critical,
}

/// One scoring pass: the alarm plus the raw components for logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyReading {
    pub alarm: Alarm,
    pub z_score: f64,
    pub p95_ratio: f64,
}

impl AnomalyReading {
    fn silent() -> Self {
        Self {
            alarm: Alarm::None,
            z_score: 0.0,
            p95_ratio: 0.0,
        }
    }
}

/// Grades current dwell against a warm profile. Cold profiles are silent.
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    config: AnomalySection,
}

impl AnomalyDetector {
    pub fn new(config: AnomalySection) -> Self {
        Self { config }
    }

    pub fn check(&self, dwell_ms: u64, profile: Option<&DurationProfile>) -> AnomalyReading {
        let Some(profile) = profile else {
            return AnomalyReading::silent();
        };

        let dwell = dwell_ms as f64;
        let std_dev = profile.std_dev_ms();
        let z_score = if std_dev > f64::EPSILON {
            (dwell - profile.mean_ms) / std_dev
        } else if dwell > profile.mean_ms {
            f64::INFINITY
        } else {
            0.0
        };
        let p95_ratio = if profile.p95_ms > 0.0 {
            dwell / profile.p95_ms
        } else {
            0.0
        };

        let alarm = if z_score >= self.config.critical_z || p95_ratio >= self.config.critical_ratio
        {
            Alarm::Critical
        } else if z_score >= self.config.warn_z || p95_ratio >= self.config.warn_ratio {
            Alarm::Warn
        } else {
            Alarm::None
        };

        AnomalyReading {
            alarm,
            z_score,
            p95_ratio,
        }
    }
}
