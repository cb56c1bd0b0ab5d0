//! Accelerator (GPU) readings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Utilization figures for one accelerator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcceleratorStats {
    pub utilization_percent: f32,
    pub memory_used_mib: f32,
    pub memory_total_mib: f32,
    pub temperature_c: f32,
}

impl AcceleratorStats {
    /// Memory used as a share of total, 0 when total is unknown.
    pub fn memory_percent(&self) -> f32 {
        if self.memory_total_mib <= 0.0 {
            0.0
        } else {
            self.memory_used_mib / self.memory_total_mib * 100.0
        }
    }
}

/// Outcome of one probe run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AcceleratorStatus {
    Ok(AcceleratorStats),
    /// The probe tool is missing or no device is present.
    Unavailable { reason: String },
    /// The probe ran but failed or produced unparseable output.
    Error { message: String },
    Timeout { seconds: u64 },
}

/// A timestamped reading, one per stream tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceleratorReading {
    #[serde(flatten)]
    pub status: AcceleratorStatus,
    pub timestamp: DateTime<Utc>,
}

impl AcceleratorReading {
    pub const fn stats(&self) -> Option<&AcceleratorStats> {
        match &self.status {
            AcceleratorStatus::Ok(stats) => Some(stats),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_percent() {
        let stats = AcceleratorStats {
            utilization_percent: 50.0,
            memory_used_mib: 2048.0,
            memory_total_mib: 8192.0,
            temperature_c: 60.0,
        };
        assert!((stats.memory_percent() - 25.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_reading_serialization_is_flat() {
        let reading = AcceleratorReading {
            status: AcceleratorStatus::Unavailable {
                reason: "nvidia-smi not found".into(),
            },
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["reason"], "nvidia-smi not found");
        assert!(json.get("timestamp").is_some());
        assert!(reading.stats().is_none());
    }
}
