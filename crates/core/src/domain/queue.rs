// Queue Domain Model

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{DomainError, Result};

/// Queue identifier (case-sensitive)
pub type QueueName = String;

/// Closed set of queue variants.
///
/// Each kind fixes how a queue answers the throttled open count and how it
/// uses the worker partition hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueKind {
    /// Plain FIFO. Partition hint ignored.
    Fifo {
        #[serde(default = "default_max_batch")]
        max_batch: usize,
    },

    /// Hands out whole batches from a worker-specific region of the open list.
    /// A partial tail is held back until `linger_ms` passes without new posts
    /// or the tail is released explicitly.
    Batched { batch_size: usize, linger_ms: i64 },
}

fn default_max_batch() -> usize {
    1
}

impl Default for QueueKind {
    fn default() -> Self {
        QueueKind::Fifo {
            max_batch: default_max_batch(),
        }
    }
}

impl QueueKind {
    pub fn fifo() -> Self {
        Self::default()
    }

    pub fn batched(batch_size: usize, linger_ms: i64) -> Self {
        QueueKind::Batched {
            batch_size,
            linger_ms,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            QueueKind::Fifo { max_batch } if *max_batch == 0 => Err(
                DomainError::ValidationError("fifo max_batch must be at least 1".to_string()),
            ),
            QueueKind::Batched { batch_size, .. } if *batch_size == 0 => Err(
                DomainError::ValidationError("batch_size must be at least 1".to_string()),
            ),
            QueueKind::Batched { linger_ms, .. } if *linger_ms < 0 => Err(
                DomainError::ValidationError("linger_ms must not be negative".to_string()),
            ),
            _ => Ok(()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            QueueKind::Fifo { .. } => "fifo",
            QueueKind::Batched { .. } => "batched",
        }
    }
}

/// Informational queue-level event (never used for control flow)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEvent {
    pub at: i64, // epoch ms
    pub name: String,
    #[serde(default)]
    pub detail: serde_json::Value,
}

/// Validate a queue name supplied by a caller
pub fn validate_queue_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(DomainError::ValidationError(
            "Queue name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Task timeouts must be positive and fit the millisecond clock
pub fn validate_timeout(timeout: Duration) -> Result<()> {
    if timeout.is_zero() {
        return Err(DomainError::ValidationError(
            "timeout must be greater than zero".to_string(),
        ));
    }
    if i64::try_from(timeout.as_millis()).is_err() {
        return Err(DomainError::ValidationError(format!(
            "timeout of {}s is out of range",
            timeout.as_secs()
        )));
    }
    Ok(())
}

/// Milliseconds on the i64 clock, saturating at `i64::MAX`
pub fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_serde_tagged() {
        let kind: QueueKind =
            serde_json::from_value(json!({"type": "batched", "batch_size": 50, "linger_ms": 2000}))
                .unwrap();
        assert_eq!(kind, QueueKind::batched(50, 2000));

        let kind: QueueKind = serde_json::from_value(json!({"type": "fifo"})).unwrap();
        assert_eq!(kind, QueueKind::fifo());
    }

    #[test]
    fn test_kind_validation() {
        assert!(QueueKind::fifo().validate().is_ok());
        assert!(QueueKind::Fifo { max_batch: 0 }.validate().is_err());
        assert!(QueueKind::batched(0, 10).validate().is_err());
        assert!(QueueKind::batched(4, -1).validate().is_err());
    }

    #[test]
    fn test_queue_name_validation() {
        assert!(validate_queue_name("frames-001").is_ok());
        assert!(validate_queue_name("   ").is_err());
    }

    #[test]
    fn test_timeout_bounds() {
        assert!(validate_timeout(Duration::from_secs(30)).is_ok());
        assert!(validate_timeout(Duration::ZERO).is_err());
        assert!(validate_timeout(Duration::from_secs(u64::MAX)).is_err());

        assert_eq!(duration_millis(Duration::from_secs(2)), 2_000);
        assert_eq!(duration_millis(Duration::from_secs(u64::MAX)), i64::MAX);
    }
}
