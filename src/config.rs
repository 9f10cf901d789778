//! Engine configuration.
//!
//! Every field has a product default, so a JSON document only needs to name
//! the values it overrides:
//!
//! ```json
//! { "rules": { "reveal_delay_ms": 60000, "budgets": { "introduction_messages": 10 } } }
//! ```

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Time before the main question is revealed without an early request (3 days).
pub const DEFAULT_REVEAL_DELAY: Duration = Duration::from_secs(3 * 24 * 60 * 60);
/// Time a postponed main question waits before it comes back (1 day).
pub const DEFAULT_POSTPONE_DELAY: Duration = Duration::from_secs(24 * 60 * 60);
/// Length of the closing eye-contact exercise (4 minutes).
pub const DEFAULT_EYE_CONTACT_DURATION: Duration = Duration::from_secs(240);
/// Number of recent command ids remembered per session.
pub const DEFAULT_IDEMPOTENCY_WINDOW: usize = 64;

/// Starting counters per stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetDefaults {
    pub introduction_messages: u32,
    pub intuition_messages: u32,
    pub intuition_questions: u32,
    pub closeness_messages: u32,
    pub closeness_questions_per_category: u32,
    /// The chat is read-only while the 36 questions run.
    pub date_experience_messages: u32,
}

impl Default for BudgetDefaults {
    fn default() -> Self {
        Self {
            introduction_messages: 5,
            intuition_messages: 5,
            intuition_questions: 5,
            closeness_messages: 5,
            closeness_questions_per_category: 5,
            date_experience_messages: 0,
        }
    }
}

/// Rules a session is created with. Stored inside the session so a restored
/// session keeps the rules it started under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionRules {
    pub budgets: BudgetDefaults,
    #[serde(rename = "reveal_delay_ms", with = "duration_ms")]
    pub reveal_delay: Duration,
    #[serde(rename = "postpone_delay_ms", with = "duration_ms")]
    pub postpone_delay: Duration,
    #[serde(rename = "eye_contact_duration_ms", with = "duration_ms")]
    pub eye_contact_duration: Duration,
    pub idempotency_window: usize,
}

impl Default for SessionRules {
    fn default() -> Self {
        Self {
            budgets: BudgetDefaults::default(),
            reveal_delay: DEFAULT_REVEAL_DELAY,
            postpone_delay: DEFAULT_POSTPONE_DELAY,
            eye_contact_duration: DEFAULT_EYE_CONTACT_DURATION,
            idempotency_window: DEFAULT_IDEMPOTENCY_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rules: SessionRules,
    /// Notifications retained by the in-memory dispatcher.
    pub notification_history: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rules: SessionRules::default(),
            notification_history: dispatch::DEFAULT_HISTORY_SIZE,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rules.idempotency_window == 0 {
            return Err(ConfigError::Invalid(
                "idempotency_window must be at least 1".to_string(),
            ));
        }
        if self.rules.reveal_delay.is_zero() {
            return Err(ConfigError::Invalid(
                "reveal_delay_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// `now + delay`, saturating at the latest representable instant.
pub(crate) fn deadline_after(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
