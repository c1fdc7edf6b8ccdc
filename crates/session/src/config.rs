use std::str::FromStr;
use std::time::Duration;

use onboard_core::StepTable;
use onboard_store::DEFAULT_DRAFT_KEY;

/// Quiet period after the last edit before the draft is written.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(3000);

/// How long the `saved` status is shown before returning to `idle`.
pub const DEFAULT_SAVED_COOLDOWN: Duration = Duration::from_millis(2000);

/// Per-session settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub debounce: Duration,
    pub saved_cooldown: Duration,
    pub draft_key: String,
    pub steps: StepTable,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            saved_cooldown: DEFAULT_SAVED_COOLDOWN,
            draft_key: DEFAULT_DRAFT_KEY.to_string(),
            steps: StepTable::default(),
        }
    }
}

impl SessionConfig {
    /// Load overrides from environment variables.
    ///
    /// | Env Var                | Default            |
    /// |------------------------|--------------------|
    /// | `AUTOSAVE_DEBOUNCE_MS` | `3000`             |
    /// | `AUTOSAVE_COOLDOWN_MS` | `2000`             |
    /// | `DRAFT_KEY`            | `onboarding-draft` |
    ///
    /// Unparseable values are logged and replaced by the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            debounce: env_millis("AUTOSAVE_DEBOUNCE_MS").unwrap_or(defaults.debounce),
            saved_cooldown: env_millis("AUTOSAVE_COOLDOWN_MS").unwrap_or(defaults.saved_cooldown),
            draft_key: std::env::var("DRAFT_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty())
                .unwrap_or(defaults.draft_key),
            steps: defaults.steps,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_saved_cooldown(mut self, cooldown: Duration) -> Self {
        self.saved_cooldown = cooldown;
        self
    }

    pub fn with_draft_key(mut self, key: impl Into<String>) -> Self {
        self.draft_key = key.into();
        self
    }

    pub fn with_steps(mut self, steps: StepTable) -> Self {
        self.steps = steps;
        self
    }
}

fn env_millis(name: &str) -> Option<Duration> {
    env_parse::<u64>(name).map(Duration::from_millis)
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "Ignoring invalid environment value");
            None
        }
    }
}
