//! Loadable retry settings.
//!
//! [`RetrySettings`] is plain data that can be deserialized from TOML or read
//! from environment variables, then applied to a
//! [`RetryPolicyBuilder`](crate::RetryPolicyBuilder) with
//! [`settings`](crate::RetryPolicyBuilder::settings). Predicates and callbacks
//! are code, so they are always set on the builder directly.

use crate::retry::{
    BackoffProvider, CancellationBehavior, ConstantBackoff, ElapsedLimit, ExhaustionBehavior,
    ExponentialBackoff,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors produced while loading [`RetrySettings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("invalid retry settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment variable held a value that could not be parsed.
    #[error("invalid value {value:?} for {var}")]
    Env {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
}

/// Serializable retry configuration.
///
/// # Example
///
/// ```rust
/// use retrypolicy::{BackoffSettings, RetrySettings};
///
/// let settings = RetrySettings::from_toml_str(r#"
///     max_retries = 5
///
///     [backoff]
///     kind = "exponential"
///     initial_delay_ms = 200
///     max_delay_ms = 10000
///     max_elapsed_ms = 60000
/// "#).unwrap();
///
/// assert_eq!(settings.max_retries, 5);
/// assert!(matches!(settings.backoff, BackoffSettings::Exponential { .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,

    /// Backoff between attempts.
    pub backoff: BackoffSettings,

    /// What cancellation returns.
    pub cancellation: CancellationBehavior,

    /// What a budget exhausted on a rejected success returns.
    pub exhaustion: ExhaustionBehavior,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff: BackoffSettings::default(),
            cancellation: CancellationBehavior::default(),
            exhaustion: ExhaustionBehavior::default(),
        }
    }
}

/// Backoff configuration, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffSettings {
    /// Fixed delay between attempts.
    Constant {
        /// Delay in milliseconds.
        #[serde(default)]
        delay_ms: u64,
        /// Optional wall-clock budget for the whole execution.
        #[serde(default)]
        max_elapsed_ms: Option<u64>,
    },
    /// Exponential backoff with jitter.
    Exponential {
        /// Delay before the first retry.
        #[serde(default = "default_initial_delay_ms")]
        initial_delay_ms: u64,
        /// Upper bound on a single delay.
        #[serde(default = "default_max_delay_ms")]
        max_delay_ms: u64,
        /// Growth factor per attempt.
        #[serde(default = "default_multiplier")]
        multiplier: f64,
        /// Jitter factor (0.0 to 1.0).
        #[serde(default = "default_jitter")]
        jitter: f64,
        /// Optional wall-clock budget for the whole execution.
        #[serde(default)]
        max_elapsed_ms: Option<u64>,
    },
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> f64 {
    0.1
}

impl Default for BackoffSettings {
    fn default() -> Self {
        BackoffSettings::Constant {
            delay_ms: 0,
            max_elapsed_ms: None,
        }
    }
}

impl BackoffSettings {
    fn max_elapsed_ms(&self) -> Option<u64> {
        match self {
            BackoffSettings::Constant { max_elapsed_ms, .. }
            | BackoffSettings::Exponential { max_elapsed_ms, .. } => *max_elapsed_ms,
        }
    }
}

impl RetrySettings {
    /// Parse settings from a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(document)?)
    }

    /// Load settings from environment variables.
    ///
    /// This will look for:
    /// - `RETRYPOLICY_MAX_RETRIES` for the retry budget
    /// - `RETRYPOLICY_INITIAL_DELAY_MS`, `RETRYPOLICY_MAX_DELAY_MS`,
    ///   `RETRYPOLICY_MULTIPLIER`, `RETRYPOLICY_JITTER` for exponential
    ///   backoff; setting any of them selects exponential backoff
    /// - `RETRYPOLICY_MAX_ELAPSED_MS` for a wall-clock budget
    ///
    /// Unset variables keep their defaults; malformed values are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Some(max_retries) = env_parse::<u32>("RETRYPOLICY_MAX_RETRIES")? {
            settings.max_retries = max_retries;
        }

        let initial = env_parse::<u64>("RETRYPOLICY_INITIAL_DELAY_MS")?;
        let max = env_parse::<u64>("RETRYPOLICY_MAX_DELAY_MS")?;
        let multiplier = env_parse::<f64>("RETRYPOLICY_MULTIPLIER")?;
        let jitter = env_parse::<f64>("RETRYPOLICY_JITTER")?;
        let max_elapsed_ms = env_parse::<u64>("RETRYPOLICY_MAX_ELAPSED_MS")?;

        settings.backoff =
            if initial.is_some() || max.is_some() || multiplier.is_some() || jitter.is_some() {
                BackoffSettings::Exponential {
                    initial_delay_ms: initial.unwrap_or_else(default_initial_delay_ms),
                    max_delay_ms: max.unwrap_or_else(default_max_delay_ms),
                    multiplier: multiplier.unwrap_or_else(default_multiplier),
                    jitter: jitter.unwrap_or_else(default_jitter),
                    max_elapsed_ms,
                }
            } else {
                BackoffSettings::Constant {
                    delay_ms: 0,
                    max_elapsed_ms,
                }
            };

        Ok(settings)
    }

    /// Build the backoff provider these settings describe.
    pub fn backoff_provider(&self) -> Arc<dyn BackoffProvider> {
        let limit = self.backoff.max_elapsed_ms().map(Duration::from_millis);

        match &self.backoff {
            BackoffSettings::Constant { delay_ms, .. } => {
                with_limit(ConstantBackoff::new(Duration::from_millis(*delay_ms)), limit)
            }
            BackoffSettings::Exponential {
                initial_delay_ms,
                max_delay_ms,
                multiplier,
                jitter,
                ..
            } => with_limit(
                ExponentialBackoff::builder()
                    .initial_delay(Duration::from_millis(*initial_delay_ms))
                    .max_delay(Duration::from_millis(*max_delay_ms))
                    .multiplier(*multiplier)
                    .jitter(*jitter)
                    .build(),
                limit,
            ),
        }
    }
}

fn with_limit<B>(backoff: B, limit: Option<Duration>) -> Arc<dyn BackoffProvider>
where
    B: BackoffProvider + 'static,
{
    match limit {
        Some(limit) => Arc::new(ElapsedLimit::new(backoff, limit)),
        None => Arc::new(backoff),
    }
}

fn env_parse<V: std::str::FromStr>(var: &'static str) -> Result<Option<V>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { var, value }),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(raw)) => Err(ConfigError::Env {
            var,
            value: raw.to_string_lossy().into_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_VARS: [&str; 6] = [
        "RETRYPOLICY_MAX_RETRIES",
        "RETRYPOLICY_INITIAL_DELAY_MS",
        "RETRYPOLICY_MAX_DELAY_MS",
        "RETRYPOLICY_MULTIPLIER",
        "RETRYPOLICY_JITTER",
        "RETRYPOLICY_MAX_ELAPSED_MS",
    ];

    #[test]
    fn test_empty_toml_uses_defaults() {
        let settings = RetrySettings::from_toml_str("").unwrap();
        assert_eq!(settings, RetrySettings::default());
        assert_eq!(settings.max_retries, 1);
    }

    #[test]
    fn test_toml_exponential_defaults_fill_in() {
        let settings = RetrySettings::from_toml_str(
            r#"
            max_retries = 4
            cancellation = "error"
            exhaustion = "reject"

            [backoff]
            kind = "exponential"
            initial_delay_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(settings.max_retries, 4);
        assert_eq!(settings.cancellation, CancellationBehavior::Error);
        assert_eq!(settings.exhaustion, ExhaustionBehavior::Reject);
        assert_eq!(
            settings.backoff,
            BackoffSettings::Exponential {
                initial_delay_ms: 250,
                max_delay_ms: 60_000,
                multiplier: 2.0,
                jitter: 0.1,
                max_elapsed_ms: None,
            }
        );
    }

    #[test]
    fn test_toml_rejects_unknown_backoff_kind() {
        let result = RetrySettings::from_toml_str(
            r#"
            [backoff]
            kind = "fibonacci"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_backoff_provider_constant() {
        let settings = RetrySettings {
            backoff: BackoffSettings::Constant {
                delay_ms: 50,
                max_elapsed_ms: None,
            },
            ..Default::default()
        };
        let provider = settings.backoff_provider();

        assert_eq!(provider.next_delay(1), Some(Duration::from_millis(50)));
        assert_eq!(
            provider.next_delay_after(7, Duration::from_secs(3600)),
            Some(Duration::from_millis(50))
        );
    }

    #[test]
    fn test_backoff_provider_exponential_with_limit() {
        let settings = RetrySettings {
            backoff: BackoffSettings::Exponential {
                initial_delay_ms: 100,
                max_delay_ms: 1_000,
                multiplier: 2.0,
                jitter: 0.0,
                max_elapsed_ms: Some(2_000),
            },
            ..Default::default()
        };
        let provider = settings.backoff_provider();

        assert_eq!(
            provider.next_delay_after(2, Duration::ZERO),
            Some(Duration::from_millis(200))
        );
        assert_eq!(
            provider.next_delay_after(10, Duration::from_millis(1_500)),
            Some(Duration::from_millis(500))
        );
        assert_eq!(provider.next_delay_after(3, Duration::from_secs(2)), None);
    }

    #[test]
    fn test_from_env_defaults() {
        temp_env::with_vars_unset(ENV_VARS, || {
            let settings = RetrySettings::from_env().unwrap();
            assert_eq!(settings, RetrySettings::default());
        });
    }

    #[test]
    fn test_from_env_exponential() {
        temp_env::with_vars(
            [
                ("RETRYPOLICY_MAX_RETRIES", Some("5")),
                ("RETRYPOLICY_INITIAL_DELAY_MS", Some("20")),
                ("RETRYPOLICY_MAX_DELAY_MS", None),
                ("RETRYPOLICY_MULTIPLIER", Some("3")),
                ("RETRYPOLICY_JITTER", None),
                ("RETRYPOLICY_MAX_ELAPSED_MS", Some("30000")),
            ],
            || {
                let settings = RetrySettings::from_env().unwrap();

                assert_eq!(settings.max_retries, 5);
                assert_eq!(
                    settings.backoff,
                    BackoffSettings::Exponential {
                        initial_delay_ms: 20,
                        max_delay_ms: 60_000,
                        multiplier: 3.0,
                        jitter: 0.1,
                        max_elapsed_ms: Some(30_000),
                    }
                );
            },
        );
    }

    #[test]
    fn test_from_env_invalid_value() {
        temp_env::with_vars(
            [
                ("RETRYPOLICY_MAX_RETRIES", Some("many")),
                ("RETRYPOLICY_INITIAL_DELAY_MS", None),
                ("RETRYPOLICY_MAX_DELAY_MS", None),
                ("RETRYPOLICY_MULTIPLIER", None),
                ("RETRYPOLICY_JITTER", None),
                ("RETRYPOLICY_MAX_ELAPSED_MS", None),
            ],
            || match RetrySettings::from_env() {
                Err(ConfigError::Env { var, value }) => {
                    assert_eq!(var, "RETRYPOLICY_MAX_RETRIES");
                    assert_eq!(value, "many");
                }
                other => panic!("expected Env error, got {:?}", other),
            },
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_from_env_non_unicode_value() {
        use std::os::unix::ffi::OsStringExt;

        let raw = std::ffi::OsString::from_vec(vec![b'3', 0xff]);
        temp_env::with_var("RETRYPOLICY_MAX_RETRIES", Some(raw), || {
            match RetrySettings::from_env() {
                Err(ConfigError::Env { var, value }) => {
                    assert_eq!(var, "RETRYPOLICY_MAX_RETRIES");
                    assert_eq!(value, "3\u{fffd}");
                }
                other => panic!("expected Env error, got {:?}", other),
            }
        });
    }
}
