use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on the public top list.
pub const MAX_LEADERBOARD_SIZE: u32 = 10;

#[derive(Debug, Error)]
#[error("invalid value for {var}: {value:?}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(()),
        }
    }
}

/// Length bounds applied to submitted initials / gamertags, in characters.
///
/// Lengths are counted after trimming surrounding whitespace, so `" AB "`
/// is two characters and `" ABC "` satisfies a `3..=3` policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialsPolicy {
    pub min_len: usize,
    pub max_len: usize,
}

impl Default for InitialsPolicy {
    fn default() -> Self {
        InitialsPolicy {
            min_len: 1,
            max_len: 20,
        }
    }
}

/// Anti-cheat limits for score submission.
#[derive(Debug, Clone)]
pub struct SubmissionPolicy {
    pub session_ttl: Duration,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    pub duplicate_window: Duration,
    pub initials: InitialsPolicy,
}

impl Default for SubmissionPolicy {
    fn default() -> Self {
        SubmissionPolicy {
            session_ttl: Duration::from_secs(3600),
            rate_limit_max: 5,
            rate_limit_window: Duration::from_secs(60),
            duplicate_window: Duration::from_secs(10),
            initials: InitialsPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub backend: StoreBackend,
    pub ip_hash_salt: Option<String>,
    pub policy: SubmissionPolicy,
    pub rate_limit_retention: Duration,
    pub cleanup_interval: Duration,
    pub store_timeout: Duration,
    pub leaderboard_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".into(),
            port: 8082,
            database_path: "paperclip-hunt.db".into(),
            backend: StoreBackend::Sqlite,
            ip_hash_salt: None,
            policy: SubmissionPolicy::default(),
            rate_limit_retention: Duration::from_secs(86_400),
            cleanup_interval: Duration::from_secs(60),
            store_timeout: Duration::from_millis(5000),
            leaderboard_size: 10,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source, falling back to
    /// defaults for anything unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let get = |var: &'static str| lookup(var).filter(|v| !v.trim().is_empty());

        let secs = |var: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            Ok(parse(var, get(var))?.map(Duration::from_secs).unwrap_or(default))
        };

        let policy = SubmissionPolicy {
            session_ttl: secs("SESSION_TTL_SECS", defaults.policy.session_ttl)?,
            rate_limit_max: parse("RATE_LIMIT_MAX", get("RATE_LIMIT_MAX"))?
                .unwrap_or(defaults.policy.rate_limit_max),
            rate_limit_window: secs("RATE_LIMIT_WINDOW_SECS", defaults.policy.rate_limit_window)?,
            duplicate_window: secs("DUPLICATE_WINDOW_SECS", defaults.policy.duplicate_window)?,
            initials: InitialsPolicy {
                min_len: parse("INITIALS_MIN_LEN", get("INITIALS_MIN_LEN"))?
                    .unwrap_or(defaults.policy.initials.min_len),
                max_len: parse("INITIALS_MAX_LEN", get("INITIALS_MAX_LEN"))?
                    .unwrap_or(defaults.policy.initials.max_len),
            },
        };

        if policy.initials.min_len == 0 || policy.initials.min_len > policy.initials.max_len {
            return Err(ConfigError {
                var: "INITIALS_MIN_LEN",
                value: format!("{}..={}", policy.initials.min_len, policy.initials.max_len),
            });
        }

        let backend = match get("STORE_BACKEND") {
            Some(v) => v.parse().map_err(|_| ConfigError {
                var: "STORE_BACKEND",
                value: v,
            })?,
            None => defaults.backend,
        };

        let leaderboard_size = parse("LEADERBOARD_SIZE", get("LEADERBOARD_SIZE"))?
            .unwrap_or(defaults.leaderboard_size);
        if !(1..=MAX_LEADERBOARD_SIZE).contains(&leaderboard_size) {
            return Err(ConfigError {
                var: "LEADERBOARD_SIZE",
                value: leaderboard_size.to_string(),
            });
        }

        Ok(Config {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse("PORT", get("PORT"))?.unwrap_or(defaults.port),
            database_path: get("DATABASE_PATH").unwrap_or(defaults.database_path),
            backend,
            ip_hash_salt: get("IP_HASH_SALT"),
            policy,
            rate_limit_retention: secs("RATE_LIMIT_RETENTION_SECS", defaults.rate_limit_retention)?,
            cleanup_interval: secs("CLEANUP_INTERVAL_SECS", defaults.cleanup_interval)?,
            store_timeout: parse("STORE_TIMEOUT_MS", get("STORE_TIMEOUT_MS"))?
                .map(Duration::from_millis)
                .unwrap_or(defaults.store_timeout),
            leaderboard_size,
        })
    }
}

fn parse<T: FromStr>(var: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigError> {
    match raw {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError { var, value }),
    }
}
