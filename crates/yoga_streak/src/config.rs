use crate::StreakError;
use secrecy::SecretString;
use std::time::Duration;

pub const DEFAULT_RATE_LIMIT: u32 = 60;
pub const DEFAULT_RATE_WINDOW_SECS: u64 = 60;
pub const DEFAULT_NOTIFY_TOLERANCE_MINUTES: u32 = 15;

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub api_token: SecretString,
    pub rate_limit: u32,
    pub rate_window: Duration,
    pub notify_tolerance_minutes: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, StreakError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Reads configuration values through `get` so tests never touch the
    /// process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, StreakError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let api_base_url = get("YOGA_STREAK_API_BASE_URL")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| StreakError::Config("YOGA_STREAK_API_BASE_URL missing".into()))?;
        let token = get("YOGA_STREAK_API_TOKEN")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| StreakError::Config("YOGA_STREAK_API_TOKEN missing".into()))?;
        let rate_limit = parse_or(&mut get, "YOGA_STREAK_RATE_LIMIT", DEFAULT_RATE_LIMIT)?;
        let window_secs =
            parse_or(&mut get, "YOGA_STREAK_RATE_WINDOW_SECS", DEFAULT_RATE_WINDOW_SECS)?;
        let notify_tolerance_minutes = parse_or(
            &mut get,
            "YOGA_STREAK_NOTIFY_TOLERANCE_MINUTES",
            DEFAULT_NOTIFY_TOLERANCE_MINUTES,
        )?;

        if rate_limit == 0 || window_secs == 0 {
            return Err(StreakError::Config(
                "rate limit and window must be greater than zero".into(),
            ));
        }

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            api_token: SecretString::new(token.into()),
            rate_limit,
            rate_window: Duration::from_secs(window_secs),
            notify_tolerance_minutes,
        })
    }
}

fn parse_or<F, T>(get: &mut F, key: &str, default: T) -> Result<T, StreakError>
where
    F: FnMut(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| StreakError::Config(format!("{key} is not a valid number: {raw}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(k: &str) -> Option<String> {
        match k {
            "YOGA_STREAK_API_BASE_URL" => Some("http://localhost:8080/".into()),
            "YOGA_STREAK_API_TOKEN" => Some("sekrit".into()),
            _ => None,
        }
    }

    #[test]
    fn from_env_missing_token() {
        let get = |k: &str| match k {
            "YOGA_STREAK_API_BASE_URL" => Some("http://localhost".into()),
            _ => None,
        };
        let res = Config::from_env_with(get);
        assert!(matches!(res, Err(StreakError::Config(_))));
    }

    #[test]
    fn from_env_applies_defaults() {
        let cfg = Config::from_env_with(base).expect("cfg");
        assert_eq!(cfg.api_base_url, "http://localhost:8080");
        assert_eq!(cfg.rate_limit, DEFAULT_RATE_LIMIT);
        assert_eq!(cfg.rate_window, Duration::from_secs(DEFAULT_RATE_WINDOW_SECS));
        assert_eq!(cfg.notify_tolerance_minutes, DEFAULT_NOTIFY_TOLERANCE_MINUTES);
    }

    #[test]
    fn from_env_reads_overrides() {
        let get = |k: &str| match k {
            "YOGA_STREAK_RATE_LIMIT" => Some("5".into()),
            "YOGA_STREAK_RATE_WINDOW_SECS" => Some("10".into()),
            "YOGA_STREAK_NOTIFY_TOLERANCE_MINUTES" => Some("30".into()),
            other => base(other),
        };
        let cfg = Config::from_env_with(get).expect("cfg");
        assert_eq!(cfg.rate_limit, 5);
        assert_eq!(cfg.rate_window, Duration::from_secs(10));
        assert_eq!(cfg.notify_tolerance_minutes, 30);
    }

    #[test]
    fn from_env_rejects_bad_numbers() {
        let get = |k: &str| match k {
            "YOGA_STREAK_RATE_LIMIT" => Some("lots".into()),
            other => base(other),
        };
        assert!(Config::from_env_with(get).is_err());

        let get = |k: &str| match k {
            "YOGA_STREAK_RATE_WINDOW_SECS" => Some("0".into()),
            other => base(other),
        };
        assert!(Config::from_env_with(get).is_err());
    }
}
