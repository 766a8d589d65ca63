use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveTime;
use chrono_tz::Tz;

use crate::error::ConfigError;
use crate::schedule::DailySchedule;

const DEFAULT_API_URL: &str = "https://llm.api.cloud.yandex.net/foundationModels/v1/completion";

#[derive(Clone)]
pub struct AppConfig {
    pub telegram_bot_token: String,
    pub yandex_api_key: String,
    /// e.g. `gpt://<folder-id>/yandexgpt-lite/latest`
    pub yandex_model_uri: String,
    pub yandex_api_url: String,
    pub temperature: f32,
    pub request_timeout: Duration,

    /// Upper bound on generated reply length, in characters
    pub news_max_length: usize,
    /// Completion token budget passed to the provider
    pub news_token_budget: u32,

    pub broadcast_time: NaiveTime,
    pub broadcast_timezone: Tz,

    /// Appended to the `/contact` reply when set
    pub contact_info: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let telegram_bot_token = required("TELEGRAM_TOKEN")?;
        if !is_bot_token(&telegram_bot_token) {
            return Err(ConfigError::Invalid {
                name: "TELEGRAM_TOKEN",
                reason: "expected <bot id>:<secret> as issued by @BotFather".to_string(),
            });
        }
        let yandex_api_key = required("YANDEX_API_KEY")?;
        let yandex_model_uri = required("YANDEX_MODEL_URI")?;
        match yandex_model_uri.split_once("://") {
            Some((scheme, rest)) if !scheme.is_empty() && !rest.is_empty() => {}
            _ => {
                return Err(ConfigError::Invalid {
                    name: "YANDEX_MODEL_URI",
                    reason: format!("expected <scheme>://<path>, got {yandex_model_uri:?}"),
                })
            }
        }

        let temperature: f32 = parse_or("YANDEX_TEMPERATURE", get("YANDEX_TEMPERATURE"), 0.6)?;
        if !(0.0..=1.0).contains(&temperature) {
            return Err(ConfigError::Invalid {
                name: "YANDEX_TEMPERATURE",
                reason: format!("{temperature} is outside 0.0..=1.0"),
            });
        }

        let timeout_secs: u64 = positive("LLM_TIMEOUT_SECS", get("LLM_TIMEOUT_SECS"), 30)?;

        let raw_time = get("BROADCAST_TIME").unwrap_or_else(|| "08:00".to_string());
        let broadcast_time =
            NaiveTime::parse_from_str(&raw_time, "%H:%M").map_err(|e| ConfigError::Invalid {
                name: "BROADCAST_TIME",
                reason: format!("{raw_time:?} is not HH:MM ({e})"),
            })?;

        let broadcast_timezone = match get("BROADCAST_TIMEZONE") {
            Some(raw) => raw.parse::<Tz>().map_err(|e| ConfigError::Invalid {
                name: "BROADCAST_TIMEZONE",
                reason: e.to_string(),
            })?,
            None => chrono_tz::Europe::Moscow,
        };

        Ok(Self {
            telegram_bot_token,
            yandex_api_key,
            yandex_model_uri,
            yandex_api_url: get("YANDEX_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            temperature,
            request_timeout: Duration::from_secs(timeout_secs),
            news_max_length: positive("NEWS_MAX_LENGTH", get("NEWS_MAX_LENGTH"), 100)?,
            news_token_budget: positive("NEWS_TOKEN_BUDGET", get("NEWS_TOKEN_BUDGET"), 50)?,
            broadcast_time,
            broadcast_timezone,
            contact_info: get("CONTACT_INFO"),
        })
    }

    pub fn broadcast_schedule(&self) -> DailySchedule {
        DailySchedule::new(self.broadcast_time, self.broadcast_timezone)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("telegram_bot_token", &"<redacted>")
            .field("yandex_api_key", &"<redacted>")
            .field("yandex_model_uri", &self.yandex_model_uri)
            .field("yandex_api_url", &self.yandex_api_url)
            .field("temperature", &self.temperature)
            .field("request_timeout", &self.request_timeout)
            .field("news_max_length", &self.news_max_length)
            .field("news_token_budget", &self.news_token_budget)
            .field("broadcast_time", &self.broadcast_time)
            .field("broadcast_timezone", &self.broadcast_timezone)
            .field("contact_info", &self.contact_info)
            .finish()
    }
}

fn is_bot_token(token: &str) -> bool {
    match token.split_once(':') {
        Some((id, secret)) => {
            !id.is_empty()
                && id.bytes().all(|b| b.is_ascii_digit())
                && !secret.is_empty()
                && !secret.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: format!("{raw:?}: {e}"),
        }),
        None => Ok(default),
    }
}

fn positive<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
    T::Err: fmt::Display,
{
    let value = parse_or(name, raw, default)?;
    if value <= T::default() {
        return Err(ConfigError::Invalid {
            name,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig::from_lookup(|name| match name {
        "TELEGRAM_TOKEN" => Some("123:abc".to_string()),
        "YANDEX_API_KEY" => Some("key".to_string()),
        "YANDEX_MODEL_URI" => Some("gpt://folder/yandexgpt-lite/latest".to_string()),
        _ => None,
    })
    .expect("test config is valid")
}
