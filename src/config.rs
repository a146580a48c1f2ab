use crate::game::{GameOptions, DEFAULT_PRESS_COOLDOWN, DEFAULT_SESSION_IDLE};
use crate::storage::resolve_data_path;
use crate::timing::TICK_INTERVAL;
use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
#[error("invalid {key}: {reason}")]
pub struct ConfigError {
    key: &'static str,
    reason: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    /// Hex SHA-256 of the admin password; admin login is off without it.
    pub admin_password_hash: Option<String>,
    pub tick_interval: Duration,
    pub press_cooldown: Duration,
    pub session_idle: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let admin_password_hash = env::var("ADMIN_PASSWORD_HASH")
            .ok()
            .map(|hash| hash.trim().to_string())
            .filter(|hash| !hash.is_empty());
        match &admin_password_hash {
            Some(hash) if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) => {
                return Err(ConfigError {
                    key: "ADMIN_PASSWORD_HASH",
                    reason: "expected 64 hex characters".to_string(),
                });
            }
            Some(_) => {}
            None => warn!("ADMIN_PASSWORD_HASH not set, admin login disabled"),
        }

        Ok(Self {
            port: try_load("PORT", 8080)?,
            data_path: resolve_data_path(),
            admin_password_hash,
            tick_interval: Duration::from_millis(try_load(
                "TICK_INTERVAL_MS",
                TICK_INTERVAL.as_millis() as u64,
            )?),
            press_cooldown: Duration::from_millis(try_load(
                "PRESS_COOLDOWN_MS",
                DEFAULT_PRESS_COOLDOWN.as_millis() as u64,
            )?),
            session_idle: Duration::from_secs(try_load(
                "SESSION_IDLE_SECS",
                DEFAULT_SESSION_IDLE.as_secs(),
            )?),
        })
    }

    pub fn game_options(&self) -> GameOptions {
        GameOptions {
            tick_interval: self.tick_interval,
            press_cooldown: self.press_cooldown,
            session_idle: self.session_idle,
        }
    }
}

fn try_load<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|err: T::Err| ConfigError {
            key,
            reason: err.to_string(),
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
