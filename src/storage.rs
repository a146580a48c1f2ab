use crate::errors::StoreError;
use crate::models::AppData;
use std::{env, path::Path, path::PathBuf};
use tokio::fs;
use tracing::{error, warn};

pub fn resolve_data_path() -> PathBuf {
    if let Ok(path) = env::var("APP_DATA_PATH") {
        return PathBuf::from(path);
    }

    PathBuf::from("data/state.json")
}

/// Where an unparseable data file is moved before starting over.
pub fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt");
    PathBuf::from(name)
}

/// Reads the data file, starting over from defaults when it is missing or
/// cannot be parsed. An unparseable file is kept next to the original.
pub async fn load_data(path: &Path) -> AppData {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                let aside = corrupt_path(path);
                error!("failed to parse data file {}: {err}", path.display());
                match fs::rename(path, &aside).await {
                    Ok(()) => warn!("moved unreadable data file to {}", aside.display()),
                    Err(err) => error!("failed to move {} aside: {err}", path.display()),
                }
                AppData::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!("no data file at {}, starting fresh", path.display());
            AppData::default()
        }
        Err(err) => {
            error!("failed to read data file {}: {err}", path.display());
            AppData::default()
        }
    }
}

pub async fn persist_data(path: &Path, data: &AppData) -> Result<(), StoreError> {
    let payload = serde_json::to_vec_pretty(data)?;
    // write-then-rename so a crash never leaves a truncated file behind
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, payload).await?;
    fs::rename(&staging, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DiscountRange;

    fn scratch_path(tag: &str) -> PathBuf {
        let mut path = env::temp_dir();
        path.push(format!("second_hunt_storage_{tag}_{}.json", std::process::id()));
        path
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let data = load_data(&scratch_path("missing")).await;
        assert!(data.users.is_empty());
        assert_eq!(data.settings.attempts_number, 10);
        assert_eq!(data.settings.fallback_discount, 3);
    }

    #[tokio::test]
    async fn persisted_settings_survive_reload() {
        let path = scratch_path("reload");
        let mut data = AppData::default();
        data.settings.attempts_number = 4;
        data.settings.discount_ranges = vec![DiscountRange { min: 0, max: None, discount: 9 }];

        persist_data(&path, &data).await.unwrap();
        let loaded = load_data(&path).await;
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.settings, data.settings);
    }

    #[tokio::test]
    async fn corrupt_file_is_moved_aside() {
        let path = scratch_path("corrupt");
        std::fs::write(&path, b"{ not json").unwrap();
        let data = load_data(&path).await;

        let aside = corrupt_path(&path);
        let kept = std::fs::read(&aside);
        let _ = std::fs::remove_file(&aside);
        assert!(data.attempts.is_empty());
        assert!(!path.exists());
        assert_eq!(kept.unwrap(), b"{ not json");
    }
}
