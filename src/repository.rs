// Persistence port and its JSON-file implementation

use crate::discount::apply_attempt;
use crate::errors::StoreError;
use crate::models::{AdminAccount, AppData, Attempt, GameSettings, SettingsUpdate, User, UserUpdate};
use crate::storage::{load_data, persist_data};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Outcome of [`GameRepository::record_attempt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scored {
    /// The attempt was stored; carries the rescored user.
    Recorded(User),
    /// Nothing stored; carries the user as currently stored.
    Exhausted(User),
    UnknownUser,
}

/// Everything the game needs from the outside world. The game never reaches
/// storage except through this trait.
#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;

    async fn create_user(
        &self,
        name: &str,
        phone: &str,
        attempts_number: u32,
        initial_discount: u8,
    ) -> Result<User>;

    /// Checks the stored row for attempts left, stores the attempt and
    /// rescores the user with the current settings, all or nothing.
    async fn record_attempt(&self, user_id: Uuid, difference: u32) -> Result<Scored>;

    /// `false` when the user does not exist.
    async fn insert_attempt(&self, user_id: Uuid, difference: u32) -> Result<bool>;

    /// Attempts of one user in insertion order.
    async fn list_attempts(&self, user_id: Uuid) -> Result<Vec<Attempt>>;

    /// Every attempt of every user, in insertion order.
    async fn all_attempts(&self) -> Result<Vec<Attempt>>;

    /// `false` when the user does not exist.
    async fn update_user(&self, user_id: Uuid, fields: UserUpdate) -> Result<bool>;

    /// Newest first; `search` is a case-insensitive substring of name or phone.
    async fn list_users(&self, search: Option<&str>) -> Result<Vec<User>>;

    /// Newest first, both bounds inclusive.
    async fn users_created_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<User>>;

    async fn load_game_settings(&self) -> Result<GameSettings>;

    async fn update_game_settings(&self, fields: SettingsUpdate) -> Result<bool>;

    async fn load_admin(&self) -> Result<AdminAccount>;

    async fn save_admin(&self, account: &AdminAccount) -> Result<()>;
}

/// Keeps all rows in memory and rewrites the data file after each change.
pub struct JsonStore {
    path: Option<PathBuf>,
    data: Mutex<AppData>,
}

impl JsonStore {
    pub async fn open(path: &Path) -> Self {
        let data = load_data(path).await;
        Self {
            path: Some(path.to_path_buf()),
            data: Mutex::new(data),
        }
    }

    /// Never touches the disk.
    pub fn in_memory(data: AppData) -> Self {
        Self {
            path: None,
            data: Mutex::new(data),
        }
    }

    async fn persist(&self, data: &AppData) -> Result<()> {
        match &self.path {
            Some(path) => persist_data(path, data).await,
            None => Ok(()),
        }
    }

    /// Writes `next` out and only then makes it the live state, so a failed
    /// write leaves `current` as it was.
    async fn commit(&self, current: &mut AppData, next: AppData) -> Result<()> {
        self.persist(&next).await?;
        *current = next;
        Ok(())
    }
}

fn new_attempt(user_id: Uuid, difference: u32) -> Attempt {
    Attempt {
        id: Uuid::new_v4(),
        user_id,
        difference,
        created_at: Utc::now(),
    }
}

fn newest_first(mut users: Vec<User>) -> Vec<User> {
    users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    users
}

#[async_trait]
impl GameRepository for JsonStore {
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>> {
        let data = self.data.lock().await;
        Ok(data.users.iter().find(|user| user.phone == phone).cloned())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        let data = self.data.lock().await;
        Ok(data.users.iter().find(|user| user.id == id).cloned())
    }

    async fn create_user(
        &self,
        name: &str,
        phone: &str,
        attempts_number: u32,
        initial_discount: u8,
    ) -> Result<User> {
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            phone: phone.to_string(),
            attempts_left: attempts_number,
            best_result: None,
            discount: initial_discount,
            created_at: Utc::now(),
        };

        let mut data = self.data.lock().await;
        let mut next = data.clone();
        next.users.push(user.clone());
        self.commit(&mut data, next).await?;
        Ok(user)
    }

    async fn record_attempt(&self, user_id: Uuid, difference: u32) -> Result<Scored> {
        let mut data = self.data.lock().await;
        let Some(current) = data.users.iter().find(|user| user.id == user_id).cloned() else {
            return Ok(Scored::UnknownUser);
        };
        if current.attempts_left == 0 {
            return Ok(Scored::Exhausted(current));
        }

        let settings = &data.settings;
        let scored = apply_attempt(
            &current,
            difference,
            &settings.discount_ranges,
            settings.fallback_discount,
        );

        let mut next = data.clone();
        next.attempts.push(new_attempt(user_id, difference));
        if let Some(row) = next.users.iter_mut().find(|user| user.id == user_id) {
            *row = scored.clone();
        }
        self.commit(&mut data, next).await?;
        Ok(Scored::Recorded(scored))
    }

    async fn insert_attempt(&self, user_id: Uuid, difference: u32) -> Result<bool> {
        let mut data = self.data.lock().await;
        if !data.users.iter().any(|user| user.id == user_id) {
            return Ok(false);
        }

        let mut next = data.clone();
        next.attempts.push(new_attempt(user_id, difference));
        self.commit(&mut data, next).await?;
        Ok(true)
    }

    async fn list_attempts(&self, user_id: Uuid) -> Result<Vec<Attempt>> {
        let data = self.data.lock().await;
        Ok(data
            .attempts
            .iter()
            .filter(|attempt| attempt.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn all_attempts(&self) -> Result<Vec<Attempt>> {
        let data = self.data.lock().await;
        Ok(data.attempts.clone())
    }

    async fn update_user(&self, user_id: Uuid, fields: UserUpdate) -> Result<bool> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        let Some(user) = next.users.iter_mut().find(|user| user.id == user_id) else {
            return Ok(false);
        };

        if let Some(attempts_left) = fields.attempts_left {
            user.attempts_left = attempts_left;
        }
        if let Some(best_result) = fields.best_result {
            user.best_result = Some(best_result);
        }
        if let Some(discount) = fields.discount {
            user.discount = discount;
        }

        self.commit(&mut data, next).await?;
        Ok(true)
    }

    async fn list_users(&self, search: Option<&str>) -> Result<Vec<User>> {
        let needle = search
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty());

        let data = self.data.lock().await;
        let users = data
            .users
            .iter()
            .filter(|user| match &needle {
                Some(needle) => {
                    user.name.to_lowercase().contains(needle.as_str())
                        || user.phone.to_lowercase().contains(needle.as_str())
                }
                None => true,
            })
            .cloned()
            .collect();
        Ok(newest_first(users))
    }

    async fn users_created_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<User>> {
        let data = self.data.lock().await;
        let users = data
            .users
            .iter()
            .filter(|user| user.created_at >= from && user.created_at <= to)
            .cloned()
            .collect();
        Ok(newest_first(users))
    }

    async fn load_game_settings(&self) -> Result<GameSettings> {
        let data = self.data.lock().await;
        Ok(data.settings.clone())
    }

    async fn update_game_settings(&self, fields: SettingsUpdate) -> Result<bool> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        if let Some(attempts_number) = fields.attempts_number {
            next.settings.attempts_number = attempts_number;
        }
        if let Some(ranges) = fields.discount_ranges {
            next.settings.discount_ranges = ranges;
        }
        if let Some(fallback) = fields.fallback_discount {
            next.settings.fallback_discount = fallback;
        }

        self.commit(&mut data, next).await?;
        Ok(true)
    }

    async fn load_admin(&self) -> Result<AdminAccount> {
        let data = self.data.lock().await;
        Ok(data.admin.clone())
    }

    async fn save_admin(&self, account: &AdminAccount) -> Result<()> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        next.admin = account.clone();
        self.commit(&mut data, next).await
    }
}
