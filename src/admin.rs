use crate::discount::{validate_discount, validate_ranges};
use crate::errors::GameError;
use crate::models::{DiscountRange, GameSettings, SettingsUpdate, StatsResponse, User, UserUpdate};
use crate::repository::GameRepository;
use crate::stats::build_stats_at;
use crate::timing::Clock;
use crate::validation::format_phone;
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

pub const MAX_FAILED_LOGINS: u32 = 5;

pub fn lockout() -> Duration {
    Duration::minutes(15)
}

/// An admin token expires after this long without use.
pub fn token_idle() -> Duration {
    Duration::hours(2)
}

/// Hex SHA-256 digest of an admin password.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn digests_match(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    name: &'a str,
    phone: &'a str,
    phone_display: String,
    attempts_left: u32,
    best_result: Option<u32>,
    discount: u8,
    created_at: String,
}

/// Administrative surface: password gate with lockout plus the operations
/// behind it.
pub struct Admin {
    repo: Arc<dyn GameRepository>,
    clock: Arc<dyn Clock>,
    password_hash: Option<String>,
    /// Held for a whole login so concurrent attempts see each other's count.
    gate: Mutex<()>,
    /// Token to time of last use.
    tokens: Mutex<HashMap<Uuid, DateTime<Utc>>>,
}

impl Admin {
    pub fn new(repo: Arc<dyn GameRepository>, clock: Arc<dyn Clock>, password_hash: Option<String>) -> Self {
        Self {
            repo,
            clock,
            password_hash: password_hash.map(|hash| hash.trim().to_ascii_lowercase()),
            gate: Mutex::new(()),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Five wrong passwords in a row lock the gate for fifteen minutes. The
    /// counter only clears on success, so a wrong password right after the
    /// lock expires locks again.
    pub async fn login(&self, password: &str) -> Result<Uuid, GameError> {
        let _gate = self.gate.lock().await;
        let mut account = self.repo.load_admin().await?;
        let now = self.clock.now();

        if let Some(until) = account.locked_until.filter(|until| *until > now) {
            return Err(GameError::AdminLocked { until });
        }

        let Some(expected) = self.password_hash.as_deref() else {
            warn!("admin login attempted but ADMIN_PASSWORD_HASH is not set");
            return Err(GameError::AdminDisabled);
        };

        if !digests_match(&hash_password(password), expected) {
            account.failed_attempts = account.failed_attempts.saturating_add(1);
            account.locked_until = None;
            if account.failed_attempts >= MAX_FAILED_LOGINS {
                let until = now + lockout();
                account.locked_until = Some(until);
                self.repo.save_admin(&account).await?;
                warn!(failed = account.failed_attempts, %until, "admin login locked");
                return Err(GameError::AdminLocked { until });
            }
            self.repo.save_admin(&account).await?;
            warn!(failed = account.failed_attempts, "admin login rejected");
            return Err(GameError::WrongPassword);
        }

        account.failed_attempts = 0;
        account.locked_until = None;
        self.repo.save_admin(&account).await?;

        let token = Uuid::new_v4();
        self.tokens.lock().await.insert(token, now);
        info!("admin logged in");
        Ok(token)
    }

    /// Each successful check extends the token's life.
    pub async fn authorize(&self, token: Uuid) -> Result<(), GameError> {
        let now = self.clock.now();
        let mut tokens = self.tokens.lock().await;
        match tokens.get_mut(&token) {
            Some(last_used) if now - *last_used < token_idle() => {
                *last_used = now;
                Ok(())
            }
            Some(_) => {
                tokens.remove(&token);
                Err(GameError::Unauthorized)
            }
            None => Err(GameError::Unauthorized),
        }
    }

    pub async fn forget_expired_tokens(&self) -> usize {
        let now = self.clock.now();
        let mut tokens = self.tokens.lock().await;
        let before = tokens.len();
        tokens.retain(|_, last_used| now - *last_used < token_idle());
        let forgotten = before - tokens.len();
        if forgotten > 0 {
            info!(count = forgotten, "expired admin tokens dropped");
        }
        forgotten
    }

    pub async fn list_users(&self, search: Option<&str>) -> Result<Vec<User>, GameError> {
        Ok(self.repo.list_users(search).await?)
    }

    /// Gives a player the configured number of attempts again.
    pub async fn reset_user_attempts(&self, user_id: Uuid) -> Result<User, GameError> {
        let settings = self.repo.load_game_settings().await?;
        let fields = UserUpdate {
            attempts_left: Some(settings.attempts_number),
            ..UserUpdate::default()
        };
        if !self.repo.update_user(user_id, fields).await? {
            return Err(GameError::UserNotFound);
        }

        info!(user = %user_id, attempts = settings.attempts_number, "attempts reset");
        self.repo
            .find_user(user_id)
            .await?
            .ok_or(GameError::UserNotFound)
    }

    pub async fn change_attempts_number(&self, attempts_number: u32) -> Result<GameSettings, GameError> {
        if attempts_number == 0 {
            return Err(GameError::validation("attempts number must be positive"));
        }

        let fields = SettingsUpdate {
            attempts_number: Some(attempts_number),
            ..SettingsUpdate::default()
        };
        self.repo.update_game_settings(fields).await?;
        info!(attempts_number, "attempts number changed");
        Ok(self.repo.load_game_settings().await?)
    }

    pub async fn change_discount_ranges(
        &self,
        ranges: Vec<DiscountRange>,
        fallback: Option<u8>,
    ) -> Result<GameSettings, GameError> {
        validate_ranges(&ranges)?;
        if let Some(fallback) = fallback {
            validate_discount(fallback)?;
        }

        let count = ranges.len();
        let fields = SettingsUpdate {
            discount_ranges: Some(ranges),
            fallback_discount: fallback,
            ..SettingsUpdate::default()
        };
        self.repo.update_game_settings(fields).await?;
        info!(ranges = count, ?fallback, "discount table changed");
        Ok(self.repo.load_game_settings().await?)
    }

    /// CSV of the players registered between `from` and `to`, both days
    /// included (server local time).
    pub async fn export_users_csv(&self, from: NaiveDate, to: NaiveDate) -> Result<String, GameError> {
        if to < from {
            return Err(GameError::validation("export range ends before it starts"));
        }

        let start = local_midnight(from)?;
        let end = local_midnight(to + Duration::days(1))? - Duration::nanoseconds(1);
        let users = self.repo.users_created_between(start, end).await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        for user in &users {
            writer.serialize(ExportRow {
                name: &user.name,
                phone: &user.phone,
                phone_display: format_phone(&user.phone),
                attempts_left: user.attempts_left,
                best_result: user.best_result,
                discount: user.discount,
                created_at: user.created_at.with_timezone(&Local).format("%d.%m.%Y %H:%M").to_string(),
            })?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| csv::Error::from(err.into_error()))?;

        info!(rows = users.len(), %from, %to, "users exported");
        String::from_utf8(bytes).map_err(|_| GameError::validation("export produced invalid text"))
    }

    pub async fn stats(&self) -> Result<StatsResponse, GameError> {
        let users = self.repo.list_users(None).await?;
        let attempts = self.repo.all_attempts().await?;
        let today = self.clock.now().with_timezone(&Local).date_naive();
        Ok(build_stats_at(today, &users, &attempts))
    }
}

fn local_midnight(date: NaiveDate) -> Result<chrono::DateTime<Utc>, GameError> {
    Local
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| GameError::validation(format!("{date} has no local midnight")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdminAccount, AppData};
    use crate::repository::JsonStore;
    use crate::timing::tests::FixedClock;

    const PASSWORD: &str = "open sesame";

    fn admin() -> (Admin, Arc<JsonStore>, Arc<FixedClock>) {
        let store = Arc::new(JsonStore::in_memory(AppData::default()));
        let clock = FixedClock::at_millis(0);
        let admin = Admin::new(store.clone(), clock.clone(), Some(hash_password(PASSWORD)));
        (admin, store, clock)
    }

    #[test]
    fn digest_is_hex_sha256() {
        assert_eq!(
            hash_password("secret"),
            "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b"
        );
    }

    #[tokio::test]
    async fn correct_password_issues_a_token() {
        let (admin, store, _clock) = admin();
        let token = admin.login(PASSWORD).await.unwrap();
        assert!(admin.authorize(token).await.is_ok());
        assert!(matches!(admin.authorize(Uuid::new_v4()).await, Err(GameError::Unauthorized)));
        assert_eq!(store.load_admin().await.unwrap().failed_attempts, 0);
    }

    #[tokio::test]
    async fn five_failures_lock_for_fifteen_minutes() {
        let (admin, store, clock) = admin();
        for _ in 0..4 {
            assert!(matches!(admin.login("nope").await, Err(GameError::WrongPassword)));
        }
        let until = match admin.login("nope").await {
            Err(GameError::AdminLocked { until }) => until,
            other => panic!("expected lock, got {other:?}"),
        };
        assert_eq!(until, clock.now() + lockout());

        // even the right password bounces while locked
        assert!(matches!(admin.login(PASSWORD).await, Err(GameError::AdminLocked { .. })));

        clock.set(until + Duration::seconds(1));
        assert!(admin.login(PASSWORD).await.is_ok());
        assert_eq!(store.load_admin().await.unwrap(), AdminAccount::default());
    }

    #[tokio::test]
    async fn failure_after_expiry_relocks() {
        let (admin, _store, clock) = admin();
        for _ in 0..5 {
            let _ = admin.login("nope").await;
        }
        clock.advance(lockout() + Duration::seconds(1));
        assert!(matches!(admin.login("nope").await, Err(GameError::AdminLocked { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn parallel_guesses_still_lock() {
        let (admin, store, _clock) = admin();
        let admin = Arc::new(admin);

        let guesses: Vec<_> = (0..40)
            .map(|_| {
                let admin = Arc::clone(&admin);
                tokio::spawn(async move { admin.login("nope").await })
            })
            .collect();

        let (mut wrong, mut locked) = (0, 0);
        for guess in guesses {
            match guess.await.unwrap() {
                Err(GameError::WrongPassword) => wrong += 1,
                Err(GameError::AdminLocked { .. }) => locked += 1,
                other => panic!("unexpected login outcome {other:?}"),
            }
        }
        assert_eq!(wrong, MAX_FAILED_LOGINS - 1);
        assert_eq!(locked, 40 - wrong);
        assert_eq!(store.load_admin().await.unwrap().failed_attempts, MAX_FAILED_LOGINS);
    }

    #[tokio::test]
    async fn tokens_expire_when_unused() {
        let (admin, _store, clock) = admin();
        let active = admin.login(PASSWORD).await.unwrap();
        let idle = admin.login(PASSWORD).await.unwrap();

        clock.advance(token_idle() - Duration::minutes(1));
        assert!(admin.authorize(active).await.is_ok());
        clock.advance(Duration::minutes(2));

        assert_eq!(admin.forget_expired_tokens().await, 1);
        assert!(matches!(admin.authorize(idle).await, Err(GameError::Unauthorized)));
        assert!(admin.authorize(active).await.is_ok());

        clock.advance(token_idle());
        assert!(matches!(admin.authorize(active).await, Err(GameError::Unauthorized)));
        assert_eq!(admin.forget_expired_tokens().await, 0);
    }

    #[tokio::test]
    async fn unset_hash_disables_login() {
        let store = Arc::new(JsonStore::in_memory(AppData::default()));
        let admin = Admin::new(store, FixedClock::at_millis(0), None);
        assert!(matches!(admin.login(PASSWORD).await, Err(GameError::AdminDisabled)));
    }

    #[tokio::test]
    async fn reset_restores_configured_attempts() {
        let (admin, store, _clock) = admin();
        let user = store.create_user("Dana", "+972501234567", 10, 3).await.unwrap();
        let fields = UserUpdate {
            attempts_left: Some(0),
            ..UserUpdate::default()
        };
        store.update_user(user.id, fields).await.unwrap();
        admin.change_attempts_number(6).await.unwrap();

        let reset = admin.reset_user_attempts(user.id).await.unwrap();
        assert_eq!(reset.attempts_left, 6);
        assert!(matches!(
            admin.reset_user_attempts(Uuid::new_v4()).await,
            Err(GameError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn settings_changes_are_validated() {
        let (admin, _store, _clock) = admin();
        assert!(matches!(admin.change_attempts_number(0).await, Err(GameError::Validation(_))));

        let bad = vec![DiscountRange { min: 5, max: Some(1), discount: 10 }];
        assert!(admin.change_discount_ranges(bad, None).await.is_err());

        let good = vec![
            DiscountRange { min: 0, max: Some(20), discount: 30 },
            DiscountRange { min: 21, max: None, discount: 2 },
        ];
        let settings = admin.change_discount_ranges(good.clone(), Some(1)).await.unwrap();
        assert_eq!(settings.discount_ranges, good);
        assert_eq!(settings.fallback_discount, 1);
        assert!(admin.change_discount_ranges(good, Some(120)).await.is_err());
    }

    #[tokio::test]
    async fn export_lists_registrations_in_range() {
        let (admin, store, _clock) = admin();
        store.create_user("Dana", "+972501234567", 10, 3).await.unwrap();
        let today = Local::now().date_naive();

        let csv = admin.export_users_csv(today, today).await.unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("name,phone,phone_display,attempts_left,best_result,discount,created_at")
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("Dana,+972501234567,+972 (50) 123-4567,10,,3,"));
        assert!(lines.next().is_none());

        let yesterday = today - Duration::days(1);
        let empty = admin.export_users_csv(yesterday, yesterday).await.unwrap();
        assert!(empty.is_empty());

        assert!(admin.export_users_csv(today, yesterday).await.is_err());
    }
}
