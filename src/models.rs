use crate::discount::{default_ranges, DEFAULT_FALLBACK_DISCOUNT};
use crate::timing::Reading;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_ATTEMPTS_NUMBER: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountRange {
    pub min: u32,
    /// `None` leaves the range open-ended.
    pub max: Option<u32>,
    pub discount: u8,
}

impl DiscountRange {
    pub fn contains(&self, deviation: u32) -> bool {
        deviation >= self.min && self.max.is_none_or(|max| deviation <= max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    pub attempts_number: u32,
    pub discount_ranges: Vec<DiscountRange>,
    #[serde(default = "default_fallback")]
    pub fallback_discount: u8,
}

fn default_fallback() -> u8 {
    DEFAULT_FALLBACK_DISCOUNT
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            attempts_number: DEFAULT_ATTEMPTS_NUMBER,
            discount_ranges: default_ranges(),
            fallback_discount: DEFAULT_FALLBACK_DISCOUNT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub attempts_left: u32,
    pub best_result: Option<u32>,
    pub discount: u8,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub difference: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminAccount {
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

/// Partial update of a user row; `None` leaves the column alone.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub attempts_left: Option<u32>,
    pub best_result: Option<u32>,
    pub discount: Option<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub attempts_number: Option<u32>,
    pub discount_ranges: Option<Vec<DiscountRange>>,
    pub fallback_discount: Option<u8>,
}

/// Everything kept in the data file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppData {
    pub users: Vec<User>,
    pub attempts: Vec<Attempt>,
    pub settings: GameSettings,
    pub admin: AdminAccount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Running,
    Exhausted,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: Uuid,
    pub user: User,
    pub phase: Phase,
    pub reading: Reading,
}

#[derive(Debug, Serialize)]
pub struct AttemptResponse {
    pub difference: u32,
    pub clock: String,
    pub user: User,
    pub phase: Phase,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub user: User,
    pub attempts: Vec<Attempt>,
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    pub token: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AttemptsNumberRequest {
    pub attempts_number: u32,
}

#[derive(Debug, Deserialize)]
pub struct DiscountRangesRequest {
    pub discount_ranges: Vec<DiscountRange>,
    pub fallback_discount: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct DailyPoint {
    pub date: String,
    pub attempts: u64,
    pub best: Option<u32>,
    pub average: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct TierPoint {
    pub discount: u8,
    pub users: u64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_users: u64,
    pub total_attempts: u64,
    pub last_7_days: Vec<DailyPoint>,
    pub discount_tiers: Vec<TierPoint>,
}
