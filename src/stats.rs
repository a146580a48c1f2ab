use crate::models::{Attempt, DailyPoint, StatsResponse, TierPoint, User};
use chrono::{Duration, Local, NaiveDate};
use std::collections::BTreeMap;

const DAY_COUNT: i64 = 7;

#[derive(Default)]
struct DayAccumulator {
    attempts: u64,
    total: u64,
    best: Option<u32>,
}

pub fn build_stats_at(today: NaiveDate, users: &[User], attempts: &[Attempt]) -> StatsResponse {
    let first_day = today - Duration::days(DAY_COUNT - 1);

    let mut days: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();
    for attempt in attempts {
        let date = attempt.created_at.with_timezone(&Local).date_naive();
        if date < first_day || date > today {
            continue;
        }
        let day = days.entry(date).or_default();
        day.attempts = day.attempts.saturating_add(1);
        day.total = day.total.saturating_add(u64::from(attempt.difference));
        day.best = Some(day.best.map_or(attempt.difference, |best| best.min(attempt.difference)));
    }

    let mut last_7_days = Vec::with_capacity(DAY_COUNT as usize);
    for offset in (0..DAY_COUNT).rev() {
        let date = today - Duration::days(offset);
        let day = days.remove(&date).unwrap_or_default();
        last_7_days.push(DailyPoint {
            date: date.to_string(),
            attempts: day.attempts,
            best: day.best,
            average: (day.attempts > 0).then(|| day.total as f64 / day.attempts as f64),
        });
    }

    let mut tiers: BTreeMap<u8, u64> = BTreeMap::new();
    for user in users {
        *tiers.entry(user.discount).or_default() += 1;
    }
    // best tier first
    let discount_tiers = tiers
        .into_iter()
        .rev()
        .map(|(discount, users)| TierPoint { discount, users })
        .collect();

    StatsResponse {
        total_users: users.len() as u64,
        total_attempts: attempts.len() as u64,
        last_7_days,
        discount_tiers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn at_noon(date: NaiveDate) -> chrono::DateTime<Utc> {
        Local
            .from_local_datetime(&date.and_hms_opt(12, 0, 0).unwrap())
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn attempt(date: NaiveDate, difference: u32) -> Attempt {
        Attempt {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            difference,
            created_at: at_noon(date),
        }
    }

    fn user(discount: u8) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Dana".to_string(),
            phone: "+972501234567".to_string(),
            attempts_left: 0,
            best_result: None,
            discount,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn last_7_days_includes_each_day() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let two_days_ago = today - Duration::days(2);
        let attempts = vec![
            attempt(two_days_ago, 30),
            attempt(two_days_ago, 10),
            attempt(today - Duration::days(9), 1),
        ];

        let stats = build_stats_at(today, &[], &attempts);
        assert_eq!(stats.last_7_days.len(), 7);
        assert_eq!(stats.last_7_days[6].date, today.to_string());
        assert_eq!(stats.total_attempts, 3);

        let point = stats
            .last_7_days
            .iter()
            .find(|day| day.date == two_days_ago.to_string())
            .expect("missing day");
        assert_eq!(point.attempts, 2);
        assert_eq!(point.best, Some(10));
        assert_eq!(point.average, Some(20.0));

        let quiet: u64 = stats.last_7_days.iter().map(|day| day.attempts).sum();
        assert_eq!(quiet, 2);
    }

    #[test]
    fn tiers_count_users_best_first() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let users = vec![user(3), user(15), user(3), user(25)];
        let stats = build_stats_at(today, &users, &[]);

        let tiers: Vec<(u8, u64)> = stats
            .discount_tiers
            .iter()
            .map(|tier| (tier.discount, tier.users))
            .collect();
        assert_eq!(tiers, vec![(25, 1), (15, 1), (3, 2)]);
        assert_eq!(stats.total_users, 4);
        assert!(stats.last_7_days.iter().all(|day| day.average.is_none()));
    }
}
