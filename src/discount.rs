use crate::errors::GameError;
use crate::models::{DiscountRange, User};

pub const DEFAULT_FALLBACK_DISCOUNT: u8 = 3;

/// `0 -> 25%`, `1-10 -> 15%`, `11-50 -> 10%`, `51-100 -> 5%`, `>100 -> 3%`.
pub fn default_ranges() -> Vec<DiscountRange> {
    vec![
        DiscountRange { min: 0, max: Some(0), discount: 25 },
        DiscountRange { min: 1, max: Some(10), discount: 15 },
        DiscountRange { min: 11, max: Some(50), discount: 10 },
        DiscountRange { min: 51, max: Some(100), discount: 5 },
        DiscountRange { min: 101, max: None, discount: 3 },
    ]
}

/// First listed range containing `deviation` wins; `fallback` when none does.
pub fn resolve_discount(deviation: u32, ranges: &[DiscountRange], fallback: u8) -> u8 {
    ranges
        .iter()
        .find(|range| range.contains(deviation))
        .map_or(fallback, |range| range.discount)
}

/// Scores one attempt against `user` and returns the new snapshot.
///
/// The caller rejects exhausted users before getting here; the counter
/// still saturates at zero. The discount always follows the best result,
/// never the latest one.
pub fn apply_attempt(user: &User, deviation: u32, ranges: &[DiscountRange], fallback: u8) -> User {
    let best = user.best_result.map_or(deviation, |best| best.min(deviation));
    User {
        attempts_left: user.attempts_left.saturating_sub(1),
        best_result: Some(best),
        discount: resolve_discount(best, ranges, fallback),
        ..user.clone()
    }
}

/// Checks a table submitted by an administrator.
///
/// Tables already in the data file are resolved as-is, overlaps included.
pub fn validate_ranges(ranges: &[DiscountRange]) -> Result<(), GameError> {
    if ranges.is_empty() {
        return Err(GameError::validation("discount table must not be empty"));
    }

    for (index, range) in ranges.iter().enumerate() {
        if range.discount > 100 {
            return Err(GameError::validation(format!(
                "range {} has a discount above 100%",
                index + 1
            )));
        }
        if range.max.is_some_and(|max| max < range.min) {
            return Err(GameError::validation(format!(
                "range {} ends before it starts",
                index + 1
            )));
        }
        if range.max.is_none() && index + 1 != ranges.len() {
            return Err(GameError::validation(
                "only the last range may be open-ended",
            ));
        }
    }

    let mut sorted: Vec<&DiscountRange> = ranges.iter().collect();
    sorted.sort_by_key(|range| range.min);
    for pair in sorted.windows(2) {
        let (lower, upper) = (pair[0], pair[1]);
        if lower.max.is_none_or(|max| max >= upper.min) {
            return Err(GameError::validation(format!(
                "ranges starting at {} and {} overlap",
                lower.min, upper.min
            )));
        }
    }

    Ok(())
}

pub fn validate_discount(discount: u8) -> Result<(), GameError> {
    if discount > 100 {
        return Err(GameError::validation("discount must be between 0 and 100"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn player(attempts_left: u32, best_result: Option<u32>) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Dana".to_string(),
            phone: "+972501234567".to_string(),
            attempts_left,
            best_result,
            discount: DEFAULT_FALLBACK_DISCOUNT,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn default_table_tiers() {
        let ranges = default_ranges();
        let cases = [(0, 25), (5, 15), (10, 15), (11, 10), (50, 10), (51, 5), (100, 5), (101, 3), (500, 3)];
        for (deviation, expected) in cases {
            assert_eq!(
                resolve_discount(deviation, &ranges, DEFAULT_FALLBACK_DISCOUNT),
                expected,
                "deviation {deviation}"
            );
        }
    }

    #[test]
    fn first_listed_range_wins_on_overlap() {
        let ranges = [
            DiscountRange { min: 0, max: Some(20), discount: 12 },
            DiscountRange { min: 10, max: Some(30), discount: 40 },
        ];
        assert_eq!(resolve_discount(15, &ranges, 1), 12);
        assert_eq!(resolve_discount(25, &ranges, 1), 40);
    }

    #[test]
    fn falls_back_when_nothing_matches() {
        let ranges = [DiscountRange { min: 10, max: Some(20), discount: 30 }];
        assert_eq!(resolve_discount(3, &ranges, 7), 7);
        assert_eq!(resolve_discount(21, &ranges, 7), 7);
        assert_eq!(resolve_discount(0, &[], 9), 9);
    }

    #[test]
    fn resolution_is_repeatable() {
        let ranges = default_ranges();
        let first = resolve_discount(42, &ranges, 3);
        let second = resolve_discount(42, &ranges, 3);
        assert_eq!(first, second);
    }

    #[test]
    fn single_attempt_scenario() {
        let user = player(1, None);
        let updated = apply_attempt(&user, 7, &default_ranges(), DEFAULT_FALLBACK_DISCOUNT);
        assert_eq!(updated.attempts_left, 0);
        assert_eq!(updated.best_result, Some(7));
        assert_eq!(updated.discount, 15);
        assert_eq!(updated.id, user.id);
        assert_eq!(user.attempts_left, 1);
    }

    #[test]
    fn best_result_never_increases() {
        let ranges = default_ranges();
        let mut user = player(6, None);
        let mut previous = u32::MAX;
        for deviation in [80, 12, 300, 0, 45] {
            user = apply_attempt(&user, deviation, &ranges, DEFAULT_FALLBACK_DISCOUNT);
            let best = user.best_result.unwrap();
            assert!(best <= previous);
            previous = best;
        }
        assert_eq!(user.best_result, Some(0));
        assert_eq!(user.discount, 25);
        assert_eq!(user.attempts_left, 1);
    }

    #[test]
    fn discount_follows_best_not_latest() {
        let user = player(3, Some(4));
        let updated = apply_attempt(&user, 250, &default_ranges(), DEFAULT_FALLBACK_DISCOUNT);
        assert_eq!(updated.best_result, Some(4));
        assert_eq!(updated.discount, 15);
    }

    #[test]
    fn attempts_saturate_at_zero() {
        let user = player(0, Some(30));
        let updated = apply_attempt(&user, 10, &default_ranges(), DEFAULT_FALLBACK_DISCOUNT);
        assert_eq!(updated.attempts_left, 0);
    }

    #[test]
    fn default_table_is_valid() {
        assert!(validate_ranges(&default_ranges()).is_ok());
    }

    #[test]
    fn rejects_malformed_tables() {
        let inverted = [DiscountRange { min: 10, max: Some(5), discount: 10 }];
        assert!(validate_ranges(&inverted).is_err());

        let overlapping = [
            DiscountRange { min: 0, max: Some(10), discount: 20 },
            DiscountRange { min: 10, max: None, discount: 5 },
        ];
        assert!(validate_ranges(&overlapping).is_err());

        let open_in_middle = [
            DiscountRange { min: 50, max: None, discount: 5 },
            DiscountRange { min: 0, max: Some(49), discount: 20 },
        ];
        assert!(validate_ranges(&open_in_middle).is_err());

        let too_generous = [DiscountRange { min: 0, max: None, discount: 101 }];
        assert!(validate_ranges(&too_generous).is_err());

        assert!(validate_ranges(&[]).is_err());
    }
}
