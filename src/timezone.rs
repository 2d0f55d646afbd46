//! # Timezone and DST Conversion
//!
//! Converts UTC instants to local instants using a pair of alternating
//! daylight-saving rules, in the style of the classic embedded `Timezone`
//! library: each rule names the moment its regime begins ("second Sunday
//! of March at 02:00") and the UTC offset that applies from then on.
//!
//! ## Transition Resolution
//!
//! A rule's hour is wall-clock time in the regime being *left*, so the UTC
//! instant of a transition is the rule's wall time minus the outgoing
//! rule's offset:
//!
//! ```text
//! summer_start_utc = wall(summer, year) - winter.offset
//! winter_start_utc = wall(winter, year) - summer.offset
//! ```
//!
//! ## Rule Selection
//!
//! The active rule is the one whose transition most recently happened.
//! Transitions are ordered circularly over the year boundary: before the
//! first transition of a year, the rule of that year's *later* transition
//! is still in effect from the previous year. This handles northern and
//! southern hemisphere policies alike.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which occurrence of a weekday within a month a rule fires on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Week {
    First,
    Second,
    Third,
    Fourth,
    Last,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Sun,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl From<Weekday> for chrono::Weekday {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Sun => chrono::Weekday::Sun,
            Weekday::Mon => chrono::Weekday::Mon,
            Weekday::Tue => chrono::Weekday::Tue,
            Weekday::Wed => chrono::Weekday::Wed,
            Weekday::Thu => chrono::Weekday::Thu,
            Weekday::Fri => chrono::Weekday::Fri,
            Weekday::Sat => chrono::Weekday::Sat,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RuleError {
    #[error("rule {name}: month {month} is outside 1-12")]
    Month { name: String, month: u32 },

    #[error("rule {name}: hour {hour} is outside 0-23")]
    Hour { name: String, hour: u32 },

    #[error("rule {name}: offset {offset_minutes} minutes is more than 24 hours")]
    Offset { name: String, offset_minutes: i32 },
}

/// One seasonal UTC-offset regime and the moment it starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DstRule {
    /// Abbreviation, e.g. "EDT"
    pub name: String,
    pub week: Week,
    pub weekday: Weekday,
    /// 1 = January … 12 = December
    pub month: u32,
    /// Wall-clock hour of the transition in the outgoing regime
    pub hour: u32,
    /// Offset from UTC in minutes while this rule is active
    pub offset_minutes: i32,
}

impl DstRule {
    pub fn validate(&self) -> Result<(), RuleError> {
        if !(1..=12).contains(&self.month) {
            return Err(RuleError::Month {
                name: self.name.clone(),
                month: self.month,
            });
        }
        if self.hour > 23 {
            return Err(RuleError::Hour {
                name: self.name.clone(),
                hour: self.hour,
            });
        }
        if self.offset_minutes.unsigned_abs() > 24 * 60 {
            return Err(RuleError::Offset {
                name: self.name.clone(),
                offset_minutes: self.offset_minutes,
            });
        }
        Ok(())
    }

    /// Wall-clock seconds of this rule's transition in `year`, counted as if
    /// the wall clock were UTC. `None` if the date can't be represented.
    pub fn resolve(&self, year: i32) -> Option<i64> {
        let weekday = chrono::Weekday::from(self.weekday);
        let date = match self.week {
            Week::Last => last_weekday_of_month(year, self.month, weekday)?,
            Week::First => nth_weekday_of_month(year, self.month, weekday, 0)?,
            Week::Second => nth_weekday_of_month(year, self.month, weekday, 1)?,
            Week::Third => nth_weekday_of_month(year, self.month, weekday, 2)?,
            Week::Fourth => nth_weekday_of_month(year, self.month, weekday, 3)?,
        };
        Some(date.and_hms_opt(self.hour, 0, 0)?.and_utc().timestamp())
    }

    fn offset_seconds(&self) -> i64 {
        i64::from(self.offset_minutes) * 60
    }
}

fn days_until(from: chrono::Weekday, to: chrono::Weekday) -> u32 {
    (to.num_days_from_sunday() + 7 - from.num_days_from_sunday()) % 7
}

fn nth_weekday_of_month(
    year: i32,
    month: u32,
    weekday: chrono::Weekday,
    skip_weeks: u32,
) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let day = 1 + days_until(first.weekday(), weekday) + 7 * skip_weeks;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn last_weekday_of_month(year: i32, month: u32, weekday: chrono::Weekday) -> Option<NaiveDate> {
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last = next_month.pred_opt()?;
    let back = days_until(weekday, last.weekday());
    last.checked_sub_days(chrono::Days::new(u64::from(back)))
}

/// A summer/winter pair of rules governing local time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimezonePolicy {
    pub summer: DstRule,
    pub winter: DstRule,
}

impl TimezonePolicy {
    pub fn new(summer: DstRule, winter: DstRule) -> Result<Self, RuleError> {
        summer.validate()?;
        winter.validate()?;
        Ok(Self { summer, winter })
    }

    /// US Eastern time (EDT/EST).
    pub fn us_eastern() -> Self {
        Self {
            summer: DstRule {
                name: "EDT".to_string(),
                week: Week::Second,
                weekday: Weekday::Sun,
                month: 3,
                hour: 2,
                offset_minutes: -240,
            },
            winter: DstRule {
                name: "EST".to_string(),
                week: Week::First,
                weekday: Weekday::Sun,
                month: 11,
                hour: 2,
                offset_minutes: -300,
            },
        }
    }

    pub fn validate(&self) -> Result<(), RuleError> {
        self.summer.validate()?;
        self.winter.validate()
    }

    /// UTC instants at which summer time and winter time begin in `year`.
    pub fn transitions(&self, year: i32) -> Option<(i64, i64)> {
        let summer_start = self.summer.resolve(year)? - self.winter.offset_seconds();
        let winter_start = self.winter.resolve(year)? - self.summer.offset_seconds();
        Some((summer_start, winter_start))
    }

    /// Rule in effect at `utc`. Falls back to the winter rule when the
    /// year's transitions can't be resolved.
    pub fn active_rule(&self, utc: i64) -> &DstRule {
        let clamped = utc.clamp(
            DateTime::<Utc>::MIN_UTC.timestamp(),
            DateTime::<Utc>::MAX_UTC.timestamp(),
        );
        let Some(year) = DateTime::from_timestamp(clamped, 0).map(|dt| dt.year()) else {
            return &self.winter;
        };
        let Some((summer_start, winter_start)) = self.transitions(year) else {
            return &self.winter;
        };

        let (early, late) = if summer_start <= winter_start {
            ((summer_start, &self.summer), (winter_start, &self.winter))
        } else {
            ((winter_start, &self.winter), (summer_start, &self.summer))
        };

        if clamped >= late.0 {
            late.1
        } else if clamped >= early.0 {
            early.1
        } else {
            // Still in the regime entered at the end of the previous year
            late.1
        }
    }

    /// Whether summer time is in effect at `utc`.
    pub fn is_summer(&self, utc: i64) -> bool {
        std::ptr::eq(self.active_rule(utc), &self.summer)
    }

    /// Local instant corresponding to `utc`.
    pub fn to_local(&self, utc: i64) -> i64 {
        utc.saturating_add(self.active_rule(utc).offset_seconds())
    }
}

impl Default for TimezonePolicy {
    fn default() -> Self {
        Self::us_eastern()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // 2023-03-12 07:00:00 UTC, 02:00 EST
    const SPRING_2023: i64 = 1_678_604_400;
    // 2023-11-05 06:00:00 UTC, 02:00 EDT
    const FALL_2023: i64 = 1_699_164_000;
    const JAN_1_2023: i64 = 1_672_531_200;
    const JAN_1_2024: i64 = 1_704_067_200;

    fn australia_eastern() -> TimezonePolicy {
        TimezonePolicy {
            summer: DstRule {
                name: "AEDT".to_string(),
                week: Week::First,
                weekday: Weekday::Sun,
                month: 10,
                hour: 2,
                offset_minutes: 660,
            },
            winter: DstRule {
                name: "AEST".to_string(),
                week: Week::First,
                weekday: Weekday::Sun,
                month: 4,
                hour: 3,
                offset_minutes: 600,
            },
        }
    }

    #[test]
    fn test_resolve_nth_and_last_weekday() {
        let policy = TimezonePolicy::us_eastern();
        let march = NaiveDate::from_ymd_opt(2023, 3, 12).unwrap();
        assert_eq!(
            policy.summer.resolve(2023),
            Some(march.and_hms_opt(2, 0, 0).unwrap().and_utc().timestamp())
        );

        let last_sunday_october = DstRule {
            name: "CET".to_string(),
            week: Week::Last,
            weekday: Weekday::Sun,
            month: 10,
            hour: 3,
            offset_minutes: 60,
        };
        let expected = NaiveDate::from_ymd_opt(2023, 10, 29).unwrap();
        assert_eq!(
            last_sunday_october.resolve(2023),
            Some(expected.and_hms_opt(3, 0, 0).unwrap().and_utc().timestamp())
        );
    }

    #[test]
    fn test_last_weekday_in_december() {
        let date = last_weekday_of_month(2023, 12, chrono::Weekday::Sun).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn test_transitions_2023() {
        let policy = TimezonePolicy::us_eastern();
        assert_eq!(policy.transitions(2023), Some((SPRING_2023, FALL_2023)));
    }

    #[test]
    fn test_spring_forward_boundary_uses_new_offset() {
        let policy = TimezonePolicy::us_eastern();
        assert_eq!(policy.active_rule(SPRING_2023 - 1).name, "EST");
        assert_eq!(policy.active_rule(SPRING_2023).name, "EDT");
        assert_eq!(policy.to_local(SPRING_2023), SPRING_2023 - 4 * 3600);
    }

    #[test]
    fn test_fall_back_boundary_uses_new_offset() {
        let policy = TimezonePolicy::us_eastern();
        assert_eq!(policy.active_rule(FALL_2023 - 1).name, "EDT");
        assert_eq!(policy.active_rule(FALL_2023).name, "EST");
    }

    #[test]
    fn test_new_year_carries_winter_over() {
        let policy = TimezonePolicy::us_eastern();
        assert_eq!(policy.active_rule(JAN_1_2023).name, "EST");
        assert!(!policy.is_summer(JAN_1_2023));
    }

    #[test]
    fn test_july_afternoon_is_daylight_time() {
        let policy = TimezonePolicy::us_eastern();
        // 2023-07-04 16:30:45 UTC
        let utc = 1_688_488_245;
        assert_eq!(policy.to_local(utc), utc - 4 * 3600);
    }

    #[test]
    fn test_southern_hemisphere_policy() {
        let policy = australia_eastern();
        // 2023-01-15 00:00 UTC: summer carried over from October 2022
        assert_eq!(policy.active_rule(1_673_740_800).name, "AEDT");
        // 2023-07-01 00:00 UTC
        assert_eq!(policy.active_rule(1_688_169_600).name, "AEST");
        // 2023-12-01 00:00 UTC
        assert_eq!(policy.active_rule(1_701_388_800).name, "AEDT");
    }

    #[test]
    fn test_offset_changes_exactly_twice_per_year() {
        let policy = TimezonePolicy::us_eastern();
        let mut changes = Vec::new();
        let mut previous = policy.active_rule(JAN_1_2023).name.clone();
        let mut t = JAN_1_2023;
        while t < JAN_1_2024 {
            let current = &policy.active_rule(t).name;
            if *current != previous {
                changes.push(t);
                previous = current.clone();
            }
            t += 3600;
        }
        assert_eq!(changes, vec![SPRING_2023, FALL_2023]);
    }

    #[test]
    fn test_extreme_instants_do_not_panic() {
        let policy = TimezonePolicy::us_eastern();
        assert!(policy.to_local(i64::MAX) >= i64::MAX - 300 * 60);
        assert_eq!(policy.to_local(i64::MIN), i64::MIN);
        let _ = policy.to_local(0);
    }

    #[test]
    fn test_validate_rejects_bad_month() {
        let mut summer = TimezonePolicy::us_eastern().summer;
        summer.month = 13;
        let winter = TimezonePolicy::us_eastern().winter;
        assert!(matches!(
            TimezonePolicy::new(summer, winter),
            Err(RuleError::Month { month: 13, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_offsets_beyond_a_day() {
        let mut rule = TimezonePolicy::us_eastern().summer;
        for offset_minutes in [i32::MIN, -24 * 60 - 1, 24 * 60 + 1, i32::MAX] {
            rule.offset_minutes = offset_minutes;
            assert!(matches!(rule.validate(), Err(RuleError::Offset { .. })));
        }
        rule.offset_minutes = -24 * 60;
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn test_rule_toml_names() {
        let rule: DstRule = toml::from_str(
            r#"
name = "BST"
week = "last"
weekday = "sun"
month = 3
hour = 1
offset_minutes = 60
"#,
        )
        .unwrap();
        assert_eq!(rule.week, Week::Last);
        assert_eq!(rule.weekday, Weekday::Sun);
    }

    proptest! {
        #[test]
        fn prop_offset_is_one_of_the_rules(utc in any::<i64>()) {
            let policy = TimezonePolicy::us_eastern();
            let diff = policy.to_local(utc).wrapping_sub(utc);
            prop_assert!(
                diff == -240 * 60 || diff == -300 * 60 || utc.checked_add(-300 * 60).is_none()
            );
        }
    }
}
