//! RFC 5545 RRULE building and parsing for repeating events.
//!
//! A `RecurrenceConfig` is the canonical in-memory form; `build` emits the
//! RRULE string stored on events, `parse` inverts it, and `human_readable`
//! renders the display phrase. No side effects anywhere.

use chrono::{Datelike, NaiveDate, Weekday};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    fn token(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "DAILY" => Some(Self::Daily),
            "WEEKLY" => Some(Self::Weekly),
            "MONTHLY" => Some(Self::Monthly),
            "YEARLY" => Some(Self::Yearly),
            _ => None,
        }
    }

    fn unit(self) -> &'static str {
        match self {
            Self::Daily => "day",
            Self::Weekly => "week",
            Self::Monthly => "month",
            Self::Yearly => "year",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceEnd {
    Never,
    Count(u32),
    Until(NaiveDate),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceConfig {
    pub frequency: Frequency,
    pub interval: u32,
    /// Weekdays for WEEKLY rules, or the weekday of an Nth-weekday MONTHLY
    /// rule when `by_set_pos` is set.
    pub by_day: Vec<Weekday>,
    /// Month days (1..=31) for MONTHLY rules.
    pub by_month_day: Vec<u8>,
    /// "Nth weekday of the month": 1..=4 or -1 for "last".
    pub by_set_pos: Option<i8>,
    pub end: RecurrenceEnd,
}

impl Default for RecurrenceConfig {
    fn default() -> Self {
        Self {
            frequency: Frequency::Weekly,
            interval: 1,
            by_day: vec![],
            by_month_day: vec![],
            by_set_pos: None,
            end: RecurrenceEnd::Never,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceError {
    MissingFrequency,
    UnknownFrequency(String),
    UnknownWeekday(String),
    BadPart(String),
}

impl fmt::Display for RecurrenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFrequency => write!(f, "rule has no FREQ part"),
            Self::UnknownFrequency(t) => write!(f, "unknown frequency '{t}'"),
            Self::UnknownWeekday(t) => write!(f, "unknown weekday '{t}'"),
            Self::BadPart(p) => write!(f, "malformed rule part '{p}'"),
        }
    }
}

fn weekday_token(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

fn weekday_from_token(token: &str) -> Option<Weekday> {
    match token {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn ordinal(n: i8) -> String {
    match n {
        -1 => "last".to_string(),
        1 => "1st".to_string(),
        2 => "2nd".to_string(),
        3 => "3rd".to_string(),
        n => format!("{n}th"),
    }
}

fn join_names(names: &[String]) -> String {
    match names.len() {
        0 => String::new(),
        1 => names[0].clone(),
        n => format!("{} and {}", names[..n - 1].join(", "), names[n - 1]),
    }
}

impl RecurrenceConfig {
    pub fn build(&self) -> String {
        let mut parts = vec![format!("FREQ={}", self.frequency.token())];
        if self.interval > 1 {
            parts.push(format!("INTERVAL={}", self.interval));
        }
        if !self.by_day.is_empty() {
            let days: Vec<&str> = self.by_day.iter().map(|d| weekday_token(*d)).collect();
            parts.push(format!("BYDAY={}", days.join(",")));
        }
        if !self.by_month_day.is_empty() {
            let days: Vec<String> = self.by_month_day.iter().map(|d| d.to_string()).collect();
            parts.push(format!("BYMONTHDAY={}", days.join(",")));
        }
        if let Some(pos) = self.by_set_pos {
            parts.push(format!("BYSETPOS={pos}"));
        }
        match self.end {
            RecurrenceEnd::Never => {}
            RecurrenceEnd::Count(n) => parts.push(format!("COUNT={n}")),
            RecurrenceEnd::Until(date) => {
                parts.push(format!("UNTIL={}", date.format("%Y%m%d")))
            }
        }
        parts.join(";")
    }

    pub fn parse(rule: &str) -> Result<Self, RecurrenceError> {
        let rule = rule.trim().trim_start_matches("RRULE:");
        let mut config = Self {
            frequency: Frequency::Daily,
            ..Self::default()
        };
        let mut saw_freq = false;

        for part in rule.split(';').filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| RecurrenceError::BadPart(part.to_string()))?;
            match key {
                "FREQ" => {
                    config.frequency = Frequency::from_token(value)
                        .ok_or_else(|| RecurrenceError::UnknownFrequency(value.to_string()))?;
                    saw_freq = true;
                }
                "INTERVAL" => {
                    config.interval = value
                        .parse()
                        .map_err(|_| RecurrenceError::BadPart(part.to_string()))?;
                    if config.interval == 0 {
                        return Err(RecurrenceError::BadPart(part.to_string()));
                    }
                }
                "BYDAY" => {
                    config.by_day = value
                        .split(',')
                        .map(|t| {
                            weekday_from_token(t)
                                .ok_or_else(|| RecurrenceError::UnknownWeekday(t.to_string()))
                        })
                        .collect::<Result<_, _>>()?;
                }
                "BYMONTHDAY" => {
                    config.by_month_day = value
                        .split(',')
                        .map(|t| {
                            t.parse::<u8>()
                                .ok()
                                .filter(|d| (1..=31).contains(d))
                                .ok_or_else(|| RecurrenceError::BadPart(part.to_string()))
                        })
                        .collect::<Result<_, _>>()?;
                }
                "BYSETPOS" => {
                    config.by_set_pos = Some(
                        value
                            .parse()
                            .map_err(|_| RecurrenceError::BadPart(part.to_string()))?,
                    );
                }
                "COUNT" => {
                    config.end = RecurrenceEnd::Count(
                        value
                            .parse()
                            .map_err(|_| RecurrenceError::BadPart(part.to_string()))?,
                    );
                }
                "UNTIL" => {
                    // Accept both date and date-time forms; only the date
                    // matters for all-day HR events.
                    let date_part = &value[..value.len().min(8)];
                    let date = NaiveDate::parse_from_str(date_part, "%Y%m%d")
                        .map_err(|_| RecurrenceError::BadPart(part.to_string()))?;
                    config.end = RecurrenceEnd::Until(date);
                }
                _ => return Err(RecurrenceError::BadPart(part.to_string())),
            }
        }

        if !saw_freq {
            return Err(RecurrenceError::MissingFrequency);
        }
        Ok(config)
    }

    pub fn human_readable(&self) -> String {
        let unit = self.frequency.unit();
        let mut phrase = if self.interval == 1 {
            format!("Every {unit}")
        } else {
            format!("Every {} {unit}s", self.interval)
        };

        match self.frequency {
            Frequency::Weekly if !self.by_day.is_empty() => {
                let names: Vec<String> = self
                    .by_day
                    .iter()
                    .map(|d| weekday_name(*d).to_string())
                    .collect();
                phrase.push_str(&format!(" on {}", join_names(&names)));
            }
            Frequency::Monthly => {
                if let (Some(pos), Some(day)) = (self.by_set_pos, self.by_day.first()) {
                    phrase.push_str(&format!(
                        " on the {} {}",
                        ordinal(pos),
                        weekday_name(*day)
                    ));
                } else if !self.by_month_day.is_empty() {
                    let days: Vec<String> =
                        self.by_month_day.iter().map(|d| format!("day {d}")).collect();
                    phrase.push_str(&format!(" on {}", join_names(&days)));
                }
            }
            _ => {}
        }

        match self.end {
            RecurrenceEnd::Never => {}
            RecurrenceEnd::Count(1) => phrase.push_str(", once"),
            RecurrenceEnd::Count(n) => phrase.push_str(&format!(", {n} times")),
            RecurrenceEnd::Until(date) => {
                phrase.push_str(&format!(", until {}", date.format("%Y-%m-%d")))
            }
        }

        phrase
    }

    /// Whether `date` is an occurrence of this rule for an event that first
    /// occurs on `start`. Ignores the end condition; callers bound the scan.
    fn date_matches(&self, start: NaiveDate, date: NaiveDate) -> bool {
        if date < start {
            return false;
        }
        match self.frequency {
            Frequency::Daily => {
                let gap = (date - start).num_days();
                gap % i64::from(self.interval) == 0
            }
            Frequency::Weekly => {
                let week_start = |d: NaiveDate| {
                    d - chrono::Duration::days(i64::from(d.weekday().num_days_from_monday()))
                };
                let weeks = (week_start(date) - week_start(start)).num_days() / 7;
                if weeks % i64::from(self.interval) != 0 {
                    return false;
                }
                if self.by_day.is_empty() {
                    date.weekday() == start.weekday()
                } else {
                    self.by_day.contains(&date.weekday())
                }
            }
            Frequency::Monthly => {
                let months = (i64::from(date.year()) * 12 + i64::from(date.month0()))
                    - (i64::from(start.year()) * 12 + i64::from(start.month0()));
                if months % i64::from(self.interval) != 0 {
                    return false;
                }
                if let (Some(pos), Some(day)) = (self.by_set_pos, self.by_day.first()) {
                    date.weekday() == *day && nth_weekday_matches(date, pos)
                } else if !self.by_month_day.is_empty() {
                    self.by_month_day.contains(&(date.day() as u8))
                } else {
                    date.day() == start.day()
                }
            }
            Frequency::Yearly => {
                let years = i64::from(date.year()) - i64::from(start.year());
                years % i64::from(self.interval) == 0
                    && date.month() == start.month()
                    && date.day() == start.day()
            }
        }
    }

    /// Occurrence dates within `[from, to]`, honoring COUNT/UNTIL relative to
    /// the event's first occurrence at `start`.
    pub fn occurrences_between(
        &self,
        start: NaiveDate,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<NaiveDate> {
        let mut out = vec![];
        if to < start {
            return out;
        }
        let limit = match self.end {
            RecurrenceEnd::Until(until) => to.min(until),
            _ => to,
        };
        let max_count = match self.end {
            RecurrenceEnd::Count(n) => Some(n),
            _ => None,
        };

        // COUNT is relative to the first occurrence, so the scan always
        // starts at the event start even when the window begins later.
        let mut seen: u32 = 0;
        let mut day = start;
        while day <= limit {
            if self.date_matches(start, day) {
                seen += 1;
                if let Some(max) = max_count {
                    if seen > max {
                        break;
                    }
                }
                if day >= from {
                    out.push(day);
                }
            }
            day = match day.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
        out
    }
}

fn nth_weekday_matches(date: NaiveDate, pos: i8) -> bool {
    if pos == -1 {
        // last such weekday of the month
        let mut next = date;
        for _ in 0..7 {
            next = match next.succ_opt() {
                Some(n) => n,
                None => return true,
            };
            if next.month() != date.month() {
                return true;
            }
            if next.weekday() == date.weekday() {
                return false;
            }
        }
        false
    } else {
        let occurrence = (date.day() - 1) / 7 + 1;
        i8::try_from(occurrence).map(|o| o == pos).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weekly_mo_we() -> RecurrenceConfig {
        RecurrenceConfig {
            frequency: Frequency::Weekly,
            interval: 2,
            by_day: vec![Weekday::Mon, Weekday::Wed],
            end: RecurrenceEnd::Count(10),
            ..Default::default()
        }
    }

    #[test]
    fn builds_weekly_rule() {
        assert_eq!(
            weekly_mo_we().build(),
            "FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE;COUNT=10"
        );
    }

    #[test]
    fn builds_minimal_daily_rule() {
        let config = RecurrenceConfig {
            frequency: Frequency::Daily,
            ..Default::default()
        };
        assert_eq!(config.build(), "FREQ=DAILY");
    }

    #[test]
    fn builds_until_rule() {
        let config = RecurrenceConfig {
            frequency: Frequency::Monthly,
            by_month_day: vec![1, 15],
            end: RecurrenceEnd::Until(NaiveDate::from_ymd_opt(2026, 12, 31).unwrap()),
            ..Default::default()
        };
        assert_eq!(
            config.build(),
            "FREQ=MONTHLY;BYMONTHDAY=1,15;UNTIL=20261231"
        );
    }

    #[test]
    fn builds_nth_weekday_rule() {
        let config = RecurrenceConfig {
            frequency: Frequency::Monthly,
            by_day: vec![Weekday::Tue],
            by_set_pos: Some(2),
            ..Default::default()
        };
        assert_eq!(config.build(), "FREQ=MONTHLY;BYDAY=TU;BYSETPOS=2");
        assert_eq!(config.human_readable(), "Every month on the 2nd Tuesday");
    }

    #[test]
    fn parse_inverts_build() {
        let configs = vec![
            weekly_mo_we(),
            RecurrenceConfig {
                frequency: Frequency::Daily,
                interval: 3,
                end: RecurrenceEnd::Count(5),
                ..Default::default()
            },
            RecurrenceConfig {
                frequency: Frequency::Monthly,
                by_month_day: vec![1, 15],
                end: RecurrenceEnd::Until(NaiveDate::from_ymd_opt(2027, 1, 31).unwrap()),
                ..Default::default()
            },
            RecurrenceConfig {
                frequency: Frequency::Monthly,
                by_day: vec![Weekday::Fri],
                by_set_pos: Some(-1),
                ..Default::default()
            },
            RecurrenceConfig {
                frequency: Frequency::Yearly,
                ..Default::default()
            },
        ];
        for config in configs {
            let parsed = RecurrenceConfig::parse(&config.build()).unwrap();
            assert_eq!(parsed, config);
            assert_eq!(parsed.human_readable(), config.human_readable());
        }
    }

    #[test]
    fn parse_accepts_rrule_prefix() {
        let parsed = RecurrenceConfig::parse("RRULE:FREQ=WEEKLY;BYDAY=FR").unwrap();
        assert_eq!(parsed.frequency, Frequency::Weekly);
        assert_eq!(parsed.by_day, vec![Weekday::Fri]);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(
            RecurrenceConfig::parse("BYDAY=MO"),
            Err(RecurrenceError::MissingFrequency)
        );
        assert_eq!(
            RecurrenceConfig::parse("FREQ=FORTNIGHTLY"),
            Err(RecurrenceError::UnknownFrequency("FORTNIGHTLY".to_string()))
        );
        assert_eq!(
            RecurrenceConfig::parse("FREQ=WEEKLY;BYDAY=XX"),
            Err(RecurrenceError::UnknownWeekday("XX".to_string()))
        );
        assert!(RecurrenceConfig::parse("FREQ=DAILY;INTERVAL=0").is_err());
        assert!(RecurrenceConfig::parse("FREQ=DAILY;NONSENSE").is_err());
    }

    #[test]
    fn human_phrases() {
        assert_eq!(
            weekly_mo_we().human_readable(),
            "Every 2 weeks on Monday and Wednesday, 10 times"
        );
        let daily = RecurrenceConfig {
            frequency: Frequency::Daily,
            ..Default::default()
        };
        assert_eq!(daily.human_readable(), "Every day");
        let yearly_until = RecurrenceConfig {
            frequency: Frequency::Yearly,
            end: RecurrenceEnd::Until(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()),
            ..Default::default()
        };
        assert_eq!(yearly_until.human_readable(), "Every year, until 2030-01-01");
    }

    #[test]
    fn weekly_occurrences_respect_interval_and_count() {
        // start Monday 2026-06-01, every 2 weeks on Mon/Wed, 4 occurrences
        let config = RecurrenceConfig {
            frequency: Frequency::Weekly,
            interval: 2,
            by_day: vec![Weekday::Mon, Weekday::Wed],
            end: RecurrenceEnd::Count(4),
            ..Default::default()
        };
        let start = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let from = start;
        let to = NaiveDate::from_ymd_opt(2026, 7, 31).unwrap();
        let dates = config.occurrences_between(start, from, to);
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 6, 3).unwrap(),
                NaiveDate::from_ymd_opt(2026, 6, 15).unwrap(),
                NaiveDate::from_ymd_opt(2026, 6, 17).unwrap(),
            ]
        );
    }

    #[test]
    fn count_is_relative_to_event_start_not_window() {
        let config = RecurrenceConfig {
            frequency: Frequency::Daily,
            end: RecurrenceEnd::Count(3),
            ..Default::default()
        };
        let start = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        // window starts after all three occurrences are spent
        let from = NaiveDate::from_ymd_opt(2026, 6, 10).unwrap();
        let to = NaiveDate::from_ymd_opt(2026, 6, 20).unwrap();
        assert!(config.occurrences_between(start, from, to).is_empty());
    }

    #[test]
    fn until_caps_occurrences() {
        let config = RecurrenceConfig {
            frequency: Frequency::Daily,
            end: RecurrenceEnd::Until(NaiveDate::from_ymd_opt(2026, 6, 3).unwrap()),
            ..Default::default()
        };
        let start = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2026, 6, 30).unwrap();
        assert_eq!(config.occurrences_between(start, start, to).len(), 3);
    }

    #[test]
    fn monthly_nth_weekday_occurrences() {
        // second Tuesday of each month
        let config = RecurrenceConfig {
            frequency: Frequency::Monthly,
            by_day: vec![Weekday::Tue],
            by_set_pos: Some(2),
            ..Default::default()
        };
        let start = NaiveDate::from_ymd_opt(2026, 6, 9).unwrap(); // 2nd Tue of June
        let to = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
        let dates = config.occurrences_between(start, start, to);
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2026, 6, 9).unwrap(),
                NaiveDate::from_ymd_opt(2026, 7, 14).unwrap(),
                NaiveDate::from_ymd_opt(2026, 8, 11).unwrap(),
            ]
        );
    }
}
