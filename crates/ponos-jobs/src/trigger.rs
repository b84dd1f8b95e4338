//! Trigger expressions.
//!
//! Cron fields are seconds-first: `sec min hour dom month [dow]`. With five
//! fields the day-of-week defaults to `*`, so `*/5 * * * *` fires every five
//! seconds. Day-of-week is numbered 0-6 from Sunday (7 is also Sunday) or
//! given by name. When both day-of-month and day-of-week are restricted, a
//! day matching either one fires.
//!
//! Also accepted:
//! - descriptors `@yearly`, `@annually`, `@monthly`, `@weekly`, `@daily`,
//!   `@midnight`, `@hourly`
//! - `@every <duration>` with `h`, `m`, `s`, `ms`, `us` and `ns` units, e.g.
//!   `@every 1h30m`; rounded down to whole seconds, one second at least

use chrono::{DateTime, Utc};
use cron::Schedule;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const DAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// A parsed trigger expression.
#[derive(Clone)]
pub enum Trigger {
    /// Calendar-based schedule. Holds two schedules when day-of-month and
    /// day-of-week are both restricted; the earliest occurrence wins.
    Cron(Vec<Schedule>),
    /// Fixed interval, measured from the previous fire time.
    Every(Duration),
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Cron(schedules) => f
                .debug_tuple("Cron")
                .field(&schedules.iter().map(ToString::to_string).collect::<Vec<_>>())
                .finish(),
            Trigger::Every(interval) => f.debug_tuple("Every").field(interval).finish(),
        }
    }
}

impl Trigger {
    /// Parses a trigger expression.
    pub fn parse(expression: &str) -> Result<Self, String> {
        let expression = expression.trim();

        if let Some(rest) = expression.strip_prefix("@every") {
            let interval = parse_duration(rest.trim())?;
            return Ok(Trigger::Every(Duration::from_secs(interval.as_secs().max(1))));
        }

        let fields: Vec<String> = if expression.starts_with('@') {
            descriptor(expression)?
                .split_whitespace()
                .map(str::to_string)
                .collect()
        } else {
            let mut fields: Vec<String> =
                expression.split_whitespace().map(str::to_string).collect();
            match fields.len() {
                5 => fields.push("*".to_string()),
                6 => fields[5] = day_of_week(&fields[5])?,
                n => return Err(format!("expected 5 or 6 fields, found {}", n)),
            }
            fields
        };

        let schedules = if restricted(&fields[3]) && restricted(&fields[5]) {
            let mut by_month_day = fields.clone();
            by_month_day[5] = "*".to_string();
            let mut by_week_day = fields;
            by_week_day[3] = "*".to_string();
            vec![by_month_day, by_week_day]
        } else {
            vec![fields]
        };

        schedules
            .iter()
            .map(|fields| Schedule::from_str(&fields.join(" ")).map_err(|e| e.to_string()))
            .collect::<Result<Vec<_>, _>>()
            .map(Trigger::Cron)
    }

    /// First fire time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Cron(schedules) => schedules
                .iter()
                .filter_map(|schedule| schedule.after(&after).next())
                .min(),
            Trigger::Every(interval) => chrono::Duration::from_std(*interval)
                .ok()
                .and_then(|step| after.checked_add_signed(step)),
        }
    }
}

fn restricted(field: &str) -> bool {
    field != "*" && field != "?"
}

fn descriptor(expression: &str) -> Result<&'static str, String> {
    match expression {
        "@yearly" | "@annually" => Ok("0 0 0 1 1 *"),
        "@monthly" => Ok("0 0 0 1 * *"),
        "@weekly" => Ok("0 0 0 * * SUN"),
        "@daily" | "@midnight" => Ok("0 0 0 * * *"),
        "@hourly" => Ok("0 0 * * * *"),
        other => Err(format!("unknown descriptor '{}'", other)),
    }
}

/// Rewrites a numeric day-of-week field (0-7, Sunday = 0 or 7) as day names,
/// which mean the same thing to the `cron` crate.
fn day_of_week(field: &str) -> Result<String, String> {
    if !restricted(field) || field.chars().any(|c| c.is_ascii_alphabetic()) {
        return Ok(field.to_string());
    }

    let mut days = BTreeSet::new();
    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| format!("invalid day-of-week step '{}'", step))?;
                if step == 0 {
                    return Err("day-of-week step must be positive".to_string());
                }
                (range, step)
            }
            None => (part, 1),
        };

        let (start, end) = match range {
            "*" => (0, 6),
            _ => match range.split_once('-') {
                Some((a, b)) => (day_number(a)?, day_number(b)?),
                None if step > 1 => (day_number(range)?, 6),
                None => {
                    let day = day_number(range)?;
                    (day, day)
                }
            },
        };
        if start > end {
            return Err(format!("invalid day-of-week range '{}'", range));
        }

        for day in (start..=end).step_by(step as usize) {
            days.insert(day % 7);
        }
    }

    Ok(days
        .into_iter()
        .map(|day| DAY_NAMES[day as usize])
        .collect::<Vec<_>>()
        .join(","))
}

fn day_number(token: &str) -> Result<u32, String> {
    match token.parse::<u32>() {
        Ok(day) if day <= 7 => Ok(day),
        _ => Err(format!("invalid day-of-week '{}'", token)),
    }
}

/// Parses durations such as `90s`, `1h30m` or `250ms`.
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    if text.is_empty() {
        return Err("missing duration".to_string());
    }
    let too_large = || format!("duration '{}' is too large", text);

    let mut total = Duration::ZERO;
    let mut rest = text;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(format!("invalid duration '{}'", text));
        }
        let value: u64 = rest[..digits].parse().map_err(|_| too_large())?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "h" => value.checked_mul(3600).map(Duration::from_secs),
            "m" => value.checked_mul(60).map(Duration::from_secs),
            "s" => Some(Duration::from_secs(value)),
            "ms" => Some(Duration::from_millis(value)),
            "us" | "µs" => Some(Duration::from_micros(value)),
            "ns" => Some(Duration::from_nanos(value)),
            "" => return Err(format!("missing unit in duration '{}'", text)),
            unit => return Err(format!("unknown unit '{}' in duration '{}'", unit, text)),
        };
        total = part
            .and_then(|part| total.checked_add(part))
            .ok_or_else(too_large)?;
        rest = &rest[unit_len..];
    }

    Ok(total)
}
