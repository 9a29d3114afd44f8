use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

use crate::errors::ScheduleError;

const WEEKDAY_NAMES: [&str; 8] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// A parsed recurring trigger evaluated in a fixed timezone.
///
/// Accepts the 5-field form (`min hour day month dow`, seconds fixed at 0)
/// and the 6-field form with a leading seconds field. In both forms weekdays
/// are numbered 0-7 with 0 and 7 meaning Sunday.
#[derive(Debug, Clone)]
pub struct Schedule {
    expression: String,
    timezone: Tz,
    cron: cron::Schedule,
}

impl Schedule {
    pub fn parse(expression: &str, timezone: &str) -> Result<Self, ScheduleError> {
        let invalid = |reason: String| ScheduleError::Invalid {
            expression: expression.to_string(),
            reason,
        };

        let tz: Tz = timezone
            .parse()
            .map_err(|e| invalid(format!("unknown timezone '{}': {}", timezone, e)))?;

        let fields: Vec<&str> = expression.split_whitespace().collect();
        let normalized = match fields.len() {
            5 => {
                let weekday = normalize_weekday_field(fields[4]).map_err(&invalid)?;
                format!("0 {} {} {} {} {}", fields[0], fields[1], fields[2], fields[3], weekday)
            }
            6 => {
                let weekday = normalize_weekday_field(fields[5]).map_err(&invalid)?;
                format!(
                    "{} {} {} {} {} {}",
                    fields[0], fields[1], fields[2], fields[3], fields[4], weekday
                )
            }
            n => {
                return Err(invalid(format!(
                    "expected 5 fields (min hour day month dow) or 6 fields (sec min hour day month dow), got {}",
                    n
                )))
            }
        };

        let cron = cron::Schedule::from_str(&normalized).map_err(|e| invalid(e.to_string()))?;

        let schedule = Self {
            expression: expression.trim().to_string(),
            timezone: tz,
            cron,
        };

        if schedule.next_after(Utc::now()).is_none() {
            return Err(invalid("expression never fires".to_string()));
        }

        Ok(schedule)
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire instant strictly after `instant`.
    pub fn next_after(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.cron
            .after(&instant.with_timezone(&self.timezone))
            .next()
            .map(|t| t.with_timezone(&Utc))
    }
}

/// Maps Unix weekday numbers to names so they mean the same thing to the
/// `cron` crate, which numbers Sunday as 1. Stepped items are expanded into
/// an explicit list of names.
fn normalize_weekday_field(field: &str) -> Result<String, String> {
    let items: Result<Vec<String>, String> = field
        .split(',')
        .map(|item| {
            if let Some((base, step)) = item.split_once('/') {
                return expand_stepped_weekdays(item, base, step);
            }
            if item == "*" || item == "?" {
                return Ok(item.to_string());
            }

            match item.split_once('-') {
                Some((start, end)) => {
                    let (start, end) = (weekday_number(start)?, weekday_number(end)?);
                    match (start, end) {
                        (Some(0), Some(7)) => {
                            Ok(format!("{}-{}", WEEKDAY_NAMES[0], WEEKDAY_NAMES[6]))
                        }
                        (Some(7), Some(7)) => Ok(WEEKDAY_NAMES[7].to_string()),
                        (Some(s), Some(7)) => Ok(format!(
                            "{}-{},{}",
                            WEEKDAY_NAMES[s],
                            WEEKDAY_NAMES[6],
                            WEEKDAY_NAMES[7]
                        )),
                        (Some(s), Some(e)) => {
                            Ok(format!("{}-{}", WEEKDAY_NAMES[s], WEEKDAY_NAMES[e]))
                        }
                        _ => Ok(item.to_string()),
                    }
                }
                None => Ok(match weekday_number(item)? {
                    Some(n) => WEEKDAY_NAMES[n].to_string(),
                    None => item.to_string(),
                }),
            }
        })
        .collect();

    Ok(items?.join(","))
}

/// `*/2`, `1-5/2` and `1/2` (from 1 through Saturday). Named bases such as
/// `MON-FRI/2` are passed through untouched.
fn expand_stepped_weekdays(item: &str, base: &str, step: &str) -> Result<String, String> {
    let step = match step.parse::<usize>() {
        Ok(n) if n > 0 => n,
        _ => return Err(format!("invalid weekday step in '{}'", item)),
    };

    let (start, end) = if base == "*" {
        (0, 6)
    } else if let Some((start, end)) = base.split_once('-') {
        match (weekday_number(start)?, weekday_number(end)?) {
            (Some(s), Some(e)) => (s, e),
            _ => return Ok(item.to_string()),
        }
    } else {
        match weekday_number(base)? {
            Some(s) => (s, s.max(6)),
            None => return Ok(item.to_string()),
        }
    };

    if start > end {
        return Err(format!("weekday range '{}' runs backwards", base));
    }

    let mut names: Vec<&str> = Vec::new();
    for day in (start..=end).step_by(step) {
        let name = WEEKDAY_NAMES[day];
        if !names.contains(&name) {
            names.push(name);
        }
    }
    Ok(names.join(","))
}

/// `Ok(None)` for non-numeric tokens such as `MON`.
fn weekday_number(token: &str) -> Result<Option<usize>, String> {
    match token.parse::<usize>() {
        Ok(n) if n <= 7 => Ok(Some(n)),
        Ok(n) => Err(format!("weekday {} is outside 0-7", n)),
        Err(_) => Ok(None),
    }
}
