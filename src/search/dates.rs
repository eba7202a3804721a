//! Flexible date parsing for search filters.
//!
//! Accepts ISO dates, day-first and month-first numeric forms, month
//! names, `today`/`yesterday`/`tomorrow`, and `N days ago` relative forms.
//! Everything normalises to `YYYY-MM-DD` for Slack's search grammar.

use chrono::{Datelike, Months, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

use crate::{AppError, Result};

fn relative_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        #[allow(clippy::expect_used)] // Pattern is a literal; cannot fail.
        Regex::new(r"^(\d{1,3})\s+(day|days|week|weeks|month|months)\s+ago$")
            .expect("valid regex literal")
    })
}

/// Parse a user-supplied date into a calendar day, relative to `today`.
///
/// # Errors
///
/// Returns `AppError::InvalidInput` when no supported form matches.
pub fn parse_flexible(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    let text = input.trim().to_ascii_lowercase();
    if text.is_empty() {
        return Err(AppError::InvalidInput("empty date".into()));
    }

    match text.as_str() {
        "today" => return Ok(today),
        "yesterday" => return Ok(today.pred_opt().unwrap_or(today)),
        "tomorrow" => return Ok(today.succ_opt().unwrap_or(today)),
        _ => {}
    }

    if let Some(caps) = relative_pattern().captures(&text) {
        let amount: u32 = caps[1].parse().map_err(|_| bad_date(input))?;
        let date = match &caps[2] {
            unit if unit.starts_with("day") => {
                today - chrono::Duration::days(i64::from(amount))
            }
            unit if unit.starts_with("week") => {
                today - chrono::Duration::weeks(i64::from(amount))
            }
            _ => today
                .checked_sub_months(Months::new(amount))
                .ok_or_else(|| bad_date(input))?,
        };
        return Ok(date);
    }

    // Numeric forms: ISO first, then day-first, then month-first.
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&text, format) {
            return Ok(date);
        }
    }
    for format in ["%m-%d-%Y", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&text, format) {
            return Ok(date);
        }
    }

    parse_with_month_name(&text, today).ok_or_else(|| bad_date(input))
}

/// Normalise a parsed date into Slack's `YYYY-MM-DD` form.
#[must_use]
pub fn format_for_slack(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn bad_date(input: &str) -> AppError {
    AppError::InvalidInput(format!(
        "unrecognised date '{input}' (try YYYY-MM-DD, 'yesterday', or 'Jan 5, 2025')"
    ))
}

fn month_number(token: &str) -> Option<u32> {
    let token = token.trim_end_matches(',');
    const MONTHS: [&str; 12] = [
        "january", "february", "march", "april", "may", "june", "july", "august", "september",
        "october", "november", "december",
    ];
    MONTHS.iter().position(|name| {
        *name == token || (token.len() >= 3 && name.starts_with(token) && token.len() <= 4)
    })
    .map(|idx| u32::try_from(idx + 1).unwrap_or(1))
}

/// Handle `Month DD, YYYY`, `DD Month YYYY`, `Month YYYY`, `YYYY Month`.
fn parse_with_month_name(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let tokens: Vec<&str> = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect();

    match tokens.as_slice() {
        [month, day, year] if month_number(month).is_some() => {
            let month = month_number(month)?;
            NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
        }
        [day, month, year] if month_number(month).is_some() => {
            let month = month_number(month)?;
            NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
        }
        [month, year] if month_number(month).is_some() => {
            NaiveDate::from_ymd_opt(year.parse().ok()?, month_number(month)?, 1)
        }
        [year, month] if month_number(month).is_some() => {
            NaiveDate::from_ymd_opt(year.parse().ok()?, month_number(month)?, 1)
        }
        [month] if month_number(month).is_some() => {
            NaiveDate::from_ymd_opt(today.year(), month_number(month)?, 1)
        }
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
    }

    #[test]
    fn keywords() {
        assert_eq!(
            parse_flexible("yesterday", anchor()).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 9).unwrap()
        );
        assert_eq!(parse_flexible("today", anchor()).unwrap(), anchor());
        assert_eq!(
            parse_flexible("Tomorrow", anchor()).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 11).unwrap()
        );
    }

    #[test]
    fn relative_days() {
        assert_eq!(
            parse_flexible("3 days ago", anchor()).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 7).unwrap()
        );
        assert_eq!(
            parse_flexible("2 weeks ago", anchor()).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 27).unwrap()
        );
    }

    #[test]
    fn numeric_forms() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        assert_eq!(parse_flexible("2025-03-04", anchor()).unwrap(), day);
        assert_eq!(parse_flexible("04/03/2025", anchor()).unwrap(), day);
        // Day slot over 12 forces month-first reading.
        assert_eq!(
            parse_flexible("03-14-2025", anchor()).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
        );
    }

    #[test]
    fn month_names() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(parse_flexible("January 5, 2025", anchor()).unwrap(), day);
        assert_eq!(parse_flexible("5 jan 2025", anchor()).unwrap(), day);
        assert_eq!(
            parse_flexible("march 2025", anchor()).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
        assert_eq!(
            parse_flexible("2025 March", anchor()).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_flexible("not a date", anchor()).is_err());
        assert!(parse_flexible("", anchor()).is_err());
    }
}
