//! Parsing for `rate(N unit)` and AWS 6-field `cron(min hour dom mon dow year)`
//! schedule expressions (spec §4.12).

use std::time::Duration;

use chrono::{DateTime, Datelike, Duration as ChronoDuration, Timelike, Utc};

#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleExpr {
    Rate(Duration),
    Cron(CronExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CronField {
    Any,
    Unspecified,
    Step(u32),
    Values(Vec<u32>),
}

impl CronField {
    fn matches(&self, value: u32) -> bool {
        match self {
            CronField::Any | CronField::Unspecified => true,
            CronField::Step(step) => value % step == 0,
            CronField::Values(values) => values.contains(&value),
        }
    }

    fn parse(raw: &str, min: u32, max: u32, names: &[&str]) -> Result<Self, String> {
        if raw == "*" {
            return Ok(CronField::Any);
        }
        if raw == "?" {
            return Ok(CronField::Unspecified);
        }
        if let Some(step) = raw.strip_prefix("*/") {
            let step: u32 = step.parse().map_err(|_| format!("bad step in cron field '{raw}'"))?;
            return Ok(CronField::Step(step));
        }
        let mut values = Vec::new();
        for part in raw.split(',') {
            if let Some((lo, hi)) = part.split_once('-') {
                let lo = parse_field_value(lo, names)?;
                let hi = parse_field_value(hi, names)?;
                if lo < min || hi > max || lo > hi {
                    return Err(format!("cron field range '{part}' out of bounds [{min},{max}]"));
                }
                values.extend(lo..=hi);
            } else {
                let v = parse_field_value(part, names)?;
                if v < min || v > max {
                    return Err(format!("cron field value '{part}' out of bounds [{min},{max}]"));
                }
                values.push(v);
            }
        }
        Ok(CronField::Values(values))
    }
}

fn parse_field_value(raw: &str, names: &[&str]) -> Result<u32, String> {
    if let Ok(v) = raw.parse::<u32>() {
        return Ok(v);
    }
    names
        .iter()
        .position(|n| n.eq_ignore_ascii_case(raw))
        .map(|idx| idx as u32 + 1)
        .ok_or_else(|| format!("unrecognized cron field value '{raw}'"))
}

const MONTH_NAMES: &[&str] = &["JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC"];
const DOW_NAMES: &[&str] = &["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

#[derive(Debug, Clone, PartialEq)]
pub struct CronExpr {
    pub minute: CronField,
    pub hour: CronField,
    pub day_of_month: CronField,
    pub month: CronField,
    pub day_of_week: CronField,
    pub year: CronField,
}

impl CronExpr {
    /// `day_of_week` here is ISO-ish with Sunday=1..Saturday=7, matching the
    /// AWS cron convention (not chrono's Monday=0 weekday numbering).
    fn matches(&self, dt: &DateTime<Utc>) -> bool {
        let dow = dt.weekday().num_days_from_sunday() + 1;
        self.minute.matches(dt.minute())
            && self.hour.matches(dt.hour())
            && self.day_of_month.matches(dt.day())
            && self.month.matches(dt.month())
            && self.day_of_week.matches(dow)
            && self.year.matches(dt.year() as u32)
    }
}

pub fn parse_schedule(raw: &str) -> Result<ScheduleExpr, String> {
    let raw = raw.trim();
    if let Some(inner) = raw.strip_prefix("rate(").and_then(|s| s.strip_suffix(')')) {
        return parse_rate(inner).map(ScheduleExpr::Rate);
    }
    if let Some(inner) = raw.strip_prefix("cron(").and_then(|s| s.strip_suffix(')')) {
        return parse_cron(inner).map(ScheduleExpr::Cron);
    }
    Err(format!("unrecognized schedule expression '{raw}'"))
}

fn parse_rate(inner: &str) -> Result<Duration, String> {
    let mut parts = inner.split_whitespace();
    let n: u64 = parts
        .next()
        .ok_or_else(|| "rate expression missing value".to_string())?
        .parse()
        .map_err(|_| "rate expression value must be an integer".to_string())?;
    let unit = parts.next().ok_or_else(|| "rate expression missing unit".to_string())?;
    let secs = match unit {
        "minute" | "minutes" => n * 60,
        "hour" | "hours" => n * 3600,
        "day" | "days" => n * 86400,
        other => return Err(format!("unrecognized rate unit '{other}'")),
    };
    Ok(Duration::from_secs(secs))
}

fn parse_cron(inner: &str) -> Result<CronExpr, String> {
    let fields: Vec<&str> = inner.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(format!("cron expression must have 6 fields, got {}", fields.len()));
    }
    let dom = CronField::parse(fields[2], 1, 31, &[])?;
    let dow = CronField::parse(fields[4], 1, 7, DOW_NAMES)?;
    if !matches!(dom, CronField::Unspecified) && !matches!(dow, CronField::Unspecified) {
        return Err("cron expression must leave exactly one of day-of-month/day-of-week as '?'".to_string());
    }
    Ok(CronExpr {
        minute: CronField::parse(fields[0], 0, 59, &[])?,
        hour: CronField::parse(fields[1], 0, 23, &[])?,
        day_of_month: dom,
        month: CronField::parse(fields[3], 1, 12, MONTH_NAMES)?,
        day_of_week: dow,
        year: CronField::parse(fields[5], 1970, 2199, &[])?,
    })
}

/// Brute-force minute-granularity search, bounded to five years out; AWS
/// schedules never legitimately need more lookahead than that.
pub fn next_fire_after(expr: &CronExpr, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let mut candidate = (from + ChronoDuration::minutes(1))
        .with_second(0)
        .and_then(|d| d.with_nanosecond(0))?;
    let limit = from + ChronoDuration::days(365 * 5);
    while candidate <= limit {
        if expr.matches(&candidate) {
            return Some(candidate);
        }
        candidate += ChronoDuration::minutes(1);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rate_minutes() {
        assert_eq!(parse_schedule("rate(5 minutes)").unwrap(), ScheduleExpr::Rate(Duration::from_secs(300)));
    }

    #[test]
    fn parses_rate_singular_unit() {
        assert_eq!(parse_schedule("rate(1 hour)").unwrap(), ScheduleExpr::Rate(Duration::from_secs(3600)));
    }

    #[test]
    fn rejects_unknown_rate_unit() {
        assert!(parse_schedule("rate(5 fortnights)").is_err());
    }

    #[test]
    fn parses_cron_with_wildcard_fields() {
        let expr = parse_schedule("cron(0 12 * * ? *)").unwrap();
        assert!(matches!(expr, ScheduleExpr::Cron(_)));
    }

    #[test]
    fn rejects_cron_with_both_dom_and_dow_specified() {
        assert!(parse_schedule("cron(0 12 1 * MON *)").is_err());
    }

    #[test]
    fn next_fire_after_finds_the_next_matching_minute() {
        let expr = match parse_schedule("cron(30 14 * * ? *)").unwrap() {
            ScheduleExpr::Cron(c) => c,
            _ => unreachable!(),
        };
        let from = Utc.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).unwrap();
        let next = next_fire_after(&expr, from).unwrap();
        assert_eq!(next.hour(), 14);
        assert_eq!(next.minute(), 30);
        assert_eq!(next.day(), 1);
    }

    #[test]
    fn next_fire_after_rolls_to_the_following_day_when_time_has_passed() {
        let expr = match parse_schedule("cron(0 9 * * ? *)").unwrap() {
            ScheduleExpr::Cron(c) => c,
            _ => unreachable!(),
        };
        let from = Utc.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).unwrap();
        let next = next_fire_after(&expr, from).unwrap();
        assert_eq!(next.day(), 2);
        assert_eq!(next.hour(), 9);
    }
}
