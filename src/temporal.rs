//! Natural-language date and time resolution.
//!
//! Turns a free-form phrase ("ce soir à 20h", "demain midi", "monday at 8pm",
//! "12/03 à 19h30") plus a reference "now" into a fully resolved instant in
//! the restaurant's civil timezone. Resolution is biased toward the future
//! and numeric dates are read day-month-year. Relative phrases are anchored
//! to the supplied reference, never to wall-clock time, so results are
//! deterministic for a fixed reference.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use regex::Regex;
use thiserror::Error;

/// The phrase contained no interpretable date or time.
///
/// Callers must surface a "please repeat the date" response and never fall
/// through to a default value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not resolve {phrase:?} to a date and time")]
pub struct UnresolvedDate {
    pub phrase: String,
}

static RE_RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:dans|in)\s+(\S+)\s*(heures?|hours?|hrs?|minutes?|mins?)\b").unwrap()
});
static RE_AMPM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b").unwrap());
static RE_COLON: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})\b").unwrap());
static RE_H: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{1,2})\s*h\s*(\d{2})?\b").unwrap());
static RE_DMY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})[/.](\d{1,2})(?:[/.](\d{2,4}))?\b").unwrap());
static RE_DAY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})(?:er)?\s+([[:alpha:]éû]+)(?:\s+(\d{4}))?\b").unwrap()
});

/// Resolve a phrase against a reference instant.
///
/// The reference carries the timezone the result is produced in.
pub fn resolve(phrase: &str, now: DateTime<Tz>) -> Result<DateTime<Tz>, UnresolvedDate> {
    let text = phrase.to_lowercase();
    let unresolved = || UnresolvedDate {
        phrase: phrase.to_string(),
    };

    // "dans deux heures" / "in 30 minutes" are complete on their own.
    if let Some(instant) = parse_relative(&text, now) {
        return Ok(instant);
    }

    let time = parse_time(&text);
    let date = parse_date(&text, time, now);

    match (date, time) {
        (Some(date), Some(time)) => localize(date, time, now.timezone()).ok_or_else(unresolved),
        // Bare time: today if still ahead of the reference, otherwise tomorrow.
        (None, Some(time)) => {
            let today = now.date_naive();
            let candidate = localize(today, time, now.timezone()).ok_or_else(unresolved)?;
            if candidate > now {
                Ok(candidate)
            } else {
                localize(today + Duration::days(1), time, now.timezone()).ok_or_else(unresolved)
            }
        }
        // A date with no time at all is not a bookable instant; the caller
        // has to ask the customer for one.
        (Some(_), None) | (None, None) => Err(unresolved()),
    }
}

/// Calendar-day bounds [start, next-day start) around an instant, as UTC.
pub fn day_bounds(instant: DateTime<Tz>) -> (DateTime<Utc>, DateTime<Utc>) {
    let tz = instant.timezone();
    let date = instant.date_naive();
    let next = date.succ_opt().unwrap_or(date);
    (day_start(date, tz), day_start(next, tz))
}

/// Render an instant the way the assistant speaks it back to the customer.
pub fn format_local(instant: DateTime<Tz>) -> String {
    instant.format("le %d/%m/%Y à %H:%M").to_string()
}

fn day_start(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    naive
        .and_local_timezone(tz)
        .latest()
        .map(|dt| dt.with_timezone(&Utc))
        // DST gap at midnight: fall back to reading the naive value as UTC.
        .unwrap_or_else(|| naive.and_utc())
}

fn localize(date: NaiveDate, time: NaiveTime, tz: Tz) -> Option<DateTime<Tz>> {
    date.and_time(time).and_local_timezone(tz).latest()
}

fn parse_relative(text: &str, now: DateTime<Tz>) -> Option<DateTime<Tz>> {
    let caps = RE_RELATIVE.captures(text)?;
    let amount = number_word(caps.get(1)?.as_str())?;
    let unit = caps.get(2)?.as_str();
    if unit.starts_with('h') {
        Some(now + Duration::hours(amount))
    } else {
        Some(now + Duration::minutes(amount))
    }
}

fn number_word(word: &str) -> Option<i64> {
    if let Ok(n) = word.parse::<i64>() {
        return (0..=24 * 60).contains(&n).then_some(n);
    }
    let n = match word {
        "un" | "une" | "one" => 1,
        "deux" | "two" => 2,
        "trois" | "three" => 3,
        "quatre" | "four" => 4,
        "cinq" | "five" => 5,
        "six" => 6,
        "sept" | "seven" => 7,
        "huit" | "eight" => 8,
        "neuf" | "nine" => 9,
        "dix" | "ten" => 10,
        "quinze" | "fifteen" => 15,
        "vingt" | "twenty" => 20,
        "trente" | "thirty" => 30,
        _ => return None,
    };
    Some(n)
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    if let Some(caps) = RE_AMPM.captures(text) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        if hour >= 1 && hour <= 12 && minute < 60 {
            let hour = match (hour, caps.get(3)?.as_str()) {
                (12, "am") => 0,
                (12, "pm") => 12,
                (h, "pm") => h + 12,
                (h, _) => h,
            };
            return NaiveTime::from_hms_opt(hour, minute, 0);
        }
    }
    if let Some(caps) = RE_COLON.captures(text) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
        if hour < 24 && minute < 60 {
            return NaiveTime::from_hms_opt(hour, minute, 0);
        }
    }
    if let Some(caps) = RE_H.captures(text) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        if hour < 24 && minute < 60 {
            return NaiveTime::from_hms_opt(hour, minute, 0);
        }
    }
    // Word times carry an intrinsic hour.
    if text.contains("minuit") || text.contains("midnight") {
        return NaiveTime::from_hms_opt(0, 0, 0);
    }
    if text.contains("midi") || text.contains("noon") {
        return NaiveTime::from_hms_opt(12, 0, 0);
    }
    if text.contains("soir") || text.contains("tonight") || text.contains("evening") {
        return NaiveTime::from_hms_opt(20, 0, 0);
    }
    None
}

fn parse_date(text: &str, time: Option<NaiveTime>, now: DateTime<Tz>) -> Option<NaiveDate> {
    let today = now.date_naive();

    // "après-demain" must be checked before "demain" matches inside it.
    if text.contains("après-demain")
        || text.contains("apres-demain")
        || text.contains("après demain")
        || text.contains("apres demain")
        || text.contains("day after tomorrow")
    {
        return today.checked_add_signed(Duration::days(2));
    }
    if text.contains("demain") || text.contains("tomorrow") {
        return today.checked_add_signed(Duration::days(1));
    }
    if text.contains("aujourd")
        || text.contains("today")
        || text.contains("ce soir")
        || text.contains("ce midi")
        || text.contains("tonight")
        || text.contains("this evening")
    {
        return Some(today);
    }

    if let Some(weekday) = parse_weekday(text) {
        let mut ahead = (weekday.num_days_from_monday() as i64
            - today.weekday().num_days_from_monday() as i64)
            .rem_euclid(7);
        if ahead == 0 {
            // Same weekday as the reference: keep today only when the
            // requested time is still ahead, otherwise jump a week.
            let still_today = time
                .and_then(|t| localize(today, t, now.timezone()))
                .is_some_and(|candidate| candidate > now);
            if !still_today || text.contains("prochain") || text.contains("next") {
                ahead = 7;
            }
        }
        return today.checked_add_signed(Duration::days(ahead));
    }

    if let Some(caps) = RE_DMY.captures(text) {
        let day: u32 = caps.get(1)?.as_str().parse().ok()?;
        let month: u32 = caps.get(2)?.as_str().parse().ok()?;
        let year: Option<i32> = match caps.get(3) {
            Some(y) => {
                let y: i32 = y.as_str().parse().ok()?;
                Some(if y < 100 { y + 2000 } else { y })
            }
            None => None,
        };
        return build_date(day, month, year, today);
    }

    if let Some(caps) = RE_DAY_MONTH.captures(text) {
        let day: u32 = caps.get(1)?.as_str().parse().ok()?;
        let month = month_name(caps.get(2)?.as_str())?;
        let year: Option<i32> = caps.get(3).and_then(|y| y.as_str().parse().ok());
        return build_date(day, month, year, today);
    }

    None
}

/// Assemble a calendar date, rolling a year-less date forward when it has
/// already passed (prefer-future).
fn build_date(day: u32, month: u32, year: Option<i32>, today: NaiveDate) -> Option<NaiveDate> {
    match year {
        Some(year) => NaiveDate::from_ymd_opt(year, month, day),
        None => {
            let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
            if this_year < today {
                NaiveDate::from_ymd_opt(today.year() + 1, month, day)
            } else {
                Some(this_year)
            }
        }
    }
}

fn parse_weekday(text: &str) -> Option<Weekday> {
    const DAYS: [(&str, Weekday); 14] = [
        ("lundi", Weekday::Mon),
        ("mardi", Weekday::Tue),
        ("mercredi", Weekday::Wed),
        ("jeudi", Weekday::Thu),
        ("vendredi", Weekday::Fri),
        ("samedi", Weekday::Sat),
        ("dimanche", Weekday::Sun),
        ("monday", Weekday::Mon),
        ("tuesday", Weekday::Tue),
        ("wednesday", Weekday::Wed),
        ("thursday", Weekday::Thu),
        ("friday", Weekday::Fri),
        ("saturday", Weekday::Sat),
        ("sunday", Weekday::Sun),
    ];
    DAYS.iter()
        .find(|(name, _)| text.contains(name))
        .map(|(_, day)| *day)
}

fn month_name(word: &str) -> Option<u32> {
    let month = match word {
        "janvier" | "january" => 1,
        "février" | "fevrier" | "february" => 2,
        "mars" | "march" => 3,
        "avril" | "april" => 4,
        "mai" | "may" => 5,
        "juin" | "june" => 6,
        "juillet" | "july" => 7,
        "août" | "aout" | "august" => 8,
        "septembre" | "september" => 9,
        "octobre" | "october" => 10,
        "novembre" | "november" => 11,
        "décembre" | "decembre" | "december" => 12,
        _ => return None,
    };
    Some(month)
}
