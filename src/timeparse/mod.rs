//! Deterministic natural-language time extraction.
//!
//! Detects a start instant and a duration from an utterance so schedule-like
//! payloads can carry structured time metadata. Strictly extraction: the
//! matched fragments are reported, semantic text is never rewritten and task
//! titles are never inferred. Callers pass `now` explicitly.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Default event block when no duration was mentioned.
const DEFAULT_BLOCK_MINUTES: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTime {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// The text fragment the start instant was derived from.
    pub matched_text: String,
}

/// Extract a time reference from `text` relative to `now`.
///
/// Recognized forms, first match wins for the start instant:
/// - relative offsets: "in 2 hours", "in 45 minutes"
/// - day words: "today", "tomorrow" (optionally with a clock time)
/// - clock times: "3pm", "10:30am", "15:30"
///
/// A trailing "for N minutes/hours" sets the duration; otherwise a 30-minute
/// block is assumed. Future-biased: a bare clock time already past today
/// rolls to tomorrow.
pub fn parse(text: &str, now: DateTime<Utc>) -> Option<ParsedTime> {
    if text.trim().is_empty() {
        return None;
    }
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();

    let duration = parse_duration(&words).unwrap_or(Duration::minutes(DEFAULT_BLOCK_MINUTES));

    let (start, matched) = parse_relative_offset(&words, now)
        .or_else(|| parse_day_word(&words, now))
        .or_else(|| parse_clock_time_anywhere(&words, now))?;

    Some(ParsedTime {
        start,
        end: start + duration,
        matched_text: matched,
    })
}

/// "in N minutes|hours"
fn parse_relative_offset(words: &[&str], now: DateTime<Utc>) -> Option<(DateTime<Utc>, String)> {
    for window in words.windows(3) {
        if window[0] != "in" {
            continue;
        }
        let Ok(amount) = window[1].parse::<i64>() else {
            continue;
        };
        if amount <= 0 {
            continue;
        }
        let offset = match window[2].trim_end_matches(&['.', ',']) {
            "minute" | "minutes" | "min" | "mins" => Duration::minutes(amount),
            "hour" | "hours" | "hr" | "hrs" => Duration::hours(amount),
            _ => continue,
        };
        return Some((now + offset, window.join(" ")));
    }
    None
}

/// "today"/"tomorrow", optionally followed by "at <clock>" nearby.
fn parse_day_word(words: &[&str], now: DateTime<Utc>) -> Option<(DateTime<Utc>, String)> {
    let (index, day_offset) = words.iter().enumerate().find_map(|(i, w)| {
        match w.trim_end_matches(&['.', ',']) {
            "today" => Some((i, 0)),
            "tomorrow" => Some((i, 1)),
            _ => None,
        }
    })?;

    let date = now.date_naive() + Duration::days(day_offset);

    // Look for a clock time after the day word ("tomorrow at 3pm").
    for word in &words[index..] {
        if let Some(time) = parse_clock_word(word) {
            let start = date.and_time(time).and_utc();
            return Some((start, format!("{} {}", words[index], word)));
        }
    }

    // Day word alone: default to 09:00 local-equivalent start of day.
    let start = date
        .and_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default())
        .and_utc();
    Some((start, words[index].to_string()))
}

/// A bare clock time anywhere in the text, future-biased.
fn parse_clock_time_anywhere(words: &[&str], now: DateTime<Utc>) -> Option<(DateTime<Utc>, String)> {
    for word in words {
        let Some(time) = parse_clock_word(word) else {
            continue;
        };
        let mut start = now.date_naive().and_time(time).and_utc();
        if start <= now {
            start += Duration::days(1);
        }
        return Some((start, (*word).to_string()));
    }
    None
}

/// "3pm", "10:30am", "15:30". Plain small integers are NOT treated as times;
/// that would swallow counts ("buy 3 tickets").
fn parse_clock_word(word: &str) -> Option<NaiveTime> {
    let word = word.trim_end_matches(&['.', ',']);

    let (body, meridiem) = if let Some(stripped) = word.strip_suffix("am") {
        (stripped, Some(false))
    } else if let Some(stripped) = word.strip_suffix("pm") {
        (stripped, Some(true))
    } else {
        (word, None)
    };

    let (hour_str, minute_str) = match body.split_once(':') {
        Some((h, m)) => (h, m),
        None => (body, "0"),
    };

    // Without a meridiem suffix, require the HH:MM form.
    if meridiem.is_none() && !body.contains(':') {
        return None;
    }

    let hour: u32 = hour_str.parse().ok()?;
    let minute: u32 = minute_str.parse().ok()?;

    let hour = match meridiem {
        Some(true) if hour < 12 => hour + 12,
        Some(false) if hour == 12 => 0,
        _ => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// "for N minutes|hours"
fn parse_duration(words: &[&str]) -> Option<Duration> {
    for window in words.windows(3) {
        if window[0] != "for" {
            continue;
        }
        let Ok(amount) = window[1].parse::<i64>() else {
            continue;
        };
        if amount <= 0 {
            continue;
        }
        match window[2].trim_end_matches(&['.', ',']) {
            "minute" | "minutes" | "min" | "mins" => return Some(Duration::minutes(amount)),
            "hour" | "hours" | "hr" | "hrs" => return Some(Duration::hours(amount)),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap()
    }

    #[test]
    fn relative_offset_in_hours() {
        let parsed = parse("remind me in 2 hours", now()).unwrap();
        assert_eq!(parsed.start, now() + Duration::hours(2));
        assert_eq!(parsed.matched_text, "in 2 hours");
        assert_eq!(parsed.end - parsed.start, Duration::minutes(30));
    }

    #[test]
    fn tomorrow_with_clock_time() {
        let parsed = parse("schedule the review tomorrow at 3pm", now()).unwrap();
        assert_eq!(
            parsed.start,
            Utc.with_ymd_and_hms(2026, 3, 11, 15, 0, 0).unwrap()
        );
        assert_eq!(parsed.matched_text, "tomorrow 3pm");
    }

    #[test]
    fn bare_day_word_defaults_to_morning() {
        let parsed = parse("block focus time tomorrow", now()).unwrap();
        assert_eq!(
            parsed.start,
            Utc.with_ymd_and_hms(2026, 3, 11, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn past_clock_time_rolls_to_next_day() {
        let parsed = parse("call at 7:30am", now()).unwrap();
        // 07:30 is already past 08:00 "now", so it rolls forward.
        assert_eq!(
            parsed.start,
            Utc.with_ymd_and_hms(2026, 3, 11, 7, 30, 0).unwrap()
        );
    }

    #[test]
    fn explicit_duration_is_used() {
        let parsed = parse("deep work tomorrow at 10:00am for 90 minutes", now()).unwrap();
        assert_eq!(parsed.end - parsed.start, Duration::minutes(90));
    }

    #[test]
    fn negative_duration_falls_back_to_default_block() {
        let parsed = parse("deep work tomorrow at 10:00am for -20 minutes", now()).unwrap();
        assert!(parsed.end > parsed.start);
        assert_eq!(parsed.end - parsed.start, Duration::minutes(30));
    }

    #[test]
    fn negative_relative_offset_is_not_a_start() {
        assert!(parse("remind me in -2 hours", now()).is_none());
    }

    #[test]
    fn twenty_four_hour_clock() {
        let parsed = parse("standup at 15:30", now()).unwrap();
        assert_eq!(parsed.start.time(), NaiveTime::from_hms_opt(15, 30, 0).unwrap());
    }

    #[test]
    fn plain_numbers_are_not_times() {
        assert!(parse("buy 3 tickets", now()).is_none());
        assert!(parse("", now()).is_none());
    }

    #[test]
    fn noon_and_midnight_meridiem() {
        let noon = parse("lunch tomorrow at 12pm", now()).unwrap();
        assert_eq!(noon.start.hour(), 12);
        let midnight = parse("backup tomorrow at 12am", now()).unwrap();
        assert_eq!(midnight.start.hour(), 0);
    }
}
