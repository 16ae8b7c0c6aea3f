use crate::error::{PollError, Result};
use chrono::NaiveDate;
use tracing::warn;

/// Converts the survey table's irregular date notation into a calendar date.
///
/// Two shapes are accepted:
/// - a single date `YY.MM.DD.` (trailing dot optional), read as `20YY-MM-DD`;
/// - a range `YY.MM.DD.~[MM.]DD.`, which resolves to the range's **end**
///   date: the start side supplies year and month, the end side supplies the
///   day. When the end side has two tokens they are `[month, day]` and only
///   the day is taken; the start's month wins regardless.
pub fn normalize_survey_date(raw: &str) -> Result<NaiveDate> {
    let token = raw.trim();
    let fail = |reason: &str| PollError::DateParse {
        raw: token.to_string(),
        reason: reason.to_string(),
    };

    let (year_str, month_str, day_str) = if let Some((start, end)) = token.split_once('~') {
        let start_details: Vec<&str> = start.split('.').filter(|s| !s.is_empty()).collect();
        let end_details: Vec<&str> = end.split('.').filter(|s| !s.is_empty()).collect();

        let year = *start_details.first().ok_or_else(|| fail("range start has no year"))?;
        let month = *start_details.get(1).ok_or_else(|| fail("range start has no month"))?;
        // Positional rule: a lone end token is the day; with two or more
        // tokens the second is the day and the first (an end month) is
        // ignored in favor of the start's month.
        let day = match end_details.len() {
            0 => return Err(fail("range end has no day")),
            1 => end_details[0],
            _ => end_details[1],
        };
        (year, month, day)
    } else {
        let details: Vec<&str> = token.split('.').filter(|s| !s.is_empty()).collect();
        match details[..] {
            [year, month, day, ..] => (year, month, day),
            _ => return Err(fail("expected year, month and day components")),
        }
    };

    let year: i32 = format!("20{}", year_str.trim())
        .parse()
        .map_err(|_| fail("year is not numeric"))?;
    let month: u32 = month_str
        .trim()
        .parse()
        .map_err(|_| fail("month is not numeric"))?;
    let day: u32 = day_str
        .trim()
        .parse()
        .map_err(|_| fail("day is not numeric"))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| fail("components do not form a valid calendar date"))
}

/// Resolves a raw percentage cell into an optional value.
///
/// Empty, whitespace-only or absent cells yield `None`. Otherwise one
/// trailing `%` is stripped and the rest parsed as a float; anything that
/// fails to parse (or parses to NaN) is logged and dropped. Values are not
/// clamped to [0,100]; they are trusted once parsed.
pub fn resolve_percentage(party_name: &str, raw: Option<&str>) -> Option<f64> {
    let text = raw?.trim();
    if text.is_empty() {
        return None;
    }

    let numeric = text.strip_suffix('%').unwrap_or(text).trim();
    match numeric.parse::<f64>() {
        Ok(value) if !value.is_nan() => Some(value),
        _ => {
            warn!(party = %party_name, cell = %text, "Dropping unparseable percentage cell");
            None
        }
    }
}

/// Canonicalizes a party label: every newline becomes a single space and the
/// result is trimmed, so the same party never splits into two aggregation
/// keys on whitespace noise from the source table.
pub fn canonical_party_name(raw: &str) -> String {
    raw.replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}
