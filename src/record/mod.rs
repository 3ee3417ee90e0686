use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ChatStatsError;
use crate::markup::LogEntry;

static LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*(\d+):(\d+)\s?(.*)$").expect("static regex"));

/// One parsed, speaker-attributed, timestamped utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub time: NaiveDateTime,
    pub text: String,
    pub user: Option<String>,
}

/// Parse one log entry into a [`Record`].
///
/// Lines without a bold speaker span inherit `user` from `previous`, which is
/// the record parsed just before this one in the same file (or `None` for the
/// first line). A bold span whose name is blank after trimming counts as no
/// marker at all.
pub fn parse_line(
    base_day: NaiveDate,
    previous: Option<&Record>,
    entry: &LogEntry,
) -> Result<Record, ChatStatsError> {
    let malformed = || ChatStatsError::MalformedLine { line: entry.text.clone() };
    let caps = LINE_RE.captures(&entry.text).ok_or_else(malformed)?;
    let hours: i64 = caps[1].parse().map_err(|_| malformed())?;
    let minutes: i64 = caps[2].parse().map_err(|_| malformed())?;
    let rest = caps.get(3).map_or("", |m| m.as_str());

    let speaker = entry.bold.as_deref().and_then(|raw| {
        let name = raw.trim().trim_end_matches(':').trim();
        (!name.is_empty()).then(|| (raw, name.to_string()))
    });

    let (user, text) = match speaker {
        Some((raw, name)) => (Some(name), strip_speaker_prefix(rest, raw)),
        None => (previous.and_then(|p| p.user.clone()), rest),
    };

    let offset = hours
        .checked_mul(60)
        .and_then(|h| h.checked_add(minutes))
        .and_then(Duration::try_minutes)
        .ok_or_else(malformed)?;
    let time = base_day
        .and_time(NaiveTime::MIN)
        .checked_add_signed(offset)
        .ok_or_else(malformed)?;
    Ok(Record { time, text: text.trim().to_string(), user })
}

fn strip_speaker_prefix<'a>(rest: &'a str, raw: &str) -> &'a str {
    // indented markup leaves line breaks between the timestamp and the span
    let rest = rest.trim_start();
    let raw = raw.trim();
    if let Some(stripped) = rest.strip_prefix(raw) {
        return stripped;
    }
    // markup and text disagree on inner whitespace; drop the same number of chars
    let n = raw.chars().count();
    match rest.char_indices().nth(n) {
        Some((at, _)) => &rest[at..],
        None => "",
    }
}

/// Fold [`parse_line`] over one file's entries, threading each record into the
/// next call. Stops at the first malformed line.
pub fn parse_entries(base_day: NaiveDate, entries: &[LogEntry]) -> Result<Vec<Record>, ChatStatsError> {
    let mut out: Vec<Record> = Vec::with_capacity(entries.len());
    for entry in entries {
        let rec = parse_line(base_day, out.last(), entry)?;
        out.push(rec);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::LogDocument;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2010, 1, 1).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn explicit_speaker_is_parsed_and_stripped() {
        let e = LogEntry::new("21:38 chouser: hi", Some("chouser:"));
        let r = parse_line(day(), None, &e).unwrap();
        assert_eq!(r.user.as_deref(), Some("chouser"));
        assert_eq!(r.text, "hi");
        assert_eq!(r.time, at(21, 38));
    }

    #[test]
    fn trailing_colon_space_convention_is_removed() {
        let e = LogEntry::new("09:05 rhickey: ok then", Some("rhickey: "));
        let r = parse_line(day(), None, &e).unwrap();
        assert_eq!(r.user.as_deref(), Some("rhickey"));
        assert_eq!(r.text, "ok then");
        assert_eq!(r.time, at(9, 5));
    }

    #[test]
    fn continuation_lines_inherit_the_previous_speaker() {
        let entries = vec![
            LogEntry::new("21:38 chouser: great, thanks!", Some("chouser:")),
            LogEntry::new("21:39 np", None),
            LogEntry::new("21:40 still me", None),
        ];
        let recs = parse_entries(day(), &entries).unwrap();
        assert_eq!(recs.len(), 3);
        assert!(recs.iter().all(|r| r.user.as_deref() == Some("chouser")));
        assert_eq!(recs[0].text, "great, thanks!");
        assert_eq!(recs[1].text, "np");
        assert_eq!(recs[2].time, at(21, 40));
    }

    #[test]
    fn first_line_without_marker_has_no_user() {
        let e = LogEntry::new("00:01 * someone joined", None);
        let r = parse_line(day(), None, &e).unwrap();
        assert_eq!(r.user, None);
        assert_eq!(r.text, "* someone joined");
    }

    #[test]
    fn new_speaker_resets_the_carried_state() {
        let entries = vec![
            LogEntry::new("10:00 a: one", Some("a:")),
            LogEntry::new("10:01 two", None),
            LogEntry::new("10:02 b: three", Some("b:")),
            LogEntry::new("10:03 four", None),
        ];
        let users: Vec<_> = parse_entries(day(), &entries)
            .unwrap()
            .into_iter()
            .map(|r| r.user.unwrap())
            .collect();
        assert_eq!(users, vec!["a", "a", "b", "b"]);
    }

    #[test]
    fn blank_bold_span_is_treated_as_no_marker() {
        let prev = parse_line(day(), None, &LogEntry::new("10:00 a: x", Some("a:"))).unwrap();
        let r = parse_line(day(), Some(&prev), &LogEntry::new("10:01 y", Some("  "))).unwrap();
        assert_eq!(r.user.as_deref(), Some("a"));
        assert_eq!(r.text, "y");
    }

    #[test]
    fn extra_whitespace_before_the_speaker_is_not_kept_in_text() {
        let e = LogEntry::new("21:38  chouser: hi", Some("chouser:"));
        let r = parse_line(day(), None, &e).unwrap();
        assert_eq!(r.user.as_deref(), Some("chouser"));
        assert_eq!(r.text, "hi");

        let e = LogEntry::new("\n  21:38\n  chouser: hi\n", Some("chouser:"));
        let r = parse_line(day(), None, &e).unwrap();
        assert_eq!(r.text, "hi");
        assert_eq!(r.time, at(21, 38));
    }

    #[test]
    fn indented_markup_yields_clean_text() {
        let doc = LogDocument::parse("<p>\n  <a>21:38</a>\n  <b>chouser:</b> hi\n</p>\n<p>21:39   <b> rhickey: </b>  ok then</p>");
        let recs = parse_entries(day(), &doc.log_entries()).unwrap();
        let got: Vec<_> = recs.iter().map(|r| (r.user.as_deref().unwrap(), r.text.as_str())).collect();
        assert_eq!(got, vec![("chouser", "hi"), ("rhickey", "ok then")]);
    }

    #[test]
    fn offsets_past_midnight_roll_into_the_next_day() {
        let r = parse_line(day(), None, &LogEntry::new("24:30 late", None)).unwrap();
        assert_eq!(r.time, NaiveDate::from_ymd_opt(2010, 1, 2).unwrap().and_hms_opt(0, 30, 0).unwrap());
    }

    #[test]
    fn absurd_offsets_are_malformed_not_panics() {
        let e = LogEntry::new("99999999999999999:00 x", None);
        assert!(matches!(parse_line(day(), None, &e), Err(ChatStatsError::MalformedLine { .. })));
    }

    #[test]
    fn missing_timestamp_is_malformed() {
        let err = parse_line(day(), None, &LogEntry::new("hello there", None)).unwrap_err();
        assert!(matches!(err, ChatStatsError::MalformedLine { .. }));
        let entries = vec![
            LogEntry::new("10:00 a: fine", Some("a:")),
            LogEntry::new("garbage", None),
        ];
        assert!(parse_entries(day(), &entries).is_err());
    }
}
