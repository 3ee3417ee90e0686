//! Built-in aggregation jobs. Each is plain data handed to the engine; the
//! engine never looks at a job's name except to label errors.

use chrono::{Datelike, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;

use crate::mapreduce::{AnyJob, Job, JobSpec, OutputKind};
use crate::record::Record;
use crate::tokenizer::{tokenize, StopWords};

/// Each weekday is assumed to occur 52 times a year.
pub const WEEKDAYS_PER_YEAR: f64 = 52.0;

pub const MONTHLY_MESSAGES: &str = "monthly-messages";
pub const MONTHLY_SPEAKERS: &str = "monthly-speakers";
pub const TOP_SPEAKERS: &str = "top-speakers";
pub const TOP_WORDS: &str = "top-words";
pub const THANKS: &str = "thanks";
pub const WEEKDAY_ACTIVITY: &str = "weekday-activity";

pub const JOB_NAMES: [&str; 6] = [MONTHLY_MESSAGES, MONTHLY_SPEAKERS, TOP_SPEAKERS, TOP_WORDS, THANKS, WEEKDAY_ACTIVITY];

static THANK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bthank").expect("static regex"));

fn spec(name: &str, title: &str, x: &str, y: &str, kind: OutputKind, max: Option<usize>, outfile: &str) -> JobSpec {
    JobSpec {
        name: name.to_string(),
        title: title.to_string(),
        x_label: x.to_string(),
        y_label: y.to_string(),
        kind,
        max,
        outfile: outfile.to_string(),
    }
}

fn month_of(r: &Record) -> NaiveDate {
    // day 1 of an existing month always exists
    r.time.date().with_day(1).unwrap_or_else(|| r.time.date())
}

fn month_label(d: &NaiveDate) -> String { d.format("%Y-%m").to_string() }

fn string_label(s: &String) -> String { s.clone() }

fn weekday_label(d: &u32) -> String {
    Weekday::try_from(*d as u8).map(|w| w.to_string()).unwrap_or_else(|_| d.to_string())
}

fn sum(values: &[u64]) -> anyhow::Result<u64> {
    Ok(values.iter().sum())
}

pub fn monthly_messages() -> Job<NaiveDate, u64, u64> {
    Job::new(
        spec(MONTHLY_MESSAGES, "Messages per month", "month", "messages", OutputKind::Chart, None, "messages-per-month"),
        |r: &Record| Ok(vec![(month_of(r), 1)]),
        |_k: &NaiveDate, vs: &[u64]| sum(vs),
        month_label,
    )
}

pub fn monthly_speakers() -> Job<NaiveDate, String, u64> {
    Job::new(
        spec(MONTHLY_SPEAKERS, "Distinct speakers per month", "month", "speakers", OutputKind::Chart, None, "speakers-per-month"),
        |r: &Record| Ok(r.user.iter().map(|u| (month_of(r), u.clone())).collect()),
        |_k: &NaiveDate, vs: &[String]| Ok(vs.iter().collect::<HashSet<_>>().len() as u64),
        month_label,
    )
}

pub fn top_speakers() -> Job<String, u64, u64> {
    Job::new(
        spec(TOP_SPEAKERS, "Most active speakers", "speaker", "messages", OutputKind::Table, Some(50), "top-speakers"),
        |r: &Record| Ok(r.user.iter().map(|u| (u.clone(), 1)).collect()),
        |_k: &String, vs: &[u64]| sum(vs),
        string_label,
    )
}

pub fn top_words(stop_words: Arc<StopWords>) -> Job<String, u64, u64> {
    Job::new(
        spec(TOP_WORDS, "Most used words", "word", "uses", OutputKind::Table, Some(100), "top-words"),
        move |r: &Record| {
            Ok(tokenize(&r.text)
                .filter(|t| stop_words.is_content_word(t))
                .map(|t| (t, 1))
                .collect())
        },
        |_k: &String, vs: &[u64]| sum(vs),
        string_label,
    )
}

/// Addressees of a thank-you: tokens ending in `:` in a line that thanks.
pub fn thanked_names(text: &str) -> Vec<String> {
    if !THANK_RE.is_match(text) {
        return Vec::new();
    }
    text.split_whitespace()
        .filter_map(|tok| tok.strip_suffix(':'))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn thanks() -> Job<String, u64, u64> {
    Job::new(
        spec(THANKS, "Most thanked", "user", "thanks", OutputKind::Table, Some(30), "thanks"),
        |r: &Record| Ok(thanked_names(&r.text).into_iter().map(|n| (n, 1)).collect()),
        |_k: &String, vs: &[u64]| sum(vs),
        string_label,
    )
}

/// Messages per weekday (Monday = 0), averaged over 52 weeks a year.
pub fn weekday_activity() -> Job<u32, u64, f64> {
    Job::new(
        spec(WEEKDAY_ACTIVITY, "Messages per weekday", "weekday", "messages per year", OutputKind::Chart, None, "weekday-activity"),
        |r: &Record| Ok(vec![(r.time.weekday().num_days_from_monday(), 1)]),
        |_k: &u32, vs: &[u64]| Ok(vs.iter().sum::<u64>() as f64 / WEEKDAYS_PER_YEAR),
        weekday_label,
    )
}

/// Every built-in job in report order.
pub fn catalog(stop_words: Arc<StopWords>) -> Vec<Box<dyn AnyJob>> {
    vec![
        Box::new(monthly_messages()),
        Box::new(monthly_speakers()),
        Box::new(top_speakers()),
        Box::new(top_words(stop_words)),
        Box::new(thanks()),
        Box::new(weekday_activity()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapreduce::run;
    use chrono::NaiveDateTime;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    fn rec(time: NaiveDateTime, user: Option<&str>, text: &str) -> Record {
        Record { time, text: text.to_string(), user: user.map(str::to_string) }
    }

    fn sample() -> Vec<Record> {
        vec![
            rec(at(2010, 1, 1, 10), Some("a"), "clojure macros are great"),
            rec(at(2010, 1, 4, 11), Some("a"), "thanks rich: that helped"),
            rec(at(2010, 1, 4, 12), Some("b"), "the macros again"),
            rec(at(2010, 2, 1, 9), Some("a"), "thank you jim:"),
            rec(at(2010, 2, 2, 9), Some("a"), "ok"),
            rec(at(2010, 2, 2, 9), None, "* joined"),
        ]
    }

    #[test]
    fn per_speaker_counts() {
        let t = at(2010, 1, 1, 0);
        let records = vec![
            rec(t, Some("a"), "1"),
            rec(t, Some("a"), "2"),
            rec(t, Some("b"), "3"),
            rec(t, Some("a"), "4"),
            rec(t, Some("a"), "5"),
        ];
        let out = run(&top_speakers(), &records).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out["a"], 4);
        assert_eq!(out["b"], 1);
    }

    #[test]
    fn thank_you_contributes_to_the_named_user() {
        let r = rec(at(2010, 1, 1, 0), Some("x"), "thank you jim:");
        assert_eq!((thanks().mapper)(&r).unwrap(), vec![("jim".to_string(), 1)]);
        assert_eq!(thanked_names("THANKS a: and b:"), vec!["a", "b"]);
        assert!(thanked_names("jim: no gratitude here").is_empty());
        assert!(thanked_names("thanks : ").is_empty());
    }

    #[test]
    fn monthly_jobs_bucket_by_month() {
        let jan = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
        let feb = NaiveDate::from_ymd_opt(2010, 2, 1).unwrap();
        let msgs = run(&monthly_messages(), &sample()).unwrap();
        assert_eq!(msgs[&jan], 3);
        assert_eq!(msgs[&feb], 3);
        let speakers = run(&monthly_speakers(), &sample()).unwrap();
        assert_eq!(speakers[&jan], 2);
        assert_eq!(speakers[&feb], 1);
        assert_eq!(month_label(&feb), "2010-02");
    }

    #[test]
    fn content_words_skip_stop_words_and_short_tokens() {
        let sw = Arc::new(StopWords::from_lines("the\nare\nthat\n"));
        let out = run(&top_words(sw), &sample()).unwrap();
        assert_eq!(out["macros"], 2);
        assert_eq!(out["clojure"], 1);
        assert!(!out.contains_key("the"));
        assert!(!out.contains_key("ok"));
        assert!(!out.contains_key("are"));
    }

    #[test]
    fn weekday_counts_are_normalized_by_52() {
        // 2010-01-04 was a Monday
        let out = run(&weekday_activity(), &sample()).unwrap();
        assert!((out[&0] - 3.0 / 52.0).abs() < 1e-12);
        assert_eq!(weekday_label(&0), "Mon");
        assert_eq!(weekday_label(&6), "Sun");
    }

    #[test]
    fn results_do_not_depend_on_record_order() {
        let sw = Arc::new(StopWords::from_lines("the\n"));
        let forward = sample();
        let mut backward = sample();
        backward.reverse();
        let mut rotated = sample();
        rotated.rotate_left(2);
        let m = crate::metrics::Metrics::new();
        for job in catalog(sw) {
            let base = job.execute(&forward, &m).unwrap();
            assert_eq!(base, job.execute(&backward, &m).unwrap(), "{}", job.spec().name);
            assert_eq!(base, job.execute(&rotated, &m).unwrap(), "{}", job.spec().name);
        }
    }

    #[test]
    fn catalog_names_are_unique_and_known() {
        let names: Vec<String> = catalog(Arc::new(StopWords::default())).iter().map(|j| j.spec().name.clone()).collect();
        assert_eq!(names, JOB_NAMES.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    }
}
