//! Public projection of a candidate record.
//!
//! Companies browse without authentication, so everything leaving the listing
//! endpoints goes through `anonymize`. Contact details are dropped outright and
//! free text is scrubbed of anything that looks like a way to reach the person.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::models::candidate::CandidateRow;
use crate::talent::fields::normalize_skills;
use crate::talent::seniority::SeniorityLevel;
use crate::talent::talent_id::format_talent_id;

pub const REDACTED: &str = "[redacted]";

#[derive(Debug, Clone, Serialize)]
pub struct AnonymizedProfile {
    /// Row id, kept for ordering only.
    #[serde(skip)]
    pub row_id: i64,
    pub talent_id: String,
    pub title: String,
    pub seniority_level: SeniorityLevel,
    pub years_experience: Option<i32>,
    pub skills: Vec<String>,
    pub location: String,
    pub english_level: String,
    pub availability: String,
    pub salary_expectation_usd: Option<i32>,
    pub summary: Option<String>,
    pub parse_status: String,
    pub joined_at: DateTime<Utc>,
}

pub fn anonymize(row: &CandidateRow) -> AnonymizedProfile {
    AnonymizedProfile {
        row_id: row.id,
        talent_id: format_talent_id(row.id),
        title: row.title.clone(),
        seniority_level: SeniorityLevel::from_years(row.years_experience),
        years_experience: row.years_experience.filter(|y| *y >= 0),
        skills: normalize_skills(&row.skills),
        location: row.location.clone(),
        english_level: row.english_level.clone(),
        availability: row.availability.clone(),
        salary_expectation_usd: row.salary_expectation_usd,
        summary: row
            .summary
            .as_deref()
            .map(redact_contact_details)
            .filter(|s| !s.is_empty()),
        parse_status: row.parse_status.clone(),
        joined_at: row.created_at,
    }
}

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("Valid email regex")
});

static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:https?://|www\.)[^\s]+|\b(?:[a-z0-9-]+\.)+(?:com|net|org|io|dev|me|co)/[^\s]*",
    )
    .expect("Valid URL regex")
});

static PHONE_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?\(?\d[\d\s().-]{5,}\d").expect("Valid phone regex"));

/// Digit runs shorter than this are left alone unless they carry a `+`
/// country prefix. Keeps year ranges like "2015 - 2020" intact.
const MIN_PHONE_DIGITS: usize = 9;

/// Replaces emails, URLs and phone numbers in free text with `[redacted]`.
pub fn redact_contact_details(text: &str) -> String {
    let text = EMAIL.replace_all(text, REDACTED);
    let text = URL.replace_all(&text, REDACTED);
    let text = PHONE_LIKE.replace_all(&text, |caps: &Captures| {
        let matched = &caps[0];
        let digits = matched.chars().filter(char::is_ascii_digit).count();
        if digits >= MIN_PHONE_DIGITS || (matched.starts_with('+') && digits >= 7) {
            REDACTED.to_string()
        } else {
            matched.to_string()
        }
    });
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::talent::test_support::sample_row;

    #[test]
    fn test_anonymize_drops_contact_fields() {
        let profile = anonymize(&sample_row(12));
        let json = serde_json::to_value(&profile).unwrap();

        assert_eq!(json["talent_id"], "SVL-012");
        assert_eq!(json["seniority_level"], "mid");
        for hidden in ["id", "row_id", "full_name", "email", "phone", "linkedin_url", "cv_key"] {
            assert!(json.get(hidden).is_none(), "{hidden} leaked");
        }
        let rendered = json.to_string();
        assert!(!rendered.contains("maria@example.com"));
        assert!(!rendered.contains("91234"));
        assert!(!rendered.contains("Souza"));
    }

    #[test]
    fn test_anonymize_normalizes_skills() {
        let profile = anonymize(&sample_row(1));
        assert_eq!(profile.skills, vec!["Rust", "PostgreSQL"]);
    }

    #[test]
    fn test_blank_summary_after_redaction_is_dropped() {
        let mut row = sample_row(3);
        row.summary = Some("  jane@doe.dev ".to_string());
        assert_eq!(anonymize(&row).summary.as_deref(), Some(REDACTED));

        row.summary = Some("   ".to_string());
        assert_eq!(anonymize(&row).summary, None);
    }

    #[test]
    fn test_redacts_urls() {
        let out = redact_contact_details("Portfolio: https://jane.dev/work and linkedin.com/in/jane");
        assert_eq!(out, "Portfolio: [redacted] and [redacted]");
    }

    #[test]
    fn test_redacts_local_phone_numbers() {
        let out = redact_contact_details("Call (11) 3456-7890 anytime");
        assert_eq!(out, "Call [redacted] anytime");
    }

    #[test]
    fn test_keeps_year_ranges_and_metrics() {
        let text = "Worked 2015 - 2020 on systems serving 10000 users";
        assert_eq!(redact_contact_details(text), text);
    }
}
