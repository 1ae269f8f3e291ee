//! Closed vocabularies shared by the Join form, the listing filters and the
//! hiring request form.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EnglishLevel {
    Basic,
    Intermediate,
    Advanced,
    Fluent,
    Native,
}

impl EnglishLevel {
    pub const ALL: [EnglishLevel; 5] = [
        EnglishLevel::Basic,
        EnglishLevel::Intermediate,
        EnglishLevel::Advanced,
        EnglishLevel::Fluent,
        EnglishLevel::Native,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnglishLevel::Basic => "basic",
            EnglishLevel::Intermediate => "intermediate",
            EnglishLevel::Advanced => "advanced",
            EnglishLevel::Fluent => "fluent",
            EnglishLevel::Native => "native",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|l| l.as_str() == normalized)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Immediate,
    TwoWeeks,
    OneMonth,
    MoreThanOneMonth,
}

impl Availability {
    pub const ALL: [Availability; 4] = [
        Availability::Immediate,
        Availability::TwoWeeks,
        Availability::OneMonth,
        Availability::MoreThanOneMonth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Immediate => "immediate",
            Availability::TwoWeeks => "two_weeks",
            Availability::OneMonth => "one_month",
            Availability::MoreThanOneMonth => "more_than_one_month",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|a| a.as_str() == normalized)
    }
}

/// Trims, drops empties, and de-duplicates case-insensitively.
/// The first spelling of each skill wins and submission order is kept.
pub fn normalize_skills<I, S>(skills: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for skill in skills {
        let skill = skill.as_ref().split_whitespace().collect::<Vec<_>>().join(" ");
        if skill.is_empty() {
            continue;
        }
        if seen.insert(skill.to_lowercase()) {
            out.push(skill);
        }
    }
    out
}

/// Splits a comma-separated form or query value into trimmed, non-empty parts.
pub fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_skills_dedups_case_insensitively() {
        let skills = normalize_skills(["Rust", " rust ", "PostgreSQL", "", "react  native"]);
        assert_eq!(skills, vec!["Rust", "PostgreSQL", "react native"]);
    }

    #[test]
    fn test_split_list_skips_blanks() {
        let parts: Vec<_> = split_list(" rust, ,go,, ").collect();
        assert_eq!(parts, vec!["rust", "go"]);
    }

    #[test]
    fn test_availability_parse_accepts_hyphens() {
        assert_eq!(Availability::parse("two-weeks"), Some(Availability::TwoWeeks));
        assert_eq!(Availability::parse("IMMEDIATE"), Some(Availability::Immediate));
        assert_eq!(Availability::parse("someday"), None);
    }

    #[test]
    fn test_english_level_parse() {
        assert_eq!(EnglishLevel::parse("Native"), Some(EnglishLevel::Native));
        assert_eq!(EnglishLevel::parse("b2"), None);
    }
}
