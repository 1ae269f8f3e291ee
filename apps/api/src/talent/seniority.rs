use serde::{Deserialize, Serialize};

/// Experience bucket shown to companies. Derived from years of experience,
/// never persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SeniorityLevel {
    Junior,
    Mid,
    Senior,
    NotSpecified,
}

impl SeniorityLevel {
    pub const ALL: [SeniorityLevel; 4] = [
        SeniorityLevel::Junior,
        SeniorityLevel::Mid,
        SeniorityLevel::Senior,
        SeniorityLevel::NotSpecified,
    ];

    /// Buckets: 0-2 junior, 3-5 mid, 6+ senior.
    pub fn from_years(years: Option<i32>) -> Self {
        match years {
            Some(y) if y < 0 => SeniorityLevel::NotSpecified,
            Some(0..=2) => SeniorityLevel::Junior,
            Some(3..=5) => SeniorityLevel::Mid,
            Some(_) => SeniorityLevel::Senior,
            None => SeniorityLevel::NotSpecified,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeniorityLevel::Junior => "junior",
            SeniorityLevel::Mid => "mid",
            SeniorityLevel::Senior => "senior",
            SeniorityLevel::NotSpecified => "not_specified",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|l| l.as_str() == normalized)
    }
}

impl std::fmt::Display for SeniorityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
