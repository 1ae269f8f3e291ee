//! Listing pipeline: parse query → filter → sort → paginate.
//!
//! The database narrows the pool with cheap column predicates (see
//! `store::fetch_pool`); everything that depends on derived fields such as
//! seniority, or on normalized skills, happens here over the anonymized
//! profiles. The pool is small, so the whole pipeline runs in memory.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::errors::FieldError;
use crate::talent::anonymize::AnonymizedProfile;
use crate::talent::fields::{split_list, Availability, EnglishLevel};
use crate::talent::seniority::SeniorityLevel;

pub const DEFAULT_PAGE_SIZE: u32 = 12;
pub const MAX_PAGE_SIZE: u32 = 100;
const MAX_SKILL_FACETS: usize = 50;

/// Raw listing query string. Every value arrives as text so malformed input
/// produces field errors instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub skills: Option<String>,
    pub seniority: Option<String>,
    pub location: Option<String>,
    pub english_level: Option<String>,
    pub availability: Option<String>,
    pub min_years: Option<String>,
    pub max_years: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    ExperienceDesc,
    ExperienceAsc,
    TalentId,
}

impl SortOrder {
    const ALL: [SortOrder; 5] = [
        SortOrder::Newest,
        SortOrder::Oldest,
        SortOrder::ExperienceDesc,
        SortOrder::ExperienceAsc,
        SortOrder::TalentId,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
            SortOrder::ExperienceDesc => "experience_desc",
            SortOrder::ExperienceAsc => "experience_asc",
            SortOrder::TalentId => "talent_id",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|s| s.as_str() == normalized)
    }
}

/// Validated listing filter. Echoed back to clients as `applied`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TalentFilter {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub skills: Vec<String>,
    pub seniority: Vec<SeniorityLevel>,
    pub location: Option<String>,
    pub english_level: Option<EnglishLevel>,
    pub availability: Option<Availability>,
    pub min_years: Option<i32>,
    pub max_years: Option<i32>,
    pub sort: SortOrder,
}

impl Default for TalentFilter {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            search: None,
            skills: Vec::new(),
            seniority: Vec::new(),
            location: None,
            english_level: None,
            availability: None,
            min_years: None,
            max_years: None,
            sort: SortOrder::default(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_positive(field: &str, raw: &str, errors: &mut Vec<FieldError>) -> Option<u32> {
    match raw.parse::<u32>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            errors.push(FieldError::new(field, "Must be a positive integer"));
            None
        }
    }
}

fn parse_years(field: &str, raw: &str, errors: &mut Vec<FieldError>) -> Option<i32> {
    match raw.parse::<i32>() {
        Ok(n) if (0..=50).contains(&n) => Some(n),
        _ => {
            errors.push(FieldError::new(field, "Must be a whole number between 0 and 50"));
            None
        }
    }
}

impl ListParams {
    pub fn into_filter(self) -> Result<TalentFilter, Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut filter = TalentFilter::default();

        if let Some(raw) = non_blank(self.page) {
            if let Some(page) = parse_positive("page", &raw, &mut errors) {
                filter.page = page;
            }
        }
        if let Some(raw) = non_blank(self.limit) {
            if let Some(limit) = parse_positive("limit", &raw, &mut errors) {
                filter.limit = limit.min(MAX_PAGE_SIZE);
            }
        }

        filter.search = non_blank(self.search);
        filter.location = non_blank(self.location);

        if let Some(raw) = non_blank(self.skills) {
            filter.skills = crate::talent::fields::normalize_skills(split_list(&raw));
        }

        if let Some(raw) = non_blank(self.seniority) {
            let mut levels = BTreeSet::new();
            for part in split_list(&raw) {
                match SeniorityLevel::parse(part) {
                    Some(level) => {
                        levels.insert(level);
                    }
                    None => errors.push(FieldError::new(
                        "seniority",
                        format!("Unknown seniority level '{part}'"),
                    )),
                }
            }
            filter.seniority = levels.into_iter().collect();
        }

        if let Some(raw) = non_blank(self.english_level) {
            filter.english_level = EnglishLevel::parse(&raw);
            if filter.english_level.is_none() {
                errors.push(FieldError::new(
                    "english_level",
                    format!("Unknown English level '{raw}'"),
                ));
            }
        }

        if let Some(raw) = non_blank(self.availability) {
            filter.availability = Availability::parse(&raw);
            if filter.availability.is_none() {
                errors.push(FieldError::new(
                    "availability",
                    format!("Unknown availability '{raw}'"),
                ));
            }
        }

        if let Some(raw) = non_blank(self.min_years) {
            filter.min_years = parse_years("min_years", &raw, &mut errors);
        }
        if let Some(raw) = non_blank(self.max_years) {
            filter.max_years = parse_years("max_years", &raw, &mut errors);
        }
        if let (Some(min), Some(max)) = (filter.min_years, filter.max_years) {
            if min > max {
                errors.push(FieldError::new(
                    "min_years",
                    "min_years cannot be greater than max_years",
                ));
            }
        }

        if let Some(raw) = non_blank(self.sort) {
            match SortOrder::parse(&raw) {
                Some(sort) => filter.sort = sort,
                None => errors.push(FieldError::new("sort", format!("Unknown sort order '{raw}'"))),
            }
        }

        if errors.is_empty() {
            Ok(filter)
        } else {
            Err(errors)
        }
    }
}

impl TalentFilter {
    /// True when `profile` satisfies every active criterion.
    pub fn matches(&self, profile: &AnonymizedProfile) -> bool {
        if !self.seniority.is_empty() && !self.seniority.contains(&profile.seniority_level) {
            return false;
        }

        if !self.skills.is_empty() {
            let has_all = self.skills.iter().all(|wanted| {
                let wanted = wanted.to_lowercase();
                profile.skills.iter().any(|s| s.to_lowercase() == wanted)
            });
            if !has_all {
                return false;
            }
        }

        if let Some(location) = &self.location {
            if !profile.location.to_lowercase().contains(&location.to_lowercase()) {
                return false;
            }
        }

        if let Some(level) = self.english_level {
            if profile.english_level != level.as_str() {
                return false;
            }
        }

        if let Some(availability) = self.availability {
            if profile.availability != availability.as_str() {
                return false;
            }
        }

        if self.min_years.is_some() || self.max_years.is_some() {
            let Some(years) = profile.years_experience else {
                return false;
            };
            if self.min_years.is_some_and(|min| years < min)
                || self.max_years.is_some_and(|max| years > max)
            {
                return false;
            }
        }

        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = profile.title.to_lowercase().contains(&needle)
                || profile.location.to_lowercase().contains(&needle)
                || profile.talent_id.to_lowercase().contains(&needle)
                || profile.skills.iter().any(|s| s.to_lowercase().contains(&needle))
                || profile
                    .summary
                    .as_deref()
                    .is_some_and(|s| s.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        true
    }
}

/// Missing experience sorts after every known value in both directions.
fn compare_years(a: Option<i32>, b: Option<i32>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn newest_first(a: &AnonymizedProfile, b: &AnonymizedProfile) -> Ordering {
    b.joined_at
        .cmp(&a.joined_at)
        .then_with(|| b.row_id.cmp(&a.row_id))
}

pub fn sort_profiles(profiles: &mut [AnonymizedProfile], order: SortOrder) {
    profiles.sort_by(|a, b| match order {
        SortOrder::Newest => newest_first(a, b),
        SortOrder::Oldest => newest_first(b, a),
        SortOrder::ExperienceDesc => compare_years(a.years_experience, b.years_experience, true)
            .then_with(|| newest_first(a, b)),
        SortOrder::ExperienceAsc => compare_years(a.years_experience, b.years_experience, false)
            .then_with(|| newest_first(a, b)),
        SortOrder::TalentId => a.row_id.cmp(&b.row_id),
    });
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: usize) -> Self {
        let limit = limit.max(1);
        let total_pages = total.div_ceil(limit as usize) as u32;
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }

    fn window(&self) -> std::ops::Range<usize> {
        let start = (self.page.saturating_sub(1) as usize).saturating_mul(self.limit as usize);
        let start = start.min(self.total);
        let end = start.saturating_add(self.limit as usize).min(self.total);
        start..end
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TalentPage {
    pub data: Vec<AnonymizedProfile>,
    pub pagination: Pagination,
}

/// Runs the full pipeline over the fetched pool.
pub fn apply(filter: &TalentFilter, profiles: Vec<AnonymizedProfile>) -> TalentPage {
    let mut matched: Vec<AnonymizedProfile> =
        profiles.into_iter().filter(|p| filter.matches(p)).collect();
    sort_profiles(&mut matched, filter.sort);

    let pagination = Pagination::new(filter.page, filter.limit, matched.len());
    let window = pagination.window();
    let data = matched.drain(window).collect();

    TalentPage { data, pagination }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FacetCount {
    pub value: String,
    pub count: usize,
}

/// Filter-control options counted over the fetched pool. In-memory filters
/// are not applied, so options do not disappear as the user narrows.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Facets {
    pub skills: Vec<FacetCount>,
    pub locations: Vec<FacetCount>,
    pub seniority: Vec<FacetCount>,
    pub availability: Vec<FacetCount>,
}

fn ranked(counts: HashMap<String, usize>, cap: Option<usize>) -> Vec<FacetCount> {
    let mut out: Vec<FacetCount> = counts
        .into_iter()
        .map(|(value, count)| FacetCount { value, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    if let Some(cap) = cap {
        out.truncate(cap);
    }
    out
}

pub fn facets(profiles: &[AnonymizedProfile]) -> Facets {
    // Skills are grouped case-insensitively under the first spelling seen.
    let mut skill_spelling: HashMap<String, String> = HashMap::new();
    let mut skills: HashMap<String, usize> = HashMap::new();
    let mut locations: HashMap<String, usize> = HashMap::new();
    let mut availability: HashMap<String, usize> = HashMap::new();

    for profile in profiles {
        for skill in &profile.skills {
            let display = skill_spelling
                .entry(skill.to_lowercase())
                .or_insert_with(|| skill.clone())
                .clone();
            *skills.entry(display).or_default() += 1;
        }
        *locations.entry(profile.location.clone()).or_default() += 1;
        *availability.entry(profile.availability.clone()).or_default() += 1;
    }

    let seniority = SeniorityLevel::ALL
        .iter()
        .map(|level| FacetCount {
            value: level.as_str().to_string(),
            count: profiles
                .iter()
                .filter(|p| p.seniority_level == *level)
                .count(),
        })
        .collect();

    Facets {
        skills: ranked(skills, Some(MAX_SKILL_FACETS)),
        locations: ranked(locations, None),
        seniority,
        availability: ranked(availability, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::talent::anonymize::anonymize;
    use crate::talent::test_support::sample_row;

    fn profile(id: i64, years: Option<i32>, skills: &[&str], location: &str) -> AnonymizedProfile {
        let mut row = sample_row(id);
        row.years_experience = years;
        row.skills = skills.iter().map(|s| s.to_string()).collect();
        row.location = location.to_string();
        row.summary = None;
        anonymize(&row)
    }

    fn pool() -> Vec<AnonymizedProfile> {
        vec![
            profile(1, Some(1), &["React", "TypeScript"], "Bogotá, Colombia"),
            profile(2, Some(4), &["Rust", "PostgreSQL"], "São Paulo, Brazil"),
            profile(3, Some(8), &["Rust", "Kubernetes"], "Buenos Aires, Argentina"),
            profile(4, None, &["Python"], "Lima, Peru"),
            profile(5, Some(10), &["Go", "rust"], "Medellín, Colombia"),
        ]
    }

    fn params(pairs: &[(&str, &str)]) -> ListParams {
        let mut p = ListParams::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "page" => p.page = v,
                "limit" => p.limit = v,
                "search" => p.search = v,
                "skills" => p.skills = v,
                "seniority" => p.seniority = v,
                "location" => p.location = v,
                "english_level" => p.english_level = v,
                "availability" => p.availability = v,
                "min_years" => p.min_years = v,
                "max_years" => p.max_years = v,
                "sort" => p.sort = v,
                other => panic!("unknown param {other}"),
            }
        }
        p
    }

    fn ids(page: &TalentPage) -> Vec<&str> {
        page.data.iter().map(|p| p.talent_id.as_str()).collect()
    }

    #[test]
    fn test_defaults() {
        let filter = ListParams::default().into_filter().unwrap();
        assert_eq!(filter, TalentFilter::default());
        assert_eq!(filter.limit, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_limit_is_clamped() {
        let filter = params(&[("limit", "500")]).into_filter().unwrap();
        assert_eq!(filter.limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_invalid_params_collect_every_error() {
        let errors = params(&[
            ("page", "0"),
            ("limit", "ten"),
            ("seniority", "junior,wizard"),
            ("sort", "random"),
            ("availability", "someday"),
        ])
        .into_filter()
        .unwrap_err();

        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["page", "limit", "seniority", "availability", "sort"]);
    }

    #[test]
    fn test_year_range_must_be_ordered() {
        let errors = params(&[("min_years", "6"), ("max_years", "2")])
            .into_filter()
            .unwrap_err();
        assert_eq!(errors[0].field, "min_years");
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let page = apply(&TalentFilter::default(), pool());
        assert_eq!(ids(&page), vec!["SVL-005", "SVL-004", "SVL-003", "SVL-002", "SVL-001"]);
    }

    #[test]
    fn test_seniority_filter_uses_derived_bucket() {
        let filter = params(&[("seniority", "senior,not_specified")]).into_filter().unwrap();
        let page = apply(&filter, pool());
        assert_eq!(ids(&page), vec!["SVL-005", "SVL-004", "SVL-003"]);
    }

    #[test]
    fn test_skills_require_all_case_insensitive() {
        let filter = params(&[("skills", "RUST")]).into_filter().unwrap();
        assert_eq!(ids(&apply(&filter, pool())), vec!["SVL-005", "SVL-003", "SVL-002"]);

        let filter = params(&[("skills", "rust, kubernetes")]).into_filter().unwrap();
        assert_eq!(ids(&apply(&filter, pool())), vec!["SVL-003"]);
    }

    #[test]
    fn test_location_substring() {
        let filter = params(&[("location", "colombia")]).into_filter().unwrap();
        assert_eq!(ids(&apply(&filter, pool())), vec!["SVL-005", "SVL-001"]);
    }

    #[test]
    fn test_year_range_excludes_unspecified() {
        let filter = params(&[("min_years", "0"), ("max_years", "5")])
            .into_filter()
            .unwrap();
        assert_eq!(ids(&apply(&filter, pool())), vec!["SVL-002", "SVL-001"]);
    }

    #[test]
    fn test_search_matches_talent_id_and_skills() {
        let filter = params(&[("search", "svl-003")]).into_filter().unwrap();
        assert_eq!(ids(&apply(&filter, pool())), vec!["SVL-003"]);

        let filter = params(&[("search", "typescript")]).into_filter().unwrap();
        assert_eq!(ids(&apply(&filter, pool())), vec!["SVL-001"]);
    }

    #[test]
    fn test_experience_sort_puts_unspecified_last() {
        let filter = params(&[("sort", "experience_desc")]).into_filter().unwrap();
        assert_eq!(
            ids(&apply(&filter, pool())),
            vec!["SVL-005", "SVL-003", "SVL-002", "SVL-001", "SVL-004"]
        );

        let filter = params(&[("sort", "experience-asc")]).into_filter().unwrap();
        assert_eq!(
            ids(&apply(&filter, pool())),
            vec!["SVL-001", "SVL-002", "SVL-003", "SVL-005", "SVL-004"]
        );
    }

    #[test]
    fn test_pagination_windows() {
        let filter = params(&[("limit", "2"), ("page", "2"), ("sort", "talent_id")])
            .into_filter()
            .unwrap();
        let page = apply(&filter, pool());
        assert_eq!(ids(&page), vec!["SVL-003", "SVL-004"]);
        assert_eq!(
            page.pagination,
            Pagination {
                page: 2,
                limit: 2,
                total: 5,
                total_pages: 3,
                has_next: true,
                has_prev: true,
            }
        );
    }

    #[test]
    fn test_page_past_the_end_is_empty() {
        let filter = params(&[("page", "9")]).into_filter().unwrap();
        let page = apply(&filter, pool());
        assert!(page.data.is_empty());
        assert_eq!(page.pagination.total, 5);
        assert!(!page.pagination.has_next);
    }

    #[test]
    fn test_empty_pool() {
        let page = apply(&TalentFilter::default(), Vec::new());
        assert_eq!(page.pagination.total_pages, 0);
        assert!(!page.pagination.has_next);
        assert!(!page.pagination.has_prev);
    }

    #[test]
    fn test_every_result_satisfies_filter() {
        let filter = params(&[("skills", "rust"), ("seniority", "senior")])
            .into_filter()
            .unwrap();
        let page = apply(&filter, pool());
        assert!(!page.data.is_empty());
        assert!(page.data.iter().all(|p| filter.matches(p)));
    }

    #[test]
    fn test_facets_group_skills_case_insensitively() {
        let f = facets(&pool());
        assert_eq!(
            f.skills[0],
            FacetCount {
                value: "Rust".to_string(),
                count: 3
            }
        );
        let not_specified = f.seniority.iter().find(|c| c.value == "not_specified").unwrap();
        assert_eq!(not_specified.count, 1);
        assert_eq!(f.seniority.len(), 4);
    }

    #[test]
    fn test_skill_facets_keep_the_top_fifty() {
        let mut profiles = pool();
        let many: Vec<String> = (0..60).map(|i| format!("skill-{i:02}")).collect();
        let many: Vec<&str> = many.iter().map(String::as_str).collect();
        profiles.push(profile(6, Some(3), &many, "Quito, Ecuador"));

        let f = facets(&profiles);
        assert_eq!(f.skills.len(), MAX_SKILL_FACETS);
        assert_eq!(f.skills[0].value, "Rust");
        assert!(f.skills.iter().skip(1).all(|c| c.count == 1));
    }

    #[test]
    fn test_location_and_availability_facets_rank_by_count_then_name() {
        let mut profiles = pool();
        profiles.push(profile(6, Some(2), &["Go"], "Lima, Peru"));
        profiles[0].availability = "immediate".to_string();
        profiles[1].availability = "one_month".to_string();

        let f = facets(&profiles);
        let locations: Vec<_> = f.locations.iter().map(|c| (c.value.as_str(), c.count)).collect();
        assert_eq!(
            locations,
            vec![
                ("Lima, Peru", 2),
                ("Bogotá, Colombia", 1),
                ("Buenos Aires, Argentina", 1),
                ("Medellín, Colombia", 1),
                ("São Paulo, Brazil", 1),
            ]
        );

        let availability: Vec<_> = f
            .availability
            .iter()
            .map(|c| (c.value.as_str(), c.count))
            .collect();
        assert_eq!(
            availability,
            vec![("two_weeks", 4), ("immediate", 1), ("one_month", 1)]
        );
    }
}
