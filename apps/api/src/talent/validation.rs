//! Join form rules. Mirrors what the browser checks, but this is the copy
//! that counts: every field error is reported at once.

use crate::errors::AppError;
use crate::forms::{Checker, DocumentKind, FormData, UploadedFile};
use crate::talent::fields::{normalize_skills, split_list, Availability, EnglishLevel};

pub const MAX_SKILLS: usize = 30;
pub const MAX_SKILL_LEN: usize = 40;
pub const MAX_SUMMARY_LEN: usize = 2000;

const CV_KINDS: [DocumentKind; 3] = [DocumentKind::Pdf, DocumentKind::Doc, DocumentKind::Docx];

/// A Join submission that passed validation. Contact details are still
/// present; this never leaves the submission path.
#[derive(Debug, Clone)]
pub struct CandidateSubmission {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub location: String,
    pub title: String,
    pub years_experience: Option<i32>,
    pub skills: Vec<String>,
    pub english_level: EnglishLevel,
    pub availability: Availability,
    pub salary_expectation_usd: Option<i32>,
    pub summary: Option<String>,
    pub cv: UploadedFile,
    pub cv_kind: DocumentKind,
}

pub fn validate_join_form(form: &FormData) -> Result<CandidateSubmission, AppError> {
    let mut check = Checker::default();

    let full_name = check.required(form, "full_name", 2, 100);
    let email = check.email(form, "email");
    let phone = check.phone(form, "phone");
    let linkedin_url = check.url(form, "linkedin_url", Some("linkedin.com"));
    let location = check.required(form, "location", 2, 100);
    let title = check.required(form, "title", 2, 100);
    let years_experience = check.int_in_range(form, "years_experience", 0, 50);
    let salary_expectation_usd = check.int_in_range(form, "salary_expectation_usd", 0, 1_000_000);
    let summary = check.optional(form, "summary", MAX_SUMMARY_LEN);

    let english_level = check.choice(
        form,
        "english_level",
        EnglishLevel::parse,
        &EnglishLevel::ALL.map(|l| l.as_str()),
    );
    let availability = check.choice(
        form,
        "availability",
        Availability::parse,
        &Availability::ALL.map(|a| a.as_str()),
    );

    // Accepts "Rust, Go" in one field as well as repeated `skills` parts.
    let skills = normalize_skills(form.all("skills").flat_map(split_list));
    if skills.is_empty() {
        check.fail("skills", "Add at least one skill");
    } else if skills.len() > MAX_SKILLS {
        check.fail("skills", format!("Add at most {MAX_SKILLS} skills"));
    }
    if let Some(long) = skills.iter().find(|s| s.chars().count() > MAX_SKILL_LEN) {
        check.fail(
            "skills",
            format!("Skill '{long}' is longer than {MAX_SKILL_LEN} characters"),
        );
    }

    check.accepted(
        form,
        "consent",
        "You must agree to have your anonymized profile shared with companies",
    );

    let cv = check.document(form, "cv", &CV_KINDS, true);

    check.finish()?;

    match (cv, english_level, availability) {
        (Some((cv, cv_kind)), Some(english_level), Some(availability)) => Ok(CandidateSubmission {
            full_name,
            email,
            phone,
            linkedin_url,
            location,
            title,
            years_experience,
            skills,
            english_level,
            availability,
            salary_expectation_usd,
            summary,
            cv,
            cv_kind,
        }),
        _ => Err(AppError::Validation("Incomplete submission".to_string())),
    }
}
