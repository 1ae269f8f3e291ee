use crate::errors::AppError;
use crate::forms::{Checker, DocumentKind, FormData, UploadedFile};
use crate::talent::fields::split_list;
use crate::talent::seniority::SeniorityLevel;
use crate::talent::talent_id::parse_talent_id;

pub const MAX_TALENT_IDS: usize = 20;
pub const MAX_MESSAGE_LEN: usize = 4000;

const JD_KINDS: [DocumentKind; 4] = [
    DocumentKind::Pdf,
    DocumentKind::Doc,
    DocumentKind::Docx,
    DocumentKind::Txt,
];

#[derive(Debug, Clone)]
pub struct HiringRequestSubmission {
    pub company_name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub role_title: String,
    pub seniority: Option<SeniorityLevel>,
    /// Row ids parsed from the submitted Talent IDs, de-duplicated.
    pub talent_ids: Vec<i64>,
    pub message: Option<String>,
    pub job_description: Option<(UploadedFile, DocumentKind)>,
}

pub fn validate_hiring_request(form: &FormData) -> Result<HiringRequestSubmission, AppError> {
    let mut check = Checker::default();

    let company_name = check.required(form, "company_name", 2, 120);
    let contact_name = check.required(form, "contact_name", 2, 100);
    let email = check.email(form, "email");
    let phone = check.phone(form, "phone");
    let website = check.url(form, "website", None);
    let role_title = check.required(form, "role_title", 2, 120);
    let message = check.optional(form, "message", MAX_MESSAGE_LEN);

    let seniority = form.text("seniority").and_then(|raw| {
        let level = SeniorityLevel::parse(raw);
        if level.is_none() {
            check.fail("seniority", format!("Unknown seniority level '{raw}'"));
        }
        level
    });

    let mut talent_ids = Vec::new();
    for raw in form.all("talent_ids").flat_map(split_list) {
        match parse_talent_id(raw) {
            Some(id) if !talent_ids.contains(&id) => talent_ids.push(id),
            Some(_) => {}
            None => check.fail("talent_ids", format!("'{raw}' is not a valid talent id")),
        }
    }
    if talent_ids.len() > MAX_TALENT_IDS {
        check.fail(
            "talent_ids",
            format!("Select at most {MAX_TALENT_IDS} candidates per request"),
        );
    }

    let job_description = check.document(form, "job_description", &JD_KINDS, false);

    check.finish()?;

    Ok(HiringRequestSubmission {
        company_name,
        contact_name,
        email,
        phone,
        website,
        role_title,
        seniority,
        talent_ids,
        message,
        job_description,
    })
}
