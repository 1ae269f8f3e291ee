//! Multipart form collection and the field rules shared by the Join and
//! hiring request forms.

use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::errors::{AppError, FieldError};

/// A file part of a multipart submission.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    /// As declared by the client. Logged only; `DocumentKind::detect` sniffs the bytes.
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Multipart body split into text fields (repeatable) and file parts.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, UploadedFile>,
}

impl FormData {
    pub fn insert_text(&mut self, name: &str, value: impl Into<String>) {
        self.fields
            .entry(name.to_string())
            .or_default()
            .push(value.into());
    }

    pub fn insert_file(&mut self, name: &str, file: UploadedFile) {
        self.files.insert(name.to_string(), file);
    }

    /// First value of a field, trimmed. Blank counts as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Every value of a repeatable field, in submission order.
    pub fn all(&self, name: &str) -> impl Iterator<Item = &str> {
        self.fields
            .get(name)
            .into_iter()
            .flat_map(|values| values.iter().map(String::as_str))
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }

    /// Drains a multipart body. A part with a file name is a file, anything
    /// else is text. Files over `max_file_bytes` are rejected outright.
    pub async fn from_multipart(
        mut multipart: Multipart,
        max_file_bytes: usize,
    ) -> Result<Self, AppError> {
        let mut form = FormData::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await?;
                    if bytes.is_empty() {
                        // Browsers send an empty part for an untouched file input.
                        continue;
                    }
                    if bytes.len() > max_file_bytes {
                        return Err(AppError::PayloadTooLarge(format!(
                            "File '{file_name}' exceeds the {} limit",
                            human_size(max_file_bytes)
                        )));
                    }
                    let file = UploadedFile {
                        file_name,
                        content_type,
                        bytes,
                    };
                    debug!(
                        field = %name,
                        file_name = %file.file_name,
                        content_type = ?file.content_type,
                        size = file.bytes.len(),
                        "Received file part"
                    );
                    form.insert_file(&name, file);
                }
                None => {
                    let value = field.text().await?;
                    form.insert_text(&name, value);
                }
            }
        }

        Ok(form)
    }
}

pub fn human_size(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MB", bytes / MIB)
    } else if bytes >= 1024 {
        format!("{} KB", bytes / 1024)
    } else {
        format!("{bytes} bytes")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Field rules
// ────────────────────────────────────────────────────────────────────────────

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("Valid email regex")
});

static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[\d\s().-]+$").expect("Valid phone regex"));

const PHONE_LEN: std::ops::RangeInclusive<usize> = 7..=20;

static HTTP_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://([a-z0-9-]+(\.[a-z0-9-]+)+)(:\d+)?(/[^\s]*)?$")
        .expect("Valid URL regex")
});

/// Collects field errors while a form is being checked.
#[derive(Debug, Default)]
pub struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    pub fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::InvalidFields(self.errors))
        }
    }

    /// Required text with a char-length range.
    pub fn required(&mut self, form: &FormData, field: &str, min: usize, max: usize) -> String {
        match form.text(field) {
            None => {
                self.fail(field, "This field is required");
                String::new()
            }
            Some(value) => {
                self.length(field, value, min, max);
                value.to_string()
            }
        }
    }

    /// Optional text capped at `max` chars.
    pub fn optional(&mut self, form: &FormData, field: &str, max: usize) -> Option<String> {
        let value = form.text(field)?;
        self.length(field, value, 0, max);
        Some(value.to_string())
    }

    fn length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min {
            self.fail(field, format!("Must be at least {min} characters"));
        } else if len > max {
            self.fail(field, format!("Must be at most {max} characters"));
        }
    }

    /// Required email, returned lower-cased.
    pub fn email(&mut self, form: &FormData, field: &str) -> String {
        let Some(value) = form.text(field) else {
            self.fail(field, "This field is required");
            return String::new();
        };
        if value.len() > 254 || !EMAIL.is_match(value) {
            self.fail(field, "Enter a valid email address");
        }
        value.to_lowercase()
    }

    pub fn phone(&mut self, form: &FormData, field: &str) -> Option<String> {
        let value = form.text(field)?;
        let digits = value.chars().filter(char::is_ascii_digit).count();
        if !PHONE.is_match(value) || !PHONE_LEN.contains(&value.chars().count()) || digits < 7 {
            self.fail(field, "Enter a valid phone number");
        }
        Some(value.to_string())
    }

    /// Optional http(s) URL. `host_suffix` restricts the host, e.g. `linkedin.com`.
    pub fn url(&mut self, form: &FormData, field: &str, host_suffix: Option<&str>) -> Option<String> {
        let value = form.text(field)?;
        match HTTP_URL.captures(value) {
            Some(caps) if value.len() <= 300 => {
                if let Some(suffix) = host_suffix {
                    let host = caps[1].to_ascii_lowercase();
                    if host != suffix && !host.ends_with(&format!(".{suffix}")) {
                        self.fail(field, format!("Must be a {suffix} URL"));
                    }
                }
            }
            _ => self.fail(field, "Enter a valid URL starting with http:// or https://"),
        }
        Some(value.to_string())
    }

    /// Optional integer within an inclusive range.
    pub fn int_in_range(&mut self, form: &FormData, field: &str, min: i32, max: i32) -> Option<i32> {
        let value = form.text(field)?;
        match value.parse::<i32>() {
            Ok(n) if (min..=max).contains(&n) => Some(n),
            _ => {
                self.fail(field, format!("Must be a whole number between {min} and {max}"));
                None
            }
        }
    }

    /// Required value from a closed set, via the vocabulary's `parse`.
    pub fn choice<T>(
        &mut self,
        form: &FormData,
        field: &str,
        parse: impl Fn(&str) -> Option<T>,
        allowed: &[&str],
    ) -> Option<T> {
        let Some(value) = form.text(field) else {
            self.fail(field, "This field is required");
            return None;
        };
        let parsed = parse(value);
        if parsed.is_none() {
            self.fail(field, format!("Must be one of: {}", allowed.join(", ")));
        }
        parsed
    }

    /// Checkbox semantics: `true`, `on`, `1`, `yes`.
    pub fn accepted(&mut self, form: &FormData, field: &str, message: &str) -> bool {
        let ok = form
            .text(field)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "on" | "1" | "yes"))
            .unwrap_or(false);
        if !ok {
            self.fail(field, message);
        }
        ok
    }

    /// Checks a file part by extension and sniffed content.
    pub fn document(
        &mut self,
        form: &FormData,
        field: &str,
        allowed: &[DocumentKind],
        required: bool,
    ) -> Option<(UploadedFile, DocumentKind)> {
        let Some(file) = form.file(field) else {
            if required {
                self.fail(field, "A file is required");
            }
            return None;
        };
        match DocumentKind::detect(file) {
            Some(kind) if allowed.contains(&kind) => Some((file.clone(), kind)),
            _ => {
                let names: Vec<_> = allowed.iter().map(|k| k.extension()).collect();
                self.fail(
                    field,
                    format!("Unsupported file type. Allowed: {}", names.join(", ")),
                );
                None
            }
        }
    }
}

/// Document formats accepted for CVs and job descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Doc,
    Docx,
    Txt,
}

const OLE_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

impl DocumentKind {
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Doc => "doc",
            DocumentKind::Docx => "docx",
            DocumentKind::Txt => "txt",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Doc => "application/msword",
            DocumentKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentKind::Txt => "text/plain; charset=utf-8",
        }
    }

    /// The extension picks the candidate kind; the bytes must agree with it.
    /// Client-declared content types are ignored.
    pub fn detect(file: &UploadedFile) -> Option<Self> {
        let ext = file.file_name.rsplit_once('.')?.1.to_ascii_lowercase();
        let sniffed = infer::get(&file.bytes).map(|t| t.mime_type());
        match ext.as_str() {
            "pdf" => (sniffed == Some("application/pdf")).then_some(DocumentKind::Pdf),
            "docx" => matches!(
                sniffed,
                Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
                    | Some("application/zip")
            )
            .then_some(DocumentKind::Docx),
            "doc" => (file.bytes.starts_with(&OLE_MAGIC)
                || sniffed == Some("application/msword"))
            .then_some(DocumentKind::Doc),
            "txt" => (sniffed.is_none() && std::str::from_utf8(&file.bytes).is_ok())
                .then_some(DocumentKind::Txt),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn pdf(name: &str) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: Some("application/pdf".to_string()),
            bytes: Bytes::from_static(b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog >>\nendobj\n%%EOF"),
        }
    }

    fn form(pairs: &[(&str, &str)]) -> FormData {
        let mut form = FormData::default();
        for (k, v) in pairs {
            form.insert_text(k, *v);
        }
        form
    }

    #[test]
    fn test_text_treats_blank_as_missing() {
        let f = form(&[("name", "   "), ("title", "  Engineer ")]);
        assert_eq!(f.text("name"), None);
        assert_eq!(f.text("title"), Some("Engineer"));
        assert_eq!(f.text("missing"), None);
    }

    #[test]
    fn test_repeated_fields_keep_order() {
        let f = form(&[("skills", "Rust"), ("skills", "Go")]);
        assert_eq!(f.all("skills").collect::<Vec<_>>(), vec!["Rust", "Go"]);
    }

    #[test]
    fn test_email_rules() {
        let mut c = Checker::default();
        assert_eq!(c.email(&form(&[("email", "Ana@Example.COM")]), "email"), "ana@example.com");
        c.email(&form(&[("email", "ana@example")]), "email");
        c.email(&form(&[("email", "not an email")]), "email");
        c.email(&form(&[]), "email");
        assert_eq!(c.errors.len(), 3);
    }

    #[test]
    fn test_phone_requires_seven_digits() {
        let mut c = Checker::default();
        assert!(c.phone(&form(&[("phone", "+57 (300) 123-4567")]), "phone").is_some());
        assert!(c.errors.is_empty());
        c.phone(&form(&[("phone", "12-34")]), "phone");
        c.phone(&form(&[("phone", "call me maybe")]), "phone");
        assert_eq!(c.errors.len(), 2);
    }

    #[test]
    fn test_phone_length_counts_the_plus_sign() {
        let mut c = Checker::default();
        c.phone(&form(&[("phone", "+1234567890123456789")]), "phone");
        assert!(c.errors.is_empty());

        c.phone(&form(&[("phone", "+12345678901234567890")]), "phone");
        c.phone(&form(&[("phone", "12 34+56 78")]), "phone");
        assert_eq!(c.errors.len(), 2);
    }

    #[test]
    fn test_url_host_suffix() {
        let mut c = Checker::default();
        c.url(&form(&[("li", "https://www.linkedin.com/in/ana")]), "li", Some("linkedin.com"));
        c.url(&form(&[("li", "https://linkedin.com/in/ana")]), "li", Some("linkedin.com"));
        assert!(c.errors.is_empty());

        c.url(&form(&[("li", "https://notlinkedin.com/in/ana")]), "li", Some("linkedin.com"));
        c.url(&form(&[("li", "linkedin.com/in/ana")]), "li", Some("linkedin.com"));
        assert_eq!(c.errors.len(), 2);
    }

    #[test]
    fn test_int_in_range() {
        let mut c = Checker::default();
        assert_eq!(c.int_in_range(&form(&[("y", "12")]), "y", 0, 50), Some(12));
        assert_eq!(c.int_in_range(&form(&[("y", "51")]), "y", 0, 50), None);
        assert_eq!(c.int_in_range(&form(&[("y", "2.5")]), "y", 0, 50), None);
        assert_eq!(c.int_in_range(&form(&[]), "y", 0, 50), None);
        assert_eq!(c.errors.len(), 2);
    }

    #[test]
    fn test_accepted_checkbox_values() {
        let mut c = Checker::default();
        assert!(c.accepted(&form(&[("consent", "on")]), "consent", "required"));
        assert!(c.accepted(&form(&[("consent", "TRUE")]), "consent", "required"));
        assert!(!c.accepted(&form(&[("consent", "false")]), "consent", "required"));
        assert_eq!(c.errors.len(), 1);
    }

    #[test]
    fn test_detect_pdf_by_content() {
        assert_eq!(DocumentKind::detect(&pdf("cv.PDF")), Some(DocumentKind::Pdf));

        let mut disguised = pdf("cv.pdf");
        disguised.bytes = Bytes::from_static(b"MZ\x90\x00 not a pdf at all");
        assert_eq!(DocumentKind::detect(&disguised), None);
    }

    #[test]
    fn test_detect_doc_by_ole_header() {
        let mut bytes = OLE_MAGIC.to_vec();
        bytes.extend_from_slice(&[0u8; 64]);
        let file = UploadedFile {
            file_name: "cv.doc".to_string(),
            content_type: None,
            bytes: Bytes::from(bytes),
        };
        assert_eq!(DocumentKind::detect(&file), Some(DocumentKind::Doc));
    }

    #[test]
    fn test_detect_txt_and_unknown_extension() {
        let txt = UploadedFile {
            file_name: "role.txt".to_string(),
            content_type: Some("text/plain".to_string()),
            bytes: Bytes::from_static(b"Senior Rust engineer, remote, LATAM time zones."),
        };
        assert_eq!(DocumentKind::detect(&txt), Some(DocumentKind::Txt));

        let mut exe = txt.clone();
        exe.file_name = "role.exe".to_string();
        assert_eq!(DocumentKind::detect(&exe), None);

        let mut no_ext = txt;
        no_ext.file_name = "README".to_string();
        assert_eq!(DocumentKind::detect(&no_ext), None);
    }

    #[test]
    fn test_document_rejects_disallowed_kind() {
        let mut f = FormData::default();
        f.insert_file(
            "cv",
            UploadedFile {
                file_name: "cv.txt".to_string(),
                content_type: None,
                bytes: Bytes::from_static(b"plain text cv"),
            },
        );
        let mut c = Checker::default();
        let allowed = [DocumentKind::Pdf, DocumentKind::Doc, DocumentKind::Docx];
        assert!(c.document(&f, "cv", &allowed, true).is_none());
        assert!(c.errors[0].message.contains("pdf, doc, docx"));
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(human_size(1536), "1 KB");
        assert_eq!(human_size(12), "12 bytes");
    }
}
