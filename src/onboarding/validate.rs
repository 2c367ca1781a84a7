//! Per-step input validation.
//!
//! Validators collect every violated field into a single `ValidationError`
//! before any persistence happens, so the client can fix the whole form at
//! once.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{FieldViolation, ValidationError};

/// Maximum accepted upload size (50 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex")
});

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://\S+$").expect("url regex"));

/// Founder step input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FounderInput {
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
}

/// Venture step input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VentureInput {
    pub name: String,
    pub industry: String,
    pub geography: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

/// Team member input (add/update).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberInput {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
}

struct Violations(Vec<FieldViolation>);

impl Violations {
    fn new() -> Self {
        Self(Vec::new())
    }

    fn require(&mut self, field: &'static str, value: &str) {
        if value.trim().is_empty() {
            self.0.push(FieldViolation {
                field,
                message: "must not be empty".into(),
            });
        }
    }

    fn check(&mut self, field: &'static str, ok: bool, message: &str) {
        if !ok {
            self.0.push(FieldViolation {
                field,
                message: message.into(),
            });
        }
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(self.0))
        }
    }
}

pub fn validate_founder(input: &FounderInput) -> Result<(), ValidationError> {
    let mut v = Violations::new();
    v.require("fullName", &input.full_name);
    v.require("email", &input.email);
    if !input.email.trim().is_empty() {
        v.check(
            "email",
            EMAIL_RE.is_match(input.email.trim()),
            "must be a valid email address",
        );
    }
    if let Some(url) = input.linkedin_url.as_deref() {
        v.check("linkedinUrl", URL_RE.is_match(url), "must be an http(s) URL");
    }
    v.finish()
}

pub fn validate_venture(input: &VentureInput) -> Result<(), ValidationError> {
    let mut v = Violations::new();
    v.require("name", &input.name);
    v.require("industry", &input.industry);
    v.require("geography", &input.geography);
    if let Some(url) = input.website.as_deref() {
        v.check("website", URL_RE.is_match(url), "must be an http(s) URL");
    }
    v.finish()
}

pub fn validate_team_member(input: &TeamMemberInput) -> Result<(), ValidationError> {
    let mut v = Violations::new();
    v.require("name", &input.name);
    v.require("role", &input.role);
    if let Some(email) = input.email.as_deref() {
        v.check(
            "email",
            EMAIL_RE.is_match(email.trim()),
            "must be a valid email address",
        );
    }
    v.finish()
}

pub fn validate_upload(file_name: &str, size_bytes: u64) -> Result<(), ValidationError> {
    let mut v = Violations::new();
    v.require("fileName", file_name);
    v.check("file", size_bytes > 0, "must not be empty");
    v.check(
        "file",
        size_bytes <= MAX_UPLOAD_BYTES,
        "exceeds the 50 MiB upload limit",
    );
    v.finish()
}
