use serde::{Deserialize, Serialize};

use super::messages::ParsedResume;

/// Fields a profile needs before it is considered complete
const MANDATORY_FIELDS: [&str; 3] = ["name", "email", "phone"];

/// Placeholder the parser emits for fields it could not extract
const NOT_FOUND: &str = "not found";

/// Flattened view of a parsed resume, used for display and candidate info
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub website: Option<String>,
    pub institutions: Vec<String>,
    pub companies: Vec<String>,
    pub projects: Vec<String>,
    pub skills: Vec<String>,
}

impl CandidateProfile {
    pub fn from_resume(resume: &ParsedResume) -> Self {
        let info = &resume.personal_info;

        Self {
            name: found(&info.name).unwrap_or_default(),
            email: found(&info.email).unwrap_or_default(),
            phone: found(&info.phone).unwrap_or_default(),
            linkedin: info.linkedin.as_deref().and_then(found),
            github: info.github.as_deref().and_then(found),
            website: info.website.as_deref().and_then(found),
            institutions: resume
                .education
                .iter()
                .map(|e| e.institution.clone())
                .collect(),
            companies: resume
                .experience
                .iter()
                .map(|e| e.company.clone())
                .collect(),
            projects: resume.projects.iter().map(|p| p.title.clone()).collect(),
            skills: resume.skills.flatten(),
        }
    }

    /// Mandatory fields (`name`, `email`, `phone`) that are still blank
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let values = [&self.name, &self.email, &self.phone];
        MANDATORY_FIELDS
            .into_iter()
            .zip(values)
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| field)
            .collect()
    }

    /// Name usable in the scoring payload, if the parser found one
    pub fn display_name(&self) -> Option<&str> {
        if self.name.is_empty() {
            None
        } else {
            Some(&self.name)
        }
    }
}

/// Candidate corrections to the contact details the parser extracted.
///
/// Absent fields are left alone; an empty link removes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub website: Option<String>,
}

impl ProfileUpdate {
    /// Write the corrections into the resume's personal info
    pub fn apply_to(&self, resume: &mut ParsedResume) {
        let info = &mut resume.personal_info;

        for (value, target) in [
            (&self.name, &mut info.name),
            (&self.email, &mut info.email),
            (&self.phone, &mut info.phone),
        ] {
            if let Some(value) = value {
                *target = value.trim().to_string();
            }
        }

        for (value, target) in [
            (&self.linkedin, &mut info.linkedin),
            (&self.github, &mut info.github),
            (&self.website, &mut info.website),
        ] {
            if let Some(value) = value {
                let value = value.trim();
                *target = (!value.is_empty()).then(|| value.to_string());
            }
        }
    }
}

fn found(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(NOT_FOUND) {
        None
    } else {
        Some(value.to_string())
    }
}
