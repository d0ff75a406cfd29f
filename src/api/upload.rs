use std::path::Path;
use thiserror::Error;

/// Largest resume accepted for parsing (exclusive)
pub const MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;

const PDF_MIME: &str = "application/pdf";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("Please upload only PDF or DOCX files (got {0})")]
    UnsupportedType(String),

    #[error("File must be smaller than 5MB (got {size} bytes)")]
    TooLarge { size: usize },

    #[error("Resume file is empty")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeFormat {
    Pdf,
    Docx,
}

impl ResumeFormat {
    pub fn mime(self) -> &'static str {
        match self {
            ResumeFormat::Pdf => PDF_MIME,
            ResumeFormat::Docx => DOCX_MIME,
        }
    }

    fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        if essence.eq_ignore_ascii_case(PDF_MIME) {
            Some(ResumeFormat::Pdf)
        } else if essence.eq_ignore_ascii_case(DOCX_MIME) {
            Some(ResumeFormat::Docx)
        } else {
            None
        }
    }

    fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("pdf") {
            Some(ResumeFormat::Pdf)
        } else if ext.eq_ignore_ascii_case("docx") {
            Some(ResumeFormat::Docx)
        } else {
            None
        }
    }
}

/// A resume file that passed the type and size checks
#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub file_name: String,
    pub format: ResumeFormat,
    pub bytes: Vec<u8>,
}

impl ResumeUpload {
    /// Validate an uploaded file.
    ///
    /// A declared content type decides the format; without one (or with a
    /// generic `application/octet-stream`) the file extension does.
    pub fn new(
        file_name: impl Into<String>,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Self, UploadError> {
        let file_name = file_name.into();

        let format = match content_type.filter(|ct| !is_generic(ct)) {
            Some(ct) => ResumeFormat::from_mime(ct)
                .ok_or_else(|| UploadError::UnsupportedType(ct.to_string()))?,
            None => ResumeFormat::from_file_name(&file_name)
                .ok_or_else(|| UploadError::UnsupportedType(file_name.clone()))?,
        };

        check_size(bytes.len())?;

        Ok(Self {
            file_name,
            format,
            bytes,
        })
    }

    /// Read and validate a resume from disk
    pub async fn from_path(path: &Path) -> Result<Self, super::ApiError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "resume".to_string());

        // Refuse oversized files before reading them
        let size = tokio::fs::metadata(path).await?.len();
        check_size(usize::try_from(size).unwrap_or(usize::MAX))?;

        let bytes = tokio::fs::read(path).await?;
        Ok(Self::new(file_name, None, bytes)?)
    }
}

fn is_generic(content_type: &str) -> bool {
    content_type.trim().is_empty() || content_type.starts_with("application/octet-stream")
}

fn check_size(size: usize) -> Result<(), UploadError> {
    if size == 0 {
        return Err(UploadError::Empty);
    }
    if size >= MAX_RESUME_BYTES {
        return Err(UploadError::TooLarge { size });
    }
    Ok(())
}
