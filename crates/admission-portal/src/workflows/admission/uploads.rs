//! Document metadata and the external photo/signature check.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use mime::Mime;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{info, warn};

use super::domain::{ApplicantId, DocumentType, UploadRecord, WizardProgress};
use super::portal::PortalContext;
use super::repository::RepositoryError;
use super::status::{self, WorkflowError};
use super::validation::{self, ValidationErrors};

/// Answer printed by the verification command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationVerdict {
    pub success: bool,
    pub message: String,
}

impl VerificationVerdict {
    pub fn accepted() -> Self {
        Self {
            success: true,
            message: "Image accepted.".to_string(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("image verifier could not be started: {0}")]
    Spawn(#[from] std::io::Error),
}

#[async_trait]
pub trait ImageVerifier: Send + Sync {
    async fn verify(
        &self,
        storage_key: &str,
        document_type: &DocumentType,
    ) -> Result<VerificationVerdict, VerifierError>;
}

/// Used when no verification command is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllVerifier;

#[async_trait]
impl ImageVerifier for AcceptAllVerifier {
    async fn verify(
        &self,
        _storage_key: &str,
        _document_type: &DocumentType,
    ) -> Result<VerificationVerdict, VerifierError> {
        Ok(VerificationVerdict::accepted())
    }
}

/// Runs `<cmd> <storage_key> <document_type>` and reads a JSON verdict from stdout.
#[derive(Debug, Clone)]
pub struct CommandImageVerifier {
    program: String,
    args: Vec<String>,
}

impl CommandImageVerifier {
    /// `command` is split on whitespace; returns `None` when it is blank.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

#[async_trait]
impl ImageVerifier for CommandImageVerifier {
    async fn verify(
        &self,
        storage_key: &str,
        document_type: &DocumentType,
    ) -> Result<VerificationVerdict, VerifierError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(storage_key)
            .arg(document_type.as_str())
            .stdin(Stdio::null())
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        match serde_json::from_str::<VerificationVerdict>(stdout.trim()) {
            Ok(verdict) => Ok(verdict),
            Err(err) => {
                warn!(
                    program = %self.program,
                    exit_status = ?output.status.code(),
                    error = %err,
                    "image verifier produced unreadable output"
                );
                Ok(VerificationVerdict::rejected(
                    "Image verification failed. Please upload a clearer image.",
                ))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    #[serde(default)]
    pub document_type: String,
    #[serde(default)]
    pub storage_key: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredUpload {
    pub upload: UploadRecord,
    pub progress: WizardProgress,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("Document '{0}' has not been uploaded.")]
    NotFound(DocumentType),
    #[error(transparent)]
    Verifier(#[from] VerifierError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct UploadService {
    context: Arc<PortalContext>,
    verifier: Arc<dyn ImageVerifier>,
}

impl UploadService {
    pub fn new(context: Arc<PortalContext>, verifier: Arc<dyn ImageVerifier>) -> Self {
        Self { context, verifier }
    }

    pub fn list(
        &self,
        applicant_id: ApplicantId,
    ) -> Result<BTreeMap<DocumentType, UploadRecord>, UploadError> {
        Ok(self.context.load(applicant_id)?.form.uploads)
    }

    pub async fn store(
        &self,
        applicant_id: ApplicantId,
        request: UploadRequest,
    ) -> Result<StoredUpload, UploadError> {
        let record = self.context.load(applicant_id)?;
        status::ensure_editable(record.account.status)?;

        let document_type = DocumentType::new(&request.document_type);
        let mime_type = self.check_request(&document_type, &request)?;

        if document_type.requires_image_verification() {
            let verdict = self
                .verifier
                .verify(&request.storage_key, &document_type)
                .await?;
            if !verdict.success {
                info!(%applicant_id, %document_type, "upload rejected by image verifier");
                return Err(ValidationErrors::single("file", verdict.message).into());
            }
        }

        // the record may have moved on while the verifier ran
        let mut record = self.context.load(applicant_id)?;
        status::ensure_editable(record.account.status)?;

        let upload = UploadRecord {
            document_type: document_type.clone(),
            storage_key: request.storage_key,
            original_name: request.original_name,
            mime_type,
            file_size: request.file_size,
            uploaded_at: self.context.now(),
        };
        record.form.uploads.insert(document_type, upload.clone());
        let progress = record.form.progress();
        self.context.applicants.update(record)?;

        Ok(StoredUpload { upload, progress })
    }

    pub fn delete(
        &self,
        applicant_id: ApplicantId,
        document_type: &str,
    ) -> Result<WizardProgress, UploadError> {
        let mut record = self.context.load(applicant_id)?;
        status::ensure_editable(record.account.status)?;

        let document_type = DocumentType::new(document_type);
        if record.form.uploads.remove(&document_type).is_none() {
            return Err(UploadError::NotFound(document_type));
        }

        let progress = record.form.progress();
        self.context.applicants.update(record)?;
        Ok(progress)
    }

    fn check_request(
        &self,
        document_type: &DocumentType,
        request: &UploadRequest,
    ) -> Result<String, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::required_max(&mut errors, "document_type", document_type.as_str(), 50);
        validation::required_max(&mut errors, "storage_key", &request.storage_key, 255);
        validation::required_max(&mut errors, "original_name", &request.original_name, 255);

        let max_bytes = self.context.config.max_upload_bytes;
        if request.file_size == 0 {
            errors.add("file", "The uploaded file is empty.");
        } else if request.file_size > max_bytes {
            errors.add(
                "file",
                format!(
                    "The file may not be greater than {} kilobytes.",
                    max_bytes / 1024
                ),
            );
        }

        let declared = request
            .mime_type
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());
        let mime_type: Option<Mime> = match declared {
            Some(value) => value.parse().ok(),
            None => Some(mime_guess::from_path(&request.original_name).first_or_octet_stream()),
        };

        match &mime_type {
            None => errors.add("file", "The file type is not recognised."),
            Some(mime) if document_type.requires_image_verification() => {
                if mime.type_() != mime::IMAGE {
                    errors.add("file", format!("The {document_type} must be an image."));
                }
            }
            Some(_) => {}
        }

        errors.into_result()?;
        Ok(mime_type
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_default())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    /// `sh -c <script> verifier <storage_key> <document_type>`
    fn shell(script: &str) -> CommandImageVerifier {
        CommandImageVerifier {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string(), "verifier".to_string()],
        }
    }

    #[test]
    fn command_line_is_split_on_whitespace() {
        let verifier =
            CommandImageVerifier::from_command_line("  python3   verify.py --strict ")
                .expect("command parsed");
        assert_eq!(verifier.program, "python3");
        assert_eq!(verifier.args, vec!["verify.py", "--strict"]);
        assert!(CommandImageVerifier::from_command_line("   ").is_none());
    }

    #[tokio::test]
    async fn accepted_verdict_sees_key_and_document_type() {
        let verifier = shell(
            r#"printf '{"success": true, "message": "checked %s as %s"}' "$1" "$2""#,
        );

        let verdict = verifier
            .verify("uploads/7/photo.jpg", &DocumentType::new("Photo"))
            .await
            .expect("verifier runs");
        assert!(verdict.success);
        assert_eq!(verdict.message, "checked uploads/7/photo.jpg as photo");
    }

    #[tokio::test]
    async fn rejected_verdict_carries_the_message() {
        let verifier =
            shell(r#"echo '{"success": false, "message": "No face detected in the photo."}'"#);

        let verdict = verifier
            .verify("uploads/7/photo.jpg", &DocumentType::new(DocumentType::PHOTO))
            .await
            .expect("verifier runs");
        assert_eq!(
            verdict,
            VerificationVerdict::rejected("No face detected in the photo.")
        );
    }

    #[tokio::test]
    async fn unreadable_output_counts_as_rejection() {
        let verifier = shell("echo 'Traceback (most recent call last):'; exit 1");

        let verdict = verifier
            .verify("uploads/7/signature.png", &DocumentType::new(DocumentType::SIGNATURE))
            .await
            .expect("verifier runs");
        assert!(!verdict.success);
        assert_eq!(
            verdict.message,
            "Image verification failed. Please upload a clearer image."
        );
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let verifier = CommandImageVerifier::from_command_line("/nonexistent/image-check")
            .expect("command parsed");

        assert!(matches!(
            verifier
                .verify("uploads/7/photo.jpg", &DocumentType::new(DocumentType::PHOTO))
                .await,
            Err(VerifierError::Spawn(_))
        ));
    }
}
