use serde::Serialize;
use thiserror::Error;

/// Patterns (lowercase) that indicate sensitive data not safe for UI display.
/// Used by `contains_sensitive()` for case-insensitive matching.
pub(crate) const SENSITIVE_PATTERNS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "authorization:",
];

/// Returns true if the message contains any sensitive pattern (case-insensitive).
fn contains_sensitive(msg: &str) -> bool {
    let lower = msg.to_ascii_lowercase();
    SENSITIVE_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Sanitizes a message for UI display.
/// If sensitive content is detected, returns the fallback instead.
fn sanitize_message(msg: &str, fallback: &str) -> String {
    if contains_sensitive(msg) {
        fallback.into()
    } else {
        msg.to_string()
    }
}

/// User-friendly error presentation for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPresentation {
    pub title: String,
    pub message: String,
    pub action: Option<String>,
}

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum AppError {
    // ── File / CSV ────────────────────────────────────────────────────────────
    #[error("File is not valid UTF-8")]
    NotUtf8,

    #[error("Invalid CSV: {0}")]
    CsvInvalid(String),

    // ── Store ─────────────────────────────────────────────────────────────────
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    // ── Import Jobs ───────────────────────────────────────────────────────────
    #[error("Import job {job_id} is already {status}")]
    JobFinished { job_id: String, status: String },

    // ── Configuration ─────────────────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),

    // ── Generic fallback ──────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Converts the error into a user-friendly presentation suitable for UI display.
    /// Never leaks credentials or connection details.
    pub fn to_presentation(&self) -> ErrorPresentation {
        match self {
            // ── File / CSV ────────────────────────────────────────────────────
            AppError::NotUtf8 => ErrorPresentation {
                title: "Invalid File Encoding".into(),
                message: "The file must be UTF-8 encoded. Please re-save your file with UTF-8 encoding.".into(),
                action: Some("Convert file to UTF-8".into()),
            },

            AppError::CsvInvalid(msg) => ErrorPresentation {
                title: "Invalid CSV".into(),
                message: format!("The CSV file has a formatting problem: {}", msg),
                action: Some("Fix the CSV file and try again".into()),
            },

            // ── Store ─────────────────────────────────────────────────────────
            AppError::NotFound(msg) => ErrorPresentation {
                title: "Not Found".into(),
                message: sanitize_message(msg, "The requested record does not exist."),
                action: None,
            },

            AppError::Store(msg) => ErrorPresentation {
                title: "Database Error".into(),
                message: sanitize_message(msg, "The database rejected the request."),
                action: Some("Try again".into()),
            },

            // ── Import Jobs ───────────────────────────────────────────────────
            AppError::JobFinished { job_id: _, status } => ErrorPresentation {
                title: "Import Already Finished".into(),
                message: format!("This import has already {}.", status),
                action: Some("Start a new import".into()),
            },

            // ── Configuration ─────────────────────────────────────────────────
            AppError::Config(msg) => ErrorPresentation {
                title: "Configuration Problem".into(),
                message: sanitize_message(msg, "The import configuration is invalid."),
                action: Some("Check the configuration file".into()),
            },

            // ── Generic ───────────────────────────────────────────────────────
            AppError::Internal(_) => ErrorPresentation {
                title: "Unexpected Error".into(),
                message: "Something went wrong. Please try again.".into(),
                action: Some("Try again".into()),
            },
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_presentation().serialize(serializer)
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Store(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns all AppError variants for exhaustive testing.
    fn all_variants() -> Vec<AppError> {
        vec![
            AppError::NotUtf8,
            AppError::CsvInvalid("missing header".into()),
            AppError::NotFound("import job abc".into()),
            AppError::Store("UNIQUE constraint failed".into()),
            AppError::JobFinished {
                job_id: "abc".into(),
                status: "completed".into(),
            },
            AppError::Config("checkpoint_interval must be positive".into()),
            AppError::Internal("something broke".into()),
        ]
    }

    #[test]
    fn all_variants_have_nonempty_title_and_message() {
        for variant in all_variants() {
            let presentation = variant.to_presentation();
            assert!(
                !presentation.title.trim().is_empty(),
                "Empty title for {:?}",
                variant
            );
            assert!(
                !presentation.message.trim().is_empty(),
                "Empty message for {:?}",
                variant
            );
        }
    }

    #[test]
    fn csv_errors_suggest_fixing_the_file() {
        for variant in [AppError::NotUtf8, AppError::CsvInvalid("no header".into())] {
            let action = variant
                .to_presentation()
                .action
                .expect("CSV errors should have an action");
            assert!(!action.trim().is_empty());
        }
    }

    #[test]
    fn serialization_produces_presentation_fields() {
        for variant in all_variants() {
            let json = serde_json::to_value(&variant).expect("serialize");
            assert!(json.get("title").is_some(), "{:?} missing title", variant);
            assert!(json.get("message").is_some(), "{:?} missing message", variant);
            assert!(json.get("action").is_some(), "{:?} missing action", variant);
        }
    }

    #[test]
    fn no_secret_leakage_in_presentation() {
        let test_cases: Vec<(&str, AppError)> = vec![
            ("Store", AppError::Store("auth failed for password=hunter2".into())),
            ("NotFound", AppError::NotFound("token abc123 not found".into())),
            ("Config", AppError::Config("secret key missing".into())),
            ("Internal", AppError::Internal("authorization: Basic xyz".into())),
        ];

        for (label, variant) in test_cases {
            let presentation = variant.to_presentation();
            let output_lower = format!(
                "{} {} {}",
                presentation.title,
                presentation.message,
                presentation.action.as_deref().unwrap_or("")
            )
            .to_ascii_lowercase();

            for pattern in SENSITIVE_PATTERNS {
                assert!(
                    !output_lower.contains(pattern),
                    "{} presentation contains sensitive pattern",
                    label
                );
            }
        }
    }

    #[test]
    fn rusqlite_errors_map_to_store() {
        let err: AppError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, AppError::Store(_)));
    }
}
