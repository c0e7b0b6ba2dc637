use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("`{program}` failed: {detail}")]
    ExternalProcess { program: String, detail: String },
    #[error("malformed archive listing: {0}")]
    MalformedData(String),
    #[error("unable to parse timestamp `{input}` in either new or old format: {reason}")]
    TimestampParse { input: String, reason: String },
    #[error("{0}")]
    LifecycleMisuse(String),
}

impl MigrateError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ExternalProcess { .. } => "EXTERNAL_PROCESS_FAILED",
            Self::MalformedData(_) => "MALFORMED_DATA",
            Self::TimestampParse { .. } => "TIMESTAMP_PARSE_FAILED",
            Self::LifecycleMisuse(_) => "LIFECYCLE_MISUSE",
        }
    }
}
