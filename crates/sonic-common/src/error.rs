use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("scan failed in {database} for {pattern}: {reason}")]
    ScanFailed {
        database: String,
        pattern: String,
        reason: String,
    },
    #[error("unknown database: {0}")]
    UnknownDatabase(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("label arity mismatch for {metric}: expected {expected}, got {actual}")]
    LabelArity {
        metric: String,
        expected: usize,
        actual: usize,
    },
    #[error("{domain} {stage} collection failed: {source}")]
    Collection {
        domain: &'static str,
        stage: &'static str,
        #[source]
        source: Box<ExporterError>,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ExporterError {
    pub fn collection(domain: &'static str, stage: &'static str, source: ExporterError) -> Self {
        Self::Collection {
            domain,
            stage,
            source: Box::new(source),
        }
    }

    /// Short machine-readable kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::ScanFailed { .. } => "scan_failed",
            Self::UnknownDatabase(_) | Self::Config(_) => "config",
            Self::LabelArity { .. } => "label_arity",
            Self::Collection { source, .. } => source.kind(),
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, ExporterError>;
