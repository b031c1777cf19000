use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{file}:{line}:{column}: {message}")]
    Parse {
        file: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("failed to scan comments in {file}: {reason}")]
    CommentScan { file: String, reason: String },

    #[error("failed to print {file}: {reason}")]
    Print { file: String, reason: String },

    #[error("invalid probe function `{name}`: {source}")]
    InvalidProbe {
        name: String,
        #[source]
        source: syn::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Io(#[from] std::io::Error),
}
