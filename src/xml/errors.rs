use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("malformed markup at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    #[error("mismatched end tag at byte {position}: expected </{expected}>, found </{found}>")]
    MismatchedEndTag {
        position: u64,
        expected: String,
        found: String,
    },

    #[error("unexpected end tag </{name}> at byte {position}")]
    UnexpectedEndTag { position: u64, name: String },

    #[error("unclosed element <{name}> at end of input")]
    UnclosedElement { name: String },

    #[error("document has no root element")]
    MissingRoot,

    #[error("unexpected content after root element at byte {position}")]
    TrailingContent { position: u64 },

    #[error("{path}: {source}")]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<XmlError>,
    },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl XmlError {
    /// Attach the source path to an error raised while parsing in-memory text.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            XmlError::Io { .. } | XmlError::InFile { .. } => self,
            other => XmlError::InFile {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("empty path query")]
    Empty,

    #[error("invalid path query '{input}': {message}")]
    Invalid { input: String, message: String },

    #[error("unsupported path query syntax in '{input}': {construct}")]
    Unsupported { input: String, construct: String },
}
