//! Error taxonomy for the importer

use std::collections::TryReserveError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ImportError>;

/// Coarse error class, for callers that branch on the kind of failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Archive,
    Format,
    Data,
    Allocation,
}

#[derive(Error, Debug)]
pub enum ImportError {
    /// The file is not a readable package, or a required member is missing or malformed
    #[error("archive error: {0}")]
    Archive(String),

    /// Malformed coordinate, numeric literal or missing required attribute
    #[error("format error: {0}")]
    Format(String),

    /// The sheet content cannot be turned into a dataset
    #[error("data error: {0}")]
    Data(String),

    #[error("allocation failed: {0}")]
    Allocation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl ImportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::Archive(_)
            | ImportError::Io(_)
            | ImportError::Zip(_)
            | ImportError::Xml(_) => ErrorKind::Archive,
            ImportError::Format(_) => ErrorKind::Format,
            ImportError::Data(_) => ErrorKind::Data,
            ImportError::Allocation(_) => ErrorKind::Allocation,
        }
    }

    pub(crate) fn archive(msg: impl Into<String>) -> Self {
        ImportError::Archive(msg.into())
    }

    pub(crate) fn format(msg: impl Into<String>) -> Self {
        ImportError::Format(msg.into())
    }

    pub(crate) fn data(msg: impl Into<String>) -> Self {
        ImportError::Data(msg.into())
    }
}

impl From<TryReserveError> for ImportError {
    fn from(err: TryReserveError) -> Self {
        ImportError::Allocation(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ImportError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        ImportError::Xml(err.into())
    }
}
