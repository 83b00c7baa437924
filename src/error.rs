use crate::expense::ExpenseId;
use std::{io, path::PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("expense not found: {0}")]
    NotFound(ExpenseId),
    #[error("total is too large to compute")]
    Overflow,
    /// Backing file could not be read, parsed or written.
    #[error("expense file {}: {source}", path.display())]
    Persistence { path: PathBuf, source: io::Error },
    #[error("failed to export expenses to {}: {source}", path.display())]
    Export { path: PathBuf, source: csv::Error },
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn persistence(path: impl Into<PathBuf>, source: impl Into<io::Error>) -> Self {
        Self::Persistence {
            path: path.into(),
            source: source.into(),
        }
    }
}
