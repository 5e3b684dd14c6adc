use thiserror::Error;

use crate::codec::{DecodeError, EncodeError};
use crate::export::ExportError;
use crate::section::SectionError;

/// Any failure surfaced by the [`crate::archive::Fpff`] handle.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Section(#[from] SectionError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl Error {
    /// Index of the section the failure concerns, if any.
    pub fn section_index(&self) -> Option<usize> {
        match self {
            Error::Section(SectionError::IndexOutOfRange { index, .. }) => Some(*index),
            Error::Decode(e) => e.section_index(),
            Error::Encode(EncodeError::PayloadTooLarge { index, .. }) => Some(*index),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
