//! Immutable typed sections and the payload policy that admits them.

use thiserror::Error;

use crate::kind::{Family, SectionType};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SectionError {
    #[error("Invalid section type tag: {0}")]
    InvalidType(u32),
    #[error("Empty payload not allowed for {0} sections")]
    EmptyPayload(SectionType),
    #[error("Payload length {len} is not valid for {ty} sections")]
    InvalidLength { ty: SectionType, len: usize },
    #[error("Payload is not valid {0} text")]
    InvalidText(SectionType),
    #[error("Index {index} out of range for container of {len} sections")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Author must be at most 8 ASCII bytes without NUL: {0:?}")]
    InvalidAuthor(String),
}

// ── PayloadPolicy ────────────────────────────────────────────────────────────

/// Which payload families may be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadPolicy {
    pub allow_empty_text:       bool,
    pub allow_empty_structured: bool,
    pub allow_empty_media:      bool,
}

impl Default for PayloadPolicy {
    fn default() -> Self {
        Self {
            allow_empty_text:       true,
            allow_empty_structured: false,
            allow_empty_media:      false,
        }
    }
}

impl PayloadPolicy {
    /// Accept empty payloads for every type.
    pub fn permissive() -> Self {
        Self {
            allow_empty_text:       true,
            allow_empty_structured: true,
            allow_empty_media:      true,
        }
    }

    pub fn allows_empty(&self, ty: SectionType) -> bool {
        match ty.family() {
            Family::Text       => self.allow_empty_text,
            Family::Structured => self.allow_empty_structured,
            Family::Media      => self.allow_empty_media,
        }
    }

    /// Check `data` against the rules for `ty`.
    pub fn check(&self, ty: SectionType, data: &[u8]) -> Result<(), SectionError> {
        if data.is_empty() {
            return if self.allows_empty(ty) {
                Ok(())
            } else {
                Err(SectionError::EmptyPayload(ty))
            };
        }
        let spec = ty.spec();
        if !spec.length.admits(data.len()) {
            return Err(SectionError::InvalidLength { ty, len: data.len() });
        }
        if !spec.text.admits(data) {
            return Err(SectionError::InvalidText(ty));
        }
        Ok(())
    }
}

// ── Section ──────────────────────────────────────────────────────────────────

/// One typed payload.  Type and data are fixed at construction; replacing a
/// section's content means replacing the section.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Section {
    ty:   SectionType,
    data: Vec<u8>,
}

impl Section {
    /// Build a section under the default [`PayloadPolicy`].
    pub fn new(ty: SectionType, data: impl Into<Vec<u8>>) -> Result<Self, SectionError> {
        Self::with_policy(ty, data, &PayloadPolicy::default())
    }

    pub fn with_policy(
        ty:     SectionType,
        data:   impl Into<Vec<u8>>,
        policy: &PayloadPolicy,
    ) -> Result<Self, SectionError> {
        let data = data.into();
        policy.check(ty, &data)?;
        Ok(Self { ty, data })
    }

    /// Build a section from a raw on-disk tag.
    pub fn from_tag(
        tag:    u32,
        data:   impl Into<Vec<u8>>,
        policy: &PayloadPolicy,
    ) -> Result<Self, SectionError> {
        Self::with_policy(SectionType::from_tag(tag)?, data, policy)
    }

    pub fn section_type(&self) -> SectionType { self.ty }

    pub fn data(&self) -> &[u8] { &self.data }

    pub fn len(&self) -> usize { self.data.len() }

    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    pub fn into_data(self) -> Vec<u8> { self.data }
}
