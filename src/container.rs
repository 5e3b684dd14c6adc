//! The ordered section container and its file metadata.
//!
//! ```
//! use fpff::{Container, SectionType};
//!
//! let mut doc = Container::with_author("jasmaa")?;
//! doc.add(SectionType::Ascii, b"hello world".to_vec())?;
//! assert_eq!(doc.len(), 1);
//! assert_eq!(doc.at(0)?.data(), b"hello world");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use chrono::Utc;

use crate::header::{AUTHOR_LEN, VERSION};
use crate::kind::SectionType;
use crate::section::{PayloadPolicy, Section, SectionError};

// ── Author ───────────────────────────────────────────────────────────────────

/// Creator name stored in the header: up to 8 ASCII bytes, no NUL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Author(String);

impl Author {
    pub fn new(name: &str) -> Result<Self, SectionError> {
        if name.len() > AUTHOR_LEN || !name.is_ascii() || name.contains('\0') {
            return Err(SectionError::InvalidAuthor(name.to_owned()));
        }
        Ok(Self(name.to_owned()))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl std::fmt::Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Container ────────────────────────────────────────────────────────────────

/// An FPFF document: metadata plus an ordered list of sections.
///
/// Order is insertion order and survives a write/read round-trip.  Sections
/// need not be unique.  The only mutations are [`append`](Self::append),
/// [`insert`](Self::insert) and [`remove`](Self::remove); a failed mutation
/// leaves the container untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    /// Seconds since the Unix epoch.
    pub timestamp: u32,
    pub author:    Author,
    sections:      Vec<Section>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Empty container stamped with the current time.
    pub fn new() -> Self {
        Self {
            timestamp: u32::try_from(Utc::now().timestamp()).unwrap_or(0),
            author:    Author::default(),
            sections:  Vec::new(),
        }
    }

    pub fn with_author(author: &str) -> Result<Self, SectionError> {
        let mut c = Self::new();
        c.author = Author::new(author)?;
        Ok(c)
    }

    /// Assemble a container from already-validated parts (used by the decoder).
    pub(crate) fn from_parts(timestamp: u32, author: Author, sections: Vec<Section>) -> Self {
        Self { timestamp, author, sections }
    }

    /// Format revision this container is written as.
    pub fn version(&self) -> u32 { VERSION }

    // ── Mutation ─────────────────────────────────────────────────────────────

    pub fn append(&mut self, section: Section) {
        self.sections.push(section);
    }

    /// Create a section under the default policy and append it.
    pub fn add(&mut self, ty: SectionType, data: impl Into<Vec<u8>>) -> Result<(), SectionError> {
        self.add_with_policy(ty, data, &PayloadPolicy::default())
    }

    pub fn add_with_policy(
        &mut self,
        ty:     SectionType,
        data:   impl Into<Vec<u8>>,
        policy: &PayloadPolicy,
    ) -> Result<(), SectionError> {
        self.append(Section::with_policy(ty, data, policy)?);
        Ok(())
    }

    /// Insert at `index` (`0..=len`), shifting later sections back by one.
    pub fn insert(&mut self, index: usize, section: Section) -> Result<(), SectionError> {
        if index > self.sections.len() {
            return Err(self.out_of_range(index));
        }
        self.sections.insert(index, section);
        Ok(())
    }

    /// Remove and return the section at `index` (`0..len`).
    pub fn remove(&mut self, index: usize) -> Result<Section, SectionError> {
        if index >= self.sections.len() {
            return Err(self.out_of_range(index));
        }
        Ok(self.sections.remove(index))
    }

    // ── Access ───────────────────────────────────────────────────────────────

    pub fn len(&self) -> usize { self.sections.len() }

    pub fn is_empty(&self) -> bool { self.sections.is_empty() }

    pub fn at(&self, index: usize) -> Result<&Section, SectionError> {
        self.sections.get(index).ok_or_else(|| self.out_of_range(index))
    }

    pub fn sections(&self) -> &[Section] { &self.sections }

    pub fn iter(&self) -> std::slice::Iter<'_, Section> { self.sections.iter() }

    fn out_of_range(&self, index: usize) -> SectionError {
        SectionError::IndexOutOfRange { index, len: self.sections.len() }
    }
}

impl<'a> IntoIterator for &'a Container {
    type Item     = &'a Section;
    type IntoIter = std::slice::Iter<'a, Section>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
