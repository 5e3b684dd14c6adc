//! Section type registry: frozen on-disk tags + per-type behaviour table.
//!
//! # Identity rules
//! Every section type is identified on disk by a little-endian `u32` tag.
//! Tags are permanent; a tag is never reused or renumbered.  A decoder that
//! meets a tag it does not know MUST fail with `InvalidType` rather than
//! guess at the payload.
//!
//! All type-specific behaviour (export extension, whether the payload is
//! media, which payload lengths are legal) lives in [`TYPE_TABLE`].  The codec
//! and the exporter look types up here instead of matching on them.

use serde::Serialize;

use crate::section::SectionError;

// ── SectionType ──────────────────────────────────────────────────────────────

/// Closed set of payload kinds a section may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum SectionType {
    Ascii   = 1,
    Utf8    = 2,
    Words   = 3,
    Dwords  = 4,
    Doubles = 5,
    Coord   = 6,
    Ref     = 7,
    Png     = 8,
    Gif87   = 9,
    Gif89   = 10,
}

/// Broad payload family, used by [`crate::section::PayloadPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Human-readable text (ASCII, UTF-8).
    Text,
    /// Fixed-width numeric records (words, doubles, coordinates, refs).
    Structured,
    /// Opaque image payloads.
    Media,
}

/// Which payload lengths a type accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthRule {
    Any,
    MultipleOf(usize),
    Exactly(usize),
}

impl LengthRule {
    pub fn admits(self, len: usize) -> bool {
        match self {
            LengthRule::Any           => true,
            LengthRule::MultipleOf(n) => len % n == 0,
            LengthRule::Exactly(n)    => len == n,
        }
    }
}

/// Which byte sequences a text type accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRule {
    None,
    Ascii,
    Utf8,
}

impl TextRule {
    pub fn admits(self, data: &[u8]) -> bool {
        match self {
            TextRule::None  => true,
            TextRule::Ascii => data.is_ascii(),
            TextRule::Utf8  => std::str::from_utf8(data).is_ok(),
        }
    }
}

/// One row of the type table.
#[derive(Debug, Clone, Copy)]
pub struct TypeSpec {
    pub ty:          SectionType,
    pub name:        &'static str,
    pub family:      Family,
    pub length:      LengthRule,
    pub text:        TextRule,
    /// Extension used when the payload is exported verbatim.
    pub raw_ext:     &'static str,
    /// Extension used by rendered export.
    pub render_ext:  &'static str,
    /// File signature rendered export puts back in front of a payload that
    /// was stored without it.
    pub signature:   &'static [u8],
}

const PNG_SIGNATURE:   &[u8] = b"\x89PNG\r\n\x1a\n";
const GIF87_SIGNATURE: &[u8] = b"GIF87a";
const GIF89_SIGNATURE: &[u8] = b"GIF89a";

// Order matches tag order; `spec()` indexes by `tag - 1`.
pub static TYPE_TABLE: [TypeSpec; 10] = [
    TypeSpec { ty: SectionType::Ascii,   name: "ascii",   family: Family::Text,       length: LengthRule::Any,           text: TextRule::Ascii, raw_ext: "txt", render_ext: "txt", signature: &[] },
    TypeSpec { ty: SectionType::Utf8,    name: "utf8",    family: Family::Text,       length: LengthRule::Any,           text: TextRule::Utf8,  raw_ext: "txt", render_ext: "txt", signature: &[] },
    TypeSpec { ty: SectionType::Words,   name: "words",   family: Family::Structured, length: LengthRule::MultipleOf(4), text: TextRule::None,  raw_ext: "bin", render_ext: "txt", signature: &[] },
    TypeSpec { ty: SectionType::Dwords,  name: "dwords",  family: Family::Structured, length: LengthRule::MultipleOf(8), text: TextRule::None,  raw_ext: "bin", render_ext: "txt", signature: &[] },
    TypeSpec { ty: SectionType::Doubles, name: "doubles", family: Family::Structured, length: LengthRule::MultipleOf(8), text: TextRule::None,  raw_ext: "bin", render_ext: "txt", signature: &[] },
    TypeSpec { ty: SectionType::Coord,   name: "coord",   family: Family::Structured, length: LengthRule::Exactly(16),   text: TextRule::None,  raw_ext: "bin", render_ext: "txt", signature: &[] },
    TypeSpec { ty: SectionType::Ref,     name: "ref",     family: Family::Structured, length: LengthRule::Exactly(4),    text: TextRule::None,  raw_ext: "bin", render_ext: "txt", signature: &[] },
    TypeSpec { ty: SectionType::Png,     name: "png",     family: Family::Media,      length: LengthRule::Any,           text: TextRule::None,  raw_ext: "png", render_ext: "png", signature: PNG_SIGNATURE },
    TypeSpec { ty: SectionType::Gif87,   name: "gif87",   family: Family::Media,      length: LengthRule::Any,           text: TextRule::None,  raw_ext: "gif", render_ext: "gif", signature: GIF87_SIGNATURE },
    TypeSpec { ty: SectionType::Gif89,   name: "gif89",   family: Family::Media,      length: LengthRule::Any,           text: TextRule::None,  raw_ext: "gif", render_ext: "gif", signature: GIF89_SIGNATURE },
];

impl SectionType {
    /// Every section type, in tag order.
    pub const ALL: [SectionType; 10] = [
        SectionType::Ascii,
        SectionType::Utf8,
        SectionType::Words,
        SectionType::Dwords,
        SectionType::Doubles,
        SectionType::Coord,
        SectionType::Ref,
        SectionType::Png,
        SectionType::Gif87,
        SectionType::Gif89,
    ];

    /// The frozen on-disk tag.
    #[inline]
    pub fn tag(self) -> u32 {
        self as u32
    }

    /// Resolve an on-disk tag.
    pub fn from_tag(tag: u32) -> Result<Self, SectionError> {
        TYPE_TABLE
            .iter()
            .find(|s| s.ty.tag() == tag)
            .map(|s| s.ty)
            .ok_or(SectionError::InvalidType(tag))
    }

    /// Table row for this type.
    #[inline]
    pub fn spec(self) -> &'static TypeSpec {
        &TYPE_TABLE[self.tag() as usize - 1]
    }

    /// Human-readable name (also accepted by [`SectionType::from_name`]).
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Parse from a CLI string.
    pub fn from_name(s: &str) -> Option<Self> {
        let s = s.to_lowercase();
        TYPE_TABLE.iter().find(|spec| spec.name == s).map(|spec| spec.ty)
    }

    pub fn family(self) -> Family {
        self.spec().family
    }

    pub fn is_media(self) -> bool {
        self.family() == Family::Media
    }
}

impl std::fmt::Display for SectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
