//! Binary encoder/decoder between a [`Container`] and a byte stream.
//!
//! # Layout
//! The 24-byte [`Header`] is followed by `nsects` section records:
//!
//! | Size | Field                     |
//! |------|---------------------------|
//! | 4    | type tag (u32 LE)         |
//! | 4    | payload length (u32 LE)   |
//! | len  | payload bytes, verbatim   |
//!
//! The length precedes the payload so a reader can bound its read before
//! touching the data.  All integers are little-endian; no runtime
//! negotiation is ever performed.
//!
//! # Failure policy
//! `decode` returns either a fully populated container or an error, never a
//! partial container.  `write_file` stages the encoding in a temporary file
//! next to the destination and renames it into place, so the destination is
//! either fully replaced or left as it was.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::container::Container;
use crate::header::{Header, HEADER_SIZE, VERSION};
use crate::kind::SectionType;
use crate::section::{PayloadPolicy, Section, SectionError};

/// Bytes of per-section framing (tag + length).
pub const SECTION_HEADER_SIZE: usize = 8;

// Upper bound on the up-front `Vec` reservation; `nsects` is untrusted input.
const MAX_PREALLOC_SECTIONS: usize = 1024;

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed header: {0}")]
    MalformedHeader(&'static str),
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u32),
    #[error("Section {index}: invalid type tag {tag}")]
    InvalidType { index: usize, tag: u32 },
    /// Fewer bytes remain than section `index` declares (its 8-byte record
    /// header or its payload).
    #[error("Section {index}: truncated data, {declared} bytes declared but only {available} available")]
    TruncatedData { index: usize, declared: u64, available: u64 },
    #[error("Section {index}: {source}")]
    Section { index: usize, #[source] source: SectionError },
    #[error("{0} trailing bytes after the last section")]
    TrailingData(u64),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl DecodeError {
    /// Index of the offending section, when the error is tied to one.
    pub fn section_index(&self) -> Option<usize> {
        match self {
            DecodeError::InvalidType { index, .. }
            | DecodeError::TruncatedData { index, .. }
            | DecodeError::Section { index, .. } => Some(*index),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Section {index}: payload of {len} bytes exceeds the u32 length field")]
    PayloadTooLarge { index: usize, len: usize },
    #[error("{0} sections exceed the u32 section count")]
    TooManySections(usize),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Options ──────────────────────────────────────────────────────────────────

/// What to do with bytes found after the last declared section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailingBytes {
    /// Accept silently.
    Ignore,
    /// Accept, log a warning and report the count in [`Decoded`].
    #[default]
    Warn,
    /// Fail with [`DecodeError::TrailingData`].
    Reject,
}

/// Configuration for [`decode`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    pub policy:   PayloadPolicy,
    pub trailing: TrailingBytes,
}

/// Result of a successful decode.
#[derive(Debug)]
pub struct Decoded {
    pub container:      Container,
    /// Bytes present after the last declared section.
    pub trailing_bytes: u64,
}

// ── Encode ───────────────────────────────────────────────────────────────────

/// Exact encoded size of `container`.
pub fn encoded_len(container: &Container) -> u64 {
    HEADER_SIZE as u64
        + container
            .iter()
            .map(|s| (SECTION_HEADER_SIZE + s.len()) as u64)
            .sum::<u64>()
}

/// Serialize `container` into `writer`.  Size limits are checked before the
/// first byte is written.  Returns the number of bytes written.
pub fn encode<W: Write>(container: &Container, mut writer: W) -> Result<u64, EncodeError> {
    let nsects = u32::try_from(container.len())
        .map_err(|_| EncodeError::TooManySections(container.len()))?;
    if let Some((index, s)) = container
        .iter()
        .enumerate()
        .find(|(_, s)| u32::try_from(s.len()).is_err())
    {
        return Err(EncodeError::PayloadTooLarge { index, len: s.len() });
    }

    let header = Header {
        version:   VERSION,
        timestamp: container.timestamp,
        author:    container.author.clone(),
        nsects,
    };
    header.write(&mut writer)?;

    for section in container {
        writer.write_u32::<LittleEndian>(section.section_type().tag())?;
        writer.write_u32::<LittleEndian>(section.len() as u32)?;
        writer.write_all(section.data())?;
    }

    let written = encoded_len(container);
    debug!(sections = nsects, bytes = written, "encoded container");
    Ok(written)
}

pub fn encode_to_vec(container: &Container) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::with_capacity(encoded_len(container) as usize);
    encode(container, &mut buf)?;
    Ok(buf)
}

/// Encode `container` to `path`, replacing it atomically.
pub fn write_file<P: AsRef<Path>>(container: &Container, path: P) -> Result<(), EncodeError> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut staged = staging_file(dir, path)?;
    {
        let mut writer = BufWriter::new(staged.as_file_mut());
        encode(container, &mut writer)?;
        writer.flush()?;
    }
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| EncodeError::Io(e.error))?;

    debug!(path = %path.display(), sections = container.len(), "wrote container");
    Ok(())
}

/// Temporary file next to `path` carrying the permissions the final file
/// should have: the destination's own when it exists, otherwise the
/// umask-filtered default of a plain `File::create`.
fn staging_file(dir: &Path, path: &Path) -> io::Result<tempfile::NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".fpff");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let staged = builder.tempfile_in(dir)?;
    if let Ok(meta) = fs::metadata(path) {
        staged.as_file().set_permissions(meta.permissions())?;
    }
    Ok(staged)
}

// ── Decode ───────────────────────────────────────────────────────────────────

/// Deserialize a container from `reader`.
pub fn decode<R: Read>(mut reader: R, opts: &DecodeOptions) -> Result<Decoded, DecodeError> {
    let header = Header::read(&mut reader)?;
    let nsects = header.nsects as usize;

    let mut sections = Vec::with_capacity(nsects.min(MAX_PREALLOC_SECTIONS));
    for index in 0..nsects {
        sections.push(read_section(&mut reader, index, &opts.policy)?);
    }

    let trailing_bytes = io::copy(&mut reader, &mut io::sink())?;
    if trailing_bytes > 0 {
        match opts.trailing {
            TrailingBytes::Ignore => {}
            TrailingBytes::Warn => {
                warn!(trailing_bytes, "ignoring bytes after the last declared section");
            }
            TrailingBytes::Reject => return Err(DecodeError::TrailingData(trailing_bytes)),
        }
    }

    debug!(sections = nsects, trailing_bytes, "decoded container");
    Ok(Decoded {
        container: Container::from_parts(header.timestamp, header.author, sections),
        trailing_bytes,
    })
}

/// Decode with default options, discarding the trailing byte count.
pub fn decode_slice(bytes: &[u8]) -> Result<Container, DecodeError> {
    decode(bytes, &DecodeOptions::default()).map(|d| d.container)
}

pub fn read_file<P: AsRef<Path>>(path: P, opts: &DecodeOptions) -> Result<Decoded, DecodeError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let decoded = decode(BufReader::new(file), opts)?;
    debug!(path = %path.display(), sections = decoded.container.len(), "read container");
    Ok(decoded)
}

fn read_section<R: Read>(
    reader: &mut R,
    index:  usize,
    policy: &PayloadPolicy,
) -> Result<Section, DecodeError> {
    let mut record = [0u8; SECTION_HEADER_SIZE];
    let got = read_up_to(reader, &mut record)?;
    if got < SECTION_HEADER_SIZE {
        return Err(DecodeError::TruncatedData {
            index,
            declared:  SECTION_HEADER_SIZE as u64,
            available: got as u64,
        });
    }
    let tag = LittleEndian::read_u32(&record[0..4]);
    let len = LittleEndian::read_u32(&record[4..8]) as u64;

    let ty = SectionType::from_tag(tag).map_err(|_| DecodeError::InvalidType { index, tag })?;

    // Bounded read: a corrupt length never drives the allocation.
    let mut data = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut data)?;
    if (data.len() as u64) < len {
        return Err(DecodeError::TruncatedData {
            index,
            declared:  len,
            available: data.len() as u64,
        });
    }

    Section::with_policy(ty, data, policy).map_err(|source| DecodeError::Section { index, source })
}

/// Like `read_exact`, but reports how much was read instead of failing on EOF.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
