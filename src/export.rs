//! Materialise every section of a container as a standalone file.
//!
//! File names are `{prefix}{index}.{ext}`; the index is zero-padded to the
//! width of the largest index so a plain directory listing shows sections in
//! container order.  The extension comes from the section type's row in
//! [`crate::kind::TYPE_TABLE`].
//!
//! Export is best effort: every section is attempted, sections already
//! written are never rolled back, and the caller receives an
//! [`ExportReport`] naming each index that failed and why.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;
use tracing::{debug, warn};

use crate::container::Container;
use crate::kind::SectionType;
use crate::section::Section;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Export directory {path} unavailable: {source}")]
    DirectoryUnavailable { path: PathBuf, #[source] source: io::Error },
    #[error("File name {name} already used by section {first}")]
    NameCollision { name: String, first: usize },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("{} of {} sections failed to export", .0.failures.len(), .0.attempted())]
    Incomplete(ExportReport),
}

// ── Options ──────────────────────────────────────────────────────────────────

/// How section payloads are turned into file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportMode {
    /// Payload bytes verbatim.
    #[default]
    Raw,
    /// Structured sections rendered as readable text, text verbatim, media
    /// with its file signature restored when the payload lacks it.
    Rendered,
}

/// Configuration for [`Exporter`].
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub mode:   ExportMode,
    pub prefix: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            mode:   ExportMode::Raw,
            prefix: "section-".to_owned(),
        }
    }
}

// ── Report ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub index: usize,
    pub path:  PathBuf,
    pub bytes: u64,
}

#[derive(Debug)]
pub struct ExportFailure {
    pub index: usize,
    pub error: ExportError,
}

/// Outcome of one export batch.
#[derive(Debug, Default)]
pub struct ExportReport {
    pub directory: PathBuf,
    pub written:   Vec<ExportedFile>,
    pub failures:  Vec<ExportFailure>,
}

impl ExportReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.written.len() + self.failures.len()
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.index).collect()
    }

    /// `Ok` when every section was written, otherwise the report wrapped in
    /// [`ExportError::Incomplete`].
    pub fn into_result(self) -> Result<Self, ExportError> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(ExportError::Incomplete(self))
        }
    }
}

// ── Exporter ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Exporter {
    opts: ExportOptions,
}

impl Exporter {
    pub fn new(opts: ExportOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.opts
    }

    /// File name for the section at `index` in a container of `total` sections.
    pub fn file_name(&self, index: usize, total: usize, ty: SectionType) -> String {
        let width = digits(total.saturating_sub(1));
        let spec = ty.spec();
        let ext = match self.opts.mode {
            ExportMode::Raw      => spec.raw_ext,
            ExportMode::Rendered => spec.render_ext,
        };
        format!("{}{:0width$}.{}", self.opts.prefix, index, ext, width = width)
    }

    /// Contents written for `section`.
    pub fn contents(&self, section: &Section) -> Vec<u8> {
        match self.opts.mode {
            ExportMode::Raw      => section.data().to_vec(),
            ExportMode::Rendered => render(section),
        }
    }

    /// Write one file per section of `container` into `dir`, creating it if
    /// needed.  Only an unusable directory aborts the batch.
    pub fn export<P: AsRef<Path>>(
        &self,
        container: &Container,
        dir:       P,
    ) -> Result<ExportReport, ExportError> {
        let dir = dir.as_ref();
        prepare_dir(dir)?;

        let total = container.len();
        let mut report = ExportReport { directory: dir.to_owned(), ..ExportReport::default() };
        let mut claimed: HashMap<String, usize> = HashMap::with_capacity(total);

        for (index, section) in container.iter().enumerate() {
            let name = self.file_name(index, total, section.section_type());
            if let Some(&first) = claimed.get(&name) {
                report.failures.push(ExportFailure {
                    index,
                    error: ExportError::NameCollision { name, first },
                });
                continue;
            }
            claimed.insert(name.clone(), index);

            let path = dir.join(&name);
            let contents = self.contents(section);
            match write_file(&path, &contents) {
                Ok(()) => report.written.push(ExportedFile {
                    index,
                    path,
                    bytes: contents.len() as u64,
                }),
                Err(e) => report.failures.push(ExportFailure { index, error: ExportError::Io(e) }),
            }
        }

        for f in &report.failures {
            warn!(index = f.index, error = %f.error, "section export failed");
        }
        debug!(
            dir = %dir.display(),
            written = report.written.len(),
            failed = report.failures.len(),
            "exported container",
        );
        Ok(report)
    }
}

fn prepare_dir(dir: &Path) -> Result<(), ExportError> {
    let unavailable = |source: io::Error| ExportError::DirectoryUnavailable { path: dir.to_owned(), source };

    fs::create_dir_all(dir).map_err(unavailable)?;
    let meta = fs::metadata(dir).map_err(unavailable)?;
    if !meta.is_dir() {
        return Err(unavailable(io::Error::new(io::ErrorKind::Other, "not a directory")));
    }
    if meta.permissions().readonly() {
        return Err(unavailable(io::Error::new(io::ErrorKind::PermissionDenied, "directory is read-only")));
    }
    Ok(())
}

fn write_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut f = File::create(path)?;
    f.write_all(contents)?;
    f.flush()
}

fn digits(mut n: usize) -> usize {
    let mut d = 1;
    while n >= 10 {
        n /= 10;
        d += 1;
    }
    d
}

// ── Rendering ────────────────────────────────────────────────────────────────

fn render(section: &Section) -> Vec<u8> {
    let data = section.data();
    // Non-empty payloads already satisfy their type's length rule.
    if data.is_empty() {
        return Vec::new();
    }
    let text = match section.section_type() {
        SectionType::Words   => hex_groups(data, 4),
        SectionType::Dwords  => hex_groups(data, 8),
        SectionType::Doubles => data
            .chunks_exact(8)
            .map(|c| format_double(LittleEndian::read_f64(c)))
            .collect::<Vec<_>>()
            .join(", "),
        SectionType::Coord => format!(
            "LAT: {}\nLNG: {}",
            format_double(LittleEndian::read_f64(&data[0..8])),
            format_double(LittleEndian::read_f64(&data[8..16])),
        ),
        SectionType::Ref => format!("REF: {}", LittleEndian::read_u32(&data[0..4])),
        SectionType::Ascii | SectionType::Utf8 => return data.to_vec(),
        ty @ (SectionType::Png | SectionType::Gif87 | SectionType::Gif89) => {
            return with_signature(ty.spec().signature, data);
        }
    };
    text.into_bytes()
}

/// Media payloads may be stored with their file signature stripped.
fn with_signature(signature: &[u8], data: &[u8]) -> Vec<u8> {
    if data.starts_with(signature) {
        return data.to_vec();
    }
    let mut out = Vec::with_capacity(signature.len() + data.len());
    out.extend_from_slice(signature);
    out.extend_from_slice(data);
    out
}

/// Shortest round-trip form of `v`, spelled the way Python's `repr(float)`
/// spells it: `1.0`, `0.0001`, `1e-05`, `1e+16`, `nan`, `-inf`.
fn format_double(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_owned();
    }
    let sign = if v.is_sign_negative() { "-" } else { "" };
    if v.is_infinite() {
        return format!("{sign}inf");
    }

    let sci = format!("{:e}", v.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if !(-4..16).contains(&exp) {
        let exp_sign = if exp < 0 { '-' } else { '+' };
        return format!("{sign}{mantissa}e{exp_sign}{:02}", exp.unsigned_abs());
    }

    let digits: String = mantissa.chars().filter(|&c| c != '.').collect();
    if exp < 0 {
        let zeros = "0".repeat(exp.unsigned_abs() as usize - 1);
        return format!("{sign}0.{zeros}{digits}");
    }
    let int_len = exp as usize + 1;
    if digits.len() <= int_len {
        let zeros = "0".repeat(int_len - digits.len());
        format!("{sign}{digits}{zeros}.0")
    } else {
        format!("{sign}{}.{}", &digits[..int_len], &digits[int_len..])
    }
}

fn hex_groups(data: &[u8], width: usize) -> String {
    let mut out = String::with_capacity(data.len() * 2 + data.len() / width * 2);
    for (i, group) in data.chunks(width).enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        for b in group {
            let _ = write!(out, "{b:02x}");
        }
    }
    out
}
