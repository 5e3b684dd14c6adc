//! High-level [`Fpff`] handle: the primary embedding surface.
//!
//! ```no_run
//! use fpff::archive::Fpff;
//! use fpff::SectionType;
//!
//! // Write
//! let mut doc = Fpff::with_author("jasmaa")?;
//! doc.add(b"hello world".to_vec(), SectionType::Ascii)?;
//! doc.write("hello_world.fpff")?;
//!
//! // Read and export
//! let mut doc = Fpff::new();
//! doc.read("hello_world.fpff")?;
//! let report = doc.export("out/")?;
//! assert!(report.is_complete());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::Path;

use crate::codec::{self, DecodeOptions, TrailingBytes};
use crate::container::Container;
use crate::error::Result;
use crate::export::{ExportOptions, ExportReport, Exporter};
use crate::kind::SectionType;
use crate::section::{PayloadPolicy, Section};

// ── FpffOptions ──────────────────────────────────────────────────────────────

/// Configuration for [`Fpff::with_options`].
#[derive(Debug, Clone, Default)]
pub struct FpffOptions {
    /// Applied to sections created through the handle and on decode.
    pub policy:   PayloadPolicy,
    pub trailing: TrailingBytes,
    pub export:   ExportOptions,
}

impl FpffOptions {
    fn decode_options(&self) -> DecodeOptions {
        DecodeOptions { policy: self.policy, trailing: self.trailing }
    }
}

// ── Fpff ─────────────────────────────────────────────────────────────────────

/// An in-memory FPFF document plus the options used to build, persist and
/// export it.  Every `write`/`read`/`export` is a single file-scoped
/// operation; no file handle is held between calls.
#[derive(Debug, Clone, Default)]
pub struct Fpff {
    container: Container,
    opts:      FpffOptions,
}

impl Fpff {
    // ── Constructors ─────────────────────────────────────────────────────────

    pub fn new() -> Self {
        Self::with_options(FpffOptions::default())
    }

    pub fn with_author(author: &str) -> Result<Self> {
        Ok(Self {
            container: Container::with_author(author)?,
            opts:      FpffOptions::default(),
        })
    }

    pub fn with_options(opts: FpffOptions) -> Self {
        Self { container: Container::new(), opts }
    }

    /// Decode `path` into a new handle with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut doc = Self::new();
        doc.read(path)?;
        Ok(doc)
    }

    // ── Editing ──────────────────────────────────────────────────────────────

    /// Append a section.
    pub fn add(&mut self, data: impl Into<Vec<u8>>, ty: SectionType) -> Result<()> {
        self.container.add_with_policy(ty, data, &self.opts.policy)?;
        Ok(())
    }

    pub fn insert(&mut self, index: usize, data: impl Into<Vec<u8>>, ty: SectionType) -> Result<()> {
        let section = Section::with_policy(ty, data, &self.opts.policy)?;
        self.container.insert(index, section)?;
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Section> {
        Ok(self.container.remove(index)?)
    }

    // ── Persistence ──────────────────────────────────────────────────────────

    /// Encode the document to `path`, replacing it atomically.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        codec::write_file(&self.container, path)?;
        Ok(())
    }

    /// Replace the document with the contents of `path`.  On failure the
    /// current document is kept.  Returns the number of trailing bytes found
    /// after the last section.
    pub fn read<P: AsRef<Path>>(&mut self, path: P) -> Result<u64> {
        let decoded = codec::read_file(path, &self.opts.decode_options())?;
        self.container = decoded.container;
        Ok(decoded.trailing_bytes)
    }

    /// Write every section under `dir` as its own file.
    pub fn export<P: AsRef<Path>>(&self, dir: P) -> Result<ExportReport> {
        let exporter = Exporter::new(self.opts.export.clone());
        Ok(exporter.export(&self.container, dir)?)
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn container(&self) -> &Container { &self.container }

    pub fn container_mut(&mut self) -> &mut Container { &mut self.container }

    pub fn into_container(self) -> Container { self.container }

    pub fn options(&self) -> &FpffOptions { &self.opts }

    pub fn len(&self) -> usize { self.container.len() }

    pub fn is_empty(&self) -> bool { self.container.is_empty() }
}

impl From<Container> for Fpff {
    fn from(container: Container) -> Self {
        Self { container, opts: FpffOptions::default() }
    }
}
