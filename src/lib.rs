pub mod kind;
pub mod section;
pub mod container;
pub mod header;
pub mod codec;
pub mod export;
pub mod archive;
pub mod error;

pub use kind::{SectionType, TypeSpec, TYPE_TABLE};
pub use section::{PayloadPolicy, Section, SectionError};
pub use container::{Author, Container};
pub use codec::{decode, encode, DecodeError, DecodeOptions, Decoded, EncodeError, TrailingBytes};
pub use export::{ExportError, ExportMode, ExportOptions, ExportReport, Exporter};
pub use archive::{Fpff, FpffOptions};
pub use error::{Error, Result};
