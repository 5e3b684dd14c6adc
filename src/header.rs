//! Fixed 24-byte file header.
//!
//! | Offset | Size | Field                                        |
//! |--------|------|----------------------------------------------|
//! | 0      | 4    | magic, on-disk bytes `DE DA FE BE`           |
//! | 4      | 4    | format version (u32 LE, always 1)            |
//! | 8      | 4    | creation timestamp (u32 LE, Unix seconds)    |
//! | 12     | 8    | author, ASCII stored byte-reversed, NUL pad  |
//! | 20     | 4    | section count (u32 LE)                       |

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::codec::DecodeError;
use crate::container::Author;

pub const MAGIC:       [u8; 4] = [0xDE, 0xDA, 0xFE, 0xBE];
pub const VERSION:     u32     = 1;
pub const HEADER_SIZE: usize   = 24;
pub const AUTHOR_LEN:  usize   = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version:   u32,
    pub timestamp: u32,
    pub author:    Author,
    pub nsects:    u32,
}

impl Header {
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_u32::<LittleEndian>(self.timestamp)?;
        writer.write_all(&encode_author(&self.author))?;
        writer.write_u32::<LittleEndian>(self.nsects)?;
        Ok(())
    }

    pub fn read<R: Read>(mut reader: R) -> Result<Self, DecodeError> {
        let mut buf = [0u8; HEADER_SIZE];
        reader.read_exact(&mut buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => DecodeError::MalformedHeader("file shorter than header"),
            _ => DecodeError::Io(e),
        })?;
        if buf[0..4] != MAGIC {
            return Err(DecodeError::MalformedHeader("magic did not match"));
        }
        let version = LittleEndian::read_u32(&buf[4..8]);
        if version != VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }
        let author = decode_author(&buf[12..20])
            .ok_or(DecodeError::MalformedHeader("author is not ASCII"))?;
        Ok(Self {
            version,
            timestamp: LittleEndian::read_u32(&buf[8..12]),
            author,
            nsects:    LittleEndian::read_u32(&buf[20..24]),
        })
    }
}

fn encode_author(author: &Author) -> [u8; AUTHOR_LEN] {
    let mut out = [0u8; AUTHOR_LEN];
    for (slot, b) in out.iter_mut().zip(author.as_str().bytes().rev()) {
        *slot = b;
    }
    out
}

fn decode_author(raw: &[u8]) -> Option<Author> {
    let bytes: Vec<u8> = raw.iter().rev().copied().filter(|&b| b != 0).collect();
    let name = std::str::from_utf8(&bytes).ok()?;
    Author::new(name).ok()
}
