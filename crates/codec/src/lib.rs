//! # Codec - fixed-width record encoding
//!
//! Every value the store persists in binary form has a width that is known
//! before the bytes are read: a timestamp is always 8 bytes, a count or offset
//! always 4, a spectrum sweep always `N` bytes for the lifetime of its stream.
//! A [`Codec`] describes one such shape, and [`read`] / [`write`] move a single
//! value between that shape and a byte stream.
//!
//! ## Byte order
//!
//! All multi-byte values are **little-endian**, independent of the host.
//!
//! ```text
//! Timestamp   [u64 LE]            8 bytes
//! Word        [u32 LE]            4 bytes
//! Float       [f32 LE]            4 bytes
//! IndexEntry  [u64 LE][u32 LE]   12 bytes   (timestamp, byte offset)
//! Levels(N)   [i8; N]             N bytes
//! ```
//!
//! ## End of data
//!
//! [`read`] returns `Ok(None)` when fewer than `width` bytes remain, including
//! zero. Streams are scanned until the first absent value, so a trailing
//! record that was only partly written before a crash simply ends the scan.
//!
//! ## Example
//!
//! ```rust
//! use codec::{read, write, Timestamp};
//! use std::io::Cursor;
//!
//! let mut buf = Vec::new();
//! write(&Timestamp, &mut buf, &1066).unwrap();
//! buf.extend_from_slice(&[0xAA, 0xBB]); // torn tail
//!
//! let mut r = Cursor::new(buf);
//! assert_eq!(read(&Timestamp, &mut r).unwrap(), Some(1066));
//! assert_eq!(read(&Timestamp, &mut r).unwrap(), None);
//! ```

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::{self, Read, Write};

/// Size of an encoded timestamp (milliseconds since the epoch).
pub const TIMESTAMP_BYTES: usize = 8;

/// Size of an encoded count, width, channel index or byte offset.
pub const WORD_BYTES: usize = 4;

/// Size of a variable-stream index entry: timestamp + data offset.
pub const INDEX_ENTRY_BYTES: usize = TIMESTAMP_BYTES + WORD_BYTES;

/// A fixed-width binary shape.
pub trait Codec {
    /// The decoded value.
    type Value;

    /// Exact number of bytes one value occupies on disk.
    fn width(&self) -> usize;

    /// Appends the encoding of `value` to `out`.
    ///
    /// Implementations must append exactly [`width`](Codec::width) bytes or
    /// return an error without touching the caller's file.
    fn encode(&self, value: &Self::Value, out: &mut Vec<u8>) -> io::Result<()>;

    /// Decodes a value from exactly [`width`](Codec::width) bytes.
    fn decode(&self, buf: &[u8]) -> Self::Value;
}

/// Millisecond timestamp, `u64 LE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timestamp;

impl Codec for Timestamp {
    type Value = u64;

    fn width(&self) -> usize {
        TIMESTAMP_BYTES
    }

    fn encode(&self, value: &u64, out: &mut Vec<u8>) -> io::Result<()> {
        out.write_u64::<LittleEndian>(*value)
    }

    fn decode(&self, buf: &[u8]) -> u64 {
        LittleEndian::read_u64(buf)
    }
}

/// Count, width, channel index or offset, `u32 LE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Word;

impl Codec for Word {
    type Value = u32;

    fn width(&self) -> usize {
        WORD_BYTES
    }

    fn encode(&self, value: &u32, out: &mut Vec<u8>) -> io::Result<()> {
        out.write_u32::<LittleEndian>(*value)
    }

    fn decode(&self, buf: &[u8]) -> u32 {
        LittleEndian::read_u32(buf)
    }
}

/// Single-precision reading (temperature), `f32 LE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Float;

impl Codec for Float {
    type Value = f32;

    fn width(&self) -> usize {
        4
    }

    fn encode(&self, value: &f32, out: &mut Vec<u8>) -> io::Result<()> {
        out.write_f32::<LittleEndian>(*value)
    }

    fn decode(&self, buf: &[u8]) -> f32 {
        LittleEndian::read_f32(buf)
    }
}

/// `(timestamp, byte offset)` pair of a variable-length stream index.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexEntry;

impl Codec for IndexEntry {
    type Value = (u64, u32);

    fn width(&self) -> usize {
        INDEX_ENTRY_BYTES
    }

    fn encode(&self, value: &(u64, u32), out: &mut Vec<u8>) -> io::Result<()> {
        out.write_u64::<LittleEndian>(value.0)?;
        out.write_u32::<LittleEndian>(value.1)
    }

    fn decode(&self, buf: &[u8]) -> (u64, u32) {
        (
            LittleEndian::read_u64(&buf[..TIMESTAMP_BYTES]),
            LittleEndian::read_u32(&buf[TIMESTAMP_BYTES..INDEX_ENTRY_BYTES]),
        )
    }
}

/// A sweep of `N` signed power levels, one byte per channel bin.
#[derive(Debug, Clone, Copy)]
pub struct Levels {
    width: usize,
}

impl Levels {
    /// Shape for sweeps of exactly `width` bins.
    pub fn new(width: usize) -> Self {
        Self { width }
    }
}

impl Codec for Levels {
    type Value = Vec<i8>;

    fn width(&self) -> usize {
        self.width
    }

    fn encode(&self, value: &Vec<i8>, out: &mut Vec<u8>) -> io::Result<()> {
        if value.len() != self.width {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("expected {} levels, got {}", self.width, value.len()),
            ));
        }
        out.extend(value.iter().map(|&l| l as u8));
        Ok(())
    }

    fn decode(&self, buf: &[u8]) -> Vec<i8> {
        buf.iter().map(|&b| b as i8).collect()
    }
}

/// Opaque payload of exactly `width` bytes.
#[derive(Debug, Clone, Copy)]
pub struct Bytes {
    width: usize,
}

impl Bytes {
    pub fn new(width: usize) -> Self {
        Self { width }
    }
}

impl Codec for Bytes {
    type Value = Vec<u8>;

    fn width(&self) -> usize {
        self.width
    }

    fn encode(&self, value: &Vec<u8>, out: &mut Vec<u8>) -> io::Result<()> {
        if value.len() != self.width {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("expected {} bytes, got {}", self.width, value.len()),
            ));
        }
        out.extend_from_slice(value);
        Ok(())
    }

    fn decode(&self, buf: &[u8]) -> Vec<u8> {
        buf.to_vec()
    }
}

/// Reads one value of shape `codec` from `r`.
///
/// Returns `Ok(None)` if fewer than `codec.width()` bytes are available. A
/// zero-width shape always decodes (there is nothing to run out of).
///
/// # Errors
///
/// Any I/O error other than running out of bytes.
pub fn read<C: Codec, R: Read>(codec: &C, r: &mut R) -> io::Result<Option<C::Value>> {
    let mut buf = vec![0u8; codec.width()];
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => return Ok(None),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(Some(codec.decode(&buf)))
}

/// Encodes `value` and appends it to `w` in a single `write_all` call.
///
/// The value is fully encoded before anything reaches `w`, so an encoding
/// failure never leaves a partial record behind.
pub fn write<C: Codec, W: Write>(codec: &C, w: &mut W, value: &C::Value) -> io::Result<()> {
    let mut buf = Vec::with_capacity(codec.width());
    codec.encode(value, &mut buf)?;
    w.write_all(&buf)
}

/// Encodes `value` into a fresh buffer.
pub fn to_bytes<C: Codec>(codec: &C, value: &C::Value) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(codec.width());
    codec.encode(value, &mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests;
