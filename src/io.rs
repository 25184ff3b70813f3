//! Specialized big-endian binary input.
//! Uses the error handling for this crate.

pub use ::std::io::{Read, Seek, SeekFrom};
use lebe::prelude::*;
use crate::error::{Error, Result, UnitResult, IoResult};
use std::fmt;


/// Skip reading uninteresting bytes without allocating.
#[inline]
pub fn skip_bytes(read: &mut impl Read, count: u64) -> IoResult<()> {
    let skipped = std::io::copy(
        &mut read.by_ref().take(count),
        &mut std::io::sink()
    )?;

    if skipped != count {
        return Err(std::io::ErrorKind::UnexpectedEof.into());
    }

    Ok(())
}


/// Keep track of what byte we are at.
/// Used to jump back to a section after reading some information.
#[derive(Debug)]
pub struct Tracking<T> {

    /// Do not expose to prevent seeking without updating position
    inner: T,

    position: usize,
}

impl<T: Read> Read for Tracking<T> {
    fn read(&mut self, buffer: &mut [u8]) -> std::io::Result<usize> {
        let count = self.inner.read(buffer)?;
        self.position += count;
        Ok(count)
    }
}

impl<T> Tracking<T> {

    /// The inner value must never be seeked directly,
    /// but only through this `Tracking` instance.
    pub fn new(inner: T, position: usize) -> Self {
        Tracking { inner, position }
    }

    /// Current number of bytes read.
    pub fn byte_position(&self) -> usize {
        self.position
    }
}

impl<T: Read + Seek> Tracking<T> {

    /// Set the reader to the specified byte position.
    /// If it is only a couple of bytes, no seek system call is performed.
    pub fn seek_read_to(&mut self, target_position: usize) -> std::io::Result<()> {
        let delta = target_position as i64 - self.position as i64;

        if delta > 0 && delta < 16 {
            skip_bytes(self, delta as u64)?;
        }
        else if delta != 0 {
            self.inner.seek(SeekFrom::Start(target_position as u64))?;
            self.position = target_position;
        }

        Ok(())
    }
}


/// Wraps a plain `Read` so that it can be used where a seekable stream is expected.
/// Every seek fails, so only sequential parsing is possible.
#[derive(Debug)]
pub struct Unseekable<R>(pub R);

impl<R: Read> Read for Unseekable<R> {
    fn read(&mut self, buffer: &mut [u8]) -> IoResult<usize> {
        self.0.read(buffer)
    }
}

impl<R> Seek for Unseekable<R> {
    fn seek(&mut self, _: SeekFrom) -> IoResult<u64> {
        Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "stream is not seekable"))
    }
}


/// A four character code, as used for signatures and keys.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {

    /// Create a code from its ascii text, for example `FourCC::new(b"8BIM")`.
    pub const fn new(bytes: &[u8; 4]) -> Self {
        FourCC(*bytes)
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in &self.0 {
            let character = if byte.is_ascii_graphic() || byte == b' ' { byte as char } else { '?' };
            write!(formatter, "{}", character)?;
        }

        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "`{}`", self)
    }
}


/// Big-endian reader over a document stream.
/// Knows its absolute byte position and, for seekable streams, the total stream length,
/// so that declared lengths can be checked before anything is allocated.
#[derive(Debug)]
pub struct PsdReader<R> {
    inner: Tracking<R>,
    seekable: bool,
    length: Option<usize>,
}

impl<R: Read + Seek> PsdReader<R> {

    /// Wrap a seekable stream. Positions are absolute stream offsets.
    pub fn new(mut inner: R) -> Result<Self> {
        let start = inner.stream_position()?;
        let end = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(start))?;

        Ok(PsdReader {
            inner: Tracking::new(inner, crate::error::u64_to_usize(start, "stream position")?),
            length: Some(crate::error::u64_to_usize(end, "stream length")?),
            seekable: true,
        })
    }

    /// Whether this reader may jump backwards.
    pub fn is_seekable(&self) -> bool {
        self.seekable
    }

    /// Current absolute byte position.
    pub fn position(&self) -> usize {
        self.inner.byte_position()
    }

    /// Total stream length, if known.
    pub fn stream_length(&self) -> Option<usize> {
        self.length
    }

    /// Fail if a section that claims to end at `end` would run past the end of the stream.
    pub fn ensure_within_stream(&self, end: usize, what: &'static str) -> UnitResult {
        match self.length {
            Some(length) if end > length => Err(Error::invalid(format!(
                "{} length exceeds the remaining stream ({} > {})", what, end, length
            ))),

            _ => Ok(())
        }
    }

    /// Move to an absolute position.
    /// Sequential streams can only move forward, which drains the skipped bytes.
    pub fn seek_to(&mut self, position: usize) -> UnitResult {
        let current = self.position();

        if self.seekable {
            self.inner.seek_read_to(position)?;
        }
        else if position >= current {
            skip_bytes(&mut self.inner, (position - current) as u64)?;
        }
        else {
            return Err(Error::unsupported("seeking backwards in a non-seekable stream"));
        }

        Ok(())
    }

    /// Skip bytes without interpreting them. Fails if the stream is shorter.
    pub fn skip(&mut self, count: usize) -> UnitResult {
        let target = self.position().checked_add(count)
            .ok_or_else(|| Error::invalid("skip length"))?;

        if self.seekable {
            self.ensure_within_stream(target, "skipped block")?;
        }

        self.seek_to(target)
    }

    /// Read a four character code.
    pub fn read_four_cc(&mut self) -> Result<FourCC> {
        let mut bytes = [0_u8; 4];
        self.read_exact(&mut bytes)?;
        Ok(FourCC(bytes))
    }

    /// Read a four character code and fail with a descriptive error if it is not the expected one.
    pub fn expect_signature(&mut self, expected: FourCC) -> UnitResult {
        let found = self.read_four_cc()?;

        if found != expected {
            return Err(Error::invalid(format!(
                "expected signature `{}`, found `{}`", expected, found
            )));
        }

        Ok(())
    }

    /// Read a big endian `u8`.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(u8::read_from_big_endian(&mut self.inner)?)
    }

    /// Read a big endian `u16`.
    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::read_from_big_endian(&mut self.inner)?)
    }

    /// Read a big endian `i16`.
    #[inline]
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::read_from_big_endian(&mut self.inner)?)
    }

    /// Read a big endian `u32`.
    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::read_from_big_endian(&mut self.inner)?)
    }

    /// Read a big endian `i32`.
    #[inline]
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::read_from_big_endian(&mut self.inner)?)
    }

    /// Read a big endian `u64`.
    #[inline]
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::read_from_big_endian(&mut self.inner)?)
    }

    /// Fill the whole buffer or fail.
    pub fn read_exact_bytes(&mut self, buffer: &mut [u8]) -> UnitResult {
        Ok(self.inner.read_exact(buffer)?)
    }

    /// Read a known number of bytes into a new vector.
    /// Checks the stream length before allocating.
    pub fn read_byte_vec(&mut self, count: usize) -> Result<Vec<u8>> {
        let end = self.position().checked_add(count).ok_or_else(|| Error::invalid("block length"))?;
        self.ensure_within_stream(end, "block")?;

        let mut bytes = vec![0_u8; count];
        self.read_exact_bytes(&mut bytes)?;
        Ok(bytes)
    }

    /// Read a length-prefixed string whose total size,
    /// including the length byte, is padded to a multiple of `alignment`.
    pub fn read_pascal_string(&mut self, alignment: usize) -> Result<String> {
        let length = self.read_u8()? as usize;
        let bytes = self.read_byte_vec(length)?;

        let total = 1 + length;
        let padding = (alignment - total % alignment) % alignment;
        self.skip(padding)?;

        Ok(bytes.iter().map(|&byte| byte as char).collect())
    }

    /// Read a big endian UTF-16 string with a 4 byte character count prefix.
    pub fn read_unicode_string(&mut self) -> Result<String> {
        let count = crate::error::u64_to_usize(self.read_u32()? as u64, "string length")?;
        let bytes = self.read_byte_vec(count.checked_mul(2).ok_or_else(|| Error::invalid("string length"))?)?;

        let units: Vec<u16> = bytes.chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();

        Ok(String::from_utf16_lossy(&units).trim_end_matches('\0').to_string())
    }
}

impl<R: Read> PsdReader<Unseekable<R>> {

    /// Wrap a stream that can only be read sequentially.
    /// Positions start at zero, and any backwards seek fails with `Error::NotSupported`.
    pub fn sequential(read: R) -> Self {
        PsdReader {
            inner: Tracking::new(Unseekable(read), 0),
            seekable: false,
            length: None,
        }
    }
}

impl<R: Read> Read for PsdReader<R> {
    fn read(&mut self, buffer: &mut [u8]) -> IoResult<usize> {
        self.inner.read(buffer)
    }
}
