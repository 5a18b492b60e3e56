//! Variable-length quantities, referred to in the MIDI standard as "variable length ints".
//!
//! Each byte carries 7 bits of the value, most significant group first.
//! Every byte except the last one has its top bit set.
//!
//! The MIDI standard restricts these to 4 bytes (28 bits), but any `u32` is accepted here, taking
//! up to 5 bytes.

use crate::prelude::*;
use std::ops;

/// The maximum amount of bytes a `u32` takes up when encoded.
pub const MAX_LEN: usize = 5;

/// An encoded variable-length quantity.
///
/// Dereferences to the encoded bytes.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct Encoded {
    buf: [u8; MAX_LEN],
    len: u8,
}
impl Encoded {
    /// The encoded bytes, ready to be written out.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[MAX_LEN - self.len as usize..]
    }
}
impl ops::Deref for Encoded {
    type Target = [u8];
    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}
impl AsRef<[u8]> for Encoded {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Encode an integer into its minimal variable-length representation.
///
/// `0` encodes as a single `0x00` byte.
#[inline]
pub fn encode(int: u32) -> Encoded {
    let mut buf = [0; MAX_LEN];
    let len = encoded_len(int);
    for i in 0..len {
        let byte = ((int >> (i * 7)) & 0x7F) as u8;
        buf[MAX_LEN - 1 - i] = if i == 0 {
            //Last byte
            byte
        } else {
            //Leading byte
            byte | 0x80
        };
    }
    Encoded {
        buf,
        len: len as u8,
    }
}

/// How many bytes `int` takes up when encoded, without encoding it.
#[inline]
pub fn encoded_len(int: u32) -> usize {
    let bits = 32 - int.leading_zeros() as usize;
    ((bits + 6) / 7).max(1)
}

/// Encode an integer and write it out.
#[inline]
pub fn write<W: Write + ?Sized>(out: &mut W, int: u32) -> Result<()> {
    out.write(&encode(int))?;
    Ok(())
}

/// Read a variable-length integer, returning it along with the amount of bytes it took up.
///
/// Fails with `ErrorKind::TruncatedInput` if the source ends before the last byte (the one with
/// the top bit clear) is seen.
/// Non-minimal encodings (with leading `0x80` bytes) are accepted.
pub fn decode<R: Read + ?Sized>(src: &mut R) -> Result<(u32, usize)> {
    let mut int: u32 = 0;
    let mut consumed = 0;
    loop {
        let mut byte = [0];
        src.read_exact(&mut byte).map_err(|err| {
            Error::from_io(err, ErrorKind::TruncatedInput("unterminated varlen integer"))
        })?;
        let byte = byte[0];
        consumed += 1;
        ensure!(
            int <= u32::MAX >> 7,
            ErrorKind::Format("varlen integer exceeds 32 bits")
        );
        int <<= 7;
        int |= (byte & 0x7F) as u32;
        if byte & 0x80 == 0 {
            return Ok((int, consumed));
        }
    }
}

/// Write a byte slice prefixed by its length as a variable-length integer.
pub(crate) fn write_slice<W: Write + ?Sized>(out: &mut W, data: &[u8]) -> Result<()> {
    let len = u32::try_from(data.len())
        .map_err(|_| ErrorKind::InvalidInput("varlen slice length exceeds 32 bits"))?;
    write(out, len)?;
    out.write(data)?;
    Ok(())
}

/// Read a byte slice prefixed by its length as a variable-length integer.
///
/// Returns the bytes along with the total amount of bytes consumed, length prefix included.
pub(crate) fn read_slice<R: Read + ?Sized>(src: &mut R) -> Result<(Vec<u8>, usize)> {
    let (len, len_len) = decode(src).context("failed to read varlen slice length")?;
    let data = src
        .read_vec(len as usize)
        .map_err(|err| Error::from_io(err, ErrorKind::TruncatedInput("truncated varlen slice")))?;
    let consumed = len_len + data.len();
    Ok((data, consumed))
}
