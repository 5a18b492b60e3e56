//! The byte sinks and sources the codec reads from and writes into.
//!
//! The codec never owns its sink or source: opening, flushing and closing them is up to the
//! caller.
//! Both traits report failures as plain `std::io::Error`s, which the codec passes through to
//! its own caller unchanged.

use crate::prelude::*;

/// Bytes are read from the source in pieces of at most this size, so that a corrupted length
/// field cannot make the reader allocate more memory than the source actually holds.
const READ_STEP: usize = 8 * 1024;

/// A byte sink that encoded MIDI data is written to.
pub trait Write {
    /// Write the entire buffer, or fail.
    fn write(&mut self, buf: &[u8]) -> stdio::Result<()>;
}

impl Write for Vec<u8> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> stdio::Result<()> {
        self.extend_from_slice(buf);
        Ok(())
    }
}

impl<W: Write + ?Sized> Write for &mut W {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> stdio::Result<()> {
        (**self).write(buf)
    }
}

/// Use a `std::io::Write` stream (a file, a socket, ...) as a byte sink.
///
/// No buffering is done: wrap unbuffered streams in a `std::io::BufWriter` first.
#[derive(Debug)]
pub struct IoWrap<T>(pub T);
impl<T: stdio::Write> Write for IoWrap<T> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> stdio::Result<()> {
        stdio::Write::write_all(&mut self.0, buf)
    }
}

/// A byte source that encoded MIDI data is read from.
///
/// Running out of bytes is reported as a `std::io::ErrorKind::UnexpectedEof` error.
pub trait Read {
    /// Fill the entire buffer, or fail.
    fn read_exact(&mut self, buf: &mut [u8]) -> stdio::Result<()>;

    /// Look at the next byte without consuming it.
    fn peek_byte(&mut self) -> stdio::Result<u8>;

    /// Read exactly `len` bytes into a new buffer.
    ///
    /// The buffer grows as bytes arrive, so a huge `len` on a short source fails with
    /// `UnexpectedEof` instead of allocating `len` bytes up front.
    fn read_vec(&mut self, len: usize) -> stdio::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(len.min(READ_STEP));
        while buf.len() < len {
            let start = buf.len();
            let step = (len - start).min(READ_STEP);
            buf.resize(start + step, 0);
            self.read_exact(&mut buf[start..])?;
        }
        Ok(buf)
    }
}

impl<'a> Read for &'a [u8] {
    #[inline]
    fn read_exact(&mut self, buf: &mut [u8]) -> stdio::Result<()> {
        if buf.len() > self.len() {
            let rest: &'a [u8] = *self;
            *self = &rest[rest.len()..];
            return Err(stdio::ErrorKind::UnexpectedEof.into());
        }
        let rest: &'a [u8] = *self;
        let (head, tail) = rest.split_at(buf.len());
        buf.copy_from_slice(head);
        *self = tail;
        Ok(())
    }

    #[inline]
    fn peek_byte(&mut self) -> stdio::Result<u8> {
        self.first()
            .copied()
            .ok_or_else(|| stdio::ErrorKind::UnexpectedEof.into())
    }

    #[inline]
    fn read_vec(&mut self, len: usize) -> stdio::Result<Vec<u8>> {
        if len > self.len() {
            let rest: &'a [u8] = *self;
            *self = &rest[rest.len()..];
            return Err(stdio::ErrorKind::UnexpectedEof.into());
        }
        let rest: &'a [u8] = *self;
        let (head, tail) = rest.split_at(len);
        *self = tail;
        Ok(head.to_vec())
    }
}

impl<R: Read + ?Sized> Read for &mut R {
    #[inline]
    fn read_exact(&mut self, buf: &mut [u8]) -> stdio::Result<()> {
        (**self).read_exact(buf)
    }

    #[inline]
    fn peek_byte(&mut self) -> stdio::Result<u8> {
        (**self).peek_byte()
    }

    #[inline]
    fn read_vec(&mut self, len: usize) -> stdio::Result<Vec<u8>> {
        (**self).read_vec(len)
    }
}

/// Use a buffered `std::io::BufRead` stream as a byte source.
///
/// Peeking relies on the stream's internal buffer, hence the `BufRead` bound.
/// Wrap unbuffered streams in a `std::io::BufReader` first.
#[derive(Debug)]
pub struct IoRead<R>(pub R);
impl<R: stdio::BufRead> Read for IoRead<R> {
    #[inline]
    fn read_exact(&mut self, buf: &mut [u8]) -> stdio::Result<()> {
        stdio::Read::read_exact(&mut self.0, buf)
    }

    fn peek_byte(&mut self) -> stdio::Result<u8> {
        loop {
            match stdio::BufRead::fill_buf(&mut self.0) {
                Ok(buf) => {
                    return buf
                        .first()
                        .copied()
                        .ok_or_else(|| stdio::ErrorKind::UnexpectedEof.into())
                }
                Err(err) if err.kind() == stdio::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
    }
}
