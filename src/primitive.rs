//! Simple building-block data that can be read in one go.
//! All primitives have a known, fixed size, and are always big-endian on the wire.
//! Also, primitives advance the source when read.

use crate::prelude::*;

#[inline]
fn read_array<R: Read + ?Sized, const N: usize>(src: &mut R) -> Result<[u8; N]> {
    let mut buf = [0; N];
    src.read_exact(&mut buf)
        .map_err(|err| Error::from_io(err, ErrorKind::TruncatedInput("unexpected eof")))?;
    Ok(buf)
}

#[inline]
pub(crate) fn read_u8<R: Read + ?Sized>(src: &mut R) -> Result<u8> {
    Ok(read_array::<R, 1>(src)?[0])
}

#[inline]
pub(crate) fn read_u16<R: Read + ?Sized>(src: &mut R) -> Result<u16> {
    Ok(u16::from_be_bytes(read_array(src)?))
}

#[inline]
pub(crate) fn read_u32<R: Read + ?Sized>(src: &mut R) -> Result<u32> {
    Ok(u32::from_be_bytes(read_array(src)?))
}

/// Read a 4-byte chunk identifier, such as `MThd` or `MTrk`.
#[inline]
pub(crate) fn read_magic<R: Read + ?Sized>(src: &mut R) -> Result<[u8; 4]> {
    read_array(src)
}

/// Read `len` raw bytes.
#[inline]
pub(crate) fn read_bytes<R: Read + ?Sized>(src: &mut R, len: usize) -> Result<Vec<u8>> {
    src.read_vec(len)
        .map_err(|err| Error::from_io(err, ErrorKind::TruncatedInput("unexpected eof")))
}

/// Look at the next byte without consuming it.
#[inline]
pub(crate) fn peek_u8<R: Read + ?Sized>(src: &mut R) -> Result<u8> {
    src.peek_byte()
        .map_err(|err| Error::from_io(err, ErrorKind::TruncatedInput("unexpected eof")))
}

#[inline]
pub(crate) fn write_u8<W: Write + ?Sized>(out: &mut W, int: u8) -> Result<()> {
    out.write(&[int])?;
    Ok(())
}

#[inline]
pub(crate) fn write_u16<W: Write + ?Sized>(out: &mut W, int: u16) -> Result<()> {
    out.write(&int.to_be_bytes())?;
    Ok(())
}

#[inline]
pub(crate) fn write_u32<W: Write + ?Sized>(out: &mut W, int: u32) -> Result<()> {
    out.write(&int.to_be_bytes())?;
    Ok(())
}

#[inline]
pub(crate) fn write_bytes<W: Write + ?Sized>(out: &mut W, bytes: &[u8]) -> Result<()> {
    out.write(bytes)?;
    Ok(())
}

/// Slightly restricted integers.
macro_rules! restricted_int {
    {$(#[$attr:meta])* $name:ident : $inner:tt => $bits:expr} => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash, Default)]
        #[repr(transparent)]
        #[allow(non_camel_case_types)]
        pub struct $name($inner);
        impl From<$inner> for $name {
            /// Saturating conversion, out-of-range values become the maximum value.
            #[inline]
            fn from(raw: $inner) -> $name {
                $name::new(raw)
            }
        }
        impl From<$name> for $inner {
            #[inline]
            fn from(restricted: $name) -> $inner {restricted.0}
        }
        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
        impl $name {
            const MAX: $inner = (1 << $bits) - 1;

            /// The maximum value that this restricted integer can hold.
            #[inline]
            pub const fn max_value() -> $name {
                $name(Self::MAX)
            }

            /// Creates a restricted int from its non-restricted counterpart, clamping
            /// out-of-range values to the maximum value.
            #[inline]
            pub const fn new(raw: $inner) -> $name {
                if raw > Self::MAX {
                    $name(Self::MAX)
                } else {
                    $name(raw)
                }
            }

            /// Returns `Some` if the raw integer is within range of the restricted integer, and
            /// `None` otherwise.
            #[inline]
            pub fn try_from(raw: $inner) -> Option<$name> {
                if raw <= Self::MAX {
                    Some($name(raw))
                } else {
                    None
                }
            }

            /// Get the inner integer out of the wrapper.
            /// The inner integer is guaranteed to be in range of the restricted wrapper.
            #[inline]
            pub fn as_int(self) -> $inner {
                self.0
            }
        }
        impl PartialEq<$inner> for $name {
            fn eq(&self, rhs: &$inner) -> bool {
                self.as_int() == *rhs
            }
        }
        impl PartialEq<$name> for $inner {
            fn eq(&self, rhs: &$name) -> bool {
                *self == rhs.as_int()
            }
        }
    };
}
restricted_int! {
    /// A 7-bit integer type, used for channel message data bytes.
    ///
    /// Wraps the `u8` type and ensures that the top bit is always zero.
    u7: u8 => 7
}
restricted_int! {
    /// A 4-bit integer type, used for MIDI channels.
    ///
    /// Wraps the `u8` type and ensures that the top 4 bits are always zero.
    u4: u8 => 4
}

impl u7 {
    /// Read a data byte.
    ///
    /// Unlike construction, decoding never clamps: a byte with the top bit set is an error, so
    /// that decoded data always encodes back to the same bytes.
    pub(crate) fn read<R: Read + ?Sized>(src: &mut R) -> Result<u7> {
        let raw = read_u8(src)?;
        Ok(u7::try_from(raw).ok_or(ErrorKind::Format("data byte with top bit set"))?)
    }
}

/// The order in which tracks should be laid out when playing back this SMF file.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
#[repr(u8)]
pub enum Format {
    /// This file should have a single track only.
    ///
    /// If the `strict` feature is enabled, an error is raised when decoding a
    /// `Format::SingleTrack` file that does not declare exactly one track.
    SingleTrack,
    /// This file has several tracks that should be played simultaneously.
    ///
    /// Usually the first track controls tempo and other song metadata.
    MultiTrackSync,
    /// This file has several tracks, each one a separate song.
    ///
    /// The tracks should be played sequentially, as completely separate MIDI tracks packaged
    /// within a single SMF file.
    MultiTrackAsync,
}
impl Format {
    /// Convert the 16-bit header field into a `Format`.
    pub fn from_bits(bits: u16) -> Result<Format> {
        Ok(match bits {
            0 => Format::SingleTrack,
            1 => Format::MultiTrackSync,
            2 => Format::MultiTrackAsync,
            _ => bail!(ErrorKind::Format("invalid smf format")),
        })
    }

    /// The value of the 16-bit header field for this format.
    #[inline]
    pub fn as_bits(&self) -> u16 {
        *self as u8 as u16
    }
}
impl Default for Format {
    #[inline]
    fn default() -> Format {
        Format::MultiTrackSync
    }
}
