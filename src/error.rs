use crate::prelude::*;

/// Represents an error while encoding or decoding an SMF file.
///
/// This type wraps an [`ErrorKind`](enum.ErrorKind.html), along with the chain of contexts the
/// error went through while propagating up to the caller.
/// If the error originated in the underlying byte sink or source, the original `std::io::Error`
/// is kept and exposed through `std::error::Error::source`.
///
/// For more information about the error policy used by `smfcodec`, see
/// [`ErrorKind`](enum.ErrorKind.html).
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: ErrorKind,
    context: Vec<&'static str>,
    io: Option<stdio::Error>,
}

impl Error {
    /// Create a new error with the given `ErrorKind`.
    #[inline]
    pub fn new(kind: ErrorKind) -> Error {
        Error {
            inner: Box::new(Inner {
                kind,
                context: Vec::new(),
                io: None,
            }),
        }
    }

    /// The root cause of the error.
    ///
    /// Contexts attached while the error propagated never change the kind.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.inner.kind
    }

    /// What the codec was doing when the error occurred, innermost first.
    #[inline]
    pub fn context(&self) -> &[&'static str] {
        &self.inner.context
    }

    /// The sink or source error that caused this error, if any.
    #[inline]
    pub fn io_error(&self) -> Option<&stdio::Error> {
        self.inner.io.as_ref()
    }

    /// Whether the input ended early, either the source itself or a chunk's declared length.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::TruncatedInput(_) | ErrorKind::TruncatedData(_)
        )
    }

    /// Whether the input is not an SMF file at all, or is corrupted beyond repair.
    #[inline]
    pub fn is_format(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Format(_) | ErrorKind::UnknownEventType(_)
        )
    }

    #[inline]
    fn chain_ctx(mut self, ctx: &'static str) -> Error {
        self.inner.context.push(ctx);
        self
    }

    /// Replace the root cause, keeping the context gathered so far.
    #[inline]
    pub(crate) fn with_kind(mut self, kind: ErrorKind) -> Error {
        self.inner.kind = kind;
        self
    }

    /// Convert a sink or source error, mapping a premature end of input to `eof`.
    pub(crate) fn from_io(err: stdio::Error, eof: ErrorKind) -> Error {
        if err.kind() == stdio::ErrorKind::UnexpectedEof {
            Error::new(eof)
        } else {
            Error::from(err)
        }
    }
}
impl From<ErrorKind> for Error {
    #[inline]
    fn from(kind: ErrorKind) -> Error {
        Error::new(kind)
    }
}
impl From<stdio::Error> for Error {
    fn from(err: stdio::Error) -> Error {
        let mut error = Error::new(ErrorKind::Io(err.kind()));
        error.inner.io = Some(err);
        error
    }
}
impl fmt::Display for Error {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.kind(), f)
    }
}
impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind())?;
        if let Some(io) = &self.inner.io {
            write!(f, " ({})", io)?;
        }
        for ctx in self.inner.context.iter() {
            writeln!(f)?;
            write!(f, "  while: {}", ctx)?;
        }
        Ok(())
    }
}
impl std::error::Error for Error {
    #[inline]
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner
            .io
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// The type of error that occurred while encoding or decoding.
///
/// Every failure is fatal for the operation that raised it: the codec never skips over bad data
/// and never returns a partially decoded file.
/// The string payloads are non-normative, informative messages.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong magic bytes on a header or track chunk, or a field with a value the format does
    /// not allow.
    Format(&'static str),

    /// The byte source ended before the value being read was complete.
    TruncatedInput(&'static str),

    /// A track's events did not fit in the length its chunk declared.
    TruncatedData(&'static str),

    /// An event started with a status byte that is neither a channel message, a meta event nor
    /// a system exclusive event.
    UnknownEventType(u8),

    /// A configured limit, such as the maximum amount of tracks, was exceeded.
    LimitExceeded(&'static str),

    /// The value being encoded cannot be represented on the wire.
    InvalidInput(&'static str),

    /// The byte sink or source failed.
    Io(stdio::ErrorKind),
}
impl ErrorKind {
    /// Get the informative message on what exact part of the MIDI format was not respected.
    #[inline]
    pub fn message(&self) -> &'static str {
        match *self {
            ErrorKind::Format(msg) => msg,
            ErrorKind::TruncatedInput(msg) => msg,
            ErrorKind::TruncatedData(msg) => msg,
            ErrorKind::UnknownEventType(_) => "unknown event type",
            ErrorKind::LimitExceeded(msg) => msg,
            ErrorKind::InvalidInput(msg) => msg,
            ErrorKind::Io(_) => "byte sink or source failed",
        }
    }
}
impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::Format(msg) => write!(f, "invalid midi: {}", msg),
            ErrorKind::TruncatedInput(msg) => write!(f, "truncated input: {}", msg),
            ErrorKind::TruncatedData(msg) => write!(f, "truncated data: {}", msg),
            ErrorKind::UnknownEventType(status) => {
                write!(f, "unknown event type with status byte 0x{:02X}", status)
            }
            ErrorKind::LimitExceeded(msg) => write!(f, "limit exceeded: {}", msg),
            ErrorKind::InvalidInput(msg) => write!(f, "cannot encode: {}", msg),
            ErrorKind::Io(kind) => write!(f, "io error: {:?}", kind),
        }
    }
}

pub(crate) trait ResultExt<T> {
    fn context(self, ctx: &'static str) -> Result<T>;
}
impl<T> ResultExt<T> for Result<T> {
    #[inline]
    fn context(self, ctx: &'static str) -> Result<T> {
        self.map_err(|err| err.chain_ctx(ctx))
    }
}
impl<T> ResultExt<T> for std::result::Result<T, ErrorKind> {
    #[inline]
    fn context(self, ctx: &'static str) -> Result<T> {
        self.map_err(|kind| Error::from(kind).chain_ctx(ctx))
    }
}

/// The result type used by the MIDI codec.
pub type Result<T> = std::result::Result<T, Error>;
