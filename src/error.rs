
//! Error type definitions.

use std::borrow::Cow;
use std::convert::TryFrom;
use std::fmt;
use std::io::ErrorKind;

pub use std::io::Error as IoError;
pub use std::io::Result as IoResult;


/// A result that may contain a decoding error.
pub type Result<T> = std::result::Result<T, Error>;

/// A result that, if ok, contains nothing, and otherwise contains a decoding error.
pub type UnitResult = Result<()>;


/// An error that may happen while decoding a document.
/// Distinguishes between four main categories of problems,
/// plus the case of a decode that would need too much memory.
#[derive(Debug)]
pub enum Error {

    /// Decoding was cancelled through a `CancelToken`.
    /// This is not a failure: the caller simply receives no result.
    Aborted,

    /// The contents of the file are valid, but this decoder cannot handle them.
    /// Examples are bitmap color mode and 16 bit channels.
    NotSupported(Cow<'static, str>),

    /// The contents of the file are not valid or were truncated.
    Invalid(Cow<'static, str>),

    /// The output would need more bytes than the caller allowed.
    TooLarge {

        /// Number of bytes the decode would allocate.
        required: u64,

        /// The caller supplied maximum.
        limit: u64,
    },

    /// The underlying byte stream could not be read successfully,
    /// probably due to file system related errors.
    Io(IoError),
}


impl Error {

    /// Create an error of the variant `Invalid`.
    pub(crate) fn invalid(message: impl Into<Cow<'static, str>>) -> Self {
        Error::Invalid(message.into())
    }

    /// Create an error of the variant `NotSupported`.
    pub(crate) fn unsupported(message: impl Into<Cow<'static, str>>) -> Self {
        Error::NotSupported(message.into())
    }

    /// Whether this error is only a cancellation signal.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted)
    }

    /// Prefix the message with the section and byte offset that failed.
    /// Cancellation and size limits pass through unchanged.
    pub(crate) fn context(self, section: &str, position: usize) -> Self {
        match self {
            Error::Invalid(message) => Error::Invalid(format!("{} at byte {}: {}", section, position, message).into()),
            Error::NotSupported(message) => Error::NotSupported(format!("{} at byte {}: {}", section, position, message).into()),

            Error::Io(error) => Error::Io(IoError::new(
                error.kind(), format!("{} at byte {}: {}", section, position, error)
            )),

            other => other,
        }
    }
}

/// Enable using the `?` operator on `std::io::Result`.
impl From<IoError> for Error {
    fn from(error: IoError) -> Self {
        if error.kind() == ErrorKind::UnexpectedEof {
            Error::invalid("reference to missing bytes")
        }
        else {
            Error::Io(error)
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(formatter),
            Error::NotSupported(message) => write!(formatter, "not supported: {}", message),
            Error::Invalid(message) => write!(formatter, "invalid: {}", message),
            Error::Aborted => write!(formatter, "cancelled"),

            Error::TooLarge { required, limit } => write!(
                formatter, "decoding needs {} bytes, but only {} bytes are allowed", required, limit
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(error) => Some(error),
            _ => None,
        }
    }
}


/// Return error on invalid range.
#[inline]
pub(crate) fn i32_to_usize(value: i32, error_message: &'static str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::invalid(error_message))
}

/// Return error on invalid range.
#[inline]
pub(crate) fn u64_to_usize(value: u64, error_message: &'static str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::invalid(error_message))
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn end_of_stream_is_structural(){
        let error = Error::from(IoError::new(ErrorKind::UnexpectedEof, "eof"));
        assert!(matches!(error, Error::Invalid(_)));

        let error = Error::from(IoError::new(ErrorKind::PermissionDenied, "denied"));
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn context_names_section_and_offset(){
        let error = Error::invalid("misaligned").context("image resources", 26);
        assert_eq!(error.to_string(), "invalid: image resources at byte 26: misaligned");

        assert!(Error::Aborted.context("image data", 0).is_aborted());
    }
}
