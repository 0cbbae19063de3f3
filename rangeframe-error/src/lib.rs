#![deny(missing_docs)]

//! This crate defines error & result types for RangeFrame.
//! It also contains a variety of useful macros for error handling.

mod expect;
#[cfg(feature = "parquet")]
mod parquet;

use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::num::TryFromIntError;
use std::ops::Deref;
use std::{fmt, io};

pub use expect::RangeFrameExpect;

/// A string that can be used as an error message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrString(Cow<'static, str>);

impl<T> From<T> for ErrString
where
    T: Into<Cow<'static, str>>,
{
    fn from(msg: T) -> Self {
        Self(msg.into())
    }
}

impl AsRef<str> for ErrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ErrString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// The step of a remote table fetch that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchStage {
    /// Resolving the size of the remote object.
    Metadata,
    /// Fetching a byte range of the remote object.
    RangeRead,
    /// Decoding the columnar footer and column chunks.
    Parse,
    /// Flattening the parsed table into an output frame.
    Convert,
}

impl Display for FetchStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let stage = match self {
            FetchStage::Metadata => "metadata",
            FetchStage::RangeRead => "range read",
            FetchStage::Parse => "parse",
            FetchStage::Convert => "convert",
        };
        f.write_str(stage)
    }
}

/// The top-level error type for RangeFrame.
#[derive(thiserror::Error)]
#[non_exhaustive]
pub enum RangeFrameError {
    /// The object is missing, or its metadata could not be queried.
    #[error("object {0} is unavailable: {1}")]
    ObjectUnavailable(ErrString, ErrString),
    /// A read started at or past the end of the object.
    #[error("read offset {0} is out of range for an object of {1} bytes")]
    OutOfRange(u64, u64),
    /// The store returned fewer bytes than the requested range implies.
    #[error("short read of {0} at offset {1}: expected {2} bytes, received {3}")]
    ShortRead(ErrString, u64, u64, u64),
    /// The object's contents are not valid columnar data.
    #[error("invalid columnar data: {0}")]
    FormatError(ErrString),
    /// Columns of a parsed table disagree on their row count.
    #[error("schema inconsistency: {0}")]
    SchemaInconsistency(ErrString),
    /// The caller aborted the operation.
    #[error("operation cancelled")]
    Cancelled,
    /// An invalid argument was provided.
    #[error("{0}")]
    InvalidArgument(ErrString),
    /// A wrapper for errors from the Arrow library.
    #[error(transparent)]
    ArrowError(#[from] arrow_schema::ArrowError),
    /// A wrapper for IO errors.
    #[error(transparent)]
    IOError(#[from] io::Error),
    /// A wrapper for integer conversion errors.
    #[error(transparent)]
    TryFromInt(#[from] TryFromIntError),
    /// A wrapper for errors from the object store client.
    #[cfg(feature = "object_store")]
    #[error(transparent)]
    ObjectStore(#[from] object_store::Error),
    /// A wrapper for JSON decoding errors.
    #[cfg(feature = "serde")]
    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
    /// An error annotated with the operation that produced it.
    #[error("{0}: {1}")]
    Context(ErrString, #[source] Box<RangeFrameError>),
}

impl RangeFrameError {
    /// Adds additional context to an error.
    pub fn with_context<T: Into<ErrString>>(self, msg: T) -> Self {
        RangeFrameError::Context(msg.into(), Box::new(self))
    }

    /// Returns the innermost error, skipping every layer of context.
    pub fn root(&self) -> &RangeFrameError {
        match self {
            RangeFrameError::Context(_, inner) => inner.root(),
            other => other,
        }
    }

    /// Whether the error was caused by the caller aborting the operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), RangeFrameError::Cancelled)
    }

    /// Whether the error signals a read past the end of the object.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self.root(), RangeFrameError::OutOfRange(..))
    }
}

impl Debug for RangeFrameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// A type alias for Results that return RangeFrameErrors as their error type.
pub type RangeFrameResult<T> = Result<T, RangeFrameError>;

/// A convenient macro for creating a RangeFrameError.
#[macro_export]
macro_rules! rangeframe_err {
    (OutOfRange: $offset:expr, $size:expr) => {
        $crate::RangeFrameError::OutOfRange($offset, $size)
    };
    (ShortRead: $key:expr, $offset:expr, $expected:expr, $actual:expr) => {
        $crate::RangeFrameError::ShortRead($key.to_string().into(), $offset, $expected, $actual)
    };
    (ObjectUnavailable: $key:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::RangeFrameError::ObjectUnavailable(
            $key.to_string().into(),
            format!($fmt $(, $arg)*).into(),
        )
    };
    (Cancelled) => {
        $crate::RangeFrameError::Cancelled
    };
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::RangeFrameError::$variant(format!($fmt $(, $arg)*).into())
    };
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::rangeframe_err!(InvalidArgument: $fmt $(, $arg)*)
    };
}

/// A convenient macro for returning a RangeFrameError.
#[macro_export]
macro_rules! rangeframe_bail {
    ($($tt:tt)+) => {
        return Err($crate::rangeframe_err!($($tt)+))
    };
}
