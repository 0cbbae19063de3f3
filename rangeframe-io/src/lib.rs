//! Random-access reads over remote, immutable objects.
//!
//! Object stores only know how to "fetch a byte range" of an object. Columnar readers want
//! to seek around a file, read the footer at the tail first and then jump to arbitrary
//! column chunks. This crate bridges the two: a [`RangeStore`] is the remote collaborator,
//! and a [`RangeSource`] presents one of its objects as a seekable [`RangeReadable`].

pub use cancel::*;
#[cfg(feature = "object_store")]
pub use containers::*;
pub use read::*;
pub use source::*;
pub use store::*;

mod cancel;
#[cfg(feature = "object_store")]
mod containers;
mod read;
mod source;
mod store;
#[cfg(test)]
mod test_util;
