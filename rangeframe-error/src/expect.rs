use crate::{RangeFrameError, rangeframe_err};

/// A trait for unwrapping values that are known to be present, panicking with a
/// [`RangeFrameError`] that carries the broken assumption as context.
pub trait RangeFrameExpect {
    /// The type of the value being unwrapped.
    type Output;

    /// Returns the value, or panics with `msg` attached to the underlying error.
    fn rangeframe_expect(self, msg: &str) -> Self::Output;
}

impl<T, E> RangeFrameExpect for Result<T, E>
where
    E: Into<RangeFrameError>,
{
    type Output = T;

    #[inline(always)]
    #[track_caller]
    #[allow(clippy::panic)]
    fn rangeframe_expect(self, msg: &str) -> Self::Output {
        self.unwrap_or_else(|err| panic!("{}", err.into().with_context(msg.to_string())))
    }
}

impl<T> RangeFrameExpect for Option<T> {
    type Output = T;

    #[inline(always)]
    #[track_caller]
    #[allow(clippy::panic)]
    fn rangeframe_expect(self, msg: &str) -> Self::Output {
        self.unwrap_or_else(|| panic!("{}", rangeframe_err!("{}", msg)))
    }
}
