use parquet::errors::ParquetError;

use crate::RangeFrameError;

impl From<ParquetError> for RangeFrameError {
    /// Errors raised by our own byte source travel through the Parquet reader boxed as
    /// [`ParquetError::External`]; those are unwrapped back into their original variant.
    fn from(value: ParquetError) -> Self {
        match value {
            ParquetError::External(external) => match external.downcast::<RangeFrameError>() {
                Ok(err) => *err,
                Err(other) => RangeFrameError::FormatError(other.to_string().into()),
            },
            other => RangeFrameError::FormatError(other.to_string().into()),
        }
    }
}

impl From<RangeFrameError> for ParquetError {
    fn from(value: RangeFrameError) -> Self {
        ParquetError::External(Box::new(value))
    }
}

#[cfg(test)]
mod tests {
    use parquet::errors::ParquetError;

    use crate::{RangeFrameError, rangeframe_err};

    #[test]
    fn range_errors_survive_the_parquet_boundary() {
        let pq: ParquetError = rangeframe_err!(Cancelled).into();
        let back = RangeFrameError::from(pq);
        assert!(back.is_cancelled());
    }

    #[test]
    fn decoding_errors_become_format_errors() {
        let back = RangeFrameError::from(ParquetError::General("bad footer".to_string()));
        assert!(matches!(back, RangeFrameError::FormatError(..)));
        assert!(back.to_string().contains("bad footer"));
    }
}
