use arrow_array::cast::AsArray;
use arrow_array::types::{
    Float64Type, Int64Type, TimestampMicrosecondType, TimestampMillisecondType,
    TimestampNanosecondType, TimestampSecondType, UInt64Type,
};
use arrow_array::{Array, ArrowPrimitiveType, PrimitiveArray};
use arrow_cast::cast;
use arrow_cast::display::{ArrayFormatter, FormatOptions};
use arrow_schema::{DataType, TimeUnit};
use rangeframe_error::{RangeFrameResult, rangeframe_bail};

use crate::{OutputField, OutputFrame, ParsedTable, TableColumn, Value};

/// How physical values are mapped onto [`Value`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CoercionPolicy {
    /// Render every value to its canonical text. Defined for every physical type.
    #[default]
    Text,
    /// Keep integers, floats, booleans, byte sequences and timestamps typed; render anything
    /// else to text.
    Native,
}

/// The physical type families the converter distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhysicalKind {
    Boolean,
    SignedInteger,
    UnsignedInteger,
    Float,
    Utf8,
    Binary,
    FixedSizeBinary,
    Timestamp(TimeUnit),
    Other,
}

impl From<&DataType> for PhysicalKind {
    fn from(value: &DataType) -> Self {
        match value {
            DataType::Boolean => PhysicalKind::Boolean,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
                PhysicalKind::SignedInteger
            }
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
                PhysicalKind::UnsignedInteger
            }
            DataType::Float16 | DataType::Float32 | DataType::Float64 => PhysicalKind::Float,
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => PhysicalKind::Utf8,
            DataType::Binary | DataType::LargeBinary | DataType::BinaryView => {
                PhysicalKind::Binary
            }
            DataType::FixedSizeBinary(_) => PhysicalKind::FixedSizeBinary,
            DataType::Timestamp(unit, _) => PhysicalKind::Timestamp(*unit),
            _ => PhysicalKind::Other,
        }
    }
}

/// Flattens a [`ParsedTable`] into an [`OutputFrame`] with one field per column.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableToFrameConverter {
    policy: CoercionPolicy,
}

impl TableToFrameConverter {
    pub fn new(policy: CoercionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> CoercionPolicy {
        self.policy
    }

    /// Convert `table`, keeping column order and names.
    ///
    /// Fails with `SchemaInconsistency` if any column holds a different number of values than
    /// the table's declared row count. A table without rows is not an error: every field is
    /// simply empty.
    pub fn convert(&self, table: &ParsedTable) -> RangeFrameResult<OutputFrame> {
        let mut frame = OutputFrame::default();
        for column in table.columns() {
            if column.len() != table.num_rows() {
                rangeframe_bail!(
                    SchemaInconsistency: "column {} holds {} values but the table declares {} rows",
                    column.name(),
                    column.len(),
                    table.num_rows()
                );
            }
            frame.push_field(OutputField::new(column.name(), self.convert_column(column)?));
        }
        Ok(frame)
    }

    fn convert_column(&self, column: &TableColumn) -> RangeFrameResult<Vec<Value>> {
        let mut values = Vec::with_capacity(column.len());
        for chunk in column.chunks() {
            match self.policy {
                CoercionPolicy::Text => append_text(chunk.as_ref(), &mut values)?,
                CoercionPolicy::Native => append_native(chunk.as_ref(), &mut values)?,
            }
        }
        Ok(values)
    }
}

fn append_text(array: &dyn Array, values: &mut Vec<Value>) -> RangeFrameResult<()> {
    let options = FormatOptions::default();
    let formatter = ArrayFormatter::try_new(array, &options)?;
    for idx in 0..array.len() {
        if array.is_null(idx) {
            values.push(Value::Null);
        } else {
            values.push(Value::Text(formatter.value(idx).try_to_string()?));
        }
    }
    Ok(())
}

fn append_native(array: &dyn Array, values: &mut Vec<Value>) -> RangeFrameResult<()> {
    match PhysicalKind::from(array.data_type()) {
        PhysicalKind::Boolean => {
            values.extend(array.as_boolean().iter().map(Value::from));
        }
        PhysicalKind::SignedInteger => {
            let widened = cast(array, &DataType::Int64)?;
            append_primitive::<Int64Type>(widened.as_primitive(), values, Value::Int64);
        }
        PhysicalKind::UnsignedInteger => {
            let widened = cast(array, &DataType::UInt64)?;
            append_primitive::<UInt64Type>(widened.as_primitive(), values, Value::UInt64);
        }
        PhysicalKind::Float => {
            let widened = cast(array, &DataType::Float64)?;
            append_primitive::<Float64Type>(widened.as_primitive(), values, Value::Float64);
        }
        PhysicalKind::Utf8 => {
            let strings = cast(array, &DataType::LargeUtf8)?;
            values.extend(
                strings
                    .as_string::<i64>()
                    .iter()
                    .map(|v| v.map_or(Value::Null, Value::from)),
            );
        }
        PhysicalKind::Binary => {
            let binary = cast(array, &DataType::LargeBinary)?;
            values.extend(
                binary
                    .as_binary::<i64>()
                    .iter()
                    .map(|v| v.map_or(Value::Null, |b| Value::Bytes(b.to_vec()))),
            );
        }
        PhysicalKind::FixedSizeBinary => {
            values.extend(
                array
                    .as_fixed_size_binary()
                    .iter()
                    .map(|v| v.map_or(Value::Null, |b| Value::Bytes(b.to_vec()))),
            );
        }
        PhysicalKind::Timestamp(unit) => match unit {
            TimeUnit::Second => append_timestamps::<TimestampSecondType>(array, values)?,
            TimeUnit::Millisecond => append_timestamps::<TimestampMillisecondType>(array, values)?,
            TimeUnit::Microsecond => append_timestamps::<TimestampMicrosecondType>(array, values)?,
            TimeUnit::Nanosecond => append_timestamps::<TimestampNanosecondType>(array, values)?,
        },
        PhysicalKind::Other => append_text(array, values)?,
    }
    Ok(())
}

fn append_primitive<T: ArrowPrimitiveType>(
    array: &PrimitiveArray<T>,
    values: &mut Vec<Value>,
    wrap: impl Fn(T::Native) -> Value,
) {
    values.extend(array.iter().map(|v| v.map_or(Value::Null, &wrap)));
}

/// Timestamps are read as UTC instants; the column's zone only affects rendering, not the
/// instant. Values outside chrono's range fall back to text.
fn append_timestamps<T>(array: &dyn Array, values: &mut Vec<Value>) -> RangeFrameResult<()>
where
    T: ArrowPrimitiveType<Native = i64> + arrow_array::types::ArrowTimestampType,
{
    let timestamps = array.as_primitive::<T>();
    let options = FormatOptions::default();
    let formatter = ArrayFormatter::try_new(array, &options)?;
    for idx in 0..timestamps.len() {
        if timestamps.is_null(idx) {
            values.push(Value::Null);
            continue;
        }
        match timestamps.value_as_datetime(idx) {
            Some(naive) => values.push(Value::Timestamp(naive.and_utc())),
            None => values.push(Value::Text(formatter.value(idx).try_to_string()?)),
        }
    }
    Ok(())
}
