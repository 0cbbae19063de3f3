use arrow_array::{Array, ArrayRef, RecordBatch};
use arrow_schema::{DataType, FieldRef, SchemaRef};
use rangeframe_error::{RangeFrameResult, rangeframe_bail};

/// One column of a [`ParsedTable`]: its field and the chunks holding its values, in row order.
#[derive(Debug, Clone)]
pub struct TableColumn {
    field: FieldRef,
    chunks: Vec<ArrayRef>,
}

impl TableColumn {
    pub fn new(field: FieldRef, chunks: Vec<ArrayRef>) -> Self {
        Self { field, chunks }
    }

    pub fn name(&self) -> &str {
        self.field.name()
    }

    pub fn data_type(&self) -> &DataType {
        self.field.data_type()
    }

    pub fn chunks(&self) -> &[ArrayRef] {
        &self.chunks
    }

    /// Number of materialized values across all chunks.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A fully materialized table as produced by a columnar reader.
///
/// The declared row count comes from the file's metadata; it is kept separately from the
/// columns so a reader that materialized the wrong number of values can be caught.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    schema: SchemaRef,
    columns: Vec<TableColumn>,
    num_rows: usize,
}

impl ParsedTable {
    /// Build a table from per-column chunks, given in schema order.
    pub fn try_new(
        schema: SchemaRef,
        columns: Vec<Vec<ArrayRef>>,
        num_rows: usize,
    ) -> RangeFrameResult<Self> {
        if schema.fields().len() != columns.len() {
            rangeframe_bail!(
                SchemaInconsistency: "schema has {} fields but {} columns were read",
                schema.fields().len(),
                columns.len()
            );
        }

        let columns = schema
            .fields()
            .iter()
            .zip(columns)
            .map(|(field, chunks)| {
                if let Some(chunk) = chunks.iter().find(|c| c.data_type() != field.data_type()) {
                    rangeframe_bail!(
                        SchemaInconsistency: "column {} is declared as {} but holds {}",
                        field.name(),
                        field.data_type(),
                        chunk.data_type()
                    );
                }
                Ok(TableColumn::new(field.clone(), chunks))
            })
            .collect::<RangeFrameResult<Vec<_>>>()?;

        Ok(Self {
            schema,
            columns,
            num_rows,
        })
    }

    /// Transpose a sequence of record batches into a table.
    pub fn from_batches(
        schema: SchemaRef,
        batches: &[RecordBatch],
        num_rows: usize,
    ) -> RangeFrameResult<Self> {
        let columns = (0..schema.fields().len())
            .map(|idx| {
                batches
                    .iter()
                    .filter(|batch| batch.num_rows() > 0)
                    .map(|batch| batch.column(idx).clone())
                    .collect()
            })
            .collect();
        Self::try_new(schema, columns, num_rows)
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    /// The row count declared by the source, which every column must match.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}
