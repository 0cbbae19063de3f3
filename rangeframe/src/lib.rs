//! Read columnar tables straight out of an object store.
//!
//! A [`RemoteTableFetch`] resolves an object, opens a [`RangeSource`](rangeframe_io::RangeSource)
//! over it and lets a [`ColumnarTableReader`] pull only the byte ranges it needs: the footer
//! first, then the column chunks. The parsed table is flattened into a generic
//! [`OutputFrame`] by the [`TableToFrameConverter`].
//!
//! [`Datasource`] wraps all of this behind a query/health-check surface configured from
//! [`StoreSettings`].

pub use convert::*;
pub use fetch::*;
pub use frame::*;
pub use query::*;
pub use rangeframe_error as error;
pub use rangeframe_io as io;
pub use reader::*;
pub use settings::*;
pub use table::*;

mod convert;
mod fetch;
mod frame;
mod query;
mod reader;
mod settings;
mod table;
