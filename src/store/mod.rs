//! Store backends that live outside the core library.

mod parquet_store;

pub use parquet_store::ParquetStore;
