//! Cell-related types
//!
//! - [`CellValue`] - what a cell stores
//! - [`CellAddress`] / [`CellRange`] - where it lives
//! - [`CellStorage`] - sparse row-major storage

mod address;
mod storage;
mod value;

pub use address::{CellAddress, CellRange};
pub use storage::CellStorage;
pub use value::{CellType, CellValue, ErrorCode, SharedString};
