//! # LabeledFrame
//!
//! `labeled_frame` is an in-memory labeled table engine written in Rust. It
//! supports:
//!
//! - Keyed indexes over int, long, double, string, date, datetime and generic
//!   keys with O(1) key, slot and ordinal lookups
//! - Stable physical slots: sorting and filtering never move stored data
//! - Zero-copy filtered views and transposes that share cells with their source
//! - Column-store and row-store orientation
//! - Movable cursors for allocation-free scans
//! - Fork/join parallelism with Rayon for scans and sorts
//! - A compact binary layout with memory-mapped loading
//!
//! # Example
//!
//! ```rust
//! use labeled_frame::{ArrayType, Content, Index};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rows = Index::new(vec![5, 3, 9, 1])?;
//!     let cols = Index::new(vec!["price".to_string()])?;
//!     let mut content = Content::new(rows, cols, ArrayType::Double);
//!
//!     for key in [5, 3, 9, 1] {
//!         content.set_double(&key, 0, key as f64 * 1.5)?;
//!     }
//!
//!     // Sorting reorders ordinals; key 9 keeps physical slot 2
//!     content.sort_rows(false, true);
//!     assert_eq!(content.row_keys().get_index_for_key(&9)?, 2);
//!     assert_eq!(content.get_double(3, 0)?, 13.5);
//!
//!     // Views share cells with the content they came from
//!     let rows = content.row_keys().filter(|k| *k > 2);
//!     let view = content.filter(rows, content.col_keys().clone())?;
//!     view.set_double(&3, 0, 0.0)?;
//!     assert_eq!(content.get_double(&3, 0)?, 0.0);
//!
//!     Ok(())
//! }
//! ```

mod helpers;
pub mod frame;

pub use frame::array::{ArrayType, TypedArray};
pub use frame::config::FrameConfig;
pub use frame::content::{Content, Coord};
pub use frame::cursor::{ColCursor, Cursor, RowCursor};
pub use frame::index::{Index, SlotComparator};
pub use frame::index_factory::{DynIndex, IndexFactory};
pub use frame::key::{IndexKey, KeyType};
pub use frame::{FrameError, Result, Value};
