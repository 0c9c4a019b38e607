//! Shared order-book store over a named memory-mapped region.
//!
//! One writer process publishes book updates; any number of reader processes
//! copy consistent snapshots out without locks, using a per-slot sequence
//! lock for torn-read detection. Region lifecycle (create/attach/unlink) is
//! explicit and validated, so a stale or foreign region can never be
//! silently misread.

mod error;
mod layout;
mod seqlock;
mod store;

pub use error::StoreError;
pub use layout::{BOOK_VERSION, DEPTH, PriceLevel, SYMBOL_LEN, Symbol, bytes_for_region};
pub use store::{BookReader, BookWriter, OrderBookSnapshot, READ_RETRIES, unlink};
