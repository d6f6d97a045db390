//! Fill input and position output for fill-ledger.
//!
//! Uses JSON Lines (.jsonl) for output so an interrupted write only loses
//! the trailing line. Closed positions are appended idempotently, keyed by
//! `positionKey`.

pub mod error;
pub mod reader;
pub mod writer;

pub use error::{PersistenceError, PersistenceResult};
pub use reader::{read_fill_pages, read_fills, FillPage};
pub use writer::{PositionWriter, CLOSED_FILE, OPEN_FILE};
