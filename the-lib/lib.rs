//! Walking a range of lines backwards through its version control history.
//!
//! A selection in the working copy is first mapped onto the last commit
//! ([`resolve`]), the commits that touched it are split into patch units
//! ([`history`]) and an [`UndoSession`](session::UndoSession) replays them
//! one by one ([`patch`]), newest first.

pub mod error;
pub mod history;
pub mod hunk;
pub mod patch;
pub mod range;
pub mod resolve;
pub mod session;
pub mod source;

pub use error::{
  Error,
  Result,
};
pub use range::LineRange;
pub use source::HistorySource;
