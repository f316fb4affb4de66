//! # Stream - append-only record streams on flat files
//!
//! A stream is a directory holding two files, `timestamps` and `data`, and
//! stores an append-only sequence of timestamped readings. Two layouts exist,
//! chosen by whether the payload width is known up front:
//!
//! | Layout             | Payload          | Range start cost                  |
//! |--------------------|------------------|-----------------------------------|
//! | [`FixedStream`]    | `width` bytes    | scan timestamps, one data seek    |
//! | [`VariableStream`] | `key` + any blob | scan index, one data seek         |
//!
//! See [`format`] for the exact byte layout. All integers are little-endian.
//!
//! ## Range bounds
//!
//! `range(start, end)` yields records with `start < timestamp <= end`: the
//! lower bound is **exclusive**, the upper bound inclusive. The scan ends at
//! the first timestamp past `end`.
//!
//! ## Crash behaviour
//!
//! The timestamp/index file is always appended before the data file. A
//! trailing record whose bytes are incomplete ends a range silently; there is
//! no checksum and no repair. Every call opens and closes its own files, and
//! the ranges own their file handles until they are dropped or exhausted.
//!
//! ## Example
//!
//! ```rust,no_run
//! use stream::FixedStream;
//! use tracing::Span;
//!
//! let s = FixedStream::new("spectrum", Span::none());
//! s.append(1066, &[10, 20, 226]).unwrap();
//! s.append(1080, &[1, 2, 3]).unwrap();
//! for rec in s.range(Some(1066), None).unwrap() {
//!     let (t, payload) = rec.unwrap();
//!     println!("{t}: {payload:?}");
//! }
//! ```

mod error;
mod fixed;
pub mod format;
mod variable;

pub use error::StreamError;
pub use fixed::{FixedRange, FixedStream};
pub use format::Summary;
pub use variable::{VariableRange, VariableStream};

#[cfg(test)]
mod tests;
