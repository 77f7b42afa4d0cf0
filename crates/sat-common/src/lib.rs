//! Common types and utilities shared across the eumetsat2ani crates.

pub mod fs;
pub mod naming;
pub mod time;

pub use fs::{partial_path, write_atomically};
pub use naming::animation_file_name;
pub use time::{isoformat, isoformat_time, parse_iso8601, TimeParseError, TimeWindow};
