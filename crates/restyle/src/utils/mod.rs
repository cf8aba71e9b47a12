#[macro_use]
mod logger;
mod checksum;
mod command;
mod diff;
mod error_count_logger;
mod file_path_utils;

pub use checksum::*;
pub use command::*;
pub use diff::*;
pub use error_count_logger::*;
pub use file_path_utils::*;
pub use logger::*;
