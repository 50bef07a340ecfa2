//! Historical bar archives and replay feeds.

mod csv_archive;
mod replay;

pub use csv_archive::CsvArchive;
pub use replay::ReplayFeed;
