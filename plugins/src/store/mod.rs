pub mod fs;

pub use fs::FsReportStore;
