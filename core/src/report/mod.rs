//! Run-level reporting: verification of the finished graph, pure aggregation
//! of unit reports, text formatting and durable storage.

mod aggregate;
mod format;
mod store;
mod verify;

pub use aggregate::{
    aggregate, AggregateInput, BlockedUnit, FailedUnit, ReportArchive, RunReport, RunStatus,
    RunTotals, UnitRemediation, UnitTiming,
};
pub use format::format_text;
pub use store::{run_report_key, unit_report_key, MemoryReportStore, ReportStore};
pub use verify::{verify, Verification};
