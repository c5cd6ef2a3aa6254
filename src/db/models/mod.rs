pub mod report;

pub use report::ReportSummary;
