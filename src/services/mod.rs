//! Core services for scanning, retention decisions, execution, and reporting

pub mod batch;
pub mod execute;
pub mod format;
pub mod metadata;
pub mod report;
pub mod retention;
pub mod scan;
