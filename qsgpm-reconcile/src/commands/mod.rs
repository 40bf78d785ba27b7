//! Commands module - reconciliation driver built on the QuickSight service layer

mod apply;
mod permission;
mod run;
pub(crate) mod service;

pub use apply::{ApplyGroupsOptions, ApplyGroupsSummary};
pub use run::{App, NamespaceReport, RunOption, RunReport};
pub use service::QuickSightService;
