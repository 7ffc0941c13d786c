//! Vigil Pipeline - The driving service
//!
//! [`IntelPipeline`] owns one instance of every processing component and
//! the shared stores. `process` runs a raw finding through
//! extract → enrich → reputation → threat score → MITRE annotation and
//! persists the result; `run_correlation` sweeps the retained finding
//! window on its own schedule. Both paths degrade rather than halt:
//! enrichment failures thin the record, store failures retry then skip.

pub mod catalog;
pub mod service;
pub mod store;
pub mod window;

pub use catalog::{IocCatalog, IocSighting};
pub use service::{IntelPipeline, PipelineStatsSnapshot};
pub use store::{FindingStore, MemoryFindingStore};
pub use window::FindingWindow;
