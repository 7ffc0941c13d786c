//! Vigil Correlate - Cross-finding relationship discovery
//!
//! The [`CorrelationEngine`] scans a bounded trailing window of findings
//! pairwise and retains edges whose relatedness score clears the
//! threshold. The [`MitreMapper`] annotates findings and retained edges
//! with ATT&CK technique ids from static lookup tables.

pub mod engine;
pub mod mitre;

pub use engine::CorrelationEngine;
pub use mitre::MitreMapper;
