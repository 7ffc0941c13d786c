//! Multi-provider indicator enrichment
//!
//! Given an entity (type + value), the orchestrator consults a TTL cache
//! and, on a miss, fans out to every enabled provider that declares
//! capability for that type. Each provider owns a fixed-window rate
//! limiter sized to its free-tier quota; a drained budget skips the
//! provider instead of blocking. Provider failures are logged and
//! isolated. The merged record is the union of all successful payloads,
//! tagged by provider name.
//!
//! Nine providers ship with the crate: GreyNoise, AbuseIPDB, PhishTank,
//! ThreatFox, URLhaus, AlienVault OTX, VirusTotal, Pulsedive and Shodan.

pub mod cache;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod provider;
pub mod providers;
pub mod ratelimit;
pub mod risk;

pub use cache::EnrichmentCache;
pub use error::{ProviderError, ProviderResult};
pub use http::HttpClient;
pub use orchestrator::{EnrichmentOrchestrator, EnrichmentStatsSnapshot};
pub use provider::{Provider, ProviderRegistry};
pub use ratelimit::FixedWindowLimiter;
pub use risk::{summarize_risk, RiskSummary};
