//! Pipeline configuration
//!
//! Every tunable table lives here as an immutable struct, assembled once
//! at startup and injected into the components that need it. Defaults
//! mirror the published free-tier quotas and the tuned scoring tables
//! the pipeline ships with.

use crate::error::ConfigError;
use crate::ioc::IocType;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration injected into the pipeline service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub extractor: ExtractorConfig,
    pub enrichment: EnrichmentConfig,
    pub scoring: ScoringConfig,
    pub reputation: ReputationConfig,
    pub correlation: CorrelationConfig,
    pub keywords: KeywordConfig,
}

impl PipelineConfig {
    /// Build defaults, then overlay provider API keys from the
    /// environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.enrichment.load_keys_from_env();
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring.weights.validate()?;
        if self.correlation.max_window_entries == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "correlation.max_window_entries",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Extraction
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Benign domains never reported as indicators (exact or suffix match).
    pub allowed_domains: Vec<String>,
    pub min_domain_len: usize,
    pub max_domain_len: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            allowed_domains: [
                "google.com",
                "facebook.com",
                "twitter.com",
                "youtube.com",
                "instagram.com",
                "linkedin.com",
                "microsoft.com",
                "apple.com",
                "amazon.com",
                "reddit.com",
                "wikipedia.org",
                "github.com",
                "stackoverflow.com",
                "w3.org",
                "mozilla.org",
                "cloudflare.com",
                "example.com",
                "example.org",
                "localhost",
                "test.com",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            min_domain_len: 4,
            max_domain_len: 253,
        }
    }
}

// =============================================================================
// Enrichment
// =============================================================================

/// Per-provider connection and quota settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub base_url: String,
    /// Requests allowed per window.
    pub rate_limit: u32,
    pub rate_window: Duration,
}

impl ProviderSettings {
    /// A provider that needs an API key; disabled until one is set.
    pub fn keyed(base_url: &str, rate_limit: u32, rate_window: Duration) -> Self {
        Self {
            enabled: false,
            api_key: None,
            base_url: base_url.to_string(),
            rate_limit,
            rate_window,
        }
    }

    /// A provider usable without credentials.
    pub fn keyless(base_url: &str, rate_limit: u32, rate_window: Duration) -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: base_url.to_string(),
            rate_limit,
            rate_window,
        }
    }

    /// Set the key from an environment variable if present; a key
    /// enables the provider.
    pub fn key_from_env(&mut self, var: &str) {
        if let Ok(key) = std::env::var(var) {
            if !key.is_empty() {
                self.api_key = Some(key);
                self.enabled = true;
            }
        }
    }
}

/// Per-type caps on how many indicators of a finding get enriched.
/// Bounding fan-out is part of the design: free-tier quotas are shared
/// by every upcoming finding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnrichmentCaps {
    pub ips: usize,
    pub domains: usize,
    pub urls: usize,
    pub hashes: usize,
}

impl Default for EnrichmentCaps {
    fn default() -> Self {
        Self {
            ips: 3,
            domains: 3,
            urls: 2,
            hashes: 2,
        }
    }
}

impl EnrichmentCaps {
    pub fn for_type(&self, ioc_type: IocType) -> usize {
        match ioc_type {
            IocType::Ip => self.ips,
            IocType::Domain => self.domains,
            IocType::Url => self.urls,
            IocType::Hash => self.hashes,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// How long a merged record stays usable.
    pub cache_ttl: Duration,
    pub caps: EnrichmentCaps,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Deadline for one entity's whole provider fan-out; late providers
    /// are dropped and the partial union is kept.
    pub entity_deadline: Duration,
    pub retry_attempts: u32,
    pub retry_backoff: Duration,
    pub virustotal: ProviderSettings,
    pub abuseipdb: ProviderSettings,
    pub greynoise: ProviderSettings,
    pub threatfox: ProviderSettings,
    pub urlhaus: ProviderSettings,
    pub phishtank: ProviderSettings,
    pub pulsedive: ProviderSettings,
    pub otx: ProviderSettings,
    pub shodan: ProviderSettings,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        let minute = Duration::from_secs(60);
        Self {
            cache_ttl: Duration::from_secs(86_400),
            caps: EnrichmentCaps::default(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
            entity_deadline: Duration::from_secs(30),
            retry_attempts: 3,
            retry_backoff: Duration::from_secs(2),
            virustotal: ProviderSettings::keyed("https://www.virustotal.com/api/v3", 4, minute),
            abuseipdb: ProviderSettings::keyed(
                "https://api.abuseipdb.com/api/v2",
                1000,
                Duration::from_secs(86_400),
            ),
            // Falls back to the community endpoint when keyless, so it
            // stays enabled either way.
            greynoise: ProviderSettings::keyless("https://api.greynoise.io/v3", 50, minute),
            threatfox: ProviderSettings::keyless("https://threatfox-api.abuse.ch/api/v1/", 60, minute),
            urlhaus: ProviderSettings::keyless("https://urlhaus-api.abuse.ch/v1/", 60, minute),
            phishtank: ProviderSettings::keyed("https://checkurl.phishtank.com", 10, minute),
            pulsedive: ProviderSettings::keyed("https://pulsedive.com/api", 30, minute),
            otx: ProviderSettings::keyed("https://otx.alienvault.com/api/v1", 10, minute),
            shodan: ProviderSettings::keyed("https://api.shodan.io", 1, Duration::from_secs(1)),
        }
    }
}

impl EnrichmentConfig {
    pub fn load_keys_from_env(&mut self) {
        self.virustotal.key_from_env("VIRUSTOTAL_API_KEY");
        self.abuseipdb.key_from_env("ABUSEIPDB_API_KEY");
        self.greynoise.key_from_env("GREYNOISE_API_KEY");
        self.phishtank.key_from_env("PHISHTANK_API_KEY");
        self.pulsedive.key_from_env("PULSEDIVE_API_KEY");
        self.otx.key_from_env("ALIENVAULT_OTX_API_KEY");
        self.shodan.key_from_env("SHODAN_API_KEY");
    }
}

// =============================================================================
// Threat Scoring
// =============================================================================

/// Weights for the six composite sub-scores. Must sum to 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeatureWeights {
    pub keyword_criticality: f64,
    pub ioc_volume: f64,
    pub source_reputation: f64,
    pub temporal_clustering: f64,
    pub content_analysis: f64,
    pub correlation: f64,
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self {
            keyword_criticality: 0.25,
            ioc_volume: 0.20,
            source_reputation: 0.15,
            temporal_clustering: 0.15,
            content_analysis: 0.15,
            correlation: 0.10,
        }
    }
}

impl FeatureWeights {
    pub fn sum(&self) -> f64 {
        self.keyword_criticality
            + self.ioc_volume
            + self.source_reputation
            + self.temporal_clustering
            + self.content_analysis
            + self.correlation
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sum = self.sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::WeightSum { sum });
        }
        Ok(())
    }
}

/// Per-type weight applied to indicator counts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IocWeights {
    pub ips: f64,
    pub domains: f64,
    pub urls: f64,
    pub emails: f64,
    pub hashes: f64,
    pub other: f64,
}

impl Default for IocWeights {
    fn default() -> Self {
        Self {
            ips: 10.0,
            domains: 8.0,
            urls: 5.0,
            emails: 12.0,
            hashes: 15.0,
            other: 5.0,
        }
    }
}

impl IocWeights {
    pub fn for_type(&self, ioc_type: IocType) -> f64 {
        match ioc_type {
            IocType::Ip => self.ips,
            IocType::Domain => self.domains,
            IocType::Url => self.urls,
            IocType::Email => self.emails,
            IocType::Hash => self.hashes,
            IocType::Cve | IocType::CryptoAddress | IocType::WindowsArtifact => self.other,
        }
    }
}

/// Content regex and the fixed points it contributes when it matches.
/// Patterns are compiled case-insensitively by the scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPattern {
    pub pattern: String,
    pub points: f64,
}

impl ContentPattern {
    fn new(pattern: &str, points: f64) -> Self {
        Self {
            pattern: pattern.to_string(),
            points,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub weights: FeatureWeights,
    /// Tier of terms that alone justify a high score. Scoring takes the
    /// MAX matching term, never a sum, so keyword stuffing cannot
    /// inflate it.
    pub critical_keywords: Vec<(String, f64)>,
    pub high_keywords: Vec<(String, f64)>,
    pub ioc_weights: IocWeights,
    /// Source-name substring -> risk tier.
    pub source_tiers: Vec<(String, f64)>,
    pub default_source_score: f64,
    pub content_patterns: Vec<ContentPattern>,
    /// Findings longer than this many words get extra content points.
    pub long_content_words: usize,
    pub long_content_points: f64,
    /// Points per clustered finding in the trailing window.
    pub temporal_points: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let critical = [
            ("ransomware", 100.0),
            ("zero-day", 100.0),
            ("breach", 95.0),
            ("credential dump", 95.0),
            ("exfiltration", 90.0),
            ("database leak", 90.0),
            ("apt", 85.0),
            ("backdoor", 80.0),
            ("c2", 80.0),
            ("malware", 75.0),
            ("exploit", 75.0),
            ("vulnerability", 70.0),
            ("botnet", 70.0),
            ("phishing", 65.0),
            ("ddos", 60.0),
        ];
        let high = [
            ("leaked", 60.0),
            ("hacked", 60.0),
            ("compromised", 60.0),
            ("stolen", 55.0),
            ("exposed", 55.0),
            ("password", 50.0),
            ("attack", 45.0),
            ("threat", 40.0),
        ];
        let tiers = [
            ("Dark Web", 95.0),
            ("GitHub Secret Scanning", 90.0),
            ("Pastebin", 80.0),
            ("Telegram", 75.0),
            ("Reddit", 65.0),
            ("Clear Web Forum", 60.0),
            ("Social Media", 50.0),
        ];
        Self {
            weights: FeatureWeights::default(),
            critical_keywords: critical
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            high_keywords: high.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            ioc_weights: IocWeights::default(),
            source_tiers: tiers.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            default_source_score: 50.0,
            content_patterns: vec![
                ContentPattern::new(r"(username|user|login)\s*[:=].*?(password|pass|pwd)\s*[:=]", 30.0),
                ContentPattern::new(r"AWS_?(SECRET_?)?ACCESS_?KEY", 25.0),
                ContentPattern::new(r"(0day|zero-day)", 25.0),
                ContentPattern::new(r"(root|admin|sudo).*password", 20.0),
                ContentPattern::new(r"CVE-\d{4}-\d{4,}", 20.0),
                ContentPattern::new(r"api[_\s]?key", 15.0),
                ContentPattern::new(r"(INSERT|UPDATE|DELETE)\s+(INTO|FROM)", 15.0),
                ContentPattern::new(r"SELECT.*FROM.*WHERE", 10.0),
            ],
            long_content_words: 500,
            long_content_points: 10.0,
            temporal_points: 15.0,
        }
    }
}

// =============================================================================
// Reputation
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationConfig {
    /// TLDs that cost a domain reputation points.
    pub suspicious_tlds: Vec<String>,
    /// Phishing-bait words checked inside domain names.
    pub suspicious_keywords: Vec<String>,
    /// URL path prefixes that suggest credential harvesting.
    pub suspicious_paths: Vec<String>,
    /// Domains longer than this are penalized.
    pub long_domain_len: usize,
    /// Query strings longer than this are penalized.
    pub long_query_len: usize,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            suspicious_tlds: ["xyz", "top", "tk", "ml", "ga", "cf", "gq", "win", "loan"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            suspicious_keywords: [
                "login", "verify", "secure", "account", "banking", "paypal", "update",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            suspicious_paths: ["/admin", "/login", "/verify", "/update", "/secure"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            long_domain_len: 50,
            long_query_len: 100,
        }
    }
}

// =============================================================================
// Correlation
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationConfig {
    /// Trailing window of findings considered for pairing.
    pub window: Duration,
    /// Hard cap on entries fed to the pairwise scan; the scan is O(n^2)
    /// in this number.
    pub max_window_entries: usize,
    /// Edges scoring at or below this are discarded.
    pub retention_threshold: f64,
    /// Findings closer than this get the full time-proximity bonus.
    pub near_duration: Duration,
    /// Findings closer than this (but beyond near) get the reduced bonus.
    pub far_duration: Duration,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(86_400),
            max_window_entries: 500,
            retention_threshold: 0.3,
            near_duration: Duration::from_secs(3600),
            far_duration: Duration::from_secs(7200),
        }
    }
}

// =============================================================================
// Keywords
// =============================================================================

/// Monitored terms collectors matched on; reused for temporal
/// clustering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    pub keywords: Vec<String>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            keywords: [
                "leak",
                "database",
                "dump",
                "credentials",
                "breach",
                "stolen data",
                "data breach",
                "hacked",
                "compromised",
                "exposed",
                "sql dump",
                "combo",
                "combolist",
                "account",
                "passwords",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}
