//! Pipeline service
//!
//! One `IntelPipeline` per process. It owns the component instances and
//! shared stores, drives each raw finding through the full pipeline,
//! and runs correlation sweeps over the retained window on its own
//! schedule.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aho_corasick::AhoCorasick;
use anyhow::Context;
use chrono::Utc;
use tracing::{error, info, warn};
use vigil_common::config::PipelineConfig;
use vigil_common::correlation::CorrelationEdge;
use vigil_common::entity::ScoreContext;
use vigil_common::enrichment::EnrichmentRecord;
use vigil_common::finding::{Finding, RawFinding};
use vigil_correlate::{CorrelationEngine, MitreMapper};
use vigil_enrich::{summarize_risk, EnrichmentOrchestrator, EnrichmentStatsSnapshot};
use vigil_extract::IocExtractor;
use vigil_score::{ReputationScorer, ReputationStore, ThreatScorer};

use crate::catalog::IocCatalog;
use crate::store::{FindingStore, MemoryFindingStore};
use crate::window::FindingWindow;

const STORE_RETRY_ATTEMPTS: u32 = 3;
const STORE_RETRY_BACKOFF: Duration = Duration::from_millis(500);

// =============================================================================
// Stats
// =============================================================================

#[derive(Default)]
struct PipelineStats {
    findings_processed: AtomicU64,
    iocs_extracted: AtomicU64,
    correlations_found: AtomicU64,
    store_skips: AtomicU64,
    severity: [AtomicU64; 4],
}

/// Point-in-time pipeline counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStatsSnapshot {
    pub findings_processed: u64,
    pub iocs_extracted: u64,
    pub correlations_found: u64,
    pub store_skips: u64,
    /// Processed findings per tier, indexed LOW..CRITICAL.
    pub severity: [u64; 4],
    pub enrichment: EnrichmentStatsSnapshot,
    pub entities_tracked: usize,
    pub iocs_cataloged: usize,
}

// =============================================================================
// Service
// =============================================================================

pub struct IntelPipeline {
    config: Arc<PipelineConfig>,
    extractor: IocExtractor,
    enricher: EnrichmentOrchestrator,
    reputation: ReputationScorer,
    reputation_store: Arc<ReputationStore>,
    threat: ThreatScorer,
    correlator: CorrelationEngine,
    mapper: MitreMapper,
    /// Matcher over the monitored keyword list, for findings whose
    /// collector did not tag keywords itself.
    monitored: AhoCorasick,
    window: FindingWindow,
    catalog: IocCatalog,
    store: Arc<dyn FindingStore>,
    stats: PipelineStats,
}

impl IntelPipeline {
    pub fn new(config: PipelineConfig, store: Arc<dyn FindingStore>) -> anyhow::Result<Self> {
        let enricher = EnrichmentOrchestrator::new(&config.enrichment);
        Self::with_enricher(config, store, enricher)
    }

    /// Pipeline over a caller-supplied orchestrator. Tests inject mock
    /// provider registries through this.
    pub fn with_enricher(
        config: PipelineConfig,
        store: Arc<dyn FindingStore>,
        enricher: EnrichmentOrchestrator,
    ) -> anyhow::Result<Self> {
        config
            .validate()
            .context("invalid pipeline configuration")?;

        let monitored = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&config.keywords.keywords)
            .context("invalid monitored keyword list")?;

        let config = Arc::new(config);
        let reputation_store = Arc::new(ReputationStore::new());

        let pipeline = Self {
            extractor: IocExtractor::new(&config.extractor),
            enricher,
            reputation: ReputationScorer::new(config.reputation.clone(), reputation_store.clone()),
            reputation_store,
            threat: ThreatScorer::new(config.scoring.clone()),
            correlator: CorrelationEngine::new(config.correlation.clone()),
            mapper: MitreMapper::new(),
            monitored,
            window: FindingWindow::new(),
            catalog: IocCatalog::new(),
            store,
            stats: PipelineStats::default(),
            config,
        };
        info!("threat-intelligence pipeline initialized");
        Ok(pipeline)
    }

    pub fn with_memory_store(config: PipelineConfig) -> anyhow::Result<Self> {
        Self::new(config, Arc::new(MemoryFindingStore::new()))
    }

    /// Run one raw finding through the whole pipeline. Never fails:
    /// degraded enrichment thins the record and unwritable findings are
    /// skipped after bounded retries.
    pub async fn process(&self, raw: RawFinding) -> Finding {
        let mut finding = Finding::from_raw(raw);
        let text = finding.text();
        if finding.keywords.is_empty() {
            finding.keywords = self.matched_keywords(&text);
        }

        finding.iocs = self.extractor.extract(&text);
        let density = self.extractor.ioc_density(&text, &finding.iocs);
        self.catalog.record_set(&finding.iocs, &finding.source);

        finding.enrichment = self.enricher.enrich_iocs(&finding.iocs).await;
        let risk = summarize_risk(&finding.iocs, density, &finding.enrichment);
        finding.enrichment_risk = risk.score;
        finding.threat_indicators = risk.threat_indicators;

        for record in &finding.enrichment {
            let context = enrichment_context(record);
            self.reputation
                .score(record.entity_type, &record.value, context);
        }

        let recent = self.window.snapshot();
        let assessment = self.threat.score_finding(&finding, &recent);
        finding.threat_score = assessment.threat_score;
        finding.severity = assessment.severity;
        finding.confidence = assessment.confidence;
        finding.risk_factors = assessment.risk_factors;

        finding.mitre_techniques = self.mapper.annotate(&finding);

        self.window.push(finding.clone());
        self.persist(&finding).await;

        self.stats.findings_processed.fetch_add(1, Ordering::Relaxed);
        self.stats
            .iocs_extracted
            .fetch_add(finding.iocs.total() as u64, Ordering::Relaxed);
        self.stats.severity[finding.severity as usize].fetch_add(1, Ordering::Relaxed);

        info!(
            id = %finding.id,
            source = %finding.source,
            iocs = finding.iocs.total(),
            score = finding.threat_score,
            severity = %finding.severity,
            "processed finding"
        );
        finding
    }

    /// Monitored keywords present in the text, in list order.
    fn matched_keywords(&self, text: &str) -> Vec<String> {
        let mut matched: Vec<String> = Vec::new();
        for hit in self.monitored.find_iter(text) {
            let keyword = &self.config.keywords.keywords[hit.pattern().as_usize()];
            if !matched.contains(keyword) {
                matched.push(keyword.clone());
            }
        }
        matched
    }

    /// Spawn the periodic correlation sweep. Runs until aborted.
    pub fn spawn_correlation_sweeps(
        self: &Arc<Self>,
        every: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let edges = pipeline.run_correlation();
                if !edges.is_empty() {
                    info!(edges = edges.len(), "correlation sweep finished");
                }
            }
        })
    }

    /// Sweep the retained window for correlated findings. Evicts entries
    /// older than the configured window first, then records
    /// back-references for every retained edge.
    pub fn run_correlation(&self) -> Vec<CorrelationEdge> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.config.correlation.window)
                .unwrap_or_else(|_| chrono::Duration::hours(24));
        let evicted = self.window.prune_older_than(cutoff);
        if evicted > 0 {
            info!(evicted, "evicted stale findings from correlation window");
        }

        let edges = self.correlator.correlate(&self.window.snapshot());
        for edge in &edges {
            self.window.link(edge.finding_a, edge.finding_b);
        }
        self.stats
            .correlations_found
            .fetch_add(edges.len() as u64, Ordering::Relaxed);
        edges
    }

    pub fn stats(&self) -> PipelineStatsSnapshot {
        PipelineStatsSnapshot {
            findings_processed: self.stats.findings_processed.load(Ordering::Relaxed),
            iocs_extracted: self.stats.iocs_extracted.load(Ordering::Relaxed),
            correlations_found: self.stats.correlations_found.load(Ordering::Relaxed),
            store_skips: self.stats.store_skips.load(Ordering::Relaxed),
            severity: [
                self.stats.severity[0].load(Ordering::Relaxed),
                self.stats.severity[1].load(Ordering::Relaxed),
                self.stats.severity[2].load(Ordering::Relaxed),
                self.stats.severity[3].load(Ordering::Relaxed),
            ],
            enrichment: self.enricher.stats(),
            entities_tracked: self.reputation_store.len(),
            iocs_cataloged: self.catalog.len(),
        }
    }

    pub fn catalog(&self) -> &IocCatalog {
        &self.catalog
    }

    pub fn reputation_store(&self) -> &ReputationStore {
        &self.reputation_store
    }

    pub fn window(&self) -> &FindingWindow {
        &self.window
    }

    /// Bounded retry, then skip. One unwritable finding never stalls the
    /// pipeline.
    async fn persist(&self, finding: &Finding) {
        for attempt in 1..=STORE_RETRY_ATTEMPTS {
            match self.store.put(finding).await {
                Ok(()) => return,
                Err(err) if attempt < STORE_RETRY_ATTEMPTS => {
                    warn!(id = %finding.id, attempt, error = %err, "store write failed, retrying");
                    tokio::time::sleep(STORE_RETRY_BACKOFF).await;
                }
                Err(err) => {
                    error!(id = %finding.id, error = %err, "store write failed, skipping finding");
                    self.stats.store_skips.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }
}

/// Derive reputation hints from a merged enrichment record. Thresholds
/// mirror the enrichment risk summary's malicious signals.
fn enrichment_context(record: &EnrichmentRecord) -> ScoreContext {
    let mut context = ScoreContext::default();

    if let Some(payload) = record.payload("virustotal") {
        if payload["malicious"].as_u64().unwrap_or(0) > 0 {
            context.malicious = true;
        }
        if payload["suspicious"].as_u64().unwrap_or(0) > 0 {
            context.suspicious = true;
        }
    }
    if let Some(payload) = record.payload("abuseipdb") {
        if payload["abuse_confidence_score"].as_u64().unwrap_or(0) >= 75 {
            context.malicious = true;
        }
        if payload["usage_type"]
            .as_str()
            .is_some_and(|u| u.contains("Data Center"))
        {
            context.cloud_provider = true;
        }
    }
    if let Some(payload) = record.payload("greynoise") {
        match payload["classification"].as_str() {
            Some("malicious") => context.malicious = true,
            Some("suspicious") => context.suspicious = true,
            _ => {}
        }
    }
    if let Some(payload) = record.payload("phishtank") {
        if payload["in_database"].as_bool().unwrap_or(false) {
            context.malicious = true;
        }
    }
    if record.payload("threatfox").is_some() {
        // ThreatFox only answers for indicators it already tracks.
        context.malicious = true;
    }
    if let Some(payload) = record.payload("urlhaus") {
        if payload["url_status"].as_str() == Some("online")
            || payload["url_count"].as_u64().unwrap_or(0) > 0
        {
            context.malicious = true;
        }
    }

    context
}
