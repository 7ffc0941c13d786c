//! Concrete intelligence providers
//!
//! Each provider summarizes its upstream response into a flat JSON
//! payload carrying only the fields downstream scoring reads. Fan-out
//! order for an entity type is registration order filtered by declared
//! capability, so the registration sequence in [`default_registry`] is
//! deliberate.

use std::sync::Arc;

use vigil_common::config::EnrichmentConfig;

use crate::http::HttpClient;
use crate::provider::ProviderRegistry;

pub mod abuseipdb;
pub mod greynoise;
pub mod otx;
pub mod phishtank;
pub mod pulsedive;
pub mod shodan;
pub mod threatfox;
pub mod urlhaus;
pub mod virustotal;

pub use abuseipdb::AbuseIpDb;
pub use greynoise::GreyNoise;
pub use otx::AlienVaultOtx;
pub use phishtank::PhishTank;
pub use pulsedive::Pulsedive;
pub use shodan::Shodan;
pub use threatfox::ThreatFox;
pub use urlhaus::UrlHaus;
pub use virustotal::VirusTotal;

/// Build the standard nine-provider registry from configuration.
pub fn default_registry(config: &EnrichmentConfig) -> ProviderRegistry {
    let http = Arc::new(HttpClient::new(config));
    let mut registry = ProviderRegistry::new();

    let greynoise = &config.greynoise;
    registry.register(
        Arc::new(GreyNoise::new(greynoise.clone(), http.clone())),
        greynoise.rate_limit,
        greynoise.rate_window,
    );
    let abuseipdb = &config.abuseipdb;
    registry.register(
        Arc::new(AbuseIpDb::new(abuseipdb.clone(), http.clone())),
        abuseipdb.rate_limit,
        abuseipdb.rate_window,
    );
    let phishtank = &config.phishtank;
    registry.register(
        Arc::new(PhishTank::new(phishtank.clone(), http.clone())),
        phishtank.rate_limit,
        phishtank.rate_window,
    );
    let threatfox = &config.threatfox;
    registry.register(
        Arc::new(ThreatFox::new(threatfox.clone(), http.clone())),
        threatfox.rate_limit,
        threatfox.rate_window,
    );
    let urlhaus = &config.urlhaus;
    registry.register(
        Arc::new(UrlHaus::new(urlhaus.clone(), http.clone())),
        urlhaus.rate_limit,
        urlhaus.rate_window,
    );
    let otx = &config.otx;
    registry.register(
        Arc::new(AlienVaultOtx::new(otx.clone(), http.clone())),
        otx.rate_limit,
        otx.rate_window,
    );
    let virustotal = &config.virustotal;
    registry.register(
        Arc::new(VirusTotal::new(virustotal.clone(), http.clone())),
        virustotal.rate_limit,
        virustotal.rate_window,
    );
    let pulsedive = &config.pulsedive;
    registry.register(
        Arc::new(Pulsedive::new(pulsedive.clone(), http.clone())),
        pulsedive.rate_limit,
        pulsedive.rate_window,
    );
    let shodan = &config.shodan;
    registry.register(
        Arc::new(Shodan::new(shodan.clone(), http)),
        shodan.rate_limit,
        shodan.rate_window,
    );

    registry
}

/// String field with a default, for upstream payloads that omit keys.
pub(crate) fn str_field(value: &serde_json::Value, key: &str, default: &str) -> String {
    value[key].as_str().unwrap_or(default).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_common::entity::EntityType;

    #[test]
    fn test_default_registry_fan_out_order() {
        let registry = default_registry(&EnrichmentConfig::default());
        assert_eq!(registry.len(), 9);

        // Keyless providers only; keyed ones are disabled without keys.
        let ip_order: Vec<&str> = registry
            .providers_for(EntityType::Ip)
            .iter()
            .map(|entry| entry.provider.name())
            .collect();
        assert_eq!(ip_order, vec!["greynoise"]);

        let hash_order: Vec<&str> = registry
            .providers_for(EntityType::Hash)
            .iter()
            .map(|entry| entry.provider.name())
            .collect();
        assert_eq!(hash_order, vec!["threatfox", "urlhaus"]);
    }

    #[test]
    fn test_keys_enable_full_fan_out() {
        let mut config = EnrichmentConfig::default();
        for settings in [
            &mut config.virustotal,
            &mut config.abuseipdb,
            &mut config.phishtank,
            &mut config.pulsedive,
            &mut config.otx,
            &mut config.shodan,
        ] {
            settings.api_key = Some("test-key".to_string());
            settings.enabled = true;
        }

        let registry = default_registry(&config);
        let ip_order: Vec<&str> = registry
            .providers_for(EntityType::Ip)
            .iter()
            .map(|entry| entry.provider.name())
            .collect();
        assert_eq!(
            ip_order,
            vec!["greynoise", "abuseipdb", "alienvault_otx", "virustotal", "pulsedive", "shodan"]
        );

        let url_order: Vec<&str> = registry
            .providers_for(EntityType::Url)
            .iter()
            .map(|entry| entry.provider.name())
            .collect();
        assert_eq!(url_order, vec!["phishtank", "urlhaus", "virustotal"]);

        let domain_order: Vec<&str> = registry
            .providers_for(EntityType::Domain)
            .iter()
            .map(|entry| entry.provider.name())
            .collect();
        assert_eq!(
            domain_order,
            vec!["urlhaus", "alienvault_otx", "virustotal", "pulsedive"]
        );
    }
}
