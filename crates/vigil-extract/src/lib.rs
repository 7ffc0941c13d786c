//! IOC Extraction
//!
//! Turns free-form finding text into a typed indicator set:
//! - Defang reversal (hxxp, [dot], [.], [:], [@]) before matching
//! - Pattern extraction for IPs, domains, URLs, emails, hashes, CVEs,
//!   crypto addresses and Windows artifacts
//! - Private and reserved address exclusion
//! - Benign-domain allow-list filtering
//! - IOC density metric for downstream scoring

use std::net::{Ipv4Addr, Ipv6Addr};

use tracing::debug;
use vigil_common::config::ExtractorConfig;
use vigil_common::ioc::{IocSet, IocType};

pub mod filters;
pub mod patterns;

pub use filters::IndicatorFilters;
pub use patterns::PatternLibrary;

// =============================================================================
// Extractor
// =============================================================================

/// Stateless text-to-indicators engine. Compile once, share freely.
pub struct IocExtractor {
    patterns: PatternLibrary,
    filters: IndicatorFilters,
}

impl IocExtractor {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            patterns: PatternLibrary::compile(),
            filters: IndicatorFilters::new(config),
        }
    }

    /// Reverse common defanging so obfuscated indicators still match.
    pub fn refang(&self, text: &str) -> String {
        let text = self.patterns.refang_hxxp.replace_all(text, "http");
        let text = self.patterns.refang_dot_word.replace_all(&text, ".");
        text.replace("[.]", ".")
            .replace("[:]", ":")
            .replace("[@]", "@")
    }

    /// Extract every supported indicator type from one finding's text.
    /// Values are deduplicated per type; types with no hits are absent
    /// from the result.
    pub fn extract(&self, text: &str) -> IocSet {
        let text = self.refang(text);
        let mut iocs = IocSet::new();

        for m in self.patterns.ipv4.find_iter(&text) {
            if let Ok(addr) = m.as_str().parse::<Ipv4Addr>() {
                if self.filters.is_public_ipv4(addr) {
                    iocs.insert(IocType::Ip, m.as_str());
                }
            }
        }

        // IPv6 has no single trustworthy regex; tokenize and let the
        // address parser decide.
        for token in Self::ipv6_tokens(&text) {
            if let Ok(addr) = token.parse::<Ipv6Addr>() {
                if self.filters.is_public_ipv6(addr) {
                    iocs.insert(IocType::Ip, token);
                }
            }
        }

        for m in self.patterns.domain.find_iter(&text) {
            let domain = m.as_str();
            if self.filters.is_valid_domain(domain) && !self.filters.is_allowed_domain(domain) {
                iocs.insert(IocType::Domain, domain);
            }
        }

        for m in self.patterns.url.find_iter(&text) {
            iocs.insert(IocType::Url, m.as_str());
        }

        for m in self.patterns.email.find_iter(&text) {
            if self.filters.is_valid_email(m.as_str()) {
                iocs.insert(IocType::Email, m.as_str());
            }
        }

        for pattern in [&self.patterns.md5, &self.patterns.sha1, &self.patterns.sha256] {
            for m in pattern.find_iter(&text) {
                iocs.insert(IocType::Hash, m.as_str());
            }
        }

        for m in self.patterns.cve.find_iter(&text) {
            iocs.insert(IocType::Cve, m.as_str());
        }

        for pattern in [&self.patterns.bitcoin, &self.patterns.ethereum] {
            for m in pattern.find_iter(&text) {
                iocs.insert(IocType::CryptoAddress, m.as_str());
            }
        }

        for pattern in [
            &self.patterns.windows_path,
            &self.patterns.registry_key,
            &self.patterns.mutex,
        ] {
            for m in pattern.find_iter(&text) {
                iocs.insert(IocType::WindowsArtifact, m.as_str());
            }
        }

        if !iocs.is_empty() {
            debug!(total = iocs.total(), "extracted indicators");
        }

        iocs
    }

    /// Share of words that are indicators, as a percentage capped at 100.
    pub fn ioc_density(&self, text: &str, iocs: &IocSet) -> f64 {
        let words = text.split_whitespace().count();
        if words == 0 {
            return 0.0;
        }
        (iocs.total() as f64 / words as f64 * 100.0).min(100.0)
    }

    fn ipv6_tokens(text: &str) -> Vec<&str> {
        text.split(|c: char| c.is_whitespace() || ",;|(){}<>\"'[]".contains(c))
            .map(|token| token.trim_matches(|c: char| c.is_whitespace() || ".!?;".contains(c)))
            .filter(|token| !token.is_empty() && token.contains(':'))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use vigil_common::ioc::HashKind;

    fn extractor() -> IocExtractor {
        IocExtractor::new(&ExtractorConfig::default())
    }

    #[test]
    fn test_refang_restores_indicators() {
        let extractor = extractor();
        assert_eq!(
            extractor.refang("hxxps://evil[.]com/payload"),
            "https://evil.com/payload"
        );
        assert_eq!(extractor.refang("bad[dot]site[dot]io"), "bad.site.io");
        assert_eq!(extractor.refang("user[@]evil[.]com"), "user@evil.com");
        assert_eq!(extractor.refang("hXXp[:]//evil[.]com"), "http://evil.com");
    }

    #[test]
    fn test_defanged_url_extracted() {
        let extractor = extractor();
        let iocs = extractor.extract("payload at hxxps://evil-domain[.]xyz/drop.bin");
        assert!(iocs.contains(IocType::Url, "https://evil-domain.xyz/drop.bin"));
        assert!(iocs.contains(IocType::Domain, "evil-domain.xyz"));
    }

    #[test]
    fn test_private_addresses_excluded() {
        let extractor = extractor();
        let iocs = extractor
            .extract("lateral movement from 10.0.0.5 to 192.168.1.20, exfil to 203.0.113.5");
        let ips = iocs.get(IocType::Ip).unwrap();
        assert_eq!(ips.len(), 1);
        assert!(ips.contains("203.0.113.5"));
    }

    #[test]
    fn test_ipv6_extraction() {
        let extractor = extractor();
        let iocs = extractor.extract("beacon to 2001:db8::bad:1 (loopback ::1 ignored)");
        let ips = iocs.get(IocType::Ip).unwrap();
        assert!(ips.contains("2001:db8::bad:1"));
        assert!(!ips.contains("::1"));
    }

    #[test]
    fn test_domain_allowlist() {
        let extractor = extractor();
        let iocs = extractor.extract("malware hosted on evil-domain.xyz, writeup on github.com");
        let domains = iocs.get(IocType::Domain).unwrap();
        assert!(domains.contains("evil-domain.xyz"));
        assert!(!domains.contains("github.com"));
    }

    #[test]
    fn test_hash_extraction_all_kinds() {
        let extractor = extractor();
        let text = "md5 d41d8cd98f00b204e9800998ecf8427e \
                    sha1 da39a3ee5e6b4b0d3255bfef95601890afd80709 \
                    sha256 e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        let iocs = extractor.extract(text);
        assert_eq!(iocs.count(IocType::Hash), 3);
    }

    #[test]
    fn test_cve_and_crypto_addresses() {
        let extractor = extractor();
        let iocs = extractor.extract(
            "exploits CVE-2021-44228, pay to 1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa \
             or 0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BEAed",
        );
        assert!(iocs.contains(IocType::Cve, "CVE-2021-44228"));
        assert_eq!(iocs.count(IocType::CryptoAddress), 2);
    }

    #[test]
    fn test_windows_artifacts() {
        let extractor = extractor();
        let text = "dropped C:\\Windows\\Temp\\payload.exe\n\
                    key HKLM\\Software\\Run\n\
                    mutex \\BaseNamedObjects\\Global_x99";
        let iocs = extractor.extract(text);
        let artifacts = iocs.get(IocType::WindowsArtifact).unwrap();
        assert!(artifacts.contains("C:\\Windows\\Temp\\payload.exe"));
        assert!(artifacts.contains("HKLM\\Software\\Run"));
        assert!(artifacts.contains("\\BaseNamedObjects\\Global_x99"));
    }

    #[test]
    fn test_breach_report_extraction() {
        let extractor = extractor();
        let iocs = extractor.extract(
            "Leaked database dump at 203.0.113.5, contact breach@evil.com, \
             hash d41d8cd98f00b204e9800998ecf8427e",
        );
        assert!(iocs.contains(IocType::Ip, "203.0.113.5"));
        assert!(iocs.contains(IocType::Email, "breach@evil.com"));
        assert!(iocs.contains(IocType::Hash, "d41d8cd98f00b204e9800998ecf8427e"));
    }

    #[test]
    fn test_density() {
        let extractor = extractor();
        let text = "breach at 203.0.113.5 now";
        let iocs = extractor.extract(text);
        assert!((extractor.ioc_density(text, &iocs) - 25.0).abs() < f64::EPSILON);
        assert_eq!(extractor.ioc_density("", &IocSet::new()), 0.0);
    }

    #[test]
    fn test_density_capped() {
        let extractor = extractor();
        let text = "203.0.113.5 198.51.100.7 breach@evil.com";
        let iocs = extractor.extract(text);
        assert!(extractor.ioc_density(text, &iocs) <= 100.0);
    }

    /// Fragments a defanged report is made of; bare brackets are
    /// excluded so markers never nest.
    fn defangish() -> impl Strategy<Value = String> {
        proptest::collection::vec(
            prop_oneof![
                Just("hxxp".to_string()),
                Just("[dot]".to_string()),
                Just("[.]".to_string()),
                Just("[:]".to_string()),
                Just("[@]".to_string()),
                "[a-z0-9 ./:@-]{1,8}",
            ],
            0..20,
        )
        .prop_map(|parts| parts.concat())
    }

    proptest! {
        #[test]
        fn prop_refang_idempotent(text in defangish()) {
            let extractor = extractor();
            let once = extractor.refang(&text);
            prop_assert_eq!(extractor.refang(&once), once);
        }

        #[test]
        fn prop_sha256_never_buckets_smaller(hex in "[a-f0-9]{64}") {
            let extractor = extractor();
            let iocs = extractor.extract(&format!("sample {hex} observed"));
            prop_assert_eq!(iocs.count(IocType::Hash), 1);
            prop_assert!(iocs.contains(IocType::Hash, &hex));
            prop_assert_eq!(HashKind::from_len(hex.len()), Some(HashKind::Sha256));
        }

        #[test]
        fn prop_private_ipv4_never_extracted(b in 0u8..=255u8, c in 0u8..=255u8) {
            let extractor = extractor();
            let iocs = extractor.extract(&format!("seen at 10.{b}.{c}.7 and 192.168.{b}.{c}"));
            prop_assert_eq!(iocs.count(IocType::Ip), 0);
        }
    }
}
