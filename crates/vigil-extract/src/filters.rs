//! Candidate validation
//!
//! Pattern matches are candidates, not indicators. This module holds the
//! checks that separate reportable values from internal addresses,
//! benign well-known domains and malformed matches.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnetwork::{Ipv4Network, Ipv6Network};
use vigil_common::config::ExtractorConfig;

/// Compiled exclusion tables, built once from config.
pub struct IndicatorFilters {
    allowed_domains: Vec<String>,
    min_domain_len: usize,
    max_domain_len: usize,
    ipv4_private: Vec<Ipv4Network>,
    ipv6_private: Vec<Ipv6Network>,
}

impl IndicatorFilters {
    pub fn new(config: &ExtractorConfig) -> Self {
        let ipv4_private = ["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16", "127.0.0.0/8", "169.254.0.0/16"]
            .iter()
            .map(|cidr| cidr.parse().expect("Failed to parse private IPv4 range"))
            .collect();
        let ipv6_private = ["::1/128", "fe80::/10", "fc00::/7"]
            .iter()
            .map(|cidr| cidr.parse().expect("Failed to parse private IPv6 range"))
            .collect();
        Self {
            allowed_domains: config
                .allowed_domains
                .iter()
                .map(|d| d.to_lowercase())
                .collect(),
            min_domain_len: config.min_domain_len,
            max_domain_len: config.max_domain_len,
            ipv4_private,
            ipv6_private,
        }
    }

    /// True when the address is routable and worth reporting.
    pub fn is_public_ip(&self, raw: &str) -> bool {
        match raw.parse::<IpAddr>() {
            Ok(IpAddr::V4(addr)) => self.is_public_ipv4(addr),
            Ok(IpAddr::V6(addr)) => self.is_public_ipv6(addr),
            Err(_) => false,
        }
    }

    pub fn is_public_ipv4(&self, addr: Ipv4Addr) -> bool {
        !self.ipv4_private.iter().any(|net| net.contains(addr))
    }

    pub fn is_public_ipv6(&self, addr: Ipv6Addr) -> bool {
        !self.ipv6_private.iter().any(|net| net.contains(addr))
    }

    /// Structural domain check: bounded length, not a dotted quad, and an
    /// alphabetic TLD of at least two characters.
    pub fn is_valid_domain(&self, domain: &str) -> bool {
        if domain.len() < self.min_domain_len || domain.len() > self.max_domain_len {
            return false;
        }
        if Self::is_dotted_quad(domain) {
            return false;
        }
        match domain.rsplit_once('.') {
            Some((_, tld)) => tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()),
            None => false,
        }
    }

    /// Well-known benign domain, matched exactly or as a parent of the
    /// candidate ("docs.google.com" is covered by "google.com").
    pub fn is_allowed_domain(&self, domain: &str) -> bool {
        let domain = domain.to_lowercase();
        self.allowed_domains
            .iter()
            .any(|allowed| domain == *allowed || domain.ends_with(&format!(".{allowed}")))
    }

    /// Shape check beyond the extraction pattern: single @, no leading,
    /// trailing or doubled dots on either side.
    pub fn is_valid_email(&self, email: &str) -> bool {
        let Some((local, host)) = email.split_once('@') else {
            return false;
        };
        if host.contains('@') || local.is_empty() || host.is_empty() {
            return false;
        }
        if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
            return false;
        }
        if host.starts_with(['.', '-']) || host.ends_with(['.', '-']) || host.contains("..") {
            return false;
        }
        host.contains('.')
    }

    fn is_dotted_quad(domain: &str) -> bool {
        let parts: Vec<&str> = domain.split('.').collect();
        parts.len() == 4
            && parts
                .iter()
                .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
    }
}
