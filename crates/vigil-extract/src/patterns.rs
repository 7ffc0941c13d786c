//! Pre-compiled extraction pattern library

use regex::Regex;

/// One compiled regex per indicator shape, built once at startup.
pub struct PatternLibrary {
    pub ipv4: Regex,
    pub domain: Regex,
    pub url: Regex,
    pub email: Regex,
    pub md5: Regex,
    pub sha1: Regex,
    pub sha256: Regex,
    pub cve: Regex,
    pub bitcoin: Regex,
    pub ethereum: Regex,
    pub windows_path: Regex,
    pub registry_key: Regex,
    pub mutex: Regex,
    pub refang_hxxp: Regex,
    pub refang_dot_word: Regex,
}

impl PatternLibrary {
    pub fn compile() -> Self {
        Self {
            ipv4: Regex::new(
                r"\b(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\b",
            )
            .expect("Failed to compile ipv4 pattern"),
            domain: Regex::new(r"(?i)\b(?:[a-z0-9](?:[a-z0-9\-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b")
                .expect("Failed to compile domain pattern"),
            url: Regex::new(r#"(?i)\b(?:https?|ftp)://[^\s<>"']+"#)
                .expect("Failed to compile url pattern"),
            email: Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
                .expect("Failed to compile email pattern"),
            // Word boundaries enforce strict length bucketing: a 64-char
            // hex string never also yields a 32- or 40-char match.
            md5: Regex::new(r"(?i)\b[a-f0-9]{32}\b").expect("Failed to compile md5 pattern"),
            sha1: Regex::new(r"(?i)\b[a-f0-9]{40}\b").expect("Failed to compile sha1 pattern"),
            sha256: Regex::new(r"(?i)\b[a-f0-9]{64}\b").expect("Failed to compile sha256 pattern"),
            cve: Regex::new(r"(?i)CVE-\d{4}-\d{4,7}").expect("Failed to compile cve pattern"),
            bitcoin: Regex::new(r"\b[13][a-km-zA-HJ-NP-Z1-9]{25,34}\b")
                .expect("Failed to compile bitcoin pattern"),
            ethereum: Regex::new(r"\b0x[a-fA-F0-9]{40}\b")
                .expect("Failed to compile ethereum pattern"),
            windows_path: Regex::new(r#"[A-Za-z]:\\(?:[^\\/:*?"<>|\r\n]+\\)*[^\\/:*?"<>|\r\n]*"#)
                .expect("Failed to compile windows_path pattern"),
            registry_key: Regex::new(
                r"(?i)\b(?:HKEY_LOCAL_MACHINE|HKLM|HKEY_CURRENT_USER|HKCU|HKEY_CLASSES_ROOT|HKCR)\\[^\s<>]+",
            )
            .expect("Failed to compile registry_key pattern"),
            mutex: Regex::new(r"(?i)\\BaseNamedObjects\\[A-Za-z0-9_\-]+")
                .expect("Failed to compile mutex pattern"),
            refang_hxxp: Regex::new(r"(?i)hxxp").expect("Failed to compile refang pattern"),
            refang_dot_word: Regex::new(r"(?i)\[dot\]").expect("Failed to compile refang pattern"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4_matches() {
        let patterns = PatternLibrary::compile();
        let hits: Vec<&str> = patterns
            .ipv4
            .find_iter("from 203.0.113.5 to 999.1.1.1 and 8.8.8.8")
            .map(|m| m.as_str())
            .collect();
        assert_eq!(hits, vec!["203.0.113.5", "8.8.8.8"]);
    }

    #[test]
    fn test_hash_length_buckets() {
        let patterns = PatternLibrary::compile();
        let sha256 = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert!(!patterns.md5.is_match(sha256));
        assert!(!patterns.sha1.is_match(sha256));
        assert!(patterns.sha256.is_match(sha256));

        let md5 = "d41d8cd98f00b204e9800998ecf8427e";
        assert!(patterns.md5.is_match(md5));
        assert!(!patterns.sha1.is_match(md5));
        assert!(!patterns.sha256.is_match(md5));
    }

    #[test]
    fn test_registry_key() {
        let patterns = PatternLibrary::compile();
        let text = r"persisted under HKLM\Software\Microsoft\Windows\CurrentVersion\Run";
        let hit = patterns.registry_key.find(text).map(|m| m.as_str());
        assert_eq!(
            hit,
            Some(r"HKLM\Software\Microsoft\Windows\CurrentVersion\Run")
        );
    }

    #[test]
    fn test_cve_bounds() {
        let patterns = PatternLibrary::compile();
        assert!(patterns.cve.is_match("CVE-2024-12345"));
        assert!(patterns.cve.is_match("cve-2021-44228"));
        assert!(!patterns.cve.is_match("CVE-24-1"));
    }
}
