//! MITRE ATT&CK mapping tables
//!
//! Three static tables annotate findings (keyword, IOC-type, and source
//! mappings); a fourth, smaller table tags correlation edges from the
//! combined text of a finding pair. Tables are compiled once into
//! Aho-Corasick matchers at startup.

use aho_corasick::AhoCorasick;
use vigil_common::correlation::MitreTechnique;
use vigil_common::finding::Finding;
use vigil_common::ioc::IocType;

// =============================================================================
// Lookup tables
// =============================================================================

type TechniqueRow = (&'static str, &'static str, &'static str);

const KEYWORD_TABLE: &[(&str, &[TechniqueRow])] = &[
    ("phishing", &[("T1566", "Phishing", "initial-access")]),
    ("credential dump", &[("T1003", "OS Credential Dumping", "credential-access")]),
    (
        "ransomware",
        &[
            ("T1486", "Data Encrypted for Impact", "impact"),
            ("T1490", "Inhibit System Recovery", "impact"),
        ],
    ),
    ("backdoor", &[("T1547", "Boot or Logon Autostart Execution", "persistence")]),
    ("c2", &[("T1071", "Application Layer Protocol", "command-and-control")]),
    ("exfiltration", &[("T1041", "Exfiltration Over C2 Channel", "exfiltration")]),
    ("lateral movement", &[("T1021", "Remote Services", "lateral-movement")]),
    (
        "privilege escalation",
        &[("T1068", "Exploitation for Privilege Escalation", "privilege-escalation")],
    ),
    ("exploit", &[("T1203", "Exploitation for Client Execution", "execution")]),
    ("powershell", &[("T1059.001", "PowerShell", "execution")]),
    ("mimikatz", &[("T1003.001", "LSASS Memory", "credential-access")]),
    ("keylogger", &[("T1056.001", "Keylogging", "collection")]),
    ("rootkit", &[("T1014", "Rootkit", "defense-evasion")]),
    ("ddos", &[("T1498", "Network Denial of Service", "impact")]),
    ("sql injection", &[("T1190", "Exploit Public-Facing Application", "initial-access")]),
    ("brute force", &[("T1110", "Brute Force", "credential-access")]),
];

const IOC_TABLE: &[(IocType, TechniqueRow)] =
    &[(IocType::Hash, ("T1204", "User Execution", "execution"))];

const SOURCE_TABLE: &[(&str, &[TechniqueRow])] = &[
    ("Pastebin", &[("T1567", "Exfiltration Over Web Service", "exfiltration")]),
    (
        "GitHub Secret Scanning",
        &[("T1552.001", "Credentials In Files", "credential-access")],
    ),
];

/// Edge-tagging table: technique id, name, trigger terms checked
/// against the combined text of a finding pair.
const PAIR_TABLE: &[(&str, &str, &[&str])] = &[
    ("T1078", "Valid Accounts", &["credential", "password", "account", "login"]),
    ("T1110", "Brute Force", &["brute", "bruteforce", "password spray"]),
    ("T1566", "Phishing", &["phishing", "spearphishing"]),
    (
        "T1059",
        "Command and Scripting Interpreter",
        &["command", "script", "shell", "powershell"],
    ),
    ("T1003", "OS Credential Dumping", &["credential dump", "lsass", "sam"]),
    (
        "T1190",
        "Exploit Public-Facing Application",
        &["exploit", "vulnerability", "rce"],
    ),
    ("T1133", "External Remote Services", &["vpn", "remote access", "rdp"]),
    (
        "T1071",
        "Application Layer Protocol",
        &["c2", "command and control", "beacon"],
    ),
    (
        "T1048",
        "Exfiltration Over Alternative Protocol",
        &["exfiltration", "data leak", "stolen data"],
    ),
    ("T1486", "Data Encrypted for Impact", &["ransomware", "encryption", "locked"]),
];

/// Kill-chain ordering for a tactic slug; unmapped tactics sort first.
fn kill_chain_phase(tactic: &str) -> u8 {
    match tactic {
        "reconnaissance" => 1,
        "resource-development" => 2,
        "initial-access" => 3,
        "execution" => 4,
        "persistence" => 5,
        "privilege-escalation" => 6,
        "defense-evasion" => 7,
        "credential-access" => 8,
        "discovery" => 9,
        "lateral-movement" => 10,
        "collection" => 11,
        "command-and-control" => 12,
        "exfiltration" => 13,
        "impact" => 14,
        _ => 0,
    }
}

fn technique(row: &TechniqueRow) -> MitreTechnique {
    MitreTechnique {
        technique_id: row.0.to_string(),
        technique_name: row.1.to_string(),
        tactic: row.2.to_string(),
        kill_chain_phase: kill_chain_phase(row.2),
    }
}

// =============================================================================
// Mapper
// =============================================================================

pub struct MitreMapper {
    keyword_matcher: AhoCorasick,
    source_matcher: AhoCorasick,
    pair_matcher: AhoCorasick,
    /// Pattern index -> pair-table row index.
    pair_rows: Vec<usize>,
}

impl Default for MitreMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl MitreMapper {
    pub fn new() -> Self {
        let keyword_matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(KEYWORD_TABLE.iter().map(|(pattern, _)| *pattern))
            .expect("Failed to compile keyword mapping table");
        let source_matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(SOURCE_TABLE.iter().map(|(pattern, _)| *pattern))
            .expect("Failed to compile source mapping table");

        let mut pair_terms = Vec::new();
        let mut pair_rows = Vec::new();
        for (row, (_, _, terms)) in PAIR_TABLE.iter().enumerate() {
            for term in *terms {
                pair_terms.push(*term);
                pair_rows.push(row);
            }
        }
        let pair_matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&pair_terms)
            .expect("Failed to compile pair mapping table");

        Self {
            keyword_matcher,
            source_matcher,
            pair_matcher,
            pair_rows,
        }
    }

    /// Techniques for one finding, de-duplicated by id and ordered by
    /// kill-chain phase.
    pub fn annotate(&self, finding: &Finding) -> Vec<MitreTechnique> {
        let mut techniques: Vec<MitreTechnique> = Vec::new();
        let mut push = |tech: MitreTechnique| {
            if !techniques.iter().any(|t| t.technique_id == tech.technique_id) {
                techniques.push(tech);
            }
        };

        for keyword in &finding.keywords {
            for hit in self.keyword_matcher.find_iter(keyword) {
                for row in KEYWORD_TABLE[hit.pattern().as_usize()].1 {
                    push(technique(row));
                }
            }
        }

        for (ioc_type, row) in IOC_TABLE {
            if finding.iocs.count(*ioc_type) > 0 {
                push(technique(row));
            }
        }

        for hit in self.source_matcher.find_iter(&finding.source) {
            for row in SOURCE_TABLE[hit.pattern().as_usize()].1 {
                push(technique(row));
            }
        }

        techniques.sort_by_key(|t| (t.kill_chain_phase, t.technique_id.clone()));
        techniques
    }

    /// Technique ids for a correlated pair, from the combined lowercased
    /// text of both findings. Sorted, de-duplicated.
    pub fn pair_techniques(&self, a: &Finding, b: &Finding) -> Vec<String> {
        let text = format!("{} {}", a.text(), b.text());
        let mut ids: Vec<String> = self
            .pair_matcher
            .find_iter(&text)
            .map(|hit| PAIR_TABLE[self.pair_rows[hit.pattern().as_usize()]].0.to_string())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_common::finding::RawFinding;

    fn finding(source: &str, title: &str, keywords: &[&str]) -> Finding {
        let mut raw = RawFinding::new(source, title, "");
        raw.keywords = keywords.iter().map(|k| k.to_string()).collect();
        Finding::from_raw(raw)
    }

    #[test]
    fn test_keyword_annotation_dedups_and_orders() {
        let f = finding(
            "Telegram",
            "campaign",
            &["ransomware", "Ransomware gang", "exfiltration"],
        );
        let techniques = MitreMapper::new().annotate(&f);
        let ids: Vec<&str> = techniques.iter().map(|t| t.technique_id.as_str()).collect();
        // exfiltration (13) sorts before impact (14); duplicates collapse.
        assert_eq!(ids, vec!["T1041", "T1486", "T1490"]);
    }

    #[test]
    fn test_hash_iocs_map_to_user_execution() {
        let mut f = finding("Reddit", "sample", &[]);
        f.iocs.insert(IocType::Hash, "d41d8cd98f00b204e9800998ecf8427e");
        let techniques = MitreMapper::new().annotate(&f);
        assert!(techniques.iter().any(|t| t.technique_id == "T1204"));
    }

    #[test]
    fn test_source_mapping() {
        let f = finding("Pastebin Monitor", "paste", &[]);
        let techniques = MitreMapper::new().annotate(&f);
        assert!(techniques
            .iter()
            .any(|t| t.technique_id == "T1567" && t.tactic == "exfiltration"));
    }

    #[test]
    fn test_pair_techniques_from_combined_text() {
        let a = finding("Reddit", "phishing kit with stolen passwords", &[]);
        let b = finding("Telegram", "beacon traffic observed", &[]);
        let ids = MitreMapper::new().pair_techniques(&a, &b);
        assert!(ids.contains(&"T1566".to_string()));
        assert!(ids.contains(&"T1071".to_string()));
        assert!(ids.contains(&"T1078".to_string()));
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_no_signal_no_techniques() {
        let f = finding("some blog", "weather report", &[]);
        assert!(MitreMapper::new().annotate(&f).is_empty());
    }
}
