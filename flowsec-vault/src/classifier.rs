//! Threat severity classification for engine detections.
//!
//! Keyword matching on detection names is best-effort triage, not an
//! authoritative taxonomy. The classifier is a trait so a stronger one can be
//! swapped in without touching the scan state machine.

use crate::types::ThreatLevel;

/// Maps an engine's detection name to a severity.
pub trait ThreatClassifier: Send + Sync {
    fn classify(&self, threat_name: &str) -> ThreatLevel;
}

const HIGH_KEYWORDS: &[&str] = &["trojan", "ransomware", "backdoor", "rootkit"];
const MEDIUM_KEYWORDS: &[&str] = &["adware", "pup", "potentially unwanted"];

/// Case-insensitive substring classifier over threat-family keywords.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeywordClassifier;

impl ThreatClassifier for KeywordClassifier {
    fn classify(&self, threat_name: &str) -> ThreatLevel {
        let lower = threat_name.to_lowercase();
        if HIGH_KEYWORDS.iter().any(|k| lower.contains(k)) {
            ThreatLevel::High
        } else if MEDIUM_KEYWORDS.iter().any(|k| lower.contains(k)) {
            ThreatLevel::Medium
        } else {
            ThreatLevel::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_families() {
        let c = KeywordClassifier;
        assert_eq!(c.classify("Trojan.Generic"), ThreatLevel::High);
        assert_eq!(c.classify("Win32.RANSOMWARE.Locky"), ThreatLevel::High);
        assert_eq!(c.classify("Backdoor:Win32/Agent"), ThreatLevel::High);
        assert_eq!(c.classify("Linux.Rootkit.X"), ThreatLevel::High);
    }

    #[test]
    fn medium_families() {
        let c = KeywordClassifier;
        assert_eq!(c.classify("Adware.BrowseFox"), ThreatLevel::Medium);
        assert_eq!(c.classify("PUP.Optional.Toolbar"), ThreatLevel::Medium);
        assert_eq!(
            c.classify("Potentially Unwanted Application"),
            ThreatLevel::Medium
        );
    }

    #[test]
    fn everything_else_is_low() {
        let c = KeywordClassifier;
        assert_eq!(c.classify("Phishing site"), ThreatLevel::Low);
        assert_eq!(c.classify(""), ThreatLevel::Low);
    }

    #[test]
    fn high_wins_over_medium() {
        assert_eq!(
            KeywordClassifier.classify("Adware.Trojan.Dropper"),
            ThreatLevel::High
        );
    }
}
