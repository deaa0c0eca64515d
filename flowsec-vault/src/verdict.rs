//! Mapping provider reports to vault verdicts.

use crate::classifier::ThreatClassifier;
use crate::scan_provider::ProviderReport;
use crate::types::{EngineCounts, ScanResults, ScanStatus, Threat};

/// A formatted provider verdict.
///
/// Only built by [`format_verdict`], so `Malicious` always has positives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub(crate) status: ScanStatus,
    pub(crate) scan_id: Option<String>,
    pub(crate) results: ScanResults,
}

impl Verdict {
    /// `Safe`, `Malicious`, or `Pending` when no engine has reported yet.
    pub fn status(&self) -> ScanStatus {
        self.status
    }

    pub fn scan_id(&self) -> Option<&str> {
        self.scan_id.as_deref()
    }

    pub fn results(&self) -> &ScanResults {
        &self.results
    }
}

/// Formats a provider report.
///
/// `positives > 0` is malicious, `total == 0` is still pending, anything
/// else is safe. Each detecting engine becomes one threat entry.
pub fn format_verdict(report: &ProviderReport, classifier: &dyn ThreatClassifier) -> Verdict {
    let status = if report.positives > 0 {
        ScanStatus::Malicious
    } else if report.total == 0 {
        ScanStatus::Pending
    } else {
        ScanStatus::Safe
    };

    let threats = report
        .scans
        .iter()
        .filter(|(_, r)| r.detected)
        .map(|(engine, r)| {
            let name = r.result.clone().unwrap_or_default();
            Threat {
                engine: engine.clone(),
                level: classifier.classify(&name),
                description: format!("Detected by {engine}: {name}"),
                name,
            }
        })
        .collect();

    Verdict {
        status,
        scan_id: report.scan_id.clone(),
        results: ScanResults {
            engines: EngineCounts {
                total: report.total,
                positives: report.positives,
            },
            threats,
            permalink: report.permalink.clone(),
        },
    }
}
