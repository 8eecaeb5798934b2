//! Quality tiers, GUNC pass/fail and the composite score.

use std::fmt;

/// GUNC clade separation scores below this pass.
pub const GUNC_CSS_CUTOFF: f64 = 0.45;

/// Minimum tRNA count for the near-complete tier.
pub const MIN_TRNA: u64 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTier {
    Low,
    Medium,
    High,
    NearComplete,
    BinaryHigh,
    BinaryMedium,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Low => "Low",
            QualityTier::Medium => "Medium",
            QualityTier::High => "High",
            QualityTier::NearComplete => "Near_Complete",
            QualityTier::BinaryHigh => "High quality",
            QualityTier::BinaryMedium => "Medium quality",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuncStatus {
    Pass,
    Fail,
}

impl fmt::Display for GuncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuncStatus::Pass => f.write_str("Pass"),
            GuncStatus::Fail => f.write_str("Fail"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityScheme {
    /// Five MIMAG-style tiers, first matching rule wins.
    Mimag,
    /// High when `c >= 90` and `k <= 5`, Medium otherwise.
    Binary,
}

/// The values the rule tables look at. Absent values never satisfy a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QualityInputs {
    pub completeness: Option<f64>,
    pub contamination: Option<f64>,
    pub trna: Option<u64>,
    pub rrna_5s: Option<u64>,
    pub rrna_16s: Option<u64>,
    pub rrna_23s: Option<u64>,
}

type Rule = fn(&QualityInputs) -> bool;

fn has(v: Option<u64>, min: u64) -> bool {
    v.is_some_and(|n| n >= min)
}

fn low(q: &QualityInputs) -> bool {
    matches!((q.completeness, q.contamination), (Some(c), Some(k)) if c < 50.0 && k < 10.0)
}

fn medium(q: &QualityInputs) -> bool {
    matches!((q.completeness, q.contamination), (Some(c), Some(k)) if (50.0..=90.0).contains(&c) && k < 10.0)
}

fn medium_contaminated(q: &QualityInputs) -> bool {
    matches!((q.completeness, q.contamination), (Some(c), Some(k)) if c > 90.0 && k > 5.0 && k < 10.0)
}

fn high(q: &QualityInputs) -> bool {
    matches!((q.completeness, q.contamination), (Some(c), Some(k)) if c > 90.0 && k <= 5.0)
}

fn near_complete(q: &QualityInputs) -> bool {
    matches!((q.completeness, q.contamination), (Some(c), Some(k)) if c > 90.0 && k < 5.0)
        && has(q.trna, MIN_TRNA)
        && has(q.rrna_5s, 1)
        && has(q.rrna_16s, 1)
        && has(q.rrna_23s, 1)
}

/// Rule order matters: `high` shadows `near_complete`.
const MIMAG_RULES: [(Rule, QualityTier); 5] = [
    (low, QualityTier::Low),
    (medium, QualityTier::Medium),
    (medium_contaminated, QualityTier::Medium),
    (high, QualityTier::High),
    (near_complete, QualityTier::NearComplete),
];

impl QualityScheme {
    pub fn classify(&self, q: &QualityInputs) -> Option<QualityTier> {
        match self {
            QualityScheme::Mimag => MIMAG_RULES
                .iter()
                .find(|(rule, _)| rule(q))
                .map(|(_, tier)| *tier),
            QualityScheme::Binary => {
                let high = matches!(
                    (q.completeness, q.contamination),
                    (Some(c), Some(k)) if c >= 90.0 && k <= 5.0
                );
                Some(if high {
                    QualityTier::BinaryHigh
                } else {
                    QualityTier::BinaryMedium
                })
            }
        }
    }
}

/// A missing or NaN score fails.
pub fn gunc_status(clade_separation_score: Option<f64>) -> GuncStatus {
    match clade_separation_score {
        Some(css) if css < GUNC_CSS_CUTOFF => GuncStatus::Pass,
        _ => GuncStatus::Fail,
    }
}

/// `completeness + 0.5 * log10(N50) - 5 * contamination - strain_heterogeneity`
pub fn overall_score(
    completeness: Option<f64>,
    contamination: Option<f64>,
    n50: Option<u64>,
    strain_heterogeneity: Option<f64>,
) -> Option<f64> {
    Some(
        completeness? + 0.5 * (n50? as f64).log10() - 5.0 * contamination? - strain_heterogeneity?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cq(c: f64, k: f64) -> QualityInputs {
        QualityInputs {
            completeness: Some(c),
            contamination: Some(k),
            ..Default::default()
        }
    }

    #[test]
    fn mimag_tiers() {
        let s = QualityScheme::Mimag;
        assert_eq!(s.classify(&cq(30.0, 2.0)), Some(QualityTier::Low));
        assert_eq!(s.classify(&cq(50.0, 9.9)), Some(QualityTier::Medium));
        assert_eq!(s.classify(&cq(90.0, 0.0)), Some(QualityTier::Medium));
        assert_eq!(s.classify(&cq(95.0, 7.0)), Some(QualityTier::Medium));
        assert_eq!(s.classify(&cq(95.0, 5.0)), Some(QualityTier::High));
        assert_eq!(s.classify(&cq(95.0, 12.0)), None);
        assert_eq!(s.classify(&cq(30.0, 10.0)), None);
    }

    #[test]
    fn high_matches_before_near_complete() {
        let s = QualityScheme::Mimag;
        assert_eq!(s.classify(&cq(95.0, 3.0)), Some(QualityTier::High));

        let full = QualityInputs {
            trna: Some(21),
            rrna_5s: Some(1),
            rrna_16s: Some(1),
            rrna_23s: Some(2),
            ..cq(99.0, 0.5)
        };
        assert!(near_complete(&full));
        assert_eq!(s.classify(&full), Some(QualityTier::High));
    }

    #[test]
    fn missing_values_match_nothing() {
        let q = QualityInputs {
            completeness: Some(95.0),
            ..Default::default()
        };
        assert_eq!(QualityScheme::Mimag.classify(&q), None);
        assert_eq!(
            QualityScheme::Mimag.classify(&cq(f64::NAN, 1.0)),
            None
        );
    }

    #[test]
    fn binary_tiers() {
        let s = QualityScheme::Binary;
        assert_eq!(s.classify(&cq(90.0, 5.0)), Some(QualityTier::BinaryHigh));
        assert_eq!(s.classify(&cq(89.9, 1.0)), Some(QualityTier::BinaryMedium));
        assert_eq!(s.classify(&cq(99.0, 5.1)), Some(QualityTier::BinaryMedium));
        assert_eq!(
            s.classify(&QualityInputs::default()),
            Some(QualityTier::BinaryMedium)
        );
    }

    #[test]
    fn gunc_cutoff_is_strict() {
        assert_eq!(gunc_status(Some(0.0)), GuncStatus::Pass);
        assert_eq!(gunc_status(Some(0.45)), GuncStatus::Fail);
        assert_eq!(gunc_status(Some(f64::NAN)), GuncStatus::Fail);
        assert_eq!(gunc_status(None), GuncStatus::Fail);
    }

    #[test]
    fn score_by_field() {
        let s = overall_score(Some(95.0), Some(2.0), Some(100_000), Some(10.0)).unwrap();
        assert!((s - (95.0 + 2.5 - 10.0 - 10.0)).abs() < 1e-9);
        assert_eq!(overall_score(Some(95.0), None, Some(10), Some(0.0)), None);
    }
}
