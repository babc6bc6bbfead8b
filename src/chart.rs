//! Finding reconciliation for the per-tooth surface chart.
//!
//! The service returns findings as an ordered stream; the chart keeps the
//! full history and derives per-tooth state on demand. Derivation is a pure
//! fold over the history, so any cached rendering can always be rebuilt from
//! scratch and match.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Condition that removes every accumulated finding for a tooth.
pub const CONDITION_ERASE: &str = "borrar";

/// Condition that marks a tooth as absent, overriding all surface findings.
pub const CONDITION_MISSING: &str = "ausente";

/// Odontogram surfaces, Spanish clinical naming as spoken by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Vestibular,
    Palatina,
    Lingual,
    Mesial,
    Distal,
    Oclusal,
    Incisal,
}

impl Surface {
    pub fn label(self) -> &'static str {
        match self {
            Surface::Vestibular => "vestibular",
            Surface::Palatina => "palatina",
            Surface::Lingual => "lingual",
            Surface::Mesial => "mesial",
            Surface::Distal => "distal",
            Surface::Oclusal => "oclusal",
            Surface::Incisal => "incisal",
        }
    }
}

/// One clinical finding as produced by the extraction service. Immutable
/// once created; order of arrival is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub tooth_number: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface: Option<Surface>,
    pub condition: String,
}

/// Derived state for one tooth. Never stored; recomputed from the finding
/// history whenever needed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToothState {
    pub is_missing: bool,
    pub surface_conditions: BTreeMap<Surface, String>,
}

/// Anterior teeth (x1–x3 of each FDI quadrant) chart their center surface as
/// incisal rather than oclusal.
pub fn is_anterior(tooth_number: u8) -> bool {
    matches!(tooth_number % 10, 1..=3) && (11..=48).contains(&tooth_number)
}

/// Session-scoped finding history.
#[derive(Debug, Clone, Default)]
pub struct Chart {
    findings: Vec<Finding>,
}

impl Chart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch of incoming findings, in arrival order. An erase finding
    /// purges every accumulated finding for its tooth (including ones applied
    /// earlier in the same batch) and leaves no residue of itself.
    pub fn apply(&mut self, incoming: impl IntoIterator<Item = Finding>) {
        for finding in incoming {
            if finding.condition == CONDITION_ERASE {
                self.findings
                    .retain(|f| f.tooth_number != finding.tooth_number);
            } else {
                self.findings.push(finding);
            }
        }
    }

    /// Full ordered finding history.
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Teeth that currently have at least one finding, ascending.
    pub fn charted_teeth(&self) -> Vec<u8> {
        let mut teeth: Vec<u8> = self.findings.iter().map(|f| f.tooth_number).collect();
        teeth.sort_unstable();
        teeth.dedup();
        teeth
    }

    pub fn tooth_state(&self, tooth_number: u8) -> ToothState {
        compute_tooth_state(tooth_number, &self.findings)
    }
}

/// Derive one tooth's state from an ordered finding sequence.
///
/// A missing-tooth finding wins unconditionally, regardless of where it sits
/// in the sequence. Otherwise findings fold into a surface map in order,
/// last write per surface winning; findings without an explicit surface go
/// to the tooth's center surface (incisal for anteriors, oclusal otherwise).
pub fn compute_tooth_state(tooth_number: u8, findings: &[Finding]) -> ToothState {
    let tooth_findings = findings.iter().filter(|f| f.tooth_number == tooth_number);

    if tooth_findings
        .clone()
        .any(|f| f.condition == CONDITION_MISSING)
    {
        return ToothState {
            is_missing: true,
            surface_conditions: BTreeMap::new(),
        };
    }

    let mut surface_conditions = BTreeMap::new();
    for finding in tooth_findings {
        let surface = finding.surface.unwrap_or(if is_anterior(tooth_number) {
            Surface::Incisal
        } else {
            Surface::Oclusal
        });
        surface_conditions.insert(surface, finding.condition.clone());
    }

    ToothState {
        is_missing: false,
        surface_conditions,
    }
}
