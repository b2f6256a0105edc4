//! Species and evidence-type selectors.

use serde::{Deserialize, Serialize};

/// Organism whose database and precomputed sources a request runs against.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    #[default]
    Human,
    Mouse,
}

impl Species {
    pub const ALL: [Species; 2] = [Species::Human, Species::Mouse];

    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Human => "human",
            Species::Mouse => "mouse",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "human" => Some(Species::Human),
            "mouse" => Some(Species::Mouse),
            _ => None,
        }
    }
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which binding evidence a factor-name match inspects.
///
/// `Direct` is ChIP-seq style experimental binding, `Predicted` is
/// accessibility-based prediction, `All` accepts either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceType {
    #[default]
    All,
    Direct,
    Predicted,
}

impl EvidenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceType::All => "all",
            EvidenceType::Direct => "direct",
            EvidenceType::Predicted => "predicted",
        }
    }

    /// Parse a user-facing label. The web form historically sends `chip` for
    /// direct evidence, and an empty value for no constraint.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Some(EvidenceType::All),
            "direct" | "chip" => Some(EvidenceType::Direct),
            "predicted" => Some(EvidenceType::Predicted),
            _ => None,
        }
    }
}

impl std::fmt::Display for EvidenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
