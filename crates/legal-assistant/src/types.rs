use serde::{Deserialize, Serialize};

/// A provenance-tagged segment of law text. The unit of indexing and retrieval.
///
/// `text` already carries the `[NGUỒN: ...]` line, so downstream prompts can cite
/// the source without a separate metadata lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LawChunk {
    pub text: String,
    pub source_file: String,
}

impl LawChunk {
    pub fn new(text: impl Into<String>, source_file: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_file: source_file.into(),
        }
    }
}

/// Whether a contract is an unfilled draft or an executed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentStatus {
    Template,
    Final,
    Unknown,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Template => "TEMPLATE",
            Self::Final => "FINAL",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Normalize a free-form label (usually model output). Anything that is not
    /// TEMPLATE or FINAL maps to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "TEMPLATE" => Self::Template,
            "FINAL" => Self::Final,
            _ => Self::Unknown,
        }
    }
}

/// Which branch of the classifier produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSource {
    Rules,
    Model,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractStatus {
    pub status: DocumentStatus,
    pub reason: String,
    pub source: StatusSource,
}

/// Closed set of request modes. Classifier output is normalized into this enum
/// before dispatch; anything unrecognized becomes `Fallback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Lookup,
    Advisory,
    ContractAnalysis,
    Drafting,
    Chitchat,
    Fallback,
}

impl Mode {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "tra_cuu_luat" => Self::Lookup,
            "luat_su_online" => Self::Advisory,
            "phan_tich_hop_dong" => Self::ContractAnalysis,
            "goi_y_dieu_khoan" => Self::Drafting,
            "chatchit" => Self::Chitchat,
            _ => Self::Fallback,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Lookup => "tra_cuu_luat",
            Self::Advisory => "luat_su_online",
            Self::ContractAnalysis => "phan_tich_hop_dong",
            Self::Drafting => "goi_y_dieu_khoan",
            Self::Chitchat => "chatchit",
            Self::Fallback => "khong_xac_dinh",
        }
    }
}

/// Per-request classification result. Not persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub clean_text: String,
    pub mode: Mode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_labels_round_trip() {
        for mode in [
            Mode::Lookup,
            Mode::Advisory,
            Mode::ContractAnalysis,
            Mode::Drafting,
            Mode::Chitchat,
        ] {
            assert_eq!(Mode::from_label(mode.label()), mode);
        }
    }

    #[test]
    fn test_unrecognized_mode_is_fallback() {
        assert_eq!(Mode::from_label("weather_report"), Mode::Fallback);
        assert_eq!(Mode::from_label(""), Mode::Fallback);
        assert_eq!(Mode::from_label("  TRA_CUU_LUAT "), Mode::Lookup);
    }

    #[test]
    fn test_document_status_from_label() {
        assert_eq!(DocumentStatus::from_label("template"), DocumentStatus::Template);
        assert_eq!(DocumentStatus::from_label(" FINAL "), DocumentStatus::Final);
        assert_eq!(DocumentStatus::from_label("draft"), DocumentStatus::Unknown);
    }
}
