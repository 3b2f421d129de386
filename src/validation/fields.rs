//! Enumerated venue fields and the normalization shared by their parsers.

use serde::{Deserialize, Serialize};

/// Lower-cases a raw enumerated value and maps hyphens to the store's
/// underscore separator.
pub fn normalize_enum_value(raw: &str) -> String {
    raw.trim().to_lowercase().replace('-', "_")
}

// ─────────────────────────────────────────────────────────────────────────────
// VenueType
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueType {
    Stadium,
    Arena,
    Amphitheater,
    Theater,
    ConventionCenter,
    #[default]
    Other,
}

impl VenueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VenueType::Stadium => "stadium",
            VenueType::Arena => "arena",
            VenueType::Amphitheater => "amphitheater",
            VenueType::Theater => "theater",
            VenueType::ConventionCenter => "convention_center",
            VenueType::Other => "other",
        }
    }

    /// Parses a raw CSV value. Returns `None` for anything outside the allowed set.
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_enum_value(raw).as_str() {
            "stadium" => Some(VenueType::Stadium),
            "arena" => Some(VenueType::Arena),
            "amphitheater" => Some(VenueType::Amphitheater),
            "theater" => Some(VenueType::Theater),
            "convention_center" => Some(VenueType::ConventionCenter),
            "other" => Some(VenueType::Other),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PipelineStage
// ─────────────────────────────────────────────────────────────────────────────

/// Sales pipeline stage of a venue deal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    #[default]
    Lead,
    Qualified,
    Demo,
    Proposal,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Lead => "lead",
            PipelineStage::Qualified => "qualified",
            PipelineStage::Demo => "demo",
            PipelineStage::Proposal => "proposal",
            PipelineStage::Negotiation => "negotiation",
            PipelineStage::ClosedWon => "closed_won",
            PipelineStage::ClosedLost => "closed_lost",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_enum_value(raw).as_str() {
            "lead" => Some(PipelineStage::Lead),
            "qualified" => Some(PipelineStage::Qualified),
            "demo" => Some(PipelineStage::Demo),
            "proposal" => Some(PipelineStage::Proposal),
            "negotiation" => Some(PipelineStage::Negotiation),
            "closed_won" => Some(PipelineStage::ClosedWon),
            "closed_lost" => Some(PipelineStage::ClosedLost),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// VenueStatus
// ─────────────────────────────────────────────────────────────────────────────

/// Relationship status of a venue account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueStatus {
    Client,
    #[default]
    Prospect,
    Churned,
    Negotiating,
}

impl VenueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VenueStatus::Client => "client",
            VenueStatus::Prospect => "prospect",
            VenueStatus::Churned => "churned",
            VenueStatus::Negotiating => "negotiating",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_enum_value(raw).as_str() {
            "client" => Some(VenueStatus::Client),
            "prospect" => Some(VenueStatus::Prospect),
            "churned" => Some(VenueStatus::Churned),
            "negotiating" => Some(VenueStatus::Negotiating),
            _ => None,
        }
    }
}
