//! Core data model shared across the diff engine, workflow and storage layers.
//!
//! Wire names stay camelCase so the JSON blocks embedded in exported
//! documents keep their original shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Conventional-commit style classification of a single change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Feat,
    Fix,
    Docs,
    Refactor,
    Style,
    Perf,
}

impl ChangeKind {
    pub const ALL: [ChangeKind; 6] = [
        ChangeKind::Feat,
        ChangeKind::Fix,
        ChangeKind::Docs,
        ChangeKind::Refactor,
        ChangeKind::Style,
        ChangeKind::Perf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Feat => "feat",
            ChangeKind::Fix => "fix",
            ChangeKind::Docs => "docs",
            ChangeKind::Refactor => "refactor",
            ChangeKind::Style => "style",
            ChangeKind::Perf => "perf",
        }
    }
}

/// Semantic-version bump significance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BumpType {
    Major,
    Minor,
    Patch,
}

/// Output language for AI-generated text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Zh,
    #[default]
    En,
}

impl Language {
    /// Human-readable language name used inside prompts
    pub fn prompt_name(&self) -> &'static str {
        match self {
            Language::Zh => "Simplified Chinese",
            Language::En => "English",
        }
    }
}

/// Tone/detail profile steering the analysis collaborator's descriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    #[default]
    General,
    Developer,
    Executive,
    Public,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// 1-based inclusive line range in the NEW revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    pub fn is_valid(&self) -> bool {
        self.start >= 1 && self.start <= self.end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub title: String,
    pub description: String,
    pub lines: LineRange,
}

/// Immutable outcome of one successful analysis call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// The new calculated semantic version (e.g., 1.1.0)
    pub version: String,
    pub previous_version: String,
    pub bump_type: BumpType,
    pub summary: String,
    pub changes: Vec<ChangeItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Insert,
    Replace,
    Delete,
}

/// One planned edit; the section header is display/traceability only
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchAction {
    pub operation: PatchOp,
    pub target_section_header: String,
    pub description: String,
    pub reason: String,
}

/// Reviewed-then-consumed plan produced by the planning collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchPlan {
    pub actions: Vec<PatchAction>,
    pub proposed_version: String,
    pub bump_type: BumpType,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// Append-only snapshot of a committed revision
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: String,
    /// Absent for records created before documents carried identities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub summary: String,
    /// Full text of the new revision at capture time
    pub full_content: String,
    pub doc_title: String,
}

/// Which workflow a document is currently driving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocMode {
    #[default]
    Global,
    Patch,
}

/// Remote sync target (owner/repo/branch/path); sync itself lives outside this crate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    /// None means the document sits at the workspace root
    pub folder_id: Option<String>,
    pub title: String,
    /// Previous revision, full text
    pub v1: String,
    /// Current revision, full text; may carry an embedded history log
    pub v2: String,
    /// Staging area for a pending patch fragment
    pub patch_text: String,
    pub mode: DocMode,
    pub persona: Persona,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
}

impl Document {
    pub fn new(folder_id: Option<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            folder_id,
            title: title.into(),
            v1: String::new(),
            v2: String::new(),
            patch_text: String::new(),
            mode: DocMode::default(),
            persona: Persona::default(),
            created_at: now,
            updated_at: now,
            remote: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_item_wire_names_match_original_format() {
        let item = ChangeItem {
            id: "c1".to_string(),
            kind: ChangeKind::Feat,
            title: "Pricing section".to_string(),
            description: "Added pricing tiers".to_string(),
            lines: LineRange { start: 20, end: 23 },
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "feat");
        assert_eq!(json["lines"]["start"], 20);
    }

    #[test]
    fn analysis_result_round_trips() {
        let raw = r#"{
            "version": "1.1.0",
            "previousVersion": "1.0.0",
            "bumpType": "Minor",
            "summary": "Added pricing",
            "changes": []
        }"#;
        let result: AnalysisResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.version, "1.1.0");
        assert_eq!(result.bump_type, BumpType::Minor);
        assert!(result.usage.is_none());

        let back = serde_json::to_value(&result).unwrap();
        assert_eq!(back["previousVersion"], "1.0.0");
        assert_eq!(back["bumpType"], "Minor");
    }

    #[test]
    fn line_range_validity() {
        assert!(LineRange { start: 1, end: 1 }.is_valid());
        assert!(LineRange { start: 3, end: 7 }.is_valid());
        assert!(!LineRange { start: 0, end: 4 }.is_valid());
        assert!(!LineRange { start: 5, end: 2 }.is_valid());
    }
}
