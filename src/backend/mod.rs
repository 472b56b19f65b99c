//! External collaborator interface.
//!
//! The workflow talks to the semantic-analysis service through the
//! [`Collaborator`] trait; request/response shapes are fixed here while the
//! transport lives in [`ai_backend`].

pub mod ai_backend;

use crate::types::{AnalysisResult, Language, PatchPlan, Persona, TokenUsage};
use ai_backend::AiError;

/// One-shot semantic comparison of two document texts
#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub previous_text: String,
    pub new_text: String,
    pub language: Language,
    /// When set, the collaborator must echo this version instead of
    /// inferring one
    pub known_version: Option<String>,
    pub persona: Persona,
}

/// Turn a free-form patch fragment into an edit plan
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub previous_text: String,
    pub patch_fragment: String,
    pub language: Language,
}

/// Regenerate the full document from a confirmed plan
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub previous_text: String,
    pub patch_fragment: String,
    pub plan: PatchPlan,
    pub target_version: String,
    pub language: Language,
}

/// Full new document text, never a diff/patch format
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

pub trait Collaborator {
    fn analyze(&self, req: &AnalyzeRequest) -> Result<AnalysisResult, AiError>;
    fn plan(&self, req: &PlanRequest) -> Result<PatchPlan, AiError>;
    fn generate(&self, req: &GenerateRequest) -> Result<GeneratedDocument, AiError>;
}
