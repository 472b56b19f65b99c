//! Patch and analysis workflows.
//!
//! The patch workflow is a per-document state machine:
//! `Idle -> Planning -> PlanReady -> Generating -> Committed`, with error
//! edges back to the last interactive state. Nothing persisted is touched
//! until every collaborator call has succeeded; the commit itself is a
//! single document mutation plus one history append.
//!
//! Each mutating run captures a request token for its document. Switching
//! away from a document bumps its token via [`PatchWorkflow::supersede`],
//! so a completion that arrives late is discarded instead of landing on a
//! document the user is no longer looking at.

use std::collections::HashMap;

use chrono::Local;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::backend::ai_backend::AiError;
use crate::backend::{AnalyzeRequest, Collaborator, GenerateRequest, PlanRequest};
use crate::history::HistoryStore;
use crate::metadata::{
    assemble_document, ensure_ai_guide, extract_history, history_contains_version, history_entry,
    strip_metadata,
};
use crate::repository::{DocumentRepository, RepositoryError};
use crate::types::{AnalysisResult, HistoryRecord, Language, PatchPlan};

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Validation failed: {0}")]
    Validation(&'static str),

    #[error("Collaborator call failed: {0}")]
    Collaborator(#[from] AiError),

    #[error("A request of this kind is already in flight")]
    Busy,

    #[error("No reviewed plan to apply")]
    NoPlan,

    #[error("Request was superseded; result discarded")]
    Superseded,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Where the patch workflow currently stands
#[derive(Debug, Clone)]
pub enum PatchState {
    Idle,
    /// Plan request outstanding
    Planning,
    /// Plan awaiting user review; the proposed version is editable
    PlanReady(PatchPlan),
    /// Generation/re-analysis outstanding or awaiting commit
    Generating,
    Committed,
}

/// Result of a successful generation run, not yet applied.
///
/// Carries the request token captured when the run started; [`commit`]
/// discards it if the document's token has moved since.
///
/// [`commit`]: PatchWorkflow::commit
#[derive(Debug)]
pub struct PendingCommit {
    doc_id: String,
    token: u64,
    analysis: AnalysisResult,
    clean_content: String,
    inherited_history: String,
}

pub struct PatchWorkflow<C: Collaborator> {
    collaborator: C,
    history: HistoryStore,
    language: Language,
    state: PatchState,
    analyzing: bool,
    generating: bool,
    tokens: HashMap<String, u64>,
    result: Option<AnalysisResult>,
}

impl<C: Collaborator> PatchWorkflow<C> {
    pub fn new(collaborator: C, history: HistoryStore, language: Language) -> Self {
        Self {
            collaborator,
            history,
            language,
            state: PatchState::Idle,
            analyzing: false,
            generating: false,
            tokens: HashMap::new(),
            result: None,
        }
    }

    pub fn state(&self) -> &PatchState {
        &self.state
    }

    /// The most recent committed analysis, replaced wholesale by a new one
    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryStore {
        &mut self.history
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    /// Drop back to the interactive state, discarding any reviewed plan
    /// and the current result
    pub fn reset(&mut self) {
        self.state = PatchState::Idle;
        self.result = None;
    }

    /// Invalidate any in-flight run for this document; its completion will
    /// be discarded at commit time. Call when the active document changes.
    pub fn supersede(&mut self, doc_id: &str) {
        *self.tokens.entry(doc_id.to_string()).or_insert(0) += 1;
    }

    fn current_token(&self, doc_id: &str) -> u64 {
        self.tokens.get(doc_id).copied().unwrap_or(0)
    }

    /// Single-shot Global-mode analysis: compare the document's two marker-
    /// free revisions, store the result and append one snapshot. The
    /// document itself is not mutated.
    pub fn analyze_global(
        &mut self,
        repo: &DocumentRepository,
        doc_id: &str,
    ) -> Result<AnalysisResult, WorkflowError> {
        if self.analyzing {
            return Err(WorkflowError::Busy);
        }
        let doc = repo
            .get(doc_id)
            .ok_or_else(|| RepositoryError::DocumentNotFound(doc_id.to_string()))?;
        if doc.v1.trim().is_empty() || doc.v2.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "Please provide content for both V1 and V2",
            ));
        }

        let clean_v2 = strip_metadata(&doc.v2);
        let request = AnalyzeRequest {
            previous_text: strip_metadata(&doc.v1),
            new_text: clean_v2.clone(),
            language: self.language,
            known_version: None,
            persona: doc.persona,
        };
        let title = doc.title.clone();

        self.analyzing = true;
        let outcome = self.collaborator.analyze(&request);
        self.analyzing = false;

        let analysis = outcome.inspect_err(|e| error!("Analysis failed: {}", e))?;
        info!(
            "Analysis committed: {} -> {} ({} changes)",
            analysis.previous_version,
            analysis.version,
            analysis.changes.len()
        );

        self.push_snapshot(doc_id, &analysis, clean_v2, &title);
        self.result = Some(analysis.clone());
        Ok(analysis)
    }

    /// `Idle -> Planning -> PlanReady`: ask the planning collaborator for a
    /// reviewed edit plan. No document mutation on any path.
    pub fn plan_patch(
        &mut self,
        repo: &DocumentRepository,
        doc_id: &str,
    ) -> Result<PatchPlan, WorkflowError> {
        if self.analyzing {
            return Err(WorkflowError::Busy);
        }
        let doc = repo
            .get(doc_id)
            .ok_or_else(|| RepositoryError::DocumentNotFound(doc_id.to_string()))?;
        if doc.v1.trim().is_empty() || doc.patch_text.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "Please provide V1 content and the patch fragment",
            ));
        }

        let request = PlanRequest {
            previous_text: strip_metadata(&doc.v1),
            patch_fragment: doc.patch_text.clone(),
            language: self.language,
        };

        self.state = PatchState::Planning;
        self.analyzing = true;
        let outcome = self.collaborator.plan(&request);
        self.analyzing = false;

        match outcome {
            Ok(plan) => {
                self.state = PatchState::PlanReady(plan.clone());
                Ok(plan)
            }
            Err(e) => {
                error!("Patch planning failed: {}", e);
                self.state = PatchState::Idle;
                Err(e.into())
            }
        }
    }

    /// Exit plan review without applying; the plan is dropped
    pub fn discard_plan(&mut self) {
        if matches!(self.state, PatchState::PlanReady(_)) {
            self.state = PatchState::Idle;
        }
    }

    /// `PlanReady -> Generating`: consume the reviewed plan with a (possibly
    /// user-edited) target version. Runs generation, then a re-analysis with
    /// the target version pinned. Any failure restores `PlanReady` and
    /// leaves all persisted state untouched.
    pub fn prepare_commit(
        &mut self,
        repo: &DocumentRepository,
        doc_id: &str,
        target_version: &str,
    ) -> Result<PendingCommit, WorkflowError> {
        let PatchState::PlanReady(plan) = &self.state else {
            return Err(WorkflowError::NoPlan);
        };
        if self.generating {
            return Err(WorkflowError::Busy);
        }
        let plan = plan.clone();
        let doc = repo
            .get(doc_id)
            .ok_or_else(|| RepositoryError::DocumentNotFound(doc_id.to_string()))?;

        let clean_v1 = strip_metadata(&doc.v1);
        let inherited_history = extract_history(&doc.v1);
        let token = self.current_token(doc_id);

        self.state = PatchState::Generating;
        self.generating = true;

        let generated = match self.collaborator.generate(&GenerateRequest {
            previous_text: clean_v1.clone(),
            patch_fragment: doc.patch_text.clone(),
            plan: plan.clone(),
            target_version: target_version.to_string(),
            language: self.language,
        }) {
            Ok(generated) => generated,
            Err(e) => {
                error!("Patch generation failed: {}", e);
                self.generating = false;
                self.state = PatchState::PlanReady(plan);
                return Err(e.into());
            }
        };

        // The generator may echo stale metadata; re-clean before analysis
        let clean_content = strip_metadata(&ensure_ai_guide(&generated.text));

        let analysis = match self.collaborator.analyze(&AnalyzeRequest {
            previous_text: clean_v1,
            new_text: clean_content.clone(),
            language: self.language,
            known_version: Some(target_version.to_string()),
            persona: doc.persona,
        }) {
            Ok(analysis) => analysis,
            Err(e) => {
                error!("Post-generation analysis failed: {}", e);
                self.generating = false;
                self.state = PatchState::PlanReady(plan);
                return Err(e.into());
            }
        };

        Ok(PendingCommit {
            doc_id: doc_id.to_string(),
            token,
            analysis,
            clean_content,
            inherited_history,
        })
    }

    /// `Generating -> Committed`: the single all-or-nothing write. Replaces
    /// the document's V2 with content + marker + stacked history and appends
    /// one snapshot. Discarded if the document's token moved since the run
    /// started.
    pub fn commit(
        &mut self,
        repo: &mut DocumentRepository,
        pending: PendingCommit,
    ) -> Result<AnalysisResult, WorkflowError> {
        self.generating = false;
        if self.current_token(&pending.doc_id) != pending.token {
            info!("Discarding superseded commit for document {}", pending.doc_id);
            self.state = PatchState::Idle;
            return Err(WorkflowError::Superseded);
        }

        let PendingCommit {
            doc_id,
            analysis,
            clean_content,
            inherited_history,
            ..
        } = pending;

        // Suppress a history entry the inherited region already carries
        let full_v2 = if history_contains_version(&inherited_history, &analysis.version) {
            assemble_document(&clean_content, "", &inherited_history)
        } else {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
            let entry = history_entry(&analysis, &timestamp);
            assemble_document(&clean_content, &inherited_history, &entry)
        };

        let title = repo
            .get(&doc_id)
            .map(|d| d.title.clone())
            .unwrap_or_default();
        repo.update(&doc_id, |doc| doc.v2 = full_v2)?;

        self.push_snapshot(&doc_id, &analysis, clean_content, &title);
        self.result = Some(analysis.clone());
        self.state = PatchState::Committed;
        info!("Patch committed as v{}", analysis.version);
        Ok(analysis)
    }

    /// Convenience: prepare and commit in one call
    pub fn confirm_patch(
        &mut self,
        repo: &mut DocumentRepository,
        doc_id: &str,
        target_version: &str,
    ) -> Result<AnalysisResult, WorkflowError> {
        let pending = self.prepare_commit(repo, doc_id, target_version)?;
        self.commit(repo, pending)
    }

    fn push_snapshot(
        &mut self,
        doc_id: &str,
        analysis: &AnalysisResult,
        full_content: String,
        title: &str,
    ) {
        let title = if title.is_empty() { "Untitled" } else { title };
        self.history.append(HistoryRecord {
            id: Uuid::new_v4().to_string(),
            doc_id: Some(doc_id.to_string()),
            timestamp: chrono::Utc::now(),
            version: analysis.version.clone(),
            summary: analysis.summary.clone(),
            full_content,
            doc_title: title.to_string(),
        });
    }
}
