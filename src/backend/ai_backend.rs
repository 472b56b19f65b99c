use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{AnalyzeRequest, Collaborator, GenerateRequest, GeneratedDocument, PlanRequest};
use crate::config::AiConfig;
use crate::types::{AnalysisResult, PatchPlan, Persona, TokenUsage};

#[derive(Error, Debug)]
pub enum AiError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    temperature: f32,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: ContentResponse,
}

#[derive(Deserialize)]
struct ContentResponse {
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

impl From<UsageMetadata> for TokenUsage {
    fn from(meta: UsageMetadata) -> Self {
        TokenUsage {
            prompt_tokens: meta.prompt_token_count,
            output_tokens: meta.candidates_token_count,
            total_tokens: meta.total_token_count,
        }
    }
}

pub struct AiBackend {
    model: String,
    api_url: String,
    api_key: String,
}

impl Default for AiBackend {
    fn default() -> Self {
        AiBackend::new(None, None, None)
    }
}

impl AiBackend {
    pub fn new(model: Option<String>, api_url: Option<String>, api_key: Option<String>) -> Self {
        let model = model
            .or_else(|| std::env::var("GEMINI_MODEL").ok())
            .unwrap_or_else(|| "gemini-2.5-flash".to_string());

        let api_url = api_url
            .or_else(|| std::env::var("GEMINI_API_URL").ok())
            .unwrap_or_else(|| {
                "https://generativelanguage.googleapis.com/v1beta/models/".to_string()
            });

        let api_key = api_key
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .unwrap_or_else(|| {
                tracing::warn!("GEMINI_API_KEY not found, using empty string");
                String::new()
            });

        Self {
            model,
            api_url,
            api_key,
        }
    }

    pub fn from_config(config: &AiConfig) -> Self {
        let opt = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self::new(
            opt(&config.model_name),
            opt(&config.api_url),
            opt(&config.api_key),
        )
    }

    fn send(
        &self,
        prompt: String,
        temperature: f32,
        json_response: bool,
    ) -> Result<(String, Option<TokenUsage>), AiError> {
        if self.api_key.is_empty() {
            return Err(AiError::ConfigError("API key is not configured".to_string()));
        }

        let client = Client::new();
        let url = format!("{}{}:generateContent?key={}", self.api_url, self.model, self.api_key);

        let request_body = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: json_response.then(|| "application/json".to_string()),
                temperature,
            },
        };

        let response = client
            .post(&url)
            .json(&request_body)
            .send()
            .map_err(|e| AiError::ApiError(format!("AI Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AiError::ApiError(format!(
                "API error {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response
            .json()
            .map_err(|e| AiError::ApiError(format!("Failed to parse AI response: {}", e)))?;

        let usage = gemini_response.usage_metadata.map(TokenUsage::from);
        let content = gemini_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| AiError::ApiError("No response content".to_string()))?;

        Ok((content, usage))
    }
}

impl Collaborator for AiBackend {
    fn analyze(&self, req: &AnalyzeRequest) -> Result<AnalysisResult, AiError> {
        let prompt = build_analyze_prompt(req);
        let (text, usage) = self.send(prompt, 0.2, true)?;
        let mut result = parse_analysis(&text, req.known_version.as_deref())?;
        result.usage = usage;
        Ok(result)
    }

    fn plan(&self, req: &PlanRequest) -> Result<PatchPlan, AiError> {
        let prompt = build_plan_prompt(req);
        let (text, usage) = self.send(prompt, 0.1, true)?;
        let mut plan: PatchPlan = serde_json::from_str(strip_code_fences(&text))
            .map_err(|e| AiError::ApiError(format!("Failed to deserialize patch plan: {}", e)))?;
        plan.usage = usage;
        Ok(plan)
    }

    fn generate(&self, req: &GenerateRequest) -> Result<GeneratedDocument, AiError> {
        let prompt = build_generate_prompt(req);
        let (text, usage) = self.send(prompt, 0.2, false)?;
        Ok(GeneratedDocument {
            text: strip_code_fences(&text).to_string(),
            usage,
        })
    }
}

fn persona_instruction(persona: Persona) -> &'static str {
    match persona {
        Persona::General => "Balanced tone and level of detail, readable by a mixed audience.",
        Persona::Developer => {
            "Technical and precise. Reference concrete sections, fields and behavior changes."
        }
        Persona::Executive => {
            "High-level business impact only. Short, outcome-oriented wording, no implementation detail."
        }
        Persona::Public => {
            "Plain language for end users. No internal jargon, explain benefits rather than mechanics."
        }
    }
}

/// Prefix every V2 line with its 1-based number so the collaborator can
/// return consistent line references.
fn number_lines(text: &str) -> String {
    text.split('\n')
        .enumerate()
        .map(|(idx, line)| format!("{}: {}", idx + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_analyze_prompt(req: &AnalyzeRequest) -> String {
    let target_lang = req.language.prompt_name();
    let version_rule = match &req.known_version {
        Some(version) => format!(
            "3. The new version is explicitly set to \"{}\". You MUST use this version string in the output.",
            version
        ),
        None => {
            "3. If V1 has a version header, increment from there. If not, start from 1.0.0."
                .to_string()
        }
    };

    format!(
        r#"You are an expert Semantic Versioning manager and Diff Analyzer.

Your task is to compare two documents (V1 and V2) and generate a structured changelog.

Persona Instruction: {persona}

Input V1 (Original):
{v1}

Input V2 (New Version - with line numbers for reference):
{v2}

Instructions:
1. Compare V1 and V2 semantically.
2. Determine the semantic version bump (Major, Minor, or Patch) based on the changes.
{version_rule}
4. Identify specific changes. For each change:
   - Categorize it (feat, fix, docs, refactor, style, perf).
   - Provide a title and description in **{lang}**.
   - Tone & Detail: strictly follow the Persona Instruction above.
   - CRITICAL: Identify the start and end line numbers in V2 where this change is located. Use the line numbers provided in the V2 input.

IMPORTANT CONSTRAINT:
- Ignore changes inside sections named "Changelog", "History", "Update Log", or similar archival sections. These are historical records.
- Focus ONLY on changes in the actual document content.

5. Return the result strictly as JSON with fields: version, previousVersion, bumpType ("Major"|"Minor"|"Patch"), summary, changes (array of {{id, type, title, description, lines: {{start, end}}}})."#,
        persona = persona_instruction(req.persona),
        v1 = req.previous_text,
        v2 = number_lines(&req.new_text),
        version_rule = version_rule,
        lang = target_lang,
    )
}

fn build_plan_prompt(req: &PlanRequest) -> String {
    format!(
        r#"You are a Document Architect.
User wants to apply a "Patch Fragment" to an existing "V1 Document".

Task:
1. Analyze the "Patch Fragment" semantic meaning.
2. Detect the current version of "V1 Document" (if any).
3. Calculate a new version number based on the significance of the changes (Major, Minor, or Patch).
4. Create a detailed plan with a list of specific actions to apply the patch. You may need multiple actions if the patch affects different sections.

V1 Document:
{v1}

Patch Fragment:
{fragment}

Write summary, descriptions and reasoning in **{lang}**.
Return the plan strictly as JSON with fields: summary, proposedVersion, bumpType ("Major"|"Minor"|"Patch"), actions (array of {{operation: "insert"|"replace"|"delete", targetSectionHeader, description, reason}})."#,
        v1 = req.previous_text,
        fragment = req.patch_fragment,
        lang = req.language.prompt_name(),
    )
}

fn build_generate_prompt(req: &GenerateRequest) -> String {
    let today = chrono::Local::now().format("%Y-%m-%d");
    let actions = req
        .plan
        .actions
        .iter()
        .enumerate()
        .map(|(i, a)| {
            format!(
                "{}. [{:?}] Target: {}. Intent: {}",
                i + 1,
                a.operation,
                a.target_section_header,
                a.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an AI Document Editor.

Task: Generate the NEW full document (V2) by applying the Patch Fragment to the V1 Document following the specific Plan Actions.

Constraints:
1. Principle of Least Change: ONLY modify the sections identified in the plan. Do NOT rephrase other sections.
2. Structure: Keep the original Markdown structure, indentation, and formatting.
3. Flow: Ensure the inserted/replaced text flows naturally with the surrounding context.
4. Version & Date Header REPLACEMENT RULE (CRITICAL):
   - Scan the document for an existing header block containing "Version" and "Date" info.
   - You MUST REPLACE the existing version/date values in-place with: Version "{version}", Date "{today}".
   - If updating/inserting, prefer this format: > **Version**: {version} | **Last Updated**: {today}
   - Do NOT create a second/duplicate header block. The output must contain EXACTLY ONE version identifier.
5. METADATA REMOVAL:
   - If the V1 Document ends with a block containing "SMARTDIFF AI METADATA" or a JSON code block describing the previous version, REMOVE IT COMPLETELY.
   - The output should end with the document content only.

Plan Actions:
{actions}

V1 Document:
{v1}

Patch Fragment:
{fragment}

Output:
Return ONLY the complete content of the new V2 document. Do not use markdown code blocks."#,
        version = req.target_version,
        today = today,
        actions = actions,
        v1 = req.previous_text,
        fragment = req.patch_fragment,
    )
}

/// Models occasionally wrap output in ```json / ```markdown fences
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "markdown", ...) up to the first newline
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Deserialize an analysis response and enforce its contract: a pinned
/// version must be echoed, and line ranges must stay 1-based and ordered.
fn parse_analysis(text: &str, known_version: Option<&str>) -> Result<AnalysisResult, AiError> {
    let mut result: AnalysisResult = serde_json::from_str(strip_code_fences(text))
        .map_err(|e| AiError::ApiError(format!("Failed to deserialize analysis: {}", e)))?;

    if let Some(pinned) = known_version {
        if result.version != pinned {
            tracing::warn!(
                "Collaborator returned version {} instead of pinned {}, overriding",
                result.version,
                pinned
            );
            result.version = pinned.to_string();
        }
    }

    for change in &mut result.changes {
        if change.lines.start < 1 {
            change.lines.start = 1;
        }
        if change.lines.end < change.lines.start {
            change.lines.end = change.lines.start;
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BumpType, Language};

    #[test]
    fn analyze_prompt_numbers_v2_lines_and_pins_version() {
        let req = AnalyzeRequest {
            previous_text: "old".to_string(),
            new_text: "line one\nline two".to_string(),
            language: Language::En,
            known_version: Some("2.0.0".to_string()),
            persona: Persona::Developer,
        };
        let prompt = build_analyze_prompt(&req);
        assert!(prompt.contains("1: line one"));
        assert!(prompt.contains("2: line two"));
        assert!(prompt.contains("explicitly set to \"2.0.0\""));
        assert!(prompt.contains("Technical and precise"));
    }

    #[test]
    fn analyze_prompt_without_known_version_asks_to_infer() {
        let req = AnalyzeRequest {
            previous_text: "old".to_string(),
            new_text: "new".to_string(),
            language: Language::En,
            known_version: None,
            persona: Persona::General,
        };
        let prompt = build_analyze_prompt(&req);
        assert!(prompt.contains("start from 1.0.0"));
    }

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```markdown\n# Doc\n```"), "# Doc");
        assert_eq!(strip_code_fences("plain text"), "plain text");
    }

    #[test]
    fn parse_analysis_enforces_pinned_version_and_ranges() {
        let raw = r#"{
            "version": "9.9.9",
            "previousVersion": "1.0.0",
            "bumpType": "Minor",
            "summary": "stuff",
            "changes": [{
                "id": "c1", "type": "feat", "title": "t", "description": "d",
                "lines": { "start": 0, "end": 0 }
            }]
        }"#;
        let result = parse_analysis(raw, Some("1.1.0")).unwrap();
        assert_eq!(result.version, "1.1.0");
        assert_eq!(result.bump_type, BumpType::Minor);
        assert!(result.changes[0].lines.is_valid());
    }

    #[test]
    fn parse_analysis_rejects_garbage() {
        assert!(parse_analysis("not json", None).is_err());
    }
}
