//! Export artifact assembly.
//!
//! An export is the cleaned document with a reader note and AI guide
//! injected, followed by the marker and the full history region including
//! the current analysis (deduplicated by version string).

use chrono::{DateTime, Local};

use crate::constant::HISTORY_MARKER;
use crate::metadata::{ensure_ai_guide, extract_history, history_contains_version, strip_metadata};
use crate::types::{AnalysisResult, ChangeKind, Language};

pub fn change_kind_description(kind: ChangeKind, lang: Language) -> &'static str {
    match (lang, kind) {
        (Language::En, ChangeKind::Feat) => "Features - Introduced new features",
        (Language::En, ChangeKind::Fix) => "Fixes - Bug fixes",
        (Language::En, ChangeKind::Docs) => "Documentation - Documentation only changes",
        (Language::En, ChangeKind::Refactor) => {
            "Refactor - Code change that neither fixes a bug nor adds a feature"
        }
        (Language::En, ChangeKind::Style) => {
            "Style - Changes that do not affect the meaning of the code (white-space, formatting, etc)"
        }
        (Language::En, ChangeKind::Perf) => "Performance - A code change that improves performance",
        (Language::Zh, ChangeKind::Feat) => "新功能 (Features) - 引入了新的功能或特性",
        (Language::Zh, ChangeKind::Fix) => "修复 (Fixes) - 修复了 bug 或错误",
        (Language::Zh, ChangeKind::Docs) => "文档 (Documentation) - 仅修改了文档",
        (Language::Zh, ChangeKind::Refactor) => "重构 (Refactor) - 代码结构调整，不影响功能",
        (Language::Zh, ChangeKind::Style) => "样式 (Style) - 代码格式、UI 样式调整",
        (Language::Zh, ChangeKind::Perf) => "性能 (Performance) - 提升性能的修改",
    }
}

fn legend_title(lang: Language) -> &'static str {
    match lang {
        Language::En => "Change Types Legend",
        Language::Zh => "变更类型说明 (Change Types Legend)",
    }
}

fn note_block(lang: Language) -> &'static str {
    match lang {
        Language::En => {
            "> **Note**: For all updates and changes, please refer to the `### Analysis JSON` section."
        }
        Language::Zh => "> **备注**: 所有更新和变动请查看 `### 结构化分析数据 (Analysis JSON)` 这一章节",
    }
}

fn meta_header(lang: Language) -> &'static str {
    match lang {
        Language::En => {
            "SMARTDIFF AI METADATA\nThis section contains structured version data designed for AI coding assistants (e.g., Cursor, Copilot)."
        }
        Language::Zh => "SMARTDIFF AI METADATA\n此部分包含结构化版本数据，专为 AI 编程助手 (如 Cursor, Copilot) 设计。",
    }
}

fn section_title(lang: Language) -> &'static str {
    match lang {
        Language::En => "Analysis JSON",
        Language::Zh => "结构化分析数据 (Analysis JSON)",
    }
}

/// Insert the reader note right after the first H1, or at the very top
fn inject_note(content: &str, note: &str) -> String {
    let mut lines: Vec<&str> = content.split('\n').collect();
    match lines.iter().position(|line| line.trim().starts_with("# ")) {
        Some(h1_idx) => {
            lines.splice(h1_idx + 1..h1_idx + 1, ["", note, ""]);
            lines.join("\n")
        }
        None => format!("{}\n\n{}", note, content),
    }
}

/// Build the full export text for the current document state and analysis
pub fn render_export(
    v2: &str,
    result: &AnalysisResult,
    lang: Language,
    now: DateTime<Local>,
) -> String {
    let clean = strip_metadata(v2);
    let content = inject_note(&ensure_ai_guide(&clean), note_block(lang));
    let existing_history = extract_history(v2);

    let mut legend = format!("### {}\n", legend_title(lang));
    for kind in ChangeKind::ALL {
        legend.push_str(&format!(
            "- **{}**: {}\n",
            kind.as_str(),
            change_kind_description(kind, lang)
        ));
    }

    let json = serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string());
    let analysis_block = format!(
        "<!--\n=============================================================================\n{}\nGenerated at: {}\n=============================================================================\n-->\n\n{}\n### {} (v{})\n```json\n{}\n```",
        meta_header(lang),
        now.format("%Y-%m-%d %H:%M:%S"),
        legend,
        section_title(lang),
        result.version,
        json
    );

    // Re-appending an already logged version would duplicate its block
    let history_region = if existing_history.is_empty() {
        analysis_block
    } else if history_contains_version(&existing_history, &result.version) {
        existing_history
    } else {
        format!("{}\n\n{}", existing_history, analysis_block)
    };

    format!("{}\n\n{}\n\n{}\n", content, HISTORY_MARKER, history_region)
}

/// `<sanitized-title>_v<version>_<ISO-ish-timestamp>.md`
pub fn export_filename(title: &str, version: &str, now: DateTime<Local>) -> String {
    let safe: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ' '))
        .collect();
    let safe = safe.trim();
    let safe = if safe.is_empty() { "SmartDiff" } else { safe };
    format!("{}_v{}_{}.md", safe, version, now.format("%Y-%m-%dT%H-%M-%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::AI_GUIDE_COMMENT;
    use crate::metadata::{assemble_document, history_entry};
    use crate::types::BumpType;
    use chrono::TimeZone;

    fn sample_result(version: &str) -> AnalysisResult {
        AnalysisResult {
            version: version.to_string(),
            previous_version: "1.0.0".to_string(),
            bump_type: BumpType::Minor,
            summary: "Added a pricing section".to_string(),
            changes: Vec::new(),
            usage: None,
        }
    }

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    #[test]
    fn export_contains_note_guide_and_single_marker() {
        let out = render_export("# Doc\n\nBody", &sample_result("1.1.0"), Language::En, fixed_now());
        assert_eq!(out.matches(HISTORY_MARKER).count(), 1);
        assert!(out.contains(AI_GUIDE_COMMENT));
        assert!(out.contains("> **Note**"));
        assert!(out.contains("\"version\": \"1.1.0\""));
        assert!(out.contains("- **feat**:"));
    }

    #[test]
    fn export_dedupes_already_logged_version() {
        let entry = history_entry(&sample_result("1.1.0"), "2026-03-01 08:00:00");
        let v2 = assemble_document("# Doc\n\nBody", "", &entry);

        let out = render_export(&v2, &sample_result("1.1.0"), Language::En, fixed_now());
        assert_eq!(out.matches("\"version\": \"1.1.0\"").count(), 1);
    }

    #[test]
    fn export_appends_new_version_after_existing_history() {
        let entry = history_entry(&sample_result("1.1.0"), "2026-03-01 08:00:00");
        let v2 = assemble_document("# Doc\n\nBody", "", &entry);

        let out = render_export(&v2, &sample_result("1.2.0"), Language::En, fixed_now());
        let old_pos = out.find("\"version\": \"1.1.0\"").unwrap();
        let new_pos = out.find("\"version\": \"1.2.0\"").unwrap();
        assert!(old_pos < new_pos);
    }

    #[test]
    fn filename_is_sanitized() {
        let name = export_filename("Spec: v2 / final?", "1.1.0", fixed_now());
        assert_eq!(name, "Spec v2  final_v1.1.0_2026-03-14T09-26-53.md");
    }

    #[test]
    fn filename_falls_back_for_empty_title() {
        let name = export_filename("///", "2.0.0", fixed_now());
        assert!(name.starts_with("SmartDiff_v2.0.0_"));
    }
}
