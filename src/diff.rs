//! Line-level diff engine producing renderable row models.
//!
//! Two projections of the same diff: split (two-column paired) and unified
//! (single-column chronological). Both walk the hunks in order with two
//! independent 1-based line counters, so row output is exactly reproducible
//! for identical inputs.

use serde::Serialize;
use similar::{ChangeTag, TextDiff};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Added,
    Removed,
    Unchanged,
}

/// One side of a split row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitCell {
    pub content: String,
    pub line_number: u32,
    pub kind: RowKind,
}

/// Paired two-column row; at least one side is present
#[derive(Debug, Clone, Default, Serialize)]
pub struct SplitRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<SplitCell>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<SplitCell>,
}

/// Single-column row carrying whichever line numbers apply
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedRow {
    pub content: String,
    pub kind: RowKind,
    /// Absent when kind is Added
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_line: Option<u32>,
    /// Absent when kind is Removed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_line: Option<u32>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DiffStats {
    pub added_count: usize,
    pub removed_count: usize,
}

/// Strip the line terminator the diff token carries; the final line of an
/// input ending in '\n' does not become an extra empty line.
fn line_content(value: &str) -> String {
    value
        .strip_suffix('\n')
        .map(|v| v.strip_suffix('\r').unwrap_or(v))
        .unwrap_or(value)
        .to_string()
}

/// Compute the paired two-column projection of the line diff
pub fn split_rows(old: &str, new: &str) -> Vec<SplitRow> {
    let diff = TextDiff::from_lines(old, new);
    let mut rows = Vec::new();

    let mut v1_counter: u32 = 1;
    let mut v2_counter: u32 = 1;

    for change in diff.iter_all_changes() {
        let content = line_content(change.value());
        match change.tag() {
            ChangeTag::Delete => {
                rows.push(SplitRow {
                    left: Some(SplitCell {
                        content,
                        line_number: v1_counter,
                        kind: RowKind::Removed,
                    }),
                    right: None,
                });
                v1_counter += 1;
            }
            ChangeTag::Insert => {
                rows.push(SplitRow {
                    left: None,
                    right: Some(SplitCell {
                        content,
                        line_number: v2_counter,
                        kind: RowKind::Added,
                    }),
                });
                v2_counter += 1;
            }
            ChangeTag::Equal => {
                rows.push(SplitRow {
                    left: Some(SplitCell {
                        content: content.clone(),
                        line_number: v1_counter,
                        kind: RowKind::Unchanged,
                    }),
                    right: Some(SplitCell {
                        content,
                        line_number: v2_counter,
                        kind: RowKind::Unchanged,
                    }),
                });
                v1_counter += 1;
                v2_counter += 1;
            }
        }
    }

    rows
}

/// Compute the single-column chronological projection of the line diff
pub fn unified_rows(old: &str, new: &str) -> Vec<UnifiedRow> {
    let diff = TextDiff::from_lines(old, new);
    let mut rows = Vec::new();

    let mut v1_counter: u32 = 1;
    let mut v2_counter: u32 = 1;

    for change in diff.iter_all_changes() {
        let content = line_content(change.value());
        match change.tag() {
            ChangeTag::Delete => {
                rows.push(UnifiedRow {
                    content,
                    kind: RowKind::Removed,
                    old_line: Some(v1_counter),
                    new_line: None,
                });
                v1_counter += 1;
            }
            ChangeTag::Insert => {
                rows.push(UnifiedRow {
                    content,
                    kind: RowKind::Added,
                    old_line: None,
                    new_line: Some(v2_counter),
                });
                v2_counter += 1;
            }
            ChangeTag::Equal => {
                rows.push(UnifiedRow {
                    content,
                    kind: RowKind::Unchanged,
                    old_line: Some(v1_counter),
                    new_line: Some(v2_counter),
                });
                v1_counter += 1;
                v2_counter += 1;
            }
        }
    }

    rows
}

/// Count added/removed lines across the unified projection
pub fn line_stats(rows: &[UnifiedRow]) -> DiffStats {
    let mut stats = DiffStats::default();
    for row in rows {
        match row.kind {
            RowKind::Added => stats.added_count += 1,
            RowKind::Removed => stats.removed_count += 1,
            RowKind::Unchanged => {}
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_count(text: &str) -> usize {
        if text.is_empty() {
            0
        } else {
            text.trim_end_matches('\n').split('\n').count()
        }
    }

    #[test]
    fn identical_texts_yield_only_unchanged_rows() {
        let text = "# Doc\n\nBody line\nAnother";
        let rows = split_rows(text, text);
        assert_eq!(rows.len(), line_count(text));
        for row in &rows {
            let left = row.left.as_ref().unwrap();
            let right = row.right.as_ref().unwrap();
            assert_eq!(left.kind, RowKind::Unchanged);
            assert_eq!(right.kind, RowKind::Unchanged);
            assert_eq!(left.line_number, right.line_number);
            assert_eq!(left.content, right.content);
        }
    }

    #[test]
    fn empty_old_text_is_all_added() {
        let rows = split_rows("", "a\nb\nc");
        assert_eq!(rows.len(), 3);
        for (idx, row) in rows.iter().enumerate() {
            assert!(row.left.is_none());
            let right = row.right.as_ref().unwrap();
            assert_eq!(right.kind, RowKind::Added);
            assert_eq!(right.line_number, idx as u32 + 1);
        }
    }

    #[test]
    fn empty_new_text_is_all_removed() {
        let rows = unified_rows("a\nb", "");
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.kind, RowKind::Removed);
            assert!(row.new_line.is_none());
        }
        assert_eq!(rows[1].old_line, Some(2));
    }

    #[test]
    fn split_rows_preserve_total_line_counts() {
        let old = "intro\nkeep me\nold line\ntail";
        let new = "intro\nkeep me\nnew line\nextra\ntail";
        let rows = split_rows(old, new);

        let left_lines = rows.iter().filter(|r| r.left.is_some()).count();
        let right_lines = rows.iter().filter(|r| r.right.is_some()).count();
        assert_eq!(left_lines, line_count(old));
        assert_eq!(right_lines, line_count(new));
    }

    #[test]
    fn unified_rows_preserve_total_line_counts() {
        let old = "a\nb\nc\nd";
        let new = "a\nx\ny\nc";
        let rows = unified_rows(old, new);

        let old_side = rows
            .iter()
            .filter(|r| matches!(r.kind, RowKind::Removed | RowKind::Unchanged))
            .count();
        let new_side = rows
            .iter()
            .filter(|r| matches!(r.kind, RowKind::Added | RowKind::Unchanged))
            .count();
        assert_eq!(old_side, line_count(old));
        assert_eq!(new_side, line_count(new));
    }

    #[test]
    fn counters_only_advance_on_their_own_side() {
        let old = "same\ngone\nsame2";
        let new = "same\nfresh\nmore\nsame2";
        let rows = unified_rows(old, new);

        let removed: Vec<_> = rows.iter().filter(|r| r.kind == RowKind::Removed).collect();
        let added: Vec<_> = rows.iter().filter(|r| r.kind == RowKind::Added).collect();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].old_line, Some(2));
        assert_eq!(added.len(), 2);
        assert_eq!(added[0].new_line, Some(2));
        assert_eq!(added[1].new_line, Some(3));

        let last = rows.last().unwrap();
        assert_eq!(last.kind, RowKind::Unchanged);
        assert_eq!(last.old_line, Some(3));
        assert_eq!(last.new_line, Some(4));
    }

    #[test]
    fn trailing_newline_adds_no_extra_row() {
        let rows = split_rows("a\nb\n", "a\nb\n");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn stats_count_lines() {
        let rows = unified_rows("a\nb\nc", "a\nB\nc\nd");
        let stats = line_stats(&rows);
        assert_eq!(stats.removed_count, 1);
        assert_eq!(stats.added_count, 2);
    }
}
