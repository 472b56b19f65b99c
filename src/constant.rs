/// Application name and metadata constants
pub const APP_QUALIFIER: &str = "com";
pub const APP_ORGANIZATION: &str = "SmartDiff";
pub const APP_NAME: &str = "SmartDiff";

/// Sentinel separating live document content from appended history logs
pub const HISTORY_MARKER: &str = "<!-- 🛡️ SMARTDIFF HISTORY LOG 🛡️ -->";

/// Invisible guide for AI IDEs (Cursor/Copilot) to find structured data
pub const AI_GUIDE_COMMENT: &str = "<!-- 🤖 SMARTDIFF_AI_GUIDE: For structured changes and version history, refer to the \"Analysis JSON\" section at the end of this file. -->";

/// Sentinel used by documents exported before HISTORY_MARKER existed
pub const LEGACY_METADATA_MARKER: &str = "SMARTDIFF AI METADATA";

/// App related Magic Numbers
pub const MAX_HISTORY_RECORDS: usize = 50;
pub const MAX_TITLE_LINE_LEN: usize = 100;

pub const SAMPLE_V1: &str = "\
# SmartDiff Product Requirements (V1.0)

## Overview
SmartDiff is a tool for manually comparing text files.

## Features
1. Upload text files.
2. View files side by side.
3. Highlight simple differences.

## Stack
- jQuery
- Bootstrap
- PHP backend";

pub const SAMPLE_V2: &str = "\
# SmartDiff Product Requirements (V1.1)

## Overview
SmartDiff is an AI-driven document version manager that analyzes semantic differences automatically.

## Features
1. Upload text files (V1 and V2).
2. **AI Analysis**: auto-generate changelogs and version numbers.
3. **Smart Navigation**: click a change card to jump to the matching lines.
4. JSON export for IDE integration.
5. **Compare Mode**: toggle old/new comparison with one click.

## Stack
- React
- Tailwind CSS
- Google Gemini API

## Pricing
- Free tier: 10 analyses per day
- Pro tier: unlimited";
