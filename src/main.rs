use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Local;
use tracing::error;
use tracing_subscriber::EnvFilter;

use smartdiff::backend::ai_backend::AiBackend;
use smartdiff::config::Config;
use smartdiff::diff::{line_stats, unified_rows};
use smartdiff::export::{export_filename, render_export};
use smartdiff::history::HistoryStore;
use smartdiff::metadata::strip_metadata;
use smartdiff::repository::DocumentRepository;
use smartdiff::workflow::PatchWorkflow;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(v1_path), Some(v2_path)) = (args.next(), args.next()) else {
        eprintln!("Usage: smartdiff <v1.md> <v2.md>");
        eprintln!("Compares two revisions, prints an AI changelog and writes an export file.");
        return ExitCode::FAILURE;
    };

    match run(PathBuf::from(v1_path), PathBuf::from(v2_path)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(v1_path: PathBuf, v2_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let v1 = fs::read_to_string(&v1_path)?;
    let v2 = fs::read_to_string(&v2_path)?;

    let config = Config::default();
    let language = config.settings.language;

    let stats = line_stats(&unified_rows(&strip_metadata(&v1), &strip_metadata(&v2)));
    println!(
        "{} line(s) added, {} removed",
        stats.added_count, stats.removed_count
    );

    let mut repo = DocumentRepository::in_memory();
    let doc_id = repo.create_document(None, "");
    repo.update(&doc_id, |doc| {
        doc.v1 = v1;
        doc.v2 = v2.clone();
    })?;
    repo.refresh_title(&doc_id)?;

    let backend = AiBackend::from_config(&config.settings.ai);
    let mut workflow = PatchWorkflow::new(backend, HistoryStore::new()?, language);
    let analysis = workflow.analyze_global(&repo, &doc_id)?;

    println!(
        "\nv{} -> v{} ({:?} bump)",
        analysis.previous_version, analysis.version, analysis.bump_type
    );
    println!("{}\n", analysis.summary);
    for change in &analysis.changes {
        println!(
            "  [{}] {} (lines {}-{})",
            change.kind.as_str(),
            change.title,
            change.lines.start,
            change.lines.end
        );
        println!("      {}", change.description);
    }

    let now = Local::now();
    let title = repo
        .get(&doc_id)
        .map(|d| d.title.clone())
        .unwrap_or_default();
    let filename = export_filename(&title, &analysis.version, now);
    fs::write(&filename, render_export(&v2, &analysis, language, now))?;
    println!("\nExport written to {}", filename);
    Ok(())
}
