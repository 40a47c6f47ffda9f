//! Command-line interface.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::analysis::{AnalysisPipeline, CancelToken, NoopProgressReporter};
use crate::config::AnalysisConfig;
use crate::db::{apply_schema, init_db, DbConfig, GraphStore, SurrealGraphStore};
use crate::ingest;
use crate::models::AnalysisBundle;
use crate::text::Lexicons;
use crate::AnalysisError;

#[derive(Parser)]
#[command(name = "mailuo", about = "Chinese narrative analysis into a property graph")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory for the embedded graph store.
    #[arg(long, default_value = "data/mailuo")]
    pub data_path: PathBuf,

    /// Emit JSON instead of a human-readable summary.
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a plain-text novel and persist the result.
    Analyze {
        /// Path to the .txt file.
        file: PathBuf,
        /// Novel id (defaults to the file stem).
        #[arg(long)]
        id: Option<String>,
        /// Optional analysis config TOML.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Optional lexicon directory (overrides the built-in stop words).
        #[arg(long)]
        lexicons: Option<PathBuf>,
        /// Skip the graph store write.
        #[arg(long)]
        no_store: bool,
    },
    /// Analyze a novel and write the bundle as JSON without persisting.
    Export {
        /// Path to the .txt file.
        file: PathBuf,
        /// Output path (stdout when omitted).
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show a previously stored analysis.
    Show {
        /// Novel id.
        id: String,
    },
}

pub async fn execute(cli: &Cli) -> Result<(), AnalysisError> {
    match &cli.command {
        Commands::Analyze {
            file,
            id,
            config,
            lexicons,
            no_store,
        } => {
            let config = match config {
                Some(path) => AnalysisConfig::from_file(path)?,
                None => AnalysisConfig::default(),
            };
            let lexicons = match lexicons {
                Some(dir) => Lexicons::from_dir(dir)?,
                None => Lexicons::builtin(),
            };
            let novel = ingest::parse_file(file, id.clone())?;
            let pipeline = AnalysisPipeline::new(config, Arc::new(lexicons));

            let store: Option<SurrealGraphStore> = if *no_store {
                None
            } else {
                let db = init_db(&DbConfig::default(), &cli.data_path).await?;
                apply_schema(&db).await?;
                Some(SurrealGraphStore::new(db))
            };
            let bundle = pipeline
                .analyze(
                    &novel,
                    store.as_ref().map(|s| s as &dyn GraphStore),
                    &NoopProgressReporter,
                    &CancelToken::new(),
                )
                .await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&bundle)?);
            } else {
                print_summary(&bundle);
            }
            Ok(())
        }
        Commands::Export { file, out } => {
            let novel = ingest::parse_file(file, None)?;
            let pipeline =
                AnalysisPipeline::new(AnalysisConfig::default(), Arc::new(Lexicons::builtin()));
            let bundle = pipeline
                .analyze(&novel, None, &NoopProgressReporter, &CancelToken::new())
                .await?;
            let json = serde_json::to_string_pretty(&bundle)?;
            match out {
                Some(path) => std::fs::write(path, json).map_err(|e| {
                    AnalysisError::InvalidInput(format!("cannot write {}: {}", path.display(), e))
                })?,
                None => println!("{json}"),
            }
            Ok(())
        }
        Commands::Show { id } => {
            let db = init_db(&DbConfig::default(), &cli.data_path).await?;
            let store = SurrealGraphStore::new(db);
            match store.fetch_bundle(id).await? {
                Some(bundle) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&bundle)?);
                    } else {
                        print_summary(&bundle);
                    }
                    Ok(())
                }
                None => Err(AnalysisError::InvalidInput(format!(
                    "no stored analysis for '{id}'"
                ))),
            }
        }
    }
}

fn print_summary(bundle: &AnalysisBundle) {
    let s = &bundle.statistics;
    println!("{} ({})", bundle.title, bundle.novel_id);
    println!(
        "  chapters: {}  words: {}  characters: {}  relations: {}",
        s.chapters, s.words, s.characters, s.relations
    );
    println!(
        "  events: {}  main plot: {}  locations: {}  persisted: {}",
        s.events, s.main_plot_events, s.locations, bundle.persisted
    );
    if bundle.is_empty() {
        println!("  (degenerate input: no entities found)");
        return;
    }
    println!("  top characters:");
    for character in bundle.characters.iter().take(5) {
        println!(
            "    {} importance {:.2} ({:?})",
            character.name, character.importance, character.classification
        );
    }
    for peak in &bundle.emotional_peaks {
        println!(
            "  emotional {:?} at chapter {} ({:.2})",
            peak.kind, peak.chapter, peak.sentiment
        );
    }
}
