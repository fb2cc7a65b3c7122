//! CLI tool for generating chat-level features from conversation transcripts.
//!
//! Reads a CSV of chat messages, computes per-message features once, and
//! writes one featurized CSV per requested conversation-prefix fraction.
//! Several datasets can be processed in one go from a TOML job file.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_features_core::{
    ColumnNames, FeatureEngineConfig, FeaturePipeline, PipelineConfig, PipelineReport,
    DEFAULT_ENCODING,
};

/// Generate chat-level features for conversation transcripts.
#[derive(Parser, Debug)]
#[command(name = "chat-features")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML job file with one [[dataset]] table per dataset
    #[arg(long, conflicts_with_all = ["input_file_path", "output_file_path_chat_level"])]
    config: Option<PathBuf>,

    /// Input CSV with conversation, speaker and message columns
    #[arg(long)]
    input_file_path: Option<PathBuf>,

    /// Output CSV for the full chat-level table
    #[arg(long)]
    output_file_path_chat_level: Option<PathBuf>,

    /// Conversation-prefix fractions to write, comma separated (0.0-1.0)
    #[arg(long, value_delimiter = ',', default_value = "1.0")]
    analyze_first_pct: Vec<f64>,

    /// Collapse consecutive same-speaker messages into turns
    #[arg(long)]
    turns: bool,

    /// Input encoding label (e.g. utf-8, macintosh, windows-1252)
    #[arg(long, default_value = DEFAULT_ENCODING)]
    encoding: String,

    /// Input field delimiter
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Directory for truncated outputs (default: rewrite the output/ segment)
    #[arg(long)]
    truncated_output_dir: Option<PathBuf>,

    /// Name of the conversation id column
    #[arg(long, default_value = "conversation_num")]
    conversation_column: String,

    /// Name of the speaker column
    #[arg(long, default_value = "speaker_nickname")]
    speaker_column: String,

    /// Name of the message column
    #[arg(long, default_value = "message")]
    message_column: String,

    /// Write the run report(s) as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Args {
    fn datasets(&self) -> anyhow::Result<Vec<PipelineConfig>> {
        if let Some(path) = &self.config {
            let jobs = FeatureEngineConfig::from_file(path)
                .with_context(|| format!("loading job file {}", path.display()))?;
            return Ok(jobs.datasets);
        }

        let (Some(input), Some(output)) = (&self.input_file_path, &self.output_file_path_chat_level)
        else {
            bail!("either --config or both --input-file-path and --output-file-path-chat-level are required");
        };
        let config = PipelineConfig {
            analyze_first_pct: self.analyze_first_pct.clone(),
            turns: self.turns,
            encoding: self.encoding.clone(),
            delimiter: self.delimiter,
            truncated_output_dir: self.truncated_output_dir.clone(),
            columns: ColumnNames {
                conversation: self.conversation_column.clone(),
                speaker: self.speaker_column.clone(),
                message: self.message_column.clone(),
            },
            ..PipelineConfig::new(input, output)
        };
        config.validate()?;
        Ok(vec![config])
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let datasets = args.datasets()?;

    let mut reports: Vec<PipelineReport> = Vec::with_capacity(datasets.len());
    for config in datasets {
        let input = config.input_file_path.clone();
        let report = FeaturePipeline::new(config)
            .run()
            .with_context(|| format!("featurizing {}", input.display()))?;
        reports.push(report);
    }

    if let Some(path) = &args.report {
        std::fs::write(path, serde_json::to_string_pretty(&reports)?)
            .with_context(|| format!("writing report {}", path.display()))?;
        info!(path = %path.display(), "wrote run report");
    }

    println!("\n[summary]");
    for report in &reports {
        println!("  Input: {:?}", report.input_file_path);
        println!("    Rows read: {}", report.input_rows);
        println!("    Rows featurized: {}", report.preprocessed_rows);
        println!("    Conversations: {}", report.conversations);
        println!("    Feature columns: {}", report.feature_columns.len());
        for artifact in &report.artifacts {
            println!(
                "    first {:>3}%: {} rows -> {:?}",
                artifact.fraction.percent(),
                artifact.rows,
                artifact.path
            );
        }
    }

    Ok(())
}
