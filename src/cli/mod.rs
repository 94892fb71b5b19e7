// ============================================================
// CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes each subcommand to the
// library. Nothing here computes; it only loads config, calls,
// and prints.

pub mod commands;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::HumanBytes;
use tokio::sync::mpsc;

use commands::{Commands, EncodeArgs, FetchArgs, ListopsVocabArgs, DEFAULT_LISTOPS_TOKENIZER};
use lra_data::config::FetchConfig;
use lra_data::downloads::{is_resource_available, resource_size, CancelFlag};
use lra_data::lra::{tsv, LraTask, LraTokenizer, Split, TaskOptions};
use lra_data::paths;
use lra_data::setup::{self, FetchOptions, Progress};
use lra_data::tokenizer::{ListOpsTokenizer, SpecialTokens, Tokenizer};

#[derive(Parser, Debug)]
#[command(
    name = "lra-data",
    version,
    about = "Fetch the Long Range Arena benchmark data and tokenize its tasks."
)]
pub struct Cli {
    /// Project root (defaults to $LRA_DATA_ROOT, then the current directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Config file (defaults to <root>/lra-data.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let root = paths::resolve_project_root(self.root.as_deref())?;
        let config = FetchConfig::load(&root, self.config.as_deref())
            .context("failed to load configuration")?;

        match self.command {
            Commands::Fetch(args) => run_fetch(&root, config, args).await,
            Commands::Status => run_status(&root, &config),
            Commands::Clean => run_clean(&root, &config),
            Commands::ShowConfig => {
                print!("{}", config.to_toml()?);
                Ok(())
            }
            Commands::ListopsVocab(args) => run_listops_vocab(&root, &config, args),
            Commands::Encode(args) => run_encode(&root, &config, args),
        }
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

async fn run_fetch(root: &Path, mut config: FetchConfig, args: FetchArgs) -> Result<()> {
    if let Some(url) = args.aux_url.as_deref() {
        config = config.with_aux(url, args.aux_name.as_deref());
    }
    if let Some(retries) = args.retries {
        config.retries = retries;
    }

    let options = FetchOptions {
        keep_existing: args.keep_existing,
        cancel: CancelFlag::new(),
    };

    // Ctrl-C stops the run between chunks
    let cancel = options.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling fetch...");
            cancel.cancel();
        }
    });

    let (tx, rx) = mpsc::channel(256);
    let tasks = config
        .resources
        .iter()
        .map(|r| Progress::pending(&r.name, &r.name))
        .collect();
    let reporter = setup::spawn_reporter(rx, tasks, !args.no_progress);

    let result = setup::run_fetch(&config, root, &options, Some(tx)).await;
    let overall = reporter.await.context("progress reporter crashed")?;
    let report = result?;

    println!("Fetched into {}", report.data_dir.display());
    for res in &report.resources {
        println!(
            "  {:<16} {:?} {:>10} {}",
            res.name,
            res.status,
            HumanBytes(res.bytes).to_string(),
            res.sha256.as_deref().unwrap_or("-")
        );
    }
    tracing::debug!("overall progress {:.0}%", overall.overall_percentage());
    Ok(())
}

fn run_status(root: &Path, config: &FetchConfig) -> Result<()> {
    let data_dir = paths::data_dir(root, &config.data_dir);
    println!("Data directory: {}", data_dir.display());

    for res in &config.resources {
        let available = is_resource_available(&data_dir, res);
        println!(
            "  {:<16} {:<9} {:>10}  {}",
            res.name,
            if available { "present" } else { "missing" },
            HumanBytes(resource_size(&data_dir, res)).to_string(),
            res.download_url()
        );
    }

    match setup::read_fetch_record(&data_dir)? {
        Some(record) => println!("Last fetch: {}", record.fetched_at.to_rfc3339()),
        None => println!("Last fetch: never"),
    }
    Ok(())
}

fn run_clean(root: &Path, config: &FetchConfig) -> Result<()> {
    let data_dir = setup::clean(config, root)?;
    println!("Removed LRA resources from {}", data_dir.display());
    Ok(())
}

fn run_listops_vocab(root: &Path, config: &FetchConfig, args: ListopsVocabArgs) -> Result<()> {
    let data_dir = paths::data_dir(root, &config.data_dir);
    let train = LraTask::ListOps
        .split_file(&data_dir, Split::Train)
        .context("ListOps has no train split file")?;

    let records = tsv::read_listops(&train)?;
    let tokenizer = ListOpsTokenizer::train(
        records.iter().map(|r| r.source.as_str()),
        SpecialTokens::default(),
    )?;

    let out = resolve(root, &args.out);
    tokenizer.save(&out)?;
    println!(
        "Saved ListOps tokenizer ({} symbols) to {}",
        tokenizer.vocab_size().unwrap_or(0),
        out.display()
    );
    Ok(())
}

fn run_encode(root: &Path, config: &FetchConfig, args: EncodeArgs) -> Result<()> {
    let data_dir = paths::data_dir(root, &config.data_dir);
    let task = LraTask::from_name(&args.task)?;
    let split = Split::from_name(&args.split)?;
    let Some(path) = task.split_file(&data_dir, split) else {
        bail!("{} is not stored as TSV in the LRA release", task);
    };

    let tokenizer_path = args
        .tokenizer
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LISTOPS_TOKENIZER));
    let options = TaskOptions {
        tokenizer_path: Some(resolve(root, &tokenizer_path)),
        tokenize_img: false,
    };
    let tokenizer = task.tokenizer(&options)?;

    match (&task, &tokenizer) {
        (LraTask::ListOps, LraTokenizer::ListOps(tok)) => {
            for record in tsv::read_listops(&path)?.iter().take(args.limit) {
                let enc = tok.encode(args.max_length, &record.source, record.target);
                println!(
                    "label={} len={} ids={:?}",
                    enc.labels,
                    enc.input_ids.len(),
                    enc.input_ids
                );
            }
        }
        (LraTask::Aan, LraTokenizer::ByteLevel(tok)) => {
            for record in tsv::read_aan(&path)?.iter().take(args.limit) {
                let enc =
                    tok.encode_pair(args.max_length, &record.text1, &record.text2, record.label);
                println!(
                    "label={} {}:{} len=({}, {})",
                    enc.labels,
                    record.id1,
                    record.id2,
                    enc.input_ids[0].len(),
                    enc.input_ids[1].len()
                );
            }
        }
        _ => bail!("no TSV encoder for {}", task),
    }
    Ok(())
}
