// ============================================================
// CLI Commands and Arguments
// ============================================================
// Subcommands of `lra-data` and their flags. The conversion into
// library types happens here so the library never sees clap.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Where `listops-vocab` writes and `encode` reads the ListOps vocabulary,
/// relative to the project root
pub const DEFAULT_LISTOPS_TOKENIZER: &str = "data/tokenizers/tok_list_ops.json";

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download and extract the LRA release (and any auxiliary files)
    Fetch(FetchArgs),

    /// Show which resources are present and the last fetch record
    Status,

    /// Remove every downloaded resource
    Clean,

    /// Print the effective configuration as TOML
    ShowConfig,

    /// Build the ListOps vocabulary from the extracted train split
    ListopsVocab(ListopsVocabArgs),

    /// Tokenize a few examples of a TSV-backed task
    Encode(EncodeArgs),
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Auxiliary TSV to fetch after the archive (GitHub blob URLs are accepted)
    #[arg(long)]
    pub aux_url: Option<String>,

    /// Resource name for --aux-url
    #[arg(long, requires = "aux_url")]
    pub aux_name: Option<String>,

    /// Keep resources that are already complete instead of fetching them again
    #[arg(long)]
    pub keep_existing: bool,

    /// Log only, no progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Override the configured number of retries for transient failures
    #[arg(long)]
    pub retries: Option<u32>,
}

#[derive(Args, Debug)]
pub struct ListopsVocabArgs {
    /// Output JSON, relative to the project root unless absolute
    #[arg(long, default_value = DEFAULT_LISTOPS_TOKENIZER)]
    pub out: PathBuf,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Task name: listops or aan
    #[arg(long)]
    pub task: String,

    /// train, validation or test
    #[arg(long, default_value = "validation")]
    pub split: String,

    /// Number of examples to print
    #[arg(long, default_value_t = 3)]
    pub limit: usize,

    /// Truncation / padding length
    #[arg(long, default_value_t = 2000)]
    pub max_length: usize,

    /// ListOps tokenizer JSON (defaults to the listops-vocab output)
    #[arg(long)]
    pub tokenizer: Option<PathBuf>,
}
