/**
 * LRA Module
 *
 * Long Range Arena task wiring: which tokenizer a task uses, which model
 * head it needs and where its TSV splits live inside the extracted release.
 */

pub mod tsv;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{DataError, Result};
use crate::tokenizer::{ByteLevelTokenizer, ImageTokenizer, ListOpsTokenizer, Tokenizer};

pub use tsv::{AanRecord, ListOpsRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LraTask {
    ListOps,
    /// Any `pathfinder*` variant (`pathfinder32`, `pathfinder128`, ...)
    Pathfinder(String),
    Imdb,
    Aan,
    Cifar10,
}

/// Model head a task trains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Head {
    Classification,
    /// Two documents encoded separately (AAN)
    Retrieval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Validation,
    Test,
}

impl Split {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "train" => Ok(Self::Train),
            "validation" | "val" | "eval" => Ok(Self::Validation),
            "test" => Ok(Self::Test),
            other => Err(DataError::Config(format!("unknown split '{}'", other))),
        }
    }
}

/// Task-specific inputs for tokenizer selection
#[derive(Debug, Clone, Default)]
pub struct TaskOptions {
    /// ListOps tokenizer JSON
    pub tokenizer_path: Option<PathBuf>,
    /// CIFAR-10 pixels as tokens (256 intensities) instead of raw values
    pub tokenize_img: bool,
}

/// The tokenizer chosen for a task
#[derive(Debug, Clone)]
pub enum LraTokenizer {
    ListOps(ListOpsTokenizer),
    ByteLevel(ByteLevelTokenizer),
    Image(ImageTokenizer),
}

impl LraTokenizer {
    fn as_dyn(&self) -> &dyn Tokenizer {
        match self {
            Self::ListOps(t) => t,
            Self::ByteLevel(t) => t,
            Self::Image(t) => t,
        }
    }
}

impl Tokenizer for LraTokenizer {
    fn vocab_size(&self) -> Option<usize> {
        self.as_dyn().vocab_size()
    }

    fn pad_token_id(&self) -> i64 {
        self.as_dyn().pad_token_id()
    }

    fn unk_token_id(&self) -> i64 {
        self.as_dyn().unk_token_id()
    }

    fn bos_token_id(&self) -> i64 {
        self.as_dyn().bos_token_id()
    }

    fn eos_token_id(&self) -> i64 {
        self.as_dyn().eos_token_id()
    }
}

impl LraTask {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "listops" => Ok(Self::ListOps),
            "imdb" => Ok(Self::Imdb),
            "aan" => Ok(Self::Aan),
            "cifar10" => Ok(Self::Cifar10),
            other if other.starts_with("pathfinder") => Ok(Self::Pathfinder(other.to_string())),
            other => Err(DataError::UnknownTask(format!("Unrecognised dataset name '{}'", other))),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::ListOps => "listops",
            Self::Pathfinder(name) => name,
            Self::Imdb => "imdb",
            Self::Aan => "aan",
            Self::Cifar10 => "cifar10",
        }
    }

    pub fn head(&self) -> Head {
        match self {
            Self::Aan => Head::Retrieval,
            _ => Head::Classification,
        }
    }

    /// `{base_dir}/input/lra_data`
    pub fn cache_dir(base_dir: &Path) -> PathBuf {
        base_dir.join("input").join("lra_data")
    }

    pub fn tokenizer(&self, options: &TaskOptions) -> Result<LraTokenizer> {
        let tokenizer = match self {
            Self::ListOps => {
                let path = options.tokenizer_path.as_deref().ok_or_else(|| {
                    DataError::Config(
                        "listops needs a tokenizer path (see `lra-data listops-vocab`)".to_string(),
                    )
                })?;
                LraTokenizer::ListOps(ListOpsTokenizer::from_pretrained(path)?)
            }
            Self::Pathfinder(_) => LraTokenizer::Image(ImageTokenizer::new(None)),
            Self::Imdb | Self::Aan => LraTokenizer::ByteLevel(ByteLevelTokenizer::new(false, true)),
            Self::Cifar10 => {
                let vocab_size = options.tokenize_img.then_some(256);
                LraTokenizer::Image(ImageTokenizer::new(vocab_size))
            }
        };
        tracing::info!("[LRA] {} uses tokenizer {:?}", self, tokenizer.vocab_size());
        Ok(tokenizer)
    }

    /// Location of a split inside the data directory, for tasks stored as TSV
    pub fn split_file(&self, data_dir: &Path, split: Split) -> Option<PathBuf> {
        let release = data_dir.join("lra_release");
        match self {
            Self::ListOps => {
                let split = match split {
                    Split::Train => "train",
                    Split::Validation => "val",
                    Split::Test => "test",
                };
                Some(release.join("listops-1000").join(format!("basic_{}.tsv", split)))
            }
            Self::Aan => {
                let split = match split {
                    Split::Train => "train",
                    Split::Validation => "eval",
                    Split::Test => "test",
                };
                Some(release.join("tsv_data").join(format!("new_aan_pair.{}.tsv", split)))
            }
            _ => None,
        }
    }
}

impl fmt::Display for LraTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
