/**
 * Tokenizer Module
 *
 * Tokenizers used by the LRA tasks:
 * - `CharTokenizer`      char vocabulary built from an in-memory corpus
 * - `VocabTokenizer`     word/char vocabulary counted from files
 * - `ListOpsTokenizer`   whitespace vocabulary for ListOps, stored as JSON
 * - `ByteLevelTokenizer` raw UTF-8 bytes (IMDB, AAN)
 * - `ImageTokenizer`     placeholder for pixel tasks
 * - `PretrainedTokenizer` Hugging Face `tokenizer.json` with GPT-2 style specials
 */

mod byte_level;
mod char_level;
mod image;
mod listops;
mod pretrained;
mod vocab;

pub use byte_level::*;
pub use char_level::*;
pub use image::*;
pub use listops::*;
pub use pretrained::*;
pub use vocab::*;

use serde::{Deserialize, Serialize};

pub type TokenId = u32;

/// Label/pad value ignored by the loss for tasks without a vocabulary
pub const IGNORE_INDEX: i64 = -100;

/// Special token strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialTokens {
    #[serde(rename = "<unk>")]
    pub unk: String,
    #[serde(rename = "<pad>")]
    pub pad: String,
    #[serde(rename = "<bos>")]
    pub bos: String,
    #[serde(rename = "<eos>")]
    pub eos: String,
}

impl Default for SpecialTokens {
    fn default() -> Self {
        Self {
            unk: "<unk>".to_string(),
            pad: "<pad>".to_string(),
            bos: "<bos>".to_string(),
            eos: "<eos>".to_string(),
        }
    }
}

impl SpecialTokens {
    /// unk, pad, bos, eos. Vocabularies append special tokens in this order.
    pub fn in_order(&self) -> [&str; 4] {
        [
            self.unk.as_str(),
            self.pad.as_str(),
            self.bos.as_str(),
            self.eos.as_str(),
        ]
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.in_order().contains(&symbol)
    }
}

/// A tokenized classification example
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encoding {
    pub input_ids: Vec<TokenId>,
    pub labels: i64,
    /// 0 for real tokens, 1 for padding
    pub pad_mask: Vec<u8>,
}

impl Encoding {
    pub fn new(input_ids: Vec<TokenId>, labels: i64) -> Self {
        let pad_mask = vec![0; input_ids.len()];
        Self {
            input_ids,
            labels,
            pad_mask,
        }
    }

    /// Right-pad to `max_length`. Longer encodings are left unchanged.
    pub fn pad_to(&mut self, max_length: usize, pad_id: TokenId) {
        pad_sequence(&mut self.input_ids, &mut self.pad_mask, max_length, pad_id);
    }
}

/// A tokenized pair of documents (retrieval tasks)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairEncoding {
    pub input_ids: [Vec<TokenId>; 2],
    pub labels: i64,
    pub pad_mask: [Vec<u8>; 2],
}

impl PairEncoding {
    pub fn pad_to(&mut self, max_length: usize, pad_id: TokenId) {
        for i in 0..2 {
            pad_sequence(&mut self.input_ids[i], &mut self.pad_mask[i], max_length, pad_id);
        }
    }
}

fn pad_sequence(ids: &mut Vec<TokenId>, mask: &mut Vec<u8>, max_length: usize, pad_id: TokenId) {
    let pad_length = max_length.saturating_sub(ids.len());
    if pad_length > 0 {
        ids.extend(std::iter::repeat(pad_id).take(pad_length));
        mask.extend(std::iter::repeat(1).take(pad_length));
    }
}

/// What a model needs to know about a tokenizer
pub trait Tokenizer {
    /// `None` when inputs are not token ids (raw pixels)
    fn vocab_size(&self) -> Option<usize>;
    fn pad_token_id(&self) -> i64;
    fn unk_token_id(&self) -> i64;
    fn bos_token_id(&self) -> i64;
    fn eos_token_id(&self) -> i64;
}
