//! ListOps tokenizer.
//!
//! ListOps sources are whitespace separated: operators (`[MAX`, `[MIN`,
//! `[MED`, `[SM`), the closing `]`, brackets and the digits 0-9. The target
//! is a 10-way class.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Encoding, SpecialTokens, TokenId, Tokenizer, IGNORE_INDEX};
use crate::error::{DataError, Result};

/// On-disk form: `{"special_tokens": {...}, "tokens": {...}}`
#[derive(Debug, Serialize, Deserialize)]
struct ListOpsState {
    special_tokens: SpecialTokens,
    tokens: BTreeMap<String, TokenId>,
}

#[derive(Debug, Clone)]
pub struct ListOpsTokenizer {
    special: SpecialTokens,
    mapping: HashMap<String, TokenId>,
    reverse: HashMap<TokenId, String>,
}

impl ListOpsTokenizer {
    /// Every special token must be part of `mapping`
    pub fn new(mapping: HashMap<String, TokenId>, special: Option<SpecialTokens>) -> Result<Self> {
        let special = special.unwrap_or_default();
        for symbol in special.in_order() {
            if !mapping.contains_key(symbol) {
                return Err(DataError::Tokenizer(format!(
                    "special token '{}' missing from the ListOps vocabulary",
                    symbol
                )));
            }
        }
        let reverse = mapping.iter().map(|(k, &v)| (v, k.clone())).collect();
        Ok(Self {
            special,
            mapping,
            reverse,
        })
    }

    /// Build the vocabulary from the train split sources
    pub fn train<'a, I>(sources: I, special: SpecialTokens) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let vocab: BTreeSet<&str> = sources
            .into_iter()
            .flat_map(|source| source.split_whitespace())
            .collect();

        let mut mapping: HashMap<String, TokenId> = vocab
            .iter()
            .enumerate()
            .map(|(id, symbol)| (symbol.to_string(), id as TokenId))
            .collect();
        let base = vocab.len();
        for (i, symbol) in special.in_order().iter().enumerate() {
            mapping.insert(symbol.to_string(), (base + i) as TokenId);
        }

        tracing::info!("[Tokenizer] ListOps vocabulary: {} symbols + 4 special", base);
        Self::new(mapping, Some(special))
    }

    pub fn from_pretrained(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| DataError::io(path, e))?;
        let state: ListOpsState = serde_json::from_str(&text)?;
        Self::new(state.tokens.into_iter().collect(), Some(state.special_tokens))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let state = ListOpsState {
            special_tokens: self.special.clone(),
            tokens: self.mapping.iter().map(|(k, &v)| (k.clone(), v)).collect(),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DataError::io(parent, e))?;
        }
        let text = serde_json::to_string(&state)?;
        std::fs::write(path, text).map_err(|e| DataError::io(path, e))?;
        tracing::info!("[Tokenizer] saved ListOps tokenizer to {:?}", path);
        Ok(())
    }

    fn special_id(&self, symbol: &str) -> TokenId {
        self.mapping[symbol]
    }

    /// Tokenize a source, truncated to `max_length`
    pub fn encode(&self, max_length: usize, source: &str, label: i64) -> Encoding {
        let unk = self.special_id(&self.special.unk);
        let input_ids = source
            .split_whitespace()
            .take(max_length)
            .map(|symbol| *self.mapping.get(symbol).unwrap_or(&unk))
            .collect();
        Encoding::new(input_ids, label)
    }

    pub fn pad(&self, max_length: usize, mut encoding: Encoding) -> Encoding {
        encoding.pad_to(max_length, self.special_id(&self.special.pad));
        encoding
    }

    pub fn decode(&self, ids: &[TokenId]) -> Result<String> {
        let symbols = ids
            .iter()
            .map(|id| {
                self.reverse
                    .get(id)
                    .map(String::as_str)
                    .ok_or_else(|| DataError::Tokenizer(format!("unknown token id {}", id)))
            })
            .collect::<Result<Vec<&str>>>()?;
        Ok(symbols.join(" "))
    }

    pub fn decode_batch(&self, batch: &[Vec<TokenId>]) -> Result<Vec<String>> {
        batch.iter().map(|ids| self.decode(ids)).collect()
    }

    fn id_or_ignore(&self, symbol: &str) -> i64 {
        self.mapping.get(symbol).map(|&id| id as i64).unwrap_or(IGNORE_INDEX)
    }
}

impl Tokenizer for ListOpsTokenizer {
    fn vocab_size(&self) -> Option<usize> {
        Some(self.mapping.len())
    }

    fn pad_token_id(&self) -> i64 {
        self.id_or_ignore(&self.special.pad)
    }

    fn unk_token_id(&self) -> i64 {
        self.id_or_ignore(&self.special.unk)
    }

    fn bos_token_id(&self) -> i64 {
        self.id_or_ignore(&self.special.bos)
    }

    fn eos_token_id(&self) -> i64 {
        self.id_or_ignore(&self.special.eos)
    }
}
