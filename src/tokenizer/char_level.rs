//! Char-level tokenizer over a corpus held in memory.

use std::collections::{BTreeSet, HashMap};

use super::{SpecialTokens, TokenId, Tokenizer};
use crate::error::{DataError, Result};

/// Vocabulary is every distinct char of the corpus, sorted, followed by the
/// special tokens. Needs the whole corpus up front.
#[derive(Debug, Clone)]
pub struct CharTokenizer {
    special: SpecialTokens,
    mapping: HashMap<String, TokenId>,
    reverse: Vec<String>,
}

impl CharTokenizer {
    pub fn from_corpus(corpus: &str) -> Self {
        let special = SpecialTokens::default();
        let chars: BTreeSet<char> = corpus.chars().collect();

        let mut reverse: Vec<String> = chars.into_iter().map(String::from).collect();
        reverse.extend(special.in_order().iter().map(|s| s.to_string()));
        let mapping = reverse
            .iter()
            .enumerate()
            .map(|(id, symbol)| (symbol.clone(), id as TokenId))
            .collect();

        Self {
            special,
            mapping,
            reverse,
        }
    }

    fn id_of(&self, symbol: &str) -> TokenId {
        self.mapping[symbol]
    }

    pub fn encode(&self, text: &str, add_special_tokens: bool) -> Vec<TokenId> {
        let unk = self.id_of(&self.special.unk);
        let mut buf = [0u8; 4];
        let mut ids: Vec<TokenId> = text
            .chars()
            .map(|c| *self.mapping.get(&*c.encode_utf8(&mut buf)).unwrap_or(&unk))
            .collect();

        if add_special_tokens {
            ids.insert(0, self.id_of(&self.special.bos));
            ids.push(self.id_of(&self.special.eos));
        }
        ids
    }

    pub fn encode_batch(&self, texts: &[&str], add_special_tokens: bool) -> Vec<Vec<TokenId>> {
        texts
            .iter()
            .map(|text| self.encode(text, add_special_tokens))
            .collect()
    }

    /// Special tokens are dropped unless `keep_special` is set
    pub fn decode(&self, ids: &[TokenId], keep_special: bool) -> Result<String> {
        let mut out = String::with_capacity(ids.len());
        for &id in ids {
            let symbol = self
                .reverse
                .get(id as usize)
                .ok_or_else(|| DataError::Tokenizer(format!("unknown token id {}", id)))?;
            if !keep_special && self.special.contains(symbol) {
                continue;
            }
            out.push_str(symbol);
        }
        Ok(out)
    }

    pub fn decode_batch(&self, batch: &[Vec<TokenId>], keep_special: bool) -> Result<Vec<String>> {
        batch.iter().map(|ids| self.decode(ids, keep_special)).collect()
    }
}

impl Tokenizer for CharTokenizer {
    fn vocab_size(&self) -> Option<usize> {
        Some(self.reverse.len())
    }

    fn pad_token_id(&self) -> i64 {
        self.id_of(&self.special.pad) as i64
    }

    fn unk_token_id(&self) -> i64 {
        self.id_of(&self.special.unk) as i64
    }

    fn bos_token_id(&self) -> i64 {
        self.id_of(&self.special.bos) as i64
    }

    fn eos_token_id(&self) -> i64 {
        self.id_of(&self.special.eos) as i64
    }
}
