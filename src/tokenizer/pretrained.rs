//! Hugging Face `tokenizer.json` wrapper.
//!
//! GPT-2 style vocabularies ship without pad/sep/cls tokens. `<|endoftext|>`
//! is registered as a special token and used for all of them, and batch
//! encoding pads with it.

use std::path::Path;

use tokenizers::{AddedToken, PaddingParams, Tokenizer as HfTokenizer};

use super::{Encoding, TokenId, Tokenizer};
use crate::error::{DataError, Result};

pub const END_OF_TEXT: &str = "<|endoftext|>";

fn hf_error(e: impl std::fmt::Display) -> DataError {
    DataError::Tokenizer(e.to_string())
}

pub struct PretrainedTokenizer {
    inner: HfTokenizer,
    special_id: TokenId,
}

impl PretrainedTokenizer {
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DataError::MissingData(path.to_path_buf()));
        }
        let inner = HfTokenizer::from_file(path)
            .map_err(|e| hf_error(format!("cannot load tokenizer from {:?}: {}", path, e)))?;
        let tokenizer = Self::from_tokenizer(inner)?;
        tracing::info!(
            "[Tokenizer] loaded {:?} (vocab {}, pad id {})",
            path,
            tokenizer.inner.get_vocab_size(true),
            tokenizer.special_id
        );
        Ok(tokenizer)
    }

    pub fn from_tokenizer(mut inner: HfTokenizer) -> Result<Self> {
        inner.add_special_tokens(&[AddedToken::from(END_OF_TEXT, true)]);
        let special_id = inner
            .token_to_id(END_OF_TEXT)
            .ok_or_else(|| hf_error(format!("{} was not registered", END_OF_TEXT)))?;

        inner.with_padding(Some(PaddingParams {
            pad_id: special_id,
            pad_token: END_OF_TEXT.to_string(),
            ..Default::default()
        }));

        Ok(Self { inner, special_id })
    }

    pub fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Vec<TokenId>> {
        let encoding = self.inner.encode(text, add_special_tokens).map_err(hf_error)?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Encode a batch padded to its longest member
    pub fn encode_batch(&self, texts: &[&str], labels: &[i64]) -> Result<Vec<Encoding>> {
        if texts.len() != labels.len() {
            return Err(hf_error(format!(
                "{} texts but {} labels",
                texts.len(),
                labels.len()
            )));
        }

        let encodings = self
            .inner
            .encode_batch(texts.to_vec(), true)
            .map_err(hf_error)?;

        Ok(encodings
            .iter()
            .zip(labels)
            .map(|(enc, &label)| Encoding {
                input_ids: enc.get_ids().to_vec(),
                labels: label,
                pad_mask: enc
                    .get_attention_mask()
                    .iter()
                    .map(|&m| u8::from(m == 0))
                    .collect(),
            })
            .collect())
    }

    pub fn decode(&self, ids: &[TokenId], skip_special_tokens: bool) -> Result<String> {
        self.inner.decode(ids, skip_special_tokens).map_err(hf_error)
    }
}

impl Tokenizer for PretrainedTokenizer {
    fn vocab_size(&self) -> Option<usize> {
        Some(self.inner.get_vocab_size(true))
    }

    fn pad_token_id(&self) -> i64 {
        self.special_id as i64
    }

    // GPT-2 uses <|endoftext|> for unk, bos and eos as well
    fn unk_token_id(&self) -> i64 {
        self.special_id as i64
    }

    fn bos_token_id(&self) -> i64 {
        self.special_id as i64
    }

    fn eos_token_id(&self) -> i64 {
        self.special_id as i64
    }
}
