//! Byte-level tokenizer: ids 0-255 are the UTF-8 bytes of the text, the
//! special tokens sit right after them.

use super::{Encoding, PairEncoding, TokenId, Tokenizer};

pub const NUM_BYTES: TokenId = 256;
pub const BYTE_PAD_ID: TokenId = NUM_BYTES;
pub const BYTE_UNK_ID: TokenId = NUM_BYTES + 1;
pub const BYTE_BOS_ID: TokenId = NUM_BYTES + 2;
pub const BYTE_EOS_ID: TokenId = NUM_BYTES + 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteLevelTokenizer {
    pub use_bos: bool,
    pub use_eos: bool,
}

impl Default for ByteLevelTokenizer {
    fn default() -> Self {
        Self {
            use_bos: false,
            use_eos: true,
        }
    }
}

impl ByteLevelTokenizer {
    pub fn new(use_bos: bool, use_eos: bool) -> Self {
        Self { use_bos, use_eos }
    }

    /// Bytes of `text` truncated so the result, specials included, fits `max_length`
    fn encode_ids(&self, max_length: usize, text: &str) -> Vec<TokenId> {
        let budget = max_length.saturating_sub(self.use_bos as usize + self.use_eos as usize);

        let mut ids = Vec::with_capacity(budget + 2);
        if self.use_bos {
            ids.push(BYTE_BOS_ID);
        }
        ids.extend(text.bytes().take(budget).map(TokenId::from));
        if self.use_eos {
            ids.push(BYTE_EOS_ID);
        }
        ids
    }

    pub fn encode(&self, max_length: usize, text: &str, label: i64) -> Encoding {
        Encoding::new(self.encode_ids(max_length, text), label)
    }

    pub fn encode_pair(
        &self,
        max_length: usize,
        text1: &str,
        text2: &str,
        label: i64,
    ) -> PairEncoding {
        let first = self.encode_ids(max_length, text1);
        let second = self.encode_ids(max_length, text2);
        PairEncoding {
            pad_mask: [vec![0; first.len()], vec![0; second.len()]],
            input_ids: [first, second],
            labels: label,
        }
    }

    pub fn pad(&self, max_length: usize, mut encoding: Encoding) -> Encoding {
        encoding.pad_to(max_length, BYTE_PAD_ID);
        encoding
    }

    pub fn pad_pair(&self, max_length: usize, mut encoding: PairEncoding) -> PairEncoding {
        encoding.pad_to(max_length, BYTE_PAD_ID);
        encoding
    }

    /// Bytes are rendered as Latin-1 chars, specials by name, joined by spaces
    pub fn decode(&self, ids: &[TokenId]) -> String {
        ids.iter()
            .map(|&id| match id {
                BYTE_PAD_ID => "<pad>".to_string(),
                BYTE_UNK_ID => "<unk>".to_string(),
                BYTE_BOS_ID => "<bos>".to_string(),
                BYTE_EOS_ID => "<eos>".to_string(),
                other => char::from_u32(other)
                    .unwrap_or(char::REPLACEMENT_CHARACTER)
                    .to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn decode_batch(&self, batch: &[Vec<TokenId>]) -> Vec<String> {
        batch.iter().map(|ids| self.decode(ids)).collect()
    }
}

impl Tokenizer for ByteLevelTokenizer {
    fn vocab_size(&self) -> Option<usize> {
        Some(NUM_BYTES as usize + 4)
    }

    fn pad_token_id(&self) -> i64 {
        BYTE_PAD_ID as i64
    }

    fn unk_token_id(&self) -> i64 {
        BYTE_UNK_ID as i64
    }

    fn bos_token_id(&self) -> i64 {
        BYTE_BOS_ID as i64
    }

    fn eos_token_id(&self) -> i64 {
        BYTE_EOS_ID as i64
    }
}
