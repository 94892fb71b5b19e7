//! Placeholder tokenizer for pixel tasks (Pathfinder, CIFAR-10).
//!
//! With a vocabulary size the model embeds pixel intensities as tokens;
//! without one it consumes the raw values.

use super::{Tokenizer, IGNORE_INDEX};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageTokenizer {
    pub vocab_size: Option<usize>,
}

impl ImageTokenizer {
    pub fn new(vocab_size: Option<usize>) -> Self {
        Self { vocab_size }
    }
}

impl Tokenizer for ImageTokenizer {
    fn vocab_size(&self) -> Option<usize> {
        self.vocab_size
    }

    fn pad_token_id(&self) -> i64 {
        IGNORE_INDEX
    }

    fn unk_token_id(&self) -> i64 {
        IGNORE_INDEX
    }

    fn bos_token_id(&self) -> i64 {
        IGNORE_INDEX
    }

    fn eos_token_id(&self) -> i64 {
        IGNORE_INDEX
    }
}
