//! Word (or char) vocabulary built by counting symbols in text files.
//!
//! Special tokens always take the first ids. The remaining symbols follow in
//! descending frequency, ties broken by first occurrence.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::{SpecialTokens, TokenId, Tokenizer};
use crate::error::{DataError, Result};

/// How a line is split into symbols
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Delimiter {
    /// Runs of whitespace, empty symbols dropped
    #[default]
    Whitespace,
    /// Every char is a symbol
    Chars,
    /// Exact separator, empty symbols kept
    Str(String),
}

#[derive(Debug, Clone)]
pub struct VocabOptions {
    pub min_freq: usize,
    pub max_size: Option<usize>,
    pub lower_case: bool,
    pub delimiter: Delimiter,
}

impl Default for VocabOptions {
    fn default() -> Self {
        Self {
            min_freq: 0,
            max_size: None,
            lower_case: true,
            delimiter: Delimiter::Whitespace,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VocabTokenizer {
    options: VocabOptions,
    special: SpecialTokens,
    /// symbol -> (count, first occurrence)
    counter: HashMap<String, (usize, usize)>,
    mapping: HashMap<String, TokenId>,
    reverse: Vec<String>,
}

const LOG_EVERY_LINES: usize = 500_000;

impl VocabTokenizer {
    pub fn new(options: VocabOptions) -> Self {
        let mut tokenizer = Self {
            options,
            special: SpecialTokens::default(),
            counter: HashMap::new(),
            mapping: HashMap::new(),
            reverse: Vec::new(),
        };
        tokenizer.reset_vocab();
        tokenizer
    }

    fn reset_vocab(&mut self) {
        self.mapping.clear();
        self.reverse.clear();
        let special = self.special.clone();
        for symbol in special.in_order() {
            self.push_symbol(symbol);
        }
    }

    fn push_symbol(&mut self, symbol: &str) {
        if !self.mapping.contains_key(symbol) {
            self.mapping.insert(symbol.to_string(), self.reverse.len() as TokenId);
            self.reverse.push(symbol.to_string());
        }
    }

    pub fn tokenize(&self, line: &str, add_bos: bool, add_eos: bool) -> Vec<String> {
        let line = line.trim();
        let line = if self.options.lower_case {
            line.to_lowercase()
        } else {
            line.to_string()
        };

        let mut symbols: Vec<String> = Vec::new();
        if add_bos {
            symbols.push(self.special.bos.clone());
        }
        match &self.options.delimiter {
            Delimiter::Whitespace => symbols.extend(line.split_whitespace().map(str::to_string)),
            Delimiter::Chars => symbols.extend(line.chars().map(String::from)),
            Delimiter::Str(sep) => symbols.extend(line.split(sep.as_str()).map(str::to_string)),
        }
        if add_eos {
            symbols.push(self.special.eos.clone());
        }
        symbols
    }

    /// Count the symbols of one line
    pub fn count_line(&mut self, line: &str) {
        for symbol in self.tokenize(line, false, false) {
            let order = self.counter.len();
            self.counter.entry(symbol).or_insert((0, order)).0 += 1;
        }
    }

    /// Count every line of a UTF-8 file; returns the number of lines
    pub fn count_file(&mut self, path: &Path) -> Result<usize> {
        let file = File::open(path).map_err(|e| DataError::io(path, e))?;
        let mut lines = 0;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| DataError::io(path, e))?;
            self.count_line(&line);
            lines += 1;
        }
        tracing::info!("[Tokenizer] counted {} lines from {:?}", lines, path);
        Ok(lines)
    }

    pub fn build_vocab(&mut self) {
        tracing::info!(
            "[Tokenizer] building vocab with min_freq={}, max_size={:?}",
            self.options.min_freq,
            self.options.max_size
        );
        self.reset_vocab();

        let mut counts: Vec<(&String, &(usize, usize))> = self.counter.iter().collect();
        counts.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
        let limit = self.options.max_size.unwrap_or(counts.len());

        let selected: Vec<String> = counts
            .into_iter()
            .take(limit)
            .take_while(|(_, (count, _))| *count >= self.options.min_freq)
            .map(|(symbol, _)| symbol.clone())
            .collect();
        for symbol in &selected {
            self.push_symbol(symbol);
        }

        tracing::info!(
            "[Tokenizer] final vocab size {} from {} unique tokens",
            self.reverse.len(),
            self.counter.len()
        );
    }

    pub fn encode(&self, line: &str, add_bos: bool, add_eos: bool) -> Vec<TokenId> {
        let unk = self.mapping[&self.special.unk];
        self.tokenize(line, add_bos, add_eos)
            .iter()
            .map(|symbol| *self.mapping.get(symbol).unwrap_or(&unk))
            .collect()
    }

    /// Encode a whole file into one flat id sequence
    pub fn encode_file(&self, path: &Path, add_bos: bool, add_eos: bool) -> Result<Vec<TokenId>> {
        tracing::info!("[Tokenizer] encoding file {:?}", path);
        let file = File::open(path).map_err(|e| DataError::io(path, e))?;
        let mut encoded = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| DataError::io(path, e))?;
            if idx > 0 && idx % LOG_EVERY_LINES == 0 {
                tracing::info!("[Tokenizer]     line {}", idx);
            }
            encoded.extend(self.encode(&line, add_bos, add_eos));
        }
        Ok(encoded)
    }

    pub fn decode(&self, ids: &[TokenId]) -> Result<Vec<String>> {
        ids.iter()
            .map(|&id| {
                self.reverse
                    .get(id as usize)
                    .cloned()
                    .ok_or_else(|| DataError::Tokenizer(format!("unknown token id {}", id)))
            })
            .collect()
    }

    /// Decode a corpus whose symbols are code points written as numbers
    /// (byte-encoded corpora such as enwik8). Special tokens pass through.
    pub fn decode_text(&self, ids: &[TokenId]) -> Result<String> {
        let mut out = String::new();
        for symbol in self.decode(ids)? {
            let decoded = if self.special.contains(&symbol) {
                None
            } else {
                symbol.parse::<u32>().ok().and_then(char::from_u32)
            };
            match decoded {
                Some(c) => out.push(c),
                None => out.push_str(&symbol),
            }
        }
        Ok(out)
    }

    pub fn decode_batch(&self, batch: &[Vec<TokenId>]) -> Result<Vec<Vec<String>>> {
        batch.iter().map(|ids| self.decode(ids)).collect()
    }
}

impl Tokenizer for VocabTokenizer {
    fn vocab_size(&self) -> Option<usize> {
        Some(self.reverse.len())
    }

    fn pad_token_id(&self) -> i64 {
        self.mapping[&self.special.pad] as i64
    }

    fn unk_token_id(&self) -> i64 {
        self.mapping[&self.special.unk] as i64
    }

    fn bos_token_id(&self) -> i64 {
        self.mapping[&self.special.bos] as i64
    }

    fn eos_token_id(&self) -> i64 {
        self.mapping[&self.special.eos] as i64
    }
}
