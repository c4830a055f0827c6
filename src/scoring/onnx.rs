//! ONNX Runtime sequence-classification backend.
//!
//! Loads a BERT-family classifier exported to ONNX (for example DistilBERT
//! fine-tuned on SST-2) together with its WordPiece `vocab.txt`. Inference
//! runs one text at a time; the session is behind a mutex because
//! `Session::run` needs `&mut self`.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;
use tracing::debug;

use crate::constants::onnx::{
    CLS_TOKEN, DEFAULT_LABELS, MAX_SEQUENCE_LEN, MAX_WORD_CHARS, MODEL_FILE, SEP_TOKEN,
    UNK_TOKEN, VOCAB_FILE,
};
use crate::data::{Sentiment, SentimentLabel};
use crate::errors::ModelError;
use crate::scoring::SentimentModel;

/// Lowercasing WordPiece tokenizer compatible with uncased BERT vocabularies.
#[derive(Debug, Clone)]
pub struct WordPieceTokenizer {
    vocab: HashMap<String, i64>,
    cls_id: i64,
    sep_id: i64,
    unk_id: i64,
    max_len: usize,
}

impl WordPieceTokenizer {
    /// Build from `vocab.txt` contents, one token per line; the line number is the id.
    pub fn from_vocab(contents: &str) -> Result<Self, ModelError> {
        let vocab: HashMap<String, i64> = contents
            .lines()
            .enumerate()
            .map(|(id, token)| (token.trim_end().to_string(), id as i64))
            .collect();
        let special = |token: &str| {
            vocab.get(token).copied().ok_or_else(|| {
                ModelError::Unavailable(format!("vocabulary has no {token} token"))
            })
        };
        Ok(Self {
            cls_id: special(CLS_TOKEN)?,
            sep_id: special(SEP_TOKEN)?,
            unk_id: special(UNK_TOKEN)?,
            vocab,
            max_len: MAX_SEQUENCE_LEN,
        })
    }

    /// Read a vocabulary file from disk.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            ModelError::Unavailable(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_vocab(&contents)
    }

    /// Cap the encoded length, special tokens included.
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len.max(2);
        self
    }

    /// Encode `text` as `[CLS] pieces... [SEP]`, truncated to the maximum length.
    pub fn encode(&self, text: &str) -> Vec<i64> {
        let mut ids = vec![self.cls_id];
        let budget = self.max_len - 1;
        'words: for word in basic_tokens(&text.to_lowercase()) {
            for id in self.word_pieces(&word) {
                if ids.len() == budget {
                    break 'words;
                }
                ids.push(id);
            }
        }
        ids.push(self.sep_id);
        ids
    }

    /// Greedy longest-match-first split of one word; unsplittable words become `[UNK]`.
    fn word_pieces(&self, word: &str) -> Vec<i64> {
        let chars: Vec<char> = word.chars().collect();
        if chars.len() > MAX_WORD_CHARS {
            return vec![self.unk_id];
        }
        let mut pieces = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let mut end = chars.len();
            let mut found = None;
            while start < end {
                let mut piece: String = chars[start..end].iter().collect();
                if start > 0 {
                    piece.insert_str(0, "##");
                }
                if let Some(id) = self.vocab.get(&piece) {
                    found = Some(*id);
                    break;
                }
                end -= 1;
            }
            match found {
                Some(id) => pieces.push(id),
                None => return vec![self.unk_id],
            }
            start = end;
        }
        pieces
    }
}

/// Split on whitespace and isolate punctuation, as BERT's basic tokenizer does.
fn basic_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for chunk in text.split_whitespace() {
        let mut current = String::new();
        for ch in chunk.chars() {
            if !ch.is_alphanumeric() {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(ch.to_string());
            } else {
                current.push(ch);
            }
        }
        if !current.is_empty() {
            tokens.push(current);
        }
    }
    tokens
}

/// Numerically stable softmax.
fn softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f64> = logits.iter().map(|v| f64::from(v - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

/// Map a model label name (`NEGATIVE`, `pos`, `Neutral`) onto the closed label set.
fn parse_label(name: &str) -> Option<SentimentLabel> {
    match name.trim().to_ascii_lowercase().as_str() {
        "positive" | "pos" => Some(SentimentLabel::Positive),
        "negative" | "neg" => Some(SentimentLabel::Negative),
        "neutral" | "neu" => Some(SentimentLabel::Neutral),
        _ => None,
    }
}

/// Pick the most probable class and report its probability as the confidence.
fn pick_label(logits: &[f32], labels: &[SentimentLabel]) -> Result<Sentiment, ModelError> {
    if logits.len() != labels.len() {
        return Err(ModelError::InvalidPrediction(format!(
            "model produced {} logits for {} labels",
            logits.len(),
            labels.len()
        )));
    }
    let probabilities = softmax(logits);
    let (index, score) = probabilities
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or_else(|| ModelError::InvalidPrediction("model produced no logits".into()))?;
    Ok(Sentiment {
        label: labels[index],
        score,
    })
}

fn load_error(path: &Path, err: impl fmt::Display) -> ModelError {
    ModelError::Unavailable(format!("{}: {err}", path.display()))
}

/// Pretrained transformer classifier served through ONNX Runtime.
pub struct OnnxModel {
    session: Mutex<Session>,
    tokenizer: WordPieceTokenizer,
    labels: Vec<SentimentLabel>,
    model_name: String,
}

impl OnnxModel {
    /// Load `model.onnx` and `vocab.txt` from `model_dir`.
    ///
    /// Class order defaults to SST-2 (`negative`, `positive`); override it with
    /// [`OnnxModel::with_labels`] for three-way models.
    pub fn load(model_dir: &Path) -> Result<Self, ModelError> {
        let model_path = model_dir.join(MODEL_FILE);
        if !model_path.exists() {
            return Err(ModelError::Unavailable(format!(
                "model file not found: {}",
                model_path.display()
            )));
        }
        let tokenizer = WordPieceTokenizer::load(&model_dir.join(VOCAB_FILE))?;
        let session = Session::builder()
            .map_err(|err| load_error(&model_path, err))?
            .with_intra_threads(2)
            .map_err(|err| load_error(&model_path, err))?
            .commit_from_file(&model_path)
            .map_err(|err| load_error(&model_path, err))?;

        let model_name = model_dir
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("onnx-model")
            .to_string();
        debug!(model = %model_name, "onnx sentiment model loaded");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            labels: DEFAULT_LABELS.to_vec(),
            model_name,
        })
    }

    /// Set the class order by label name, index 0 first.
    pub fn with_labels<S: AsRef<str>>(mut self, names: &[S]) -> Result<Self, ModelError> {
        self.labels = names
            .iter()
            .map(|name| {
                parse_label(name.as_ref()).ok_or_else(|| {
                    ModelError::Unavailable(format!("unknown label name '{}'", name.as_ref()))
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    fn logits(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        let input_ids = self.tokenizer.encode(text);
        let seq_len = input_ids.len() as i64;
        let attention_mask = vec![1i64; input_ids.len()];
        let ids = Tensor::from_array((vec![1i64, seq_len], input_ids))
            .map_err(|err| ModelError::InvalidPrediction(format!("tensor creation: {err}")))?;
        let mask = Tensor::from_array((vec![1i64, seq_len], attention_mask))
            .map_err(|err| ModelError::InvalidPrediction(format!("tensor creation: {err}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|err| ModelError::Unavailable(format!("session lock poisoned: {err}")))?;
        let outputs = session
            .run(ort::inputs![ids, mask])
            .map_err(|err| ModelError::Unavailable(err.to_string()))?;
        let (_name, output) = outputs
            .iter()
            .next()
            .ok_or_else(|| ModelError::InvalidPrediction("no output tensor".into()))?;
        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|err| ModelError::InvalidPrediction(format!("logit extraction: {err}")))?;
        // [batch=1, classes]
        if shape.len() != 2 {
            return Err(ModelError::InvalidPrediction(format!(
                "unexpected output shape: {shape:?}"
            )));
        }
        Ok(data.to_vec())
    }
}

impl SentimentModel for OnnxModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn classify(&self, text: &str) -> Result<Sentiment, ModelError> {
        let logits = self.logits(text)?;
        pick_label(&logits, &self.labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const VOCAB: &str =
        "[PAD]\n[UNK]\n[CLS]\n[SEP]\nthe\nmarket\nrally\n##ing\nstrong\n!\nun\n##real\n";

    #[test]
    fn encodes_with_special_tokens_and_continuations() {
        let tokenizer = WordPieceTokenizer::from_vocab(VOCAB).unwrap();
        assert_eq!(tokenizer.encode("The market rallying!"), vec![2, 4, 5, 6, 7, 9, 3]);
        assert_eq!(tokenizer.encode("unreal"), vec![2, 10, 11, 3]);
        assert_eq!(tokenizer.encode("zzz strong"), vec![2, 1, 8, 3]);
        assert_eq!(tokenizer.encode(""), vec![2, 3]);
    }

    #[test]
    fn truncates_to_max_len() {
        let tokenizer = WordPieceTokenizer::from_vocab(VOCAB).unwrap().with_max_len(4);
        assert_eq!(tokenizer.encode("the market rally strong"), vec![2, 4, 5, 3]);
    }

    #[test]
    fn vocabulary_without_special_tokens_is_rejected() {
        assert!(matches!(
            WordPieceTokenizer::from_vocab("the\nmarket\n"),
            Err(ModelError::Unavailable(_))
        ));
    }

    #[test]
    fn picks_most_probable_label_as_confidence() {
        let labels = [SentimentLabel::Negative, SentimentLabel::Positive];
        let sentiment = pick_label(&[-1.0, 1.0], &labels).unwrap();
        assert_eq!(sentiment.label, SentimentLabel::Positive);
        let expected = 1.0 / (1.0 + (-2.0f64).exp());
        assert!((sentiment.score - expected).abs() < 1e-9);
        assert!(matches!(
            pick_label(&[0.5], &labels),
            Err(ModelError::InvalidPrediction(_))
        ));
    }

    #[test]
    fn label_names_cover_common_checkpoints() {
        assert_eq!(parse_label("NEGATIVE"), Some(SentimentLabel::Negative));
        assert_eq!(parse_label("pos"), Some(SentimentLabel::Positive));
        assert_eq!(parse_label(" Neutral "), Some(SentimentLabel::Neutral));
        assert_eq!(parse_label("LABEL_1"), None);
    }

    #[test]
    fn missing_model_file_is_unavailable() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            OnnxModel::load(dir.path()),
            Err(ModelError::Unavailable(_))
        ));
    }
}
