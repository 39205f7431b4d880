//! Token cost of a result set as it would be sent to a language model.

use std::path::Path;

use tiktoken_rs::CoreBPE;
use tokenizers::pre_tokenizers::whitespace::Whitespace;
use tokenizers::{OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer, Tokenizer};

use chunkeval_core::config::TokenizerSettings;
use chunkeval_core::{Error, Result, SearchResult};

/// Encoding used by a known OpenAI model family, matched by name prefix.
pub fn encoding_for_model(model: &str) -> Option<&'static str> {
    const PREFIXES: &[(&str, &str)] = &[
        ("gpt-4o", "o200k_base"),
        ("gpt-4.1", "o200k_base"),
        ("o1", "o200k_base"),
        ("o3", "o200k_base"),
        ("gpt-4", "cl100k_base"),
        ("gpt-3.5-turbo", "cl100k_base"),
        ("text-embedding-3", "cl100k_base"),
        ("text-embedding-ada-002", "cl100k_base"),
        ("text-davinci-003", "p50k_base"),
        ("gpt2", "r50k_base"),
    ];
    PREFIXES.iter().find(|(prefix, _)| model.starts_with(prefix)).map(|(_, enc)| *enc)
}

fn load_bpe(encoding: &str) -> Option<CoreBPE> {
    let loaded = match encoding {
        "o200k_base" => tiktoken_rs::o200k_base(),
        "cl100k_base" => tiktoken_rs::cl100k_base(),
        "p50k_base" => tiktoken_rs::p50k_base(),
        "p50k_edit" => tiktoken_rs::p50k_edit(),
        "r50k_base" | "gpt2" => tiktoken_rs::r50k_base(),
        _ => {
            tracing::warn!(encoding, "unknown encoding, counting pre-tokenized words");
            return None;
        }
    };
    loaded.map_err(|e| tracing::warn!(encoding, error = %e, "failed to load BPE ranks")).ok()
}

enum Counter {
    Bpe(CoreBPE),
    File(Tokenizer),
    Words,
}

/// Counts tokens with the BPE of the encoding a model uses. A `tokenizers`
/// file at `<dir>/<encoding>.json` overrides the built-in ranks; words split
/// on whitespace and punctuation are the last resort.
pub struct TokenCounter {
    encoding: String,
    counter: Counter,
}

impl TokenCounter {
    pub fn for_model(model: &str, fallback_encoding: &str, dir: Option<&Path>) -> Self {
        let encoding = encoding_for_model(model).unwrap_or_else(|| {
            tracing::debug!(model, fallback_encoding, "unknown tokenizer model, using fallback encoding");
            fallback_encoding
        });
        let file = dir.and_then(|d| {
            let path = d.join(format!("{encoding}.json"));
            match Tokenizer::from_file(&path) {
                Ok(t) => Some(t),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "no tokenizer override, using built-in BPE");
                    None
                }
            }
        });
        let counter = match file {
            Some(t) => Counter::File(t),
            None => load_bpe(encoding).map_or(Counter::Words, Counter::Bpe),
        };
        Self { encoding: encoding.to_string(), counter }
    }

    pub fn from_settings(settings: &TokenizerSettings, base: &Path) -> Self {
        let dir = settings.dir.as_deref().map(|d| chunkeval_core::config::resolve_with_base(base, d));
        Self::for_model(&settings.model, &settings.fallback_encoding, dir.as_deref())
    }

    /// Whitespace/punctuation counting only.
    pub fn approximate() -> Self {
        Self { encoding: "whitespace".to_string(), counter: Counter::Words }
    }

    pub fn encoding(&self) -> &str { &self.encoding }

    pub fn is_exact(&self) -> bool { !matches!(self.counter, Counter::Words) }

    pub fn count_text(&self, text: &str) -> Result<usize> {
        match &self.counter {
            Counter::Bpe(bpe) => Ok(bpe.encode_ordinary(text).len()),
            Counter::File(t) => Ok(t.encode(text, false).map_err(Error::backend)?.get_ids().len()),
            Counter::Words => {
                let mut pre = PreTokenizedString::from(text);
                Whitespace {}.pre_tokenize(&mut pre).map_err(Error::backend)?;
                Ok(pre.get_splits(OffsetReferential::Original, OffsetType::Byte).len())
            }
        }
    }

    /// Tokens in the JSON serialisation of `results`.
    pub fn count(&self, results: &[SearchResult]) -> Result<usize> {
        self.count_text(&serde_json::to_string(results)?)
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        let settings = TokenizerSettings::default();
        Self::for_model(&settings.model, &settings.fallback_encoding, None)
    }
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter").field("encoding", &self.encoding).field("exact", &self.is_exact()).finish()
    }
}
