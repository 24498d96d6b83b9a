use std::collections::{HashMap, HashSet};
use std::io::BufRead;

use crate::WordId;

/// Vocabulary ids of one document's surviving tokens, in text order.
pub type EncodedDocument = Vec<WordId>;

/// Whether a token should be left out of the model.
pub trait Stopwords {
    fn is_stopword(&self, token: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Stopwords for F {
    fn is_stopword(&self, token: &str) -> bool { self(token) }
}

/// Case-folded set of stopwords.
#[derive(Debug, Clone, Default)]
pub struct StopwordList {
    words: HashSet<String>,
}

impl StopwordList {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    /// One stopword per line; blank lines are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> std::io::Result<Self> {
        let lines = reader.lines().collect::<std::io::Result<Vec<_>>>()?;
        Ok(Self::new(lines))
    }

    pub fn len(&self) -> usize { self.words.len() }

    pub fn is_empty(&self) -> bool { self.words.is_empty() }
}

impl Stopwords for StopwordList {
    fn is_stopword(&self, token: &str) -> bool { self.words.contains(token) }
}

/// Bidirectional token <-> id mapping, ordered by first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    words: Vec<String>,
    ids: HashMap<String, WordId>,
}

impl Vocabulary {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.words.len() }

    pub fn is_empty(&self) -> bool { self.words.is_empty() }

    pub fn id(&self, token: &str) -> Option<WordId> { self.ids.get(token).copied() }

    pub fn word(&self, id: WordId) -> Option<&str> {
        self.words.get(id as usize).map(String::as_str)
    }

    pub fn words(&self) -> &[String] { &self.words }

    fn intern(&mut self, token: &str) -> WordId {
        if let Some(id) = self.id(token) {
            return id;
        }
        let id = self.words.len() as WordId;
        self.words.push(token.to_string());
        self.ids.insert(token.to_string(), id);
        id
    }

    /// Encode normalized text against the frozen vocabulary. Unknown tokens
    /// are dropped, never added.
    pub fn encode_known(&self, text: &str) -> EncodedDocument {
        tokens(text).filter_map(|t| self.id(t)).collect()
    }

    /// Rebuild the reverse index from an id-ordered word list. `None` if a
    /// word repeats.
    pub(crate) fn from_words(words: Vec<String>) -> Option<Self> {
        let mut ids = HashMap::with_capacity(words.len());
        for (i, w) in words.iter().enumerate() {
            if ids.insert(w.clone(), i as WordId).is_some() {
                return None;
            }
        }
        Some(Self { words, ids })
    }
}

/// Whitespace tokens made only of letters. Numeric and mixed-symbol tokens
/// never reach the vocabulary.
pub fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace().filter(|t| t.chars().all(char::is_alphabetic))
}

/// Build a vocabulary over normalized documents and encode each one.
/// A document with no surviving tokens encodes to an empty sequence.
pub fn encode<S, W>(documents: &[S], stopwords: &W) -> (Vocabulary, Vec<EncodedDocument>)
where
    S: AsRef<str>,
    W: Stopwords + ?Sized,
{
    let mut vocab = Vocabulary::new();
    let encoded: Vec<EncodedDocument> = documents
        .iter()
        .map(|doc| {
            tokens(doc.as_ref())
                .filter(|t| !stopwords.is_stopword(t))
                .map(|t| vocab.intern(t))
                .collect::<EncodedDocument>()
        })
        .collect();
    (vocab, encoded)
}
