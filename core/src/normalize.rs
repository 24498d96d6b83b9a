use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};

/// Emoticon patterns stripped by the default pipeline, as regexes.
pub const DEFAULT_EMOTICONS: &[&str] = &[
    r":\(", ":P", r":\)", ":D", ":d", ":b", ":p", ":-D", r":=\)", ":=D",
    r":-\)", r":-\(", r":=\(", "-_-", "-_-'", "-_-\"",
];

/// Subsets of [`DEFAULT_EMOTICONS`] rewritten by [`Step::TagEmoticons`].
pub const HAPPY_EMOTICONS: &[&str] = &[
    ":P", r":\)", ":D", ":d", ":b", ":p", ":-D", r":=\)", ":=D", r":-\)",
];
pub const SAD_EMOTICONS: &[&str] = &[r":\(", r":-\(", r":=\(", "-_-", "-_-'", "-_-\""];

/// Marker appended by negation scoping; never part of the vocabulary.
pub const NEGATION_MARK: &str = " _NEG";

/// Digit-to-letter rewrites, applied one after another to the same word.
const LEET: &[(&str, &str)] = &[
    ("00", "u"), ("0", "o"), ("1", "i"), ("3", "e"), ("4", "a"),
    ("5", "s"), ("6", "g"), ("9", "g"), ("7", "t"), ("8", "b"),
];

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"\b[0-9]+\b").expect("valid regex");
    static ref HTTP_LINK: Regex = Regex::new(r"https?://[^ ]+").expect("valid regex");
    static ref WWW_LINK: Regex = Regex::new(r"www.[^ ]+").expect("valid regex");
    static ref NON_WORD: Regex = Regex::new(r"\W+").expect("valid regex");
    static ref SINGLE_CHAR: Regex = Regex::new(r"\b[\p{L}\p{N}]\b").expect("valid regex");
    static ref EMOTICONS: Vec<Regex> = compile_all(DEFAULT_EMOTICONS);
    static ref HAPPY: Vec<Regex> = compile_all(HAPPY_EMOTICONS);
    static ref SAD: Vec<Regex> = compile_all(SAD_EMOTICONS);
    static ref HASHTAG: Regex = Regex::new(r"#\w+").expect("valid regex");
    static ref USERNAME: Regex = Regex::new(r"@+[\w_]+").expect("valid regex");
    static ref RETWEET: Regex = Regex::new(r"(@user:).+").expect("valid regex");
    static ref EMAIL: Regex = Regex::new(
        r"\b[_A-Za-z0-9+-]+(\.[_A-Za-z0-9-]+)*@[A-Za-z0-9-]+(\.[A-Za-z0-9]+)*(\.[A-Za-z]{2,})\b"
    )
    .expect("valid regex");
}

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).expect("valid regex")).collect()
}

/// One pure string-to-string transformation of the pipeline.
#[derive(Debug, Clone)]
pub enum Step {
    Lowercase,
    StripNumbers,
    StripUrls,
    /// `aaaa` -> `a`, `hahahaha` -> `ha`: a unit repeated four or more times
    /// collapses to one instance. Single pass.
    CollapseRepeats,
    StripEmoticons(Vec<Regex>),
    Leetspeak,
    PunctuationToSpace,
    DropSingleChars,
    StripNegationMark,
    SquashWhitespace,

    // Optional steps, never part of the default pipeline.
    StripHashtags,
    StripUsernames,
    /// Every `@name` becomes `@user`.
    TagUsernames,
    /// Drops everything from `@user:` to the end of the line.
    StripRetweet,
    StripEmails,
    TagEmails,
    /// Links become the token `url` instead of being removed.
    TagUrls,
    /// Happy emoticons become `happyemot`, sad ones `sademot`.
    TagEmoticons,
    /// Reduplication written with a `2`: `anak2` -> `anak anak`,
    /// `main2an` -> `mainmainan`.
    ExpandReduplication,
}

impl Step {
    /// Compile caller-supplied emoticon patterns. Fails on the first bad one
    /// so a broken configuration is rejected before any document is touched.
    pub fn emoticons<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let compiled = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|source| Error::Pattern {
                    pattern: p.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Step::StripEmoticons(compiled))
    }

    pub fn apply(&self, text: &str) -> String {
        match self {
            Step::Lowercase => text.to_lowercase(),
            Step::StripNumbers => NUMBER.replace_all(text, "").into_owned(),
            Step::StripUrls => {
                let text = HTTP_LINK.replace_all(text, "");
                WWW_LINK.replace_all(&text, "").into_owned()
            }
            Step::CollapseRepeats => collapse_repeats(text),
            Step::StripEmoticons(patterns) => replace_each(text, patterns, ""),
            Step::Leetspeak => leetspeak(text),
            Step::PunctuationToSpace => NON_WORD.replace_all(text, " ").into_owned(),
            Step::DropSingleChars => SINGLE_CHAR.replace_all(text, "").into_owned(),
            Step::StripNegationMark => text.replace(NEGATION_MARK, ""),
            Step::SquashWhitespace => text.split_whitespace().collect::<Vec<_>>().join(" "),
            Step::StripHashtags => HASHTAG.replace_all(text, "").into_owned(),
            Step::StripUsernames => USERNAME.replace_all(text, "").into_owned(),
            Step::TagUsernames => USERNAME.replace_all(text, "@user").into_owned(),
            Step::StripRetweet => RETWEET.replace_all(text, "").into_owned(),
            Step::StripEmails => EMAIL.replace_all(text, "").into_owned(),
            Step::TagEmails => EMAIL.replace_all(text, "email").into_owned(),
            Step::TagUrls => {
                let text = HTTP_LINK.replace_all(text, "url");
                WWW_LINK.replace_all(&text, "url").into_owned()
            }
            Step::TagEmoticons => {
                let text = replace_each(text, &HAPPY, "happyemot");
                replace_each(&text, &SAD, "sademot")
            }
            Step::ExpandReduplication => expand_reduplication(text),
        }
    }
}

/// Ordered normalization pipeline. Variants are expressed as different step
/// lists rather than different types.
#[derive(Debug, Clone)]
pub struct Normalizer {
    steps: Vec<Step>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self { steps: default_steps(Step::StripEmoticons(EMOTICONS.clone())) }
    }
}

impl Normalizer {
    pub fn new() -> Self { Self::default() }

    /// Default pipeline with a custom emoticon list in place of
    /// [`DEFAULT_EMOTICONS`].
    pub fn with_emoticons<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        Ok(Self { steps: default_steps(Step::emoticons(patterns)?) })
    }

    pub fn from_steps(steps: Vec<Step>) -> Self { Self { steps } }

    pub fn steps(&self) -> &[Step] { &self.steps }

    pub fn normalize(&self, raw: &str) -> String {
        self.steps.iter().fold(raw.to_string(), |text, step| step.apply(&text))
    }

    pub fn normalize_all<S: AsRef<str>>(&self, docs: &[S]) -> Vec<String> {
        docs.iter().map(|d| self.normalize(d.as_ref())).collect()
    }
}

fn default_steps(emoticons: Step) -> Vec<Step> {
    vec![
        Step::Lowercase,
        Step::StripNumbers,
        Step::StripUrls,
        Step::CollapseRepeats,
        emoticons,
        Step::Leetspeak,
        Step::PunctuationToSpace,
        Step::DropSingleChars,
        Step::StripNegationMark,
        Step::SquashWhitespace,
    ]
}

fn collapse_repeats(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        match repeated_unit_at(&chars, i) {
            Some((unit, reps)) => {
                out.extend(&chars[i..i + unit]);
                i += unit * reps;
            }
            None => {
                out.push(chars[i]);
                i += 1;
            }
        }
    }
    out
}

/// Shortest unit starting at `start` that occurs at least four times in a
/// row, returned with its length and how many times it repeats.
fn repeated_unit_at(chars: &[char], start: usize) -> Option<(usize, usize)> {
    let rest = &chars[start..];
    for unit in 1..=rest.len() / 4 {
        let head = &rest[..unit];
        // units never span a line break
        if head.iter().any(|c| matches!(c, '\n' | '\r')) {
            return None;
        }
        let reps = rest.chunks_exact(unit).take_while(|chunk| *chunk == head).count();
        if reps >= 4 {
            return Some((unit, reps));
        }
    }
    None
}

fn replace_each(text: &str, patterns: &[Regex], with: &str) -> String {
    patterns
        .iter()
        .fold(text.to_string(), |acc, re| re.replace_all(&acc, with).into_owned())
}

/// Floating-point literal test. A trailing `d`/`f` type suffix is allowed
/// (`1d`, `2.5f`).
fn is_numeric(word: &str) -> bool {
    let trimmed = word.strip_suffix(&['d', 'D', 'f', 'F'][..]).unwrap_or(word);
    trimmed.parse::<f64>().is_ok()
}

fn leetspeak(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            if is_numeric(word) {
                word.to_string()
            } else {
                LEET.iter().fold(word.to_string(), |w, (digit, letter)| w.replace(digit, letter))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Per word: a leading marker is dropped, a trailing one repeats the word,
/// and one in the middle doubles the part before it. The marker is `2` or a
/// double backslash, whichever occurs later.
fn expand_reduplication(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let marker = [word.find('2'), word.find("\\\\")].into_iter().flatten().max();
            match marker {
                None => word.to_string(),
                Some(0) => word[1..].to_string(),
                Some(i) if i + 1 == word.len() => format!("{0} {0}", &word[..i]),
                Some(i) => format!("{0}{0}{1}", &word[..i], &word[i + 1..]),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
