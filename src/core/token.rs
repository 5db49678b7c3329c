/// Token resolution — literal selection or constrained Markov generation,
/// followed by joining, gendered-word substitution, and capitalization.

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::markov::{prefix_compatible, MarkovError, MarkovModel, DEFAULT_STATE_SIZE};
use crate::schema::gender::Gender;
use crate::schema::race::{TokenSource, TokenSpec};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("literal list is empty")]
    EmptyLiteralList,
    #[error("no candidate starts with '{0}'")]
    NoPrefixMatch(String),
    #[error("gave up after {attempts} attempts (max {max_syllables} syllables)")]
    GenerationExhausted { attempts: u32, max_syllables: u32 },
    #[error("markov error: {0}")]
    Markov(#[from] MarkovError),
}

/// Rejection-sampling attempts before a generative token gives up.
pub const MAX_GENERATION_ATTEMPTS: u32 = 200;

/// Vowel clusters counted by the syllable heuristic: every vowel, plus each
/// vowel preceded by one of `a`, `e`, `o`, `y`.
const VOWEL_CLUSTERS: &[&str] = &[
    "aa", "ae", "ai", "ao", "au", "ay",
    "ea", "ee", "ei", "eo", "eu", "ey",
    "oa", "oe", "oi", "oo", "ou", "oy",
    "ya", "ye", "yi", "yo", "yu", "yy",
    "a", "e", "i", "o", "u", "y",
];

/// Crude syllable estimate: total non-overlapping occurrences of every
/// vowel cluster. Case-sensitive, so uppercase placeholders count zero.
pub fn syllable_count(text: &str) -> u32 {
    VOWEL_CLUSTERS
        .iter()
        .map(|cluster| text.matches(cluster).count() as u32)
        .sum()
}

/// Uppercase the first letter of every run of letters and lowercase the rest.
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            result.push(c);
            in_word = false;
        }
    }
    result
}

/// Resolves token specs under one set of constraints.
#[derive(Debug, Clone)]
pub struct TokenGenerator<'a> {
    gender: Gender,
    starts_with: Option<&'a str>,
    max_syllables: u32,
    state_size: usize,
    join: &'a str,
    max_attempts: u32,
}

impl<'a> TokenGenerator<'a> {
    pub fn new(gender: Gender) -> Self {
        TokenGenerator {
            gender,
            starts_with: None,
            max_syllables: 0,
            state_size: DEFAULT_STATE_SIZE,
            join: "",
            max_attempts: MAX_GENERATION_ATTEMPTS,
        }
    }

    /// Required prefix; empty strings are ignored.
    pub fn starts_with(mut self, prefix: Option<&'a str>) -> Self {
        self.starts_with = prefix.map(str::trim).filter(|p| !p.is_empty());
        self
    }

    /// Syllable ceiling for generated text; 0 means no limit.
    pub fn max_syllables(mut self, max: u32) -> Self {
        self.max_syllables = max;
        self
    }

    pub fn state_size(mut self, state_size: usize) -> Self {
        self.state_size = state_size;
        self
    }

    /// Separator placed between the units of generated text.
    pub fn join(mut self, join: &'a str) -> Self {
        self.join = join;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Produce the literal text for one token.
    pub fn resolve<R: Rng>(&self, spec: &TokenSpec, rng: &mut R) -> Result<String, TokenError> {
        let text = match &spec.source {
            TokenSource::Literal(choices) => self.select_literal(choices, rng)?,
            TokenSource::Generative(corpus) => {
                let model = MarkovModel::new(corpus, self.state_size)?;
                self.sample(&model, rng)?
            }
        };

        Ok(if spec.capitalize {
            title_case(&text)
        } else {
            text
        })
    }

    fn select_literal<R: Rng>(&self, choices: &[String], rng: &mut R) -> Result<String, TokenError> {
        if choices.is_empty() {
            return Err(TokenError::EmptyLiteralList);
        }
        let pool: Vec<&String> = match self.starts_with {
            Some(prefix) => {
                let needle = prefix.to_lowercase();
                choices
                    .iter()
                    .filter(|c| c.to_lowercase().starts_with(&needle))
                    .collect()
            }
            None => choices.iter().collect(),
        };
        pool.choose(rng)
            .map(|c| (*c).clone())
            .ok_or_else(|| TokenError::NoPrefixMatch(self.starts_with.unwrap_or_default().to_string()))
    }

    /// Join the units of a generated sentence and substitute gendered words.
    fn finish(&self, sentence: &str) -> String {
        let joined = sentence.split_whitespace().collect::<Vec<_>>().join(self.join);
        self.gender.substitute(&joined)
    }

    /// Rejection sampling on the starting prefix and the syllable ceiling.
    /// The prefix is checked against the finished text.
    fn sample<R: Rng>(&self, model: &MarkovModel, rng: &mut R) -> Result<String, TokenError> {
        let needle = self.starts_with.map(str::to_lowercase);

        for attempt in 1..=self.max_attempts {
            let candidate = match (self.starts_with, &needle) {
                (Some(prefix), Some(needle)) => {
                    let opens = |unit: &str| prefix_compatible(&self.gender.substitute(unit), needle);
                    match model.generate_opening_with(prefix, opens, rng) {
                        Ok(candidate) => candidate,
                        Err(MarkovError::NoPrefixMatch(p)) => return Err(TokenError::NoPrefixMatch(p)),
                        Err(e) => return Err(e.into()),
                    }
                }
                _ => model.generate(rng),
            };

            let Some(candidate) = candidate else {
                debug!(attempt, "markov model produced no original sentence");
                continue;
            };

            let text = self.finish(&candidate);
            if let Some(needle) = &needle {
                if !text.to_lowercase().starts_with(needle.as_str()) {
                    debug!(attempt, candidate = %text, prefix = %needle, "rejected candidate without prefix");
                    continue;
                }
            }

            if self.max_syllables == 0 {
                return Ok(text);
            }
            let syllables = syllable_count(&candidate);
            if syllables <= self.max_syllables {
                return Ok(text);
            }
            debug!(
                attempt,
                candidate = %candidate,
                syllables,
                max = self.max_syllables,
                "rejected candidate over syllable limit"
            );
        }

        warn!(
            attempts = self.max_attempts,
            max_syllables = self.max_syllables,
            "token generation exhausted"
        );
        Err(TokenError::GenerationExhausted {
            attempts: self.max_attempts,
            max_syllables: self.max_syllables,
        })
    }
}
