/// Genders, their synonyms, and the gendered words substituted into generated names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Genders the name data is bucketed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Neutral,
}

/// Free-text spellings accepted for each gender.
const SYNONYMS: &[(&str, Gender)] = &[
    ("male", Gender::Male),
    ("m", Gender::Male),
    ("man", Gender::Male),
    ("masc", Gender::Male),
    ("masculine", Gender::Male),
    ("boy", Gender::Male),
    ("female", Gender::Female),
    ("f", Gender::Female),
    ("woman", Gender::Female),
    ("fem", Gender::Female),
    ("femme", Gender::Female),
    ("feminine", Gender::Female),
    ("girl", Gender::Female),
    ("neutral", Gender::Neutral),
    ("neuter", Gender::Neutral),
    ("enby", Gender::Neutral),
    ("nonbinary", Gender::Neutral),
    ("nb", Gender::Neutral),
    ("non-binary", Gender::Neutral),
    ("n", Gender::Neutral),
    ("other", Gender::Neutral),
];

/// Uppercase placeholders that generated text may contain, replaced by
/// the matching word for the requested gender.
pub const GENDERED_PLACEHOLDERS: &[&str] = &["PRONOUN", "POSSESSIVE", "OBJECT", "PERSON"];

impl Gender {
    /// Genders picked from when the caller leaves gender unspecified.
    pub const RANDOM_POOL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Neutral];

    /// Map a free-text spelling (case-insensitive) to a gender.
    pub fn from_synonym(input: &str) -> Option<Gender> {
        let needle = input.trim().to_lowercase();
        SYNONYMS
            .iter()
            .find(|(alias, _)| *alias == needle)
            .map(|(_, gender)| *gender)
    }

    /// Canonical lowercase name, also used as the config bucket key.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Neutral => "neutral",
        }
    }

    /// Subject pronoun: "he", "she", "they".
    pub fn pronoun(&self) -> &'static str {
        match self {
            Self::Male => "he",
            Self::Female => "she",
            Self::Neutral => "they",
        }
    }

    /// Possessive determiner: "his", "her", "their".
    pub fn possessive(&self) -> &'static str {
        match self {
            Self::Male => "his",
            Self::Female => "her",
            Self::Neutral => "their",
        }
    }

    /// Object pronoun: "him", "her", "them".
    pub fn object(&self) -> &'static str {
        match self {
            Self::Male => "him",
            Self::Female => "her",
            Self::Neutral => "them",
        }
    }

    /// Person noun: "man", "woman", "person".
    pub fn person(&self) -> &'static str {
        match self {
            Self::Male => "man",
            Self::Female => "woman",
            Self::Neutral => "person",
        }
    }

    /// Word for one of the `GENDERED_PLACEHOLDERS`.
    pub fn word_for(&self, placeholder: &str) -> Option<&'static str> {
        match placeholder {
            "PRONOUN" => Some(self.pronoun()),
            "POSSESSIVE" => Some(self.possessive()),
            "OBJECT" => Some(self.object()),
            "PERSON" => Some(self.person()),
            _ => None,
        }
    }

    /// Replace every gendered placeholder in `text`.
    pub fn substitute(&self, text: &str) -> String {
        GENDERED_PLACEHOLDERS
            .iter()
            .fold(text.to_string(), |acc, placeholder| match self.word_for(placeholder) {
                Some(word) => acc.replace(placeholder, word),
                None => acc,
            })
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
