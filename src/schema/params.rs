/// Caller-facing requests and their normalized generation parameters.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::core::choice::ChoiceError;
use crate::schema::gender::Gender;
use crate::schema::race::{Catalog, ConfigError};

/// Name type generated when a request names none.
pub const DEFAULT_NAME_TYPE: &str = "first";

#[derive(Debug, Error)]
pub enum ParamError {
    #[error("cannot generate name for unknown race '{0}'")]
    UnknownRace(String),
    #[error("cannot generate name for unknown subrace '{subrace}' of race '{race}'")]
    UnknownSubrace { race: String, subrace: String },
    #[error("cannot generate name for unknown gender '{0}'")]
    UnknownGender(String),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("race catalog: {0}")]
    Choice(#[from] ChoiceError),
}

/// Loose, human-typed input. Every field is optional; blanks mean
/// "pick for me".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameRequest {
    #[serde(default)]
    pub race: Option<String>,
    #[serde(default)]
    pub subrace: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub syllables: Option<u32>,
    /// Name type → required starting letters.
    #[serde(default)]
    pub starts_with: HashMap<String, String>,
}

impl NameRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn race(mut self, race: &str) -> Self {
        self.race = Some(race.to_string());
        self
    }

    pub fn subrace(mut self, subrace: &str) -> Self {
        self.subrace = Some(subrace.to_string());
        self
    }

    pub fn gender(mut self, gender: &str) -> Self {
        self.gender = Some(gender.to_string());
        self
    }

    pub fn types(mut self, types: &[&str]) -> Self {
        self.types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn syllables(mut self, syllables: u32) -> Self {
        self.syllables = Some(syllables);
        self
    }

    pub fn starts_with(mut self, name_type: &str, prefix: &str) -> Self {
        self.starts_with
            .insert(name_type.to_string(), prefix.to_string());
        self
    }

    /// Validate and default every field against the names directory.
    ///
    /// Random draws happen in a fixed order (race, subrace, gender) from
    /// `rng`. Returns the parameters and the directory holding the chosen
    /// race's `config.ron`.
    pub fn normalize<R: Rng>(
        &self,
        names_dir: &Path,
        rng: &mut R,
    ) -> Result<(GenerationParameters, PathBuf), ParamError> {
        let races = Catalog::load_races(names_dir)?;
        let resolved = resolve_race(&races, names_dir, non_blank(&self.race), non_blank(&self.subrace), rng)?;
        let gender = resolve_gender(non_blank(&self.gender), rng)?;

        let mut params = GenerationParameters::new(gender).with_types(self.types.iter().map(String::as_str));
        params.race = resolved.race;
        params.subrace = resolved.subrace;
        params.max_syllables = self.syllables.filter(|&s| s > 0);
        for (name_type, prefix) in &self.starts_with {
            params = params.with_starts_with(name_type, prefix);
        }

        Ok((params, resolved.dir))
    }
}

/// Validated parameters consumed by the assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParameters {
    pub race: String,
    pub subrace: Option<String>,
    pub gender: Gender,
    /// Lowercase name types, in request order, without duplicates.
    pub types: Vec<String>,
    /// Per-call syllable ceiling; overrides config defaults.
    pub max_syllables: Option<u32>,
    starts_with: HashMap<String, String>,
}

impl GenerationParameters {
    pub fn new(gender: Gender) -> Self {
        GenerationParameters {
            race: String::new(),
            subrace: None,
            gender,
            types: vec![DEFAULT_NAME_TYPE.to_string()],
            max_syllables: None,
            starts_with: HashMap::new(),
        }
    }

    /// Replace the requested name types; an empty list keeps the default.
    pub fn with_types<'s>(mut self, types: impl IntoIterator<Item = &'s str>) -> Self {
        let mut normalized: Vec<String> = Vec::new();
        for t in types {
            let t = t.trim().to_lowercase();
            if !t.is_empty() && !normalized.contains(&t) {
                normalized.push(t);
            }
        }
        if !normalized.is_empty() {
            self.types = normalized;
        }
        self
    }

    pub fn with_max_syllables(mut self, max: u32) -> Self {
        self.max_syllables = Some(max).filter(|&m| m > 0);
        self
    }

    /// Require the given name type to start with `prefix`; blank prefixes are dropped.
    pub fn with_starts_with(mut self, name_type: &str, prefix: &str) -> Self {
        let prefix = prefix.trim();
        if !prefix.is_empty() {
            self.starts_with
                .insert(name_type.trim().to_lowercase(), prefix.to_string());
        }
        self
    }

    pub fn starts_with(&self, name_type: &str) -> Option<&str> {
        self.starts_with.get(name_type).map(String::as_str)
    }
}

/// A race (and subrace, when the race has them) picked from the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRace {
    pub race: String,
    pub subrace: Option<String>,
    /// Directory holding `config.ron`.
    pub dir: PathBuf,
}

/// Look up or randomly pick a race, then its subrace if the race directory
/// has a subrace index.
pub fn resolve_race<R: Rng>(
    races: &Catalog,
    names_dir: &Path,
    race: Option<&str>,
    subrace: Option<&str>,
    rng: &mut R,
) -> Result<ResolvedRace, ParamError> {
    let (race_name, entry) = match race {
        Some(requested) => races
            .lookup(requested)
            .ok_or_else(|| ParamError::UnknownRace(requested.to_string()))?,
        None => {
            let picked = races.choose(rng)?;
            debug!(race = picked.0, "picked random race");
            picked
        }
    };

    let race_dir = names_dir.join(&entry.directory);
    let Some(subraces) = Catalog::load_subraces(&race_dir)? else {
        if let Some(ignored) = subrace {
            debug!(race = race_name, subrace = ignored, "race has no subraces; ignoring");
        }
        return Ok(ResolvedRace {
            race: race_name.to_string(),
            subrace: None,
            dir: race_dir,
        });
    };

    let (sub_name, sub_entry) = match subrace {
        Some(requested) => subraces.lookup(requested).ok_or_else(|| ParamError::UnknownSubrace {
            race: race_name.to_string(),
            subrace: requested.to_string(),
        })?,
        None => {
            let picked = subraces.choose(rng)?;
            debug!(race = race_name, subrace = picked.0, "picked random subrace");
            picked
        }
    };

    Ok(ResolvedRace {
        race: race_name.to_string(),
        subrace: Some(sub_name.to_string()),
        dir: race_dir.join(&sub_entry.directory),
    })
}

/// Map free-text gender to a supported one; blank picks male or female.
pub fn resolve_gender<R: Rng>(input: Option<&str>, rng: &mut R) -> Result<Gender, ParamError> {
    match input {
        Some(text) => {
            Gender::from_synonym(text).ok_or_else(|| ParamError::UnknownGender(text.to_string()))
        }
        None => Ok(*Gender::RANDOM_POOL
            .choose(rng)
            .unwrap_or(&Gender::Neutral)),
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
