/// Race configuration — name structures, token specs, catalogs, and RON loading.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

use rand::Rng;

use crate::core::choice::{weighted_index, ChoiceError, Weighted};
use crate::schema::gender::Gender;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("unknown gender bucket '{bucket}' for name type '{name_type}'")]
    UnknownGenderBucket { name_type: String, bucket: String },
    #[error("synonym '{alias}' refers to missing entry '{target}'")]
    DanglingSynonym { alias: String, target: String },
}

/// Example text a generative token is trained on.
#[derive(Debug, Clone, PartialEq)]
pub enum Corpus {
    /// Each string is one sentence.
    Sentences(Vec<String>),
    /// A block of text, one sentence per line.
    Lines(String),
}

impl Corpus {
    /// Non-blank sentences, trimmed.
    pub fn sentences(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            Corpus::Sentences(list) => Box::new(
                list.iter()
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty()),
            ),
            Corpus::Lines(text) => Box::new(
                text.lines()
                    .map(str::trim)
                    .filter(|s| !s.is_empty()),
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sentences().next().is_none()
    }
}

/// Where a token's text comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenSource {
    /// Select exactly one literal, uniformly.
    Literal(Vec<String>),
    /// Sample a Markov chain trained on the corpus.
    Generative(Corpus),
}

/// How to fill one placeholder of a name-part template.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSpec {
    pub source: TokenSource,
    pub capitalize: bool,
}

impl TokenSpec {
    pub fn literal<S: Into<String>>(choices: impl IntoIterator<Item = S>) -> Self {
        TokenSpec {
            source: TokenSource::Literal(choices.into_iter().map(Into::into).collect()),
            capitalize: true,
        }
    }

    pub fn generative(corpus: Corpus) -> Self {
        TokenSpec {
            source: TokenSource::Generative(corpus),
            capitalize: true,
        }
    }

    pub fn with_capitalize(mut self, capitalize: bool) -> Self {
        self.capitalize = capitalize;
        self
    }
}

/// One candidate shape for a name type (e.g. one way to build a first name).
#[derive(Debug, Clone, PartialEq)]
pub struct NameTypeStructure {
    /// Name-part template, e.g. `"<PREFIX><ROOT>"`.
    pub structure: String,
    /// Inserted between the units of generated text.
    pub join: String,
    /// Token name (lowercase) → how to fill it.
    pub components: HashMap<String, TokenSpec>,
    pub weight: u32,
    pub state_size: Option<usize>,
    pub max_syllables: Option<u32>,
}

impl NameTypeStructure {
    pub fn new(structure: impl Into<String>) -> Self {
        NameTypeStructure {
            structure: structure.into(),
            join: String::new(),
            components: HashMap::new(),
            weight: 1,
            state_size: None,
            max_syllables: None,
        }
    }

    pub fn component(mut self, token: &str, spec: TokenSpec) -> Self {
        self.components.insert(token.to_lowercase(), spec);
        self
    }

    pub fn with_join(mut self, join: impl Into<String>) -> Self {
        self.join = join.into();
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }
}

impl Weighted for NameTypeStructure {
    fn weight(&self) -> u32 {
        self.weight
    }
}

/// Structures for one name type, bucketed by gender.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameTypeComponents {
    pub by_gender: HashMap<Gender, Vec<NameTypeStructure>>,
    /// Gender-agnostic structures, candidates for every gender.
    pub all: Vec<NameTypeStructure>,
}

impl NameTypeComponents {
    /// Structures usable for `gender`: its own bucket, then the agnostic one.
    pub fn candidates(&self, gender: Gender) -> Vec<&NameTypeStructure> {
        self.by_gender
            .get(&gender)
            .into_iter()
            .flatten()
            .chain(self.all.iter())
            .collect()
    }
}

/// Everything needed to build names for one race (or race/subrace).
#[derive(Debug, Clone, PartialEq)]
pub struct RaceConfig {
    /// Top-level template, e.g. `"<FIRST> <LAST>"`.
    pub structure: String,
    pub state_size: usize,
    pub max_syllables: Option<u32>,
    /// Name type (lowercase) → its structures.
    pub components: HashMap<String, NameTypeComponents>,
}

impl RaceConfig {
    pub fn new(structure: impl Into<String>) -> Self {
        RaceConfig {
            structure: structure.into(),
            state_size: crate::core::markov::DEFAULT_STATE_SIZE,
            max_syllables: None,
            components: HashMap::new(),
        }
    }

    /// Register a structure for a name type; `gender = None` means all genders.
    pub fn add_structure(
        &mut self,
        name_type: &str,
        gender: Option<Gender>,
        structure: NameTypeStructure,
    ) -> &mut Self {
        let entry = self.components.entry(name_type.to_lowercase()).or_default();
        match gender {
            Some(g) => entry.by_gender.entry(g).or_default().push(structure),
            None => entry.all.push(structure),
        }
        self
    }

    /// Load `config.ron` from a race directory, resolving referenced files
    /// relative to that directory.
    pub fn load(dir: &Path) -> Result<RaceConfig, ConfigError> {
        let path = dir.join("config.ron");
        let contents = read_file(&path)?;
        let raw: RonRaceConfig =
            ron::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
        raw.into_config(dir)
    }

    /// Parse a race config from a RON string. File sources resolve against `base_dir`.
    pub fn parse_ron(input: &str, base_dir: &Path) -> Result<RaceConfig, ConfigError> {
        let raw: RonRaceConfig = ron::from_str(input)?;
        raw.into_config(base_dir)
    }
}

/// One selectable race or subrace.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogEntry {
    pub directory: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl Weighted for CatalogEntry {
    fn weight(&self) -> u32 {
        self.weight
    }
}

/// Named entries plus the free-text aliases that map onto them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub entries: BTreeMap<String, CatalogEntry>,
    /// Lowercase alias → entry name.
    pub synonyms: HashMap<String, String>,
}

impl Catalog {
    fn build(
        entries: BTreeMap<String, CatalogEntry>,
        synonyms: HashMap<String, String>,
    ) -> Result<Catalog, ConfigError> {
        let mut normalized = HashMap::new();
        for (alias, target) in synonyms {
            if !entries.contains_key(&target) {
                return Err(ConfigError::DanglingSynonym { alias, target });
            }
            normalized.insert(alias.trim().to_lowercase(), target);
        }
        // Every entry answers to its own name.
        for name in entries.keys() {
            normalized
                .entry(name.to_lowercase())
                .or_insert_with(|| name.clone());
        }
        Ok(Catalog {
            entries,
            synonyms: normalized,
        })
    }

    /// Resolve a free-text name to `(entry name, entry)`.
    pub fn lookup(&self, input: &str) -> Option<(&str, &CatalogEntry)> {
        let name = self.synonyms.get(&input.trim().to_lowercase())?;
        self.entries
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Pick an entry by weight, returning `(entry name, entry)`.
    pub fn choose<R: Rng>(&self, rng: &mut R) -> Result<(&str, &CatalogEntry), ChoiceError> {
        let entries: Vec<(&String, &CatalogEntry)> = self.entries.iter().collect();
        let weights: Vec<&CatalogEntry> = entries.iter().map(|(_, e)| *e).collect();
        let (name, entry) = entries[weighted_index(&weights, rng)?];
        Ok((name.as_str(), entry))
    }

    /// Load the race index (`races.ron`).
    pub fn load_races(names_dir: &Path) -> Result<Catalog, ConfigError> {
        let path = names_dir.join("races.ron");
        let raw: RonRaceIndex = parse_file(&path)?;
        Catalog::build(raw.races, raw.synonyms)
    }

    /// Load a race directory's subrace index (`race.ron`), if it has one.
    pub fn load_subraces(race_dir: &Path) -> Result<Option<Catalog>, ConfigError> {
        let path = race_dir.join("race.ron");
        if !path.exists() {
            return Ok(None);
        }
        let raw: RonSubraceIndex = parse_file(&path)?;
        Catalog::build(raw.subraces, raw.synonyms).map(Some)
    }
}

// RON deserialization helpers — the on-disk shape differs from the
// typed model, so files land in these structs first.

#[derive(Debug, Deserialize)]
struct RonRaceIndex {
    races: BTreeMap<String, CatalogEntry>,
    #[serde(default)]
    synonyms: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RonSubraceIndex {
    subraces: BTreeMap<String, CatalogEntry>,
    #[serde(default)]
    synonyms: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RonRaceConfig {
    structure: String,
    #[serde(default = "default_state_size")]
    state_size: usize,
    #[serde(default)]
    max_syllables: Option<u32>,
    /// Name type → gender bucket → structures. Buckets are sorted so
    /// aliases of one gender merge in a fixed order.
    components: HashMap<String, BTreeMap<String, Vec<RonStructure>>>,
}

#[derive(Debug, Deserialize)]
struct RonStructure {
    structure: String,
    #[serde(default)]
    join: String,
    #[serde(default = "default_weight")]
    weight: u32,
    #[serde(default)]
    state_size: Option<usize>,
    #[serde(default)]
    max_syllables: Option<u32>,
    #[serde(default)]
    components: HashMap<String, RonComponent>,
}

#[derive(Debug, Deserialize)]
struct RonComponent {
    source: RonSource,
    #[serde(default = "default_capitalize")]
    capitalize: bool,
}

#[derive(Debug, Deserialize)]
enum RonSource {
    /// Pick one of the listed literals.
    Choice(Vec<String>),
    /// Pick one line of the file.
    File(String),
    /// Markov over the listed sentences.
    Corpus(Vec<String>),
    /// Markov over the file's lines.
    CorpusFile(String),
}

fn default_weight() -> u32 {
    1
}

fn default_state_size() -> usize {
    crate::core::markov::DEFAULT_STATE_SIZE
}

fn default_capitalize() -> bool {
    true
}

impl RonRaceConfig {
    fn into_config(self, base_dir: &Path) -> Result<RaceConfig, ConfigError> {
        let mut components = HashMap::new();
        for (name_type, buckets) in self.components {
            let name_type = name_type.to_lowercase();
            let mut parsed = NameTypeComponents::default();
            for (bucket, structures) in buckets {
                let structures = structures
                    .into_iter()
                    .map(|s| s.into_structure(base_dir))
                    .collect::<Result<Vec<_>, _>>()?;
                if bucket.eq_ignore_ascii_case("all") {
                    parsed.all.extend(structures);
                } else {
                    let gender = Gender::from_synonym(&bucket).ok_or_else(|| {
                        ConfigError::UnknownGenderBucket {
                            name_type: name_type.clone(),
                            bucket: bucket.clone(),
                        }
                    })?;
                    parsed.by_gender.entry(gender).or_default().extend(structures);
                }
            }
            components.insert(name_type, parsed);
        }

        Ok(RaceConfig {
            structure: self.structure,
            state_size: self.state_size,
            max_syllables: self.max_syllables.filter(|&m| m > 0),
            components,
        })
    }
}

impl RonStructure {
    fn into_structure(self, base_dir: &Path) -> Result<NameTypeStructure, ConfigError> {
        let mut components = HashMap::new();
        for (token, component) in self.components {
            let source = match component.source {
                RonSource::Choice(list) => TokenSource::Literal(list),
                RonSource::File(file) => {
                    let text = read_file(&base_dir.join(file))?;
                    TokenSource::Literal(
                        text.lines()
                            .map(str::trim)
                            .filter(|l| !l.is_empty())
                            .map(str::to_string)
                            .collect(),
                    )
                }
                RonSource::Corpus(list) => TokenSource::Generative(Corpus::Sentences(list)),
                RonSource::CorpusFile(file) => {
                    TokenSource::Generative(Corpus::Lines(read_file(&base_dir.join(file))?))
                }
            };
            components.insert(
                token.to_lowercase(),
                TokenSpec {
                    source,
                    capitalize: component.capitalize,
                },
            );
        }

        Ok(NameTypeStructure {
            structure: self.structure,
            join: self.join,
            components,
            weight: self.weight,
            state_size: self.state_size,
            max_syllables: self.max_syllables,
        })
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = read_file(path)?;
    ron::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
