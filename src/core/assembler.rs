/// Structure templates and name assembly.

use rand::Rng;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::core::choice::{choose_weighted, ChoiceError};
use crate::core::token::{TokenError, TokenGenerator};
use crate::schema::gender::Gender;
use crate::schema::params::GenerationParameters;
use crate::schema::race::{NameTypeStructure, RaceConfig};

/// Max-syllable value used when neither the call, the structure, nor the
/// race config sets one. Zero means no limit.
pub const DEFAULT_MAX_SYLLABLES: u32 = 0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("no name structures for name type '{name_type}' and gender '{gender}'")]
    NoStructuresForGender { name_type: String, gender: Gender },
    #[error("structure '{structure}' has no component for token '{token}'")]
    UnknownComponent { structure: String, token: String },
    #[error("token '{token}': {source}")]
    Token {
        token: String,
        #[source]
        source: TokenError,
    },
    #[error(transparent)]
    Choice(#[from] ChoiceError),
}

/// A segment of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSegment {
    /// Literal text, emitted as-is.
    Literal(String),
    /// A `<NAME>` placeholder; the name is stored lowercase.
    Placeholder(String),
}

/// A parsed structure template — a sequence of segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub segments: Vec<TemplateSegment>,
}

impl Template {
    /// Parse a template string.
    ///
    /// `<name>` becomes a placeholder (matched case-insensitively). A `<`
    /// with no closing `>` on the same line, or `<>`, is literal text.
    pub fn parse(input: &str) -> Template {
        let mut segments = Vec::new();
        let mut literal_buf = String::new();
        let mut rest = input;

        while let Some(open) = rest.find('<') {
            literal_buf.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find(|c: char| c == '>' || c == '\n') {
                Some(close) if close > 0 && after[close..].starts_with('>') => {
                    if !literal_buf.is_empty() {
                        segments.push(TemplateSegment::Literal(std::mem::take(&mut literal_buf)));
                    }
                    segments.push(TemplateSegment::Placeholder(after[..close].to_lowercase()));
                    rest = &after[close + 1..];
                }
                _ => {
                    literal_buf.push('<');
                    rest = after;
                }
            }
        }
        literal_buf.push_str(rest);

        if !literal_buf.is_empty() {
            segments.push(TemplateSegment::Literal(literal_buf));
        }

        Template { segments }
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for segment in &self.segments {
            if let TemplateSegment::Placeholder(name) = segment {
                if !seen.contains(&name.as_str()) {
                    seen.push(name.as_str());
                }
            }
        }
        seen
    }

    /// Render with the given values. Placeholders without a value render
    /// as nothing.
    pub fn render(&self, values: &HashMap<String, String>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                TemplateSegment::Literal(text) => out.push_str(text),
                TemplateSegment::Placeholder(name) => {
                    if let Some(value) = values.get(name) {
                        out.push_str(value);
                    }
                }
            }
        }
        out
    }
}

/// Builds full names from one race config.
#[derive(Debug, Clone, Copy)]
pub struct NameAssembler<'a> {
    config: &'a RaceConfig,
}

impl<'a> NameAssembler<'a> {
    pub fn new(config: &'a RaceConfig) -> Self {
        NameAssembler { config }
    }

    /// Expand the top-level structure for every requested name type.
    ///
    /// Name types are resolved independently, in the order requested.
    /// Placeholders for name types that were not requested are dropped and
    /// the result is trimmed.
    pub fn assemble<R: Rng>(
        &self,
        params: &GenerationParameters,
        rng: &mut R,
    ) -> Result<String, AssemblyError> {
        let template = Template::parse(&self.config.structure);
        let mut parts: HashMap<String, String> = HashMap::new();

        for name_type in &params.types {
            let name_type = name_type.to_lowercase();
            if parts.contains_key(&name_type) {
                continue;
            }
            let part = self.assemble_part(&name_type, params, rng)?;
            debug!(name_type = %name_type, part = %part, "resolved name part");
            parts.insert(name_type, part);
        }

        Ok(template.render(&parts).trim().to_string())
    }

    /// Pick a structure for one name type and fill all of its tokens.
    pub fn assemble_part<R: Rng>(
        &self,
        name_type: &str,
        params: &GenerationParameters,
        rng: &mut R,
    ) -> Result<String, AssemblyError> {
        let candidates = self
            .config
            .components
            .get(name_type)
            .map(|c| c.candidates(params.gender))
            .unwrap_or_default();

        if candidates.is_empty() {
            return Err(AssemblyError::NoStructuresForGender {
                name_type: name_type.to_string(),
                gender: params.gender,
            });
        }

        let structure: &NameTypeStructure = choose_weighted(candidates, rng)?;
        let template = Template::parse(&structure.structure);

        let max_syllables = params
            .max_syllables
            .or(structure.max_syllables)
            .or(self.config.max_syllables)
            .unwrap_or(DEFAULT_MAX_SYLLABLES);
        let state_size = structure.state_size.unwrap_or(self.config.state_size);
        let starts_with = params.starts_with(name_type);

        let mut values = HashMap::new();
        for (i, token) in template.placeholders().into_iter().enumerate() {
            let spec = structure.components.get(token).ok_or_else(|| {
                AssemblyError::UnknownComponent {
                    structure: structure.structure.clone(),
                    token: token.to_string(),
                }
            })?;

            // The prefix constrains only the leading token of the part.
            let generator = TokenGenerator::new(params.gender)
                .starts_with(if i == 0 { starts_with } else { None })
                .max_syllables(max_syllables)
                .state_size(state_size)
                .join(&structure.join);

            let literal = generator
                .resolve(spec, rng)
                .map_err(|source| AssemblyError::Token {
                    token: token.to_string(),
                    source,
                })?;
            values.insert(token.to_string(), literal);
        }

        Ok(template.render(&values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::token::syllable_count;
    use crate::schema::race::{Corpus, TokenSpec};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params(gender: Gender, types: &[&str]) -> GenerationParameters {
        GenerationParameters::new(gender).with_types(types.iter().copied())
    }

    fn example_config() -> RaceConfig {
        let mut config = RaceConfig::new("<FIRST> <LAST>");
        config.add_structure(
            "first",
            Some(Gender::Female),
            NameTypeStructure::new("<FIRST>").component("first", TokenSpec::literal(["Aela", "Brynn"])),
        );
        config.add_structure(
            "last",
            None,
            NameTypeStructure::new("<LAST>").component("last", TokenSpec::literal(["Stonearm"])),
        );
        config
    }

    #[test]
    fn parse_placeholders_and_literals() {
        let t = Template::parse("<FIRST> of <Clan>");
        assert_eq!(
            t.segments,
            vec![
                TemplateSegment::Placeholder("first".to_string()),
                TemplateSegment::Literal(" of ".to_string()),
                TemplateSegment::Placeholder("clan".to_string()),
            ]
        );
    }

    #[test]
    fn parse_unclosed_and_empty_are_literal() {
        let t = Template::parse("a <> b < c");
        assert_eq!(t.segments, vec![TemplateSegment::Literal("a <> b < c".to_string())]);
    }

    #[test]
    fn placeholders_deduplicated_in_order() {
        let t = Template::parse("<B><A><B>");
        assert_eq!(t.placeholders(), vec!["b", "a"]);
    }

    #[test]
    fn render_drops_unresolved() {
        let t = Template::parse("<FIRST> <MIDDLE> <LAST>");
        let values = HashMap::from([("first".to_string(), "Aela".to_string())]);
        assert_eq!(t.render(&values), "Aela  ");
    }

    #[test]
    fn end_to_end_literal_names() {
        let config = example_config();
        let assembler = NameAssembler::new(&config);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..30 {
            let name = assembler
                .assemble(&params(Gender::Female, &["first", "last"]), &mut rng)
                .unwrap();
            assert!(
                name == "Aela Stonearm" || name == "Brynn Stonearm",
                "got {}",
                name
            );
        }
    }

    #[test]
    fn unrequested_types_are_stripped() {
        let config = example_config();
        let mut rng = StdRng::seed_from_u64(1);
        let name = NameAssembler::new(&config)
            .assemble(&params(Gender::Neutral, &["last"]), &mut rng)
            .unwrap();
        assert_eq!(name, "Stonearm");
    }

    #[test]
    fn missing_structure_for_gender() {
        let config = example_config();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            NameAssembler::new(&config).assemble(&params(Gender::Male, &["first"]), &mut rng),
            Err(AssemblyError::NoStructuresForGender {
                name_type: "first".to_string(),
                gender: Gender::Male,
            })
        );
    }

    #[test]
    fn unknown_name_type_has_no_structures() {
        let config = example_config();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            NameAssembler::new(&config).assemble(&params(Gender::Female, &["title"]), &mut rng),
            Err(AssemblyError::NoStructuresForGender { .. })
        ));
    }

    #[test]
    fn missing_component_reported() {
        let mut config = RaceConfig::new("<FIRST>");
        config.add_structure(
            "first",
            None,
            NameTypeStructure::new("<ROOT><SUFFIX>").component("root", TokenSpec::literal(["Tor"])),
        );
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            NameAssembler::new(&config).assemble(&params(Gender::Male, &["first"]), &mut rng),
            Err(AssemblyError::UnknownComponent {
                structure: "<ROOT><SUFFIX>".to_string(),
                token: "suffix".to_string(),
            })
        );
    }

    #[test]
    fn multi_token_part_with_repeat() {
        let mut config = RaceConfig::new("<FIRST>");
        config.add_structure(
            "first",
            None,
            NameTypeStructure::new("<ROOT>-<ROOT><suffix>")
                .component("root", TokenSpec::literal(["ka"]).with_capitalize(false))
                .component("suffix", TokenSpec::literal(["dor"])),
        );
        let mut rng = StdRng::seed_from_u64(1);
        let name = NameAssembler::new(&config)
            .assemble(&params(Gender::Male, &["first"]), &mut rng)
            .unwrap();
        assert_eq!(name, "ka-kaDor");
    }

    #[test]
    fn prefix_applies_to_leading_token() {
        let mut config = RaceConfig::new("<FIRST>");
        config.add_structure(
            "first",
            None,
            NameTypeStructure::new("<ROOT><SUFFIX>")
                .component("root", TokenSpec::literal(["Tor", "Bal", "Ka"]))
                .component("suffix", TokenSpec::literal(["ak", "in"]).with_capitalize(false)),
        );
        let request = params(Gender::Male, &["first"]).with_starts_with("first", "b");
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..20 {
            let name = NameAssembler::new(&config).assemble(&request, &mut rng).unwrap();
            assert!(name == "Balak" || name == "Balin", "got {}", name);
        }
    }

    #[test]
    fn generative_token_error_propagates() {
        let mut config = RaceConfig::new("<FIRST>");
        config.add_structure(
            "first",
            None,
            NameTypeStructure::new("<FIRST>").component(
                "first",
                TokenSpec::generative(Corpus::Sentences(vec![
                    "ka ri na".to_string(),
                    "ri na lo".to_string(),
                    "ka ri".to_string(),
                ])),
            ),
        );
        let mut rng = StdRng::seed_from_u64(4);
        let request = params(Gender::Female, &["first"]).with_max_syllables(1);
        assert!(matches!(
            NameAssembler::new(&config).assemble(&request, &mut rng),
            Err(AssemblyError::Token {
                source: TokenError::GenerationExhausted { .. },
                ..
            })
        ));
    }

    #[test]
    fn config_syllable_default_applies() {
        let mut config = RaceConfig::new("<FIRST>");
        config.max_syllables = Some(4);
        config.add_structure(
            "first",
            None,
            NameTypeStructure::new("<FIRST>").component(
                "first",
                TokenSpec::generative(Corpus::Sentences(vec![
                    "ka ri na".to_string(),
                    "ri na lo".to_string(),
                    "ka ri".to_string(),
                ])),
            ),
        );
        let mut rng = StdRng::seed_from_u64(4);
        let name = NameAssembler::new(&config)
            .assemble(&params(Gender::Male, &["first"]), &mut rng)
            .unwrap();
        assert!(syllable_count(&name.to_lowercase()) <= 4);
        assert!(!name.contains('<'));
    }

    #[test]
    fn seeded_assembly_is_deterministic() {
        let config = example_config();
        let request = params(Gender::Female, &["first", "last"]);
        let mut rng1 = StdRng::seed_from_u64(99);
        let mut rng2 = StdRng::seed_from_u64(99);
        for _ in 0..10 {
            assert_eq!(
                NameAssembler::new(&config).assemble(&request, &mut rng1),
                NameAssembler::new(&config).assemble(&request, &mut rng2)
            );
        }
    }
}
