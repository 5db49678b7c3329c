/// The top-level name pipeline: request → catalog → parameters → name.
///
/// Configuration is read fresh on every call; nothing is cached between
/// generations.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::assembler::{AssemblyError, NameAssembler};
use crate::schema::params::{NameRequest, ParamError};
use crate::schema::race::{Catalog, ConfigError, RaceConfig};

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error(transparent)]
    Param(#[from] ParamError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    #[error("names directory not found: {0}")]
    MissingNamesDir(PathBuf),
}

/// Generates names from a names directory. Built via `NameGenerator::builder()`.
#[derive(Debug, Clone)]
pub struct NameGenerator {
    names_dir: PathBuf,
    seed: u64,
    generation_count: u64,
}

/// Builder for constructing a `NameGenerator`.
#[derive(Debug, Clone)]
pub struct NameGeneratorBuilder {
    names_dir: PathBuf,
    seed: u64,
}

impl NameGenerator {
    pub fn builder() -> NameGeneratorBuilder {
        NameGeneratorBuilder {
            names_dir: PathBuf::from("names"),
            seed: 0,
        }
    }

    pub fn names_dir(&self) -> &Path {
        &self.names_dir
    }

    /// Generate one name, seeding a fresh RNG from the generator's seed and
    /// how many names it has produced so far.
    pub fn generate(&mut self, request: &NameRequest) -> Result<String, GeneratorError> {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(self.generation_count));
        let result = self.generate_with_rng(request, &mut rng);
        self.generation_count += 1;
        result
    }

    /// Generate one name drawing every random choice from `rng`.
    pub fn generate_with_rng<R: Rng>(
        &self,
        request: &NameRequest,
        rng: &mut R,
    ) -> Result<String, GeneratorError> {
        let (params, race_dir) = request.normalize(&self.names_dir, rng)?;
        debug!(
            race = %params.race,
            subrace = ?params.subrace,
            gender = %params.gender,
            types = ?params.types,
            "normalized request"
        );

        let config = RaceConfig::load(&race_dir)?;
        let name = NameAssembler::new(&config).assemble(&params, rng)?;
        info!(name = %name, "generated name");
        Ok(name)
    }

    /// Generate `count` names for the same request.
    pub fn generate_batch(
        &mut self,
        request: &NameRequest,
        count: usize,
    ) -> Result<Vec<String>, GeneratorError> {
        (0..count).map(|_| self.generate(request)).collect()
    }

    /// Names of every race in the catalog, sorted.
    pub fn races(&self) -> Result<Vec<String>, GeneratorError> {
        let catalog = Catalog::load_races(&self.names_dir)?;
        Ok(catalog.entries.keys().cloned().collect())
    }
}

impl NameGeneratorBuilder {
    pub fn names_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.names_dir = path.as_ref().to_path_buf();
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check the names directory and its race index, then build.
    pub fn build(self) -> Result<NameGenerator, GeneratorError> {
        if !self.names_dir.is_dir() {
            return Err(GeneratorError::MissingNamesDir(self.names_dir));
        }
        Catalog::load_races(&self.names_dir)?;

        Ok(NameGenerator {
            names_dir: self.names_dir,
            seed: self.seed,
            generation_count: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_with_seed() {
        let generator = NameGenerator::builder()
            .names_dir("tests/fixtures/names")
            .seed(12345)
            .build()
            .unwrap();
        assert_eq!(generator.seed, 12345);
        assert_eq!(generator.generation_count, 0);
    }

    #[test]
    fn builder_rejects_missing_dir() {
        let result = NameGenerator::builder()
            .names_dir("tests/fixtures/does_not_exist")
            .build();
        assert!(matches!(result, Err(GeneratorError::MissingNamesDir(_))));
    }

    #[test]
    fn generation_count_advances() {
        let mut generator = NameGenerator::builder()
            .names_dir("tests/fixtures/names")
            .build()
            .unwrap();
        let request = NameRequest::new().race("dwarf").gender("female");
        generator.generate(&request).unwrap();
        generator.generate(&request).unwrap();
        assert_eq!(generator.generation_count, 2);
    }
}
