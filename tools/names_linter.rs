/// Names Linter — validates a names directory's catalogs and race configs.
///
/// Usage: names_linter <names_dir>

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;
use tesnames::core::assembler::{Template, TemplateSegment};
use tesnames::schema::race::{Catalog, RaceConfig, TokenSource};
use tesnames::Gender;

#[derive(Parser, Debug)]
#[command(name = "names_linter")]
#[command(about = "Check a names directory for configuration defects", long_about = None)]
struct Args {
    /// Directory holding races.ron
    names_dir: PathBuf,
}

#[derive(Debug, Default)]
struct Report {
    errors: Vec<String>,
    warnings: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if !args.names_dir.is_dir() {
        eprintln!("ERROR: Path '{}' does not exist", args.names_dir.display());
        process::exit(1);
    }

    let report = lint_names_dir(&args.names_dir);

    println!("\n=== Names Lint Report ===\n");

    if report.errors.is_empty() && report.warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &report.warnings {
        println!("WARNING: {}", warning);
    }

    for error in &report.errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        report.errors.len(),
        report.warnings.len()
    );

    if !report.errors.is_empty() {
        process::exit(1);
    }
}

fn lint_names_dir(names_dir: &Path) -> Report {
    let mut report = Report::default();

    let races = match Catalog::load_races(names_dir) {
        Ok(races) => races,
        Err(e) => {
            report.errors.push(format!("races.ron: {}", e));
            return report;
        }
    };
    lint_catalog("races.ron", &races, &mut report);

    for (race, entry) in &races.entries {
        let race_dir = names_dir.join(&entry.directory);
        match Catalog::load_subraces(&race_dir) {
            Ok(Some(subraces)) => {
                lint_catalog(&format!("{}/race.ron", race), &subraces, &mut report);
                for (subrace, sub_entry) in &subraces.entries {
                    let label = format!("{}/{}", race, subrace);
                    lint_config(&label, &race_dir.join(&sub_entry.directory), &mut report);
                }
            }
            Ok(None) => lint_config(race, &race_dir, &mut report),
            Err(e) => report.errors.push(format!("{}: {}", race, e)),
        }
    }

    report
}

fn lint_catalog(label: &str, catalog: &Catalog, report: &mut Report) {
    if catalog.entries.is_empty() {
        report.errors.push(format!("{}: no entries", label));
    }
    for (name, entry) in &catalog.entries {
        if entry.weight == 0 {
            report
                .errors
                .push(format!("{}: entry '{}' has zero weight", label, name));
        }
    }
}

fn lint_config(label: &str, dir: &Path, report: &mut Report) {
    let config = match RaceConfig::load(dir) {
        Ok(config) => config,
        Err(e) => {
            report.errors.push(format!("{}: {}", label, e));
            return;
        }
    };
    println!("  Loaded: {}", dir.join("config.ron").display());
    check_config(label, &config, report);
}

fn check_config(label: &str, config: &RaceConfig, report: &mut Report) {
    for name_type in Template::parse(&config.structure).placeholders() {
        if !config.components.contains_key(name_type) {
            report.warnings.push(format!(
                "{}: structure placeholder <{}> has no name-type components",
                label, name_type
            ));
        }
    }

    let mut name_types: Vec<_> = config.components.iter().collect();
    name_types.sort_by(|a, b| a.0.cmp(b.0));

    for (name_type, components) in name_types {
        for gender in Gender::ALL {
            if components.candidates(gender).is_empty() {
                report.warnings.push(format!(
                    "{}: name type '{}' has no structures for gender '{}'",
                    label, name_type, gender
                ));
            }
        }

        let structures = components
            .by_gender
            .values()
            .flatten()
            .chain(components.all.iter());
        for structure in structures {
            let context = format!("{}: {} structure '{}'", label, name_type, structure.structure);
            if structure.weight == 0 {
                report.errors.push(format!("{} has zero weight", context));
            }

            let template = Template::parse(&structure.structure);
            if !template
                .segments
                .iter()
                .any(|s| matches!(s, TemplateSegment::Placeholder(_)))
            {
                report
                    .warnings
                    .push(format!("{} has no placeholders", context));
            }

            for token in template.placeholders() {
                let Some(spec) = structure.components.get(token) else {
                    report
                        .errors
                        .push(format!("{} has no component for <{}>", context, token));
                    continue;
                };
                match &spec.source {
                    TokenSource::Literal(choices) if choices.is_empty() => report
                        .errors
                        .push(format!("{}: <{}> has an empty literal list", context, token)),
                    TokenSource::Generative(corpus) if corpus.is_empty() => report
                        .errors
                        .push(format!("{}: <{}> has an empty corpus", context, token)),
                    _ => {}
                }
            }
        }
    }
}
