/// namegen — generate character names from a names directory.
///
/// Usage: namegen [--names-dir <path>] [--race <r>] [--subrace <s>] [--gender <g>]
///                [--types first,last] [--syllables <n>] [--first-starts-with <p>]
///                [--last-starts-with <p>] [--starts-with type=prefix]...
///                [--count <n>] [--seed <n>] [--interactive]
///
/// Interactive mode prompts for race, subrace, gender and name types, printing
/// one name per round until EOF or `quit`.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tesnames::{NameGenerator, NameRequest};

#[derive(Parser, Debug)]
#[command(name = "namegen")]
#[command(about = "Generate fantasy character names", long_about = None)]
#[command(version)]
struct Args {
    /// Directory holding races.ron and the per-race configs
    #[arg(long, default_value = "names")]
    names_dir: PathBuf,

    /// Race (random if not specified)
    #[arg(short, long)]
    race: Option<String>,

    /// Subrace (random if the race has subraces and none is given)
    #[arg(long)]
    subrace: Option<String>,

    /// Gender (random male or female if not specified)
    #[arg(short, long)]
    gender: Option<String>,

    /// Name types to generate, comma separated
    #[arg(short, long, value_delimiter = ',', default_value = "first")]
    types: Vec<String>,

    /// Maximum syllables per generated token
    #[arg(long)]
    syllables: Option<u32>,

    /// Required starting letters of the first name
    #[arg(long)]
    first_starts_with: Option<String>,

    /// Required starting letters of the last name
    #[arg(long)]
    last_starts_with: Option<String>,

    /// Required starting letters for any name type, as type=prefix
    #[arg(long, value_parser = parse_starts_with)]
    starts_with: Vec<(String, String)>,

    /// Number of names to print
    #[arg(short, long, default_value = "1")]
    count: usize,

    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Prompt for each request instead of reading flags
    #[arg(short, long)]
    interactive: bool,
}

impl Args {
    fn request(&self) -> NameRequest {
        let types: Vec<&str> = self.types.iter().map(String::as_str).collect();
        let mut request = NameRequest::new().types(&types);
        request.race = self.race.clone();
        request.subrace = self.subrace.clone();
        request.gender = self.gender.clone();
        request.syllables = self.syllables;

        if let Some(prefix) = &self.first_starts_with {
            request = request.starts_with("first", prefix);
        }
        if let Some(prefix) = &self.last_starts_with {
            request = request.starts_with("last", prefix);
        }
        for (name_type, prefix) in &self.starts_with {
            request = request.starts_with(name_type, prefix);
        }
        request
    }
}

fn parse_starts_with(input: &str) -> Result<(String, String), String> {
    let (name_type, prefix) = input
        .split_once('=')
        .ok_or_else(|| format!("expected type=prefix, got '{}'", input))?;
    let name_type = name_type.trim().to_lowercase();
    if name_type.is_empty() {
        return Err(format!("missing name type in '{}'", input));
    }
    Ok((name_type, prefix.trim().to_string()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    let mut generator = NameGenerator::builder()
        .names_dir(&args.names_dir)
        .seed(seed)
        .build()
        .with_context(|| format!("cannot use names directory {}", args.names_dir.display()))?;

    if args.interactive {
        return interactive(&mut generator, &args);
    }

    for name in generator.generate_batch(&args.request(), args.count)? {
        println!("{}", name);
    }
    Ok(())
}

fn interactive(generator: &mut NameGenerator, args: &Args) -> Result<()> {
    let races = generator.races()?;
    println!("Races: {}", races.join(", "));
    println!("Leave a field blank to pick at random. Type 'quit' to exit.\n");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let Some(race) = prompt(&mut lines, "Race    : ")? else { break };
        let Some(subrace) = prompt(&mut lines, "Subrace : ")? else { break };
        let Some(gender) = prompt(&mut lines, "Gender  : ")? else { break };
        let Some(types) = prompt(&mut lines, "Types   : ")? else { break };

        let mut request = args.request();
        request.race = Some(race);
        request.subrace = Some(subrace);
        request.gender = Some(gender);
        let types: Vec<&str> = types
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .collect();
        if !types.is_empty() {
            request = request.types(&types);
        }

        match generator.generate(&request) {
            Ok(name) => println!("{}\n", name),
            Err(e) => eprintln!("error: {}\n", e),
        }
    }

    Ok(())
}

/// Print `label` and read one trimmed line. `None` on EOF or `quit`.
fn prompt<B: BufRead>(lines: &mut io::Lines<B>, label: &str) -> Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;

    let Some(line) = lines.next() else {
        println!();
        return Ok(None);
    };
    let line = line?.trim().to_string();
    match line.to_lowercase().as_str() {
        "quit" | "exit" | "q" => Ok(None),
        _ => Ok(Some(line)),
    }
}
