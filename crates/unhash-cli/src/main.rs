//! unhash - Recover object and variable names from hashed RSDKv5 scene data
//!
//! This tool matches MD5-only names against word lists and writes
//! decompilation-style entity structs for every object type it encounters.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use unhash_core::dump::load_dump;
use unhash_core::{
    CandidateDictionary, Digest, DigestOracle, RenderConfig, Resolution, ResolveStrategy,
    Resolver, RunAggregator, RunConfig, RunReport, Symbol,
};
use walkdir::WalkDir;

/// Recover object and variable names from hashed RSDKv5 scene data
#[derive(Parser, Debug)]
#[command(name = "unhash")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the digest of each name
    Hash {
        /// Names to hash
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Look up hex digests in the word lists
    Resolve {
        #[command(flatten)]
        words: WordListArgs,

        /// Hex-encoded digests to resolve
        #[arg(required = true)]
        digests: Vec<String>,
    },

    /// Recover entity structs from an entity dump
    Schemas(SchemasArgs),
}

#[derive(Args, Debug)]
struct WordListArgs {
    /// Word list file or directory of *.txt word lists (repeatable)
    #[arg(short, long = "wordlist", value_name = "PATH")]
    wordlists: Vec<PathBuf>,

    /// Don't seed the dictionary with the base entity field names
    #[arg(long)]
    no_base_fields: bool,
}

#[derive(Args, Debug)]
struct SchemasArgs {
    #[command(flatten)]
    words: WordListArgs,

    /// Entity dump produced by the scene reader
    #[arg(short, long, value_name = "DUMP")]
    input: PathBuf,

    /// Output file for the entity structs
    #[arg(short, long, default_value = "entities.txt")]
    output: PathBuf,

    /// Dictionary matching strategy
    #[arg(long, value_enum, default_value = "scan")]
    strategy: StrategyArg,

    /// Resolve on a single thread
    #[arg(long)]
    sequential: bool,

    /// Dry run - print the structs instead of writing them
    #[arg(long)]
    dry_run: bool,

    /// Overwrite existing files without prompting
    #[arg(long)]
    force: bool,
}

/// Dictionary matching strategy
#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Hash candidates in order until one matches
    Scan,
    /// Build a digest index over the dictionary first
    Indexed,
}

impl From<StrategyArg> for ResolveStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Scan => ResolveStrategy::Scan,
            StrategyArg::Indexed => ResolveStrategy::Indexed,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    match &cli.command {
        Command::Hash { names } => hash_names(names),
        Command::Resolve { words, digests } => resolve_digests(words, digests),
        Command::Schemas(args) => recover_schemas(args),
    }
}

/// Print `<hex>  <name>` for every name
fn hash_names(names: &[String]) -> Result<()> {
    let oracle = DigestOracle::new();
    for name in names {
        println!("{}  {}", oracle.digest_str(name), name);
    }
    Ok(())
}

/// Resolve raw digests against the word lists
fn resolve_digests(words: &WordListArgs, digests: &[String]) -> Result<()> {
    let symbols = digests
        .iter()
        .map(|input| {
            let input = input.trim_start_matches('#');
            Digest::from_hex(input)
                .map(Symbol::hashed)
                .with_context(|| format!("Invalid digest: {}", input))
        })
        .collect::<Result<Vec<_>>>()?;

    let dictionary = build_dictionary(words)?;
    let oracle = DigestOracle::new();
    let resolver = Resolver::new(&dictionary, &oracle);

    for resolution in resolver.resolve_all(&symbols) {
        println!("{}", format_resolution(&resolution));
    }

    Ok(())
}

/// Run the full recovery pass over an entity dump
fn recover_schemas(args: &SchemasArgs) -> Result<()> {
    let timer = Instant::now();

    if !args.input.is_file() {
        bail!("Input dump does not exist: {}", args.input.display());
    }

    let config = RunConfig::new()
        .parallel(!args.sequential)
        .seed_base_fields(!args.words.no_base_fields)
        .strategy(args.strategy.into());
    let mut run = RunAggregator::new(config);

    for path in collect_word_lists(&args.words.wordlists)? {
        let added = run
            .dictionary_mut()
            .load_file(&path)
            .with_context(|| format!("Failed to load word list: {}", path.display()))?;
        debug!("Loaded {} new names from {}", added, path.display());
    }
    info!("Dictionary holds {} candidates", run.dictionary().len());

    let dump = load_dump(&args.input, run.oracle())
        .with_context(|| format!("Failed to read entity dump: {}", args.input.display()))?;
    let seeded = run.seed(dump.known.iter().cloned());
    debug!("Seeded {} known names from the dump", seeded);
    info!("Processing {} entity instances", dump.instances.len());

    run.process_batch(&dump.instances);
    let report = run.finish();
    let render_config = RenderConfig::default();

    if args.dry_run {
        print!("{}", report.render(&render_config));
    } else {
        write_report(&report, &render_config, &args.output, args.force)?;
        println!("Wrote {}", args.output.display());
    }

    println!("Done in {}s", timer.elapsed().as_secs_f64());
    println!("{} objects", report.stats.entity_types);
    println!("{} unique variable names", report.stats.distinct_field_names);

    if !report.unresolved.is_empty() {
        println!("Unresolved symbols ({}):", report.unresolved.len());
        for unresolved in &report.unresolved {
            println!("{}", unresolved);
        }
    }

    Ok(())
}

/// Build a dictionary from word list arguments
fn build_dictionary(words: &WordListArgs) -> Result<CandidateDictionary> {
    let mut dictionary = if words.no_base_fields {
        CandidateDictionary::new()
    } else {
        CandidateDictionary::with_base_fields()
    };

    for path in collect_word_lists(&words.wordlists)? {
        dictionary
            .load_file(&path)
            .with_context(|| format!("Failed to load word list: {}", path.display()))?;
    }

    info!("Dictionary holds {} candidates", dictionary.len());
    Ok(dictionary)
}

/// Expand word list arguments into files, walking directories in name order
fn collect_word_lists(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            bail!("Word list does not exist: {}", path.display());
        }

        for entry in WalkDir::new(path)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", path.display(), e);
                    continue;
                }
            };

            let candidate = entry.path();
            if !candidate.is_file() || !is_word_list(candidate) {
                trace!("Skipping non-word-list: {}", candidate.display());
                continue;
            }
            files.push(candidate.to_path_buf());
        }
    }

    Ok(files)
}

/// Word lists are plain `*.txt` files
fn is_word_list(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("txt"))
        .unwrap_or(false)
}

/// `<hex>  <name>` for matches, `<hex>  <source>` otherwise
fn format_resolution(resolution: &Resolution) -> String {
    match &resolution.text {
        Some(text) => format!("{}  {}", resolution.digest, text),
        None => format!("{}  {}", resolution.digest, resolution.source.as_str()),
    }
}

/// Write the rendered report to disk
fn write_report(
    report: &RunReport,
    config: &RenderConfig,
    output_path: &Path,
    force: bool,
) -> Result<()> {
    if output_path.exists() && !force {
        bail!(
            "File already exists: {} (use --force to overwrite)",
            output_path.display()
        );
    }

    report.write_to(output_path, config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;
    use unhash_core::{EntityTypeSchema, RunStats, SymbolSource, BASE_FIELDS};

    fn words(paths: Vec<PathBuf>) -> WordListArgs {
        WordListArgs {
            wordlists: paths,
            no_base_fields: false,
        }
    }

    #[test]
    fn test_collect_word_lists_walks_directories_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(temp_dir.path().join("b.txt"), "Player\n").unwrap();
        fs::write(temp_dir.path().join("a.txt"), "Ring\n").unwrap();
        fs::write(temp_dir.path().join("notes.md"), "ignored\n").unwrap();
        fs::write(nested.join("c.TXT"), "Spring\n").unwrap();

        let files = collect_word_lists(&[temp_dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a.txt", "b.txt", "c.TXT"]);
    }

    #[test]
    fn test_collect_word_lists_missing_path() {
        assert!(collect_word_lists(&[PathBuf::from("/nonexistent/words")]).is_err());
    }

    #[test]
    fn test_build_dictionary() {
        let temp_dir = TempDir::new().unwrap();
        let list = temp_dir.path().join("objects.txt");
        fs::write(&list, "Ring\nposition\nPlayer\n").unwrap();

        let dictionary = build_dictionary(&words(vec![list])).unwrap();
        assert_eq!(dictionary.position("position"), Some(0));
        assert!(dictionary.contains("Ring"));
        assert_eq!(dictionary.len(), BASE_FIELDS.len() + 2);
    }

    fn report(names: &[&str]) -> RunReport {
        RunReport {
            schemas: names.iter().map(|name| EntityTypeSchema::new(*name)).collect(),
            unresolved: Vec::new(),
            stats: RunStats::default(),
        }
    }

    #[test]
    fn test_write_report_respects_force() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out").join("entities.txt");
        let config = RenderConfig::default();

        write_report(&report(&["Ring"]), &config, &output, false).unwrap();
        assert!(write_report(&report(&["Spring"]), &config, &output, false).is_err());
        write_report(&report(&["Player"]), &config, &output, true).unwrap();

        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "struct EntityPlayer {\n\tRSDK_ENTITY\n};\n\n"
        );
    }

    #[test]
    fn test_write_report_surfaces_write_failure() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let err = write_report(
            &report(&["Ring"]),
            &RenderConfig::default(),
            &blocker.join("entities.txt"),
            true,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<unhash_core::Error>(),
            Some(unhash_core::Error::FileWrite { .. })
        ));
    }

    #[test]
    fn test_format_resolution() {
        let dictionary: CandidateDictionary = ["Ring"].into_iter().collect();
        let oracle = DigestOracle::new();
        let resolver = Resolver::new(&dictionary, &oracle);
        let ring = oracle.digest(b"Ring");
        let missing = oracle.digest(b"Missing");

        let found = resolver.resolve(&Symbol::hashed(ring));
        assert_eq!(found.source, SymbolSource::Dictionary);
        assert_eq!(format_resolution(&found), format!("{}  Ring", ring));

        let lost = resolver.resolve(&Symbol::hashed(missing));
        assert_eq!(format_resolution(&lost), format!("{}  unresolved", missing));
    }

    #[test]
    fn test_recover_schemas_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let oracle = DigestOracle::new();

        let list = temp_dir.path().join("names.txt");
        fs::write(&list, "Ring\nplaneFilter\n").unwrap();

        let dump = temp_dir.path().join("scene.dump");
        fs::write(
            &dump,
            format!(
                "object #{}\n  #{} Enum\n  angle Int32\n",
                oracle.digest(b"Ring"),
                oracle.digest(b"planeFilter")
            ),
        )
        .unwrap();

        let output = temp_dir.path().join("entities.txt");
        let args = SchemasArgs {
            words: words(vec![list]),
            input: dump,
            output: output.clone(),
            strategy: StrategyArg::Indexed,
            sequential: true,
            dry_run: false,
            force: false,
        };
        recover_schemas(&args).unwrap();

        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "struct EntityRing {\n\tRSDK_ENTITY\n\tint32 planeFilter;\n};\n\n"
        );
    }

    #[test]
    fn test_recover_schemas_seeds_known_names() {
        let temp_dir = TempDir::new().unwrap();
        let oracle = DigestOracle::new();

        let list = temp_dir.path().join("names.txt");
        fs::write(&list, "Ring\n").unwrap();

        let dump = temp_dir.path().join("scene.dump");
        fs::write(
            &dump,
            format!(
                "; from the game config\nknown Spring\nobject #{}\n  #{} UInt8\n",
                oracle.digest(b"Spring"),
                oracle.digest(b"planeFilter")
            ),
        )
        .unwrap();

        let output = temp_dir.path().join("entities.txt");
        let args = SchemasArgs {
            words: words(vec![list]),
            input: dump,
            output: output.clone(),
            strategy: StrategyArg::Scan,
            sequential: true,
            dry_run: false,
            force: false,
        };
        recover_schemas(&args).unwrap();

        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            format!(
                "struct EntitySpring {{\n\tRSDK_ENTITY\n\tuint8 {};\n}};\n\n",
                oracle.digest(b"planeFilter")
            )
        );
    }

    #[test]
    fn test_is_word_list() {
        assert!(is_word_list(Path::new("/tmp/objects.txt")));
        assert!(!is_word_list(Path::new("/tmp/objects.json")));
        assert!(!is_word_list(Path::new("/tmp/objects")));
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
