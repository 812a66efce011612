use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use doxfind::index::{stats, LoadOptions, SearchTable, Section};
use doxfind::output;
use doxfind::query::{literal_hits, parse_query, QueryExecutor};
use doxfind::utils::{get_config_path, AppConfig};
use log::{debug, info};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use termcolor::{ColorChoice, StandardStream};

#[derive(Parser)]
#[command(name = "doxfind")]
#[command(about = "Search Doxygen-generated documentation from the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Search query (when no subcommand is given); put `--` before terms starting with `-`
    query: Vec<String>,

    /// Documentation path: docs root, html directory, search directory or a shard file
    #[arg(short, long)]
    path: Option<PathBuf>,

    #[command(flatten)]
    load: LoadArgs,

    /// Maximum number of results (0 = unlimited)
    #[arg(short = 'n', long)]
    limit: Option<usize>,

    /// Treat plain terms as key prefixes
    #[arg(long)]
    prefix: bool,

    /// Match the query text as a plain substring, with no query syntax
    #[arg(short = 'F', long, conflicts_with = "prefix")]
    literal: bool,

    /// Print results as JSON
    #[arg(long, conflicts_with_all = ["names_only", "count"])]
    json: bool,

    /// Print only the names of matching records
    #[arg(short = 'l', long, conflicts_with = "count")]
    names_only: bool,

    /// Print only the number of matching records
    #[arg(short, long)]
    count: bool,

    /// When to use colors
    #[arg(long, global = true, value_enum, default_value_t = ColorWhen::Auto, value_name = "WHEN")]
    color: ColorWhen,
}

/// Options controlling how the index is loaded
#[derive(Args, Debug, Clone, Default)]
struct LoadArgs {
    /// Only load shards of this section (repeatable)
    #[arg(long = "section", value_name = "SECTION")]
    sections: Vec<String>,

    /// Fail on an unreadable shard instead of skipping it
    #[arg(long)]
    strict: bool,

    /// Merge records sharing a key across shards
    #[arg(long)]
    merge: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the index (interactive TUI mode)
    Search {
        /// Initial query
        query: Option<String>,

        /// Documentation path
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Start in literal mode (no query syntax)
        #[arg(short = 'F', long)]
        literal: bool,

        #[command(flatten)]
        load: LoadArgs,
    },
    /// Show every location of a key, with resolved file paths
    Show {
        /// Key, mangled (`get_5fcurrent_5fdir`) or plain (`get_current_dir`)
        key: String,

        /// Documentation path
        #[arg(short, long)]
        path: Option<PathBuf>,

        #[command(flatten)]
        load: LoadArgs,
    },
    /// Show index statistics
    Stats {
        /// Documentation path
        path: Option<PathBuf>,

        #[command(flatten)]
        load: LoadArgs,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the config file location and effective settings
    Config {
        /// Write the effective settings to the config file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ColorWhen {
    Auto,
    Always,
    Never,
}

impl ColorWhen {
    fn choice(self) -> ColorChoice {
        match self {
            ColorWhen::Always => ColorChoice::Always,
            ColorWhen::Never => ColorChoice::Never,
            ColorWhen::Auto if io::stdout().is_terminal() => ColorChoice::Auto,
            ColorWhen::Auto => ColorChoice::Never,
        }
    }
}

impl LoadArgs {
    fn options(&self, config: &AppConfig) -> LoadOptions {
        let sections = if self.sections.is_empty() {
            &config.sections
        } else {
            &self.sections
        };
        LoadOptions {
            sections: sections.iter().map(|s| Section::from_name(s)).collect(),
            strict: self.strict || config.strict,
        }
    }

    fn merge(&self, config: &AppConfig) -> bool {
        self.merge || config.merge_duplicates
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    debug!("config: {:?}", config);

    match cli.command {
        Some(Commands::Search {
            query,
            path,
            literal,
            load,
        }) => {
            let path = path.unwrap_or_else(|| config.effective_docs_path());
            interactive(&path, &load, &config, false, literal, query)?;
        }
        Some(Commands::Show { key, path, load }) => {
            let path = path.unwrap_or_else(|| config.effective_docs_path());
            let table = load_table(&path, &load, &config)?;
            show_key(&table, &key, cli.color.choice())?;
        }
        Some(Commands::Stats { path, load, json }) => {
            let path = path.unwrap_or_else(|| config.effective_docs_path());
            let table = load_table(&path, &load, &config)?;
            let mut stdout = io::stdout().lock();
            if json {
                serde_json::to_writer_pretty(&mut stdout, &stats::compute_stats(&table))?;
                writeln!(stdout)?;
            } else {
                stats::show_stats(&table, &mut stdout)?;
            }
        }
        Some(Commands::Config { init }) => {
            show_config(&config, init)?;
        }
        None => {
            let path = cli.path.clone().unwrap_or_else(|| config.effective_docs_path());
            let prefix = cli.prefix || config.prefix_match;

            if cli.query.is_empty() && !(cli.json || cli.names_only || cli.count) {
                #[cfg(feature = "interactive")]
                return interactive(&path, &cli.load, &config, prefix, cli.literal, None);
            }

            let table = load_table(&path, &cli.load, &config)?;
            run_lookup(&cli, &config, &table, prefix)?;
        }
    }

    Ok(())
}

/// Load the table the way the command line and config ask for
fn load_table(path: &Path, load: &LoadArgs, config: &AppConfig) -> Result<SearchTable> {
    let table = SearchTable::open(path, &load.options(config))
        .with_context(|| format!("Failed to load search index from {}", path.display()))?;
    info!("Loaded {} records from {}", table.len(), path.display());

    if load.merge(config) {
        Ok(table.merged())
    } else {
        Ok(table)
    }
}

/// One-shot lookup printed to stdout
fn run_lookup(cli: &Cli, config: &AppConfig, table: &SearchTable, prefix: bool) -> Result<()> {
    let text = cli.query.join(" ");
    let hits = if cli.literal {
        let mut hits = literal_hits(table, &text);
        let limit = cli.limit.unwrap_or(config.limit);
        if limit > 0 {
            hits.truncate(limit);
        }
        hits
    } else {
        let mut query = parse_query(&text);
        if prefix {
            query.root = query.root.into_prefix();
        }
        // `top:N` in the query wins over the flag and the config
        if query.options.limit == 0 {
            query.options.limit = cli.limit.unwrap_or(config.limit);
        }
        QueryExecutor::new(table).execute(&query)?
    };
    debug!("{} hits", hits.len());

    if cli.json {
        let mut stdout = io::stdout().lock();
        return output::print_json(&mut stdout, table, &hits);
    }

    let stdout = StandardStream::stdout(cli.color.choice());
    let mut out = stdout.lock();
    if cli.count {
        output::print_count(&mut out, &hits)?;
    } else if cli.names_only {
        output::print_names_only(&mut out, table, &hits)?;
    } else {
        output::print_hits(&mut out, table, &hits)?;
    }

    Ok(())
}

fn show_key(table: &SearchTable, key: &str, color: ColorChoice) -> Result<()> {
    let records: Vec<_> = table.find_key(key).map(|(_, record)| record).collect();
    if records.is_empty() {
        eprintln!("No records for key: {}", key);
        return Ok(());
    }

    let stdout = StandardStream::stdout(color);
    let mut out = stdout.lock();
    output::print_resolved(&mut out, table, &records)?;
    Ok(())
}

fn show_config(config: &AppConfig, init: bool) -> Result<()> {
    let config_path = get_config_path()?;

    if init {
        config.save()?;
        println!("Wrote {}", config_path.display());
        return Ok(());
    }

    let status = if config_path.exists() { "" } else { " (not present, using defaults)" };
    println!("Config file: {}{}", config_path.display(), status);
    println!("Docs path:   {}", config.effective_docs_path().display());
    println!("Browser:     {}", config.effective_browser());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

#[cfg(feature = "interactive")]
fn interactive(
    path: &Path,
    load: &LoadArgs,
    config: &AppConfig,
    prefix: bool,
    literal: bool,
    query: Option<String>,
) -> Result<()> {
    let settings = doxfind::tui::Settings {
        docs_path: path.to_path_buf(),
        load: load.options(config),
        merge: load.merge(config),
        prefix_match: prefix || config.prefix_match,
        literal,
        browser: config.effective_browser(),
    };
    doxfind::tui::run(settings, query)
}

#[cfg(not(feature = "interactive"))]
fn interactive(
    path: &Path,
    load: &LoadArgs,
    config: &AppConfig,
    prefix: bool,
    literal: bool,
    query: Option<String>,
) -> Result<()> {
    // Without a terminal UI, list whatever the query selects
    let table = load_table(path, load, config)?;
    let text = query.as_deref().unwrap_or("");
    let hits = if literal {
        literal_hits(&table, text)
    } else {
        let mut parsed = parse_query(text);
        if prefix || config.prefix_match {
            parsed.root = parsed.root.into_prefix();
        }
        QueryExecutor::new(&table).execute(&parsed)?
    };
    let stdout = StandardStream::stdout(ColorWhen::Auto.choice());
    let mut out = stdout.lock();
    output::print_hits(&mut out, &table, &hits)?;
    Ok(())
}
