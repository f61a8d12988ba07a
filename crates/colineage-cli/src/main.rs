use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use colineage_core::{Config, DialectConfig, Report, Severity, TableId};
use colineage_graph::{export, export_scoped, search_columns, Impact, LineageIndex, TableRole};
use colineage_sql::{sources, LineageBatch};

/// colineage - column-level lineage for SQL transformation scripts
#[derive(Parser)]
#[command(name = "colineage")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: colineage.toml or config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the SQL comes from and how it is read
#[derive(Args, Debug, Clone, Default)]
struct InputArgs {
    /// SQL file or directory of *.sql files (default: sql_repo_path)
    path: Option<PathBuf>,

    /// SQL dialect (ansi, bigquery, snowflake, postgres, mysql, hive)
    #[arg(short, long)]
    dialect: Option<DialectConfig>,

    /// Table name given to the result of a bare SELECT
    #[arg(long)]
    result_table: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract lineage and write the graph payload
    Build {
        #[command(flatten)]
        input: InputArgs,

        /// Output file for the lineage payload (default: output_file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the run report
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Show upstream and downstream impact for a table
    Impact {
        /// Table to analyze (as written in SQL or as a file stem)
        table: String,

        #[command(flatten)]
        input: InputArgs,

        /// Print the closures as JSON
        #[arg(long)]
        json: bool,

        /// Write the payload scoped to this table's impact
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List tables, or search columns by name
    Tables {
        #[command(flatten)]
        input: InputArgs,

        /// Column search terms, separated by `,` or `;`
        #[arg(short, long)]
        search: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.verbose)?;

    match cli.command {
        Commands::Build { input, output, report } => {
            build_command(&config, &input, output.as_deref(), report.as_deref(), cli.verbose)
        }
        Commands::Impact { table, input, json, output } => {
            impact_command(&config, &table, &input, json, output.as_deref(), cli.verbose)
        }
        Commands::Tables { input, search } => {
            tables_command(&config, &input, search.as_deref(), cli.verbose)
        }
    }
}

/// Log to stderr; RUST_LOG wins over the verbosity flag
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            Config::discover(&cwd)?
        }
    };

    if verbose {
        eprintln!("{} dialect: {:?}", "Using".cyan(), config.dialect);
    }

    Ok(config)
}

/// Config with command-line overrides applied
fn effective_config(config: &Config, input: &InputArgs) -> Config {
    let mut config = config.clone();

    if let Some(dialect) = input.dialect {
        config.dialect = dialect;
    }
    if let Some(result_table) = &input.result_table {
        config.result_table = result_table.clone();
    }

    config
}

/// Extract lineage from every SQL file at the input path
fn run_batch(config: &Config, input: &InputArgs, verbose: bool) -> Result<LineageBatch> {
    let path = match &input.path {
        Some(path) => path.clone(),
        None => config.resolve(&config.sql_repo_path),
    };

    let files = sources::discover(&path)?;

    if verbose || files.is_empty() {
        eprintln!(
            "{} {} SQL files in {}",
            "Found".cyan(),
            files.len(),
            path.display()
        );
    }

    let mut batch = LineageBatch::from_config(config);
    for file in &files {
        if verbose {
            eprintln!("  {} {}...", "Parsing".cyan(), file.display());
        }
        batch.add_file(file);
    }

    Ok(batch)
}

/// Build command - extract lineage and write the payload
fn build_command(
    config: &Config,
    input: &InputArgs,
    output: Option<&Path>,
    report_path: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let config = effective_config(config, input);
    let batch = run_batch(&config, input, verbose)?;

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => config.resolve(&config.output_file),
    };

    let (graph, report) = batch.finish();

    export(&graph).save_to_file(&output)?;

    if verbose {
        eprintln!("{} {}", "Lineage saved to:".green(), output.display());
    }

    if let Some(path) = report_path {
        report.save_to_file(path)?;
        if verbose {
            eprintln!("{} {}", "Report saved to:".green(), path.display());
        }
    }

    print_build_summary(&report, &output);

    Ok(())
}

/// Impact command - show upstream and downstream closures
fn impact_command(
    config: &Config,
    table: &str,
    input: &InputArgs,
    json: bool,
    output: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let config = effective_config(config, input);
    let batch = run_batch(&config, input, verbose)?;
    let graph = batch.graph();

    let index = LineageIndex::new(graph);
    let impact = index.impact_of(table);

    if let Some(path) = output {
        export_scoped(graph, &impact).save_to_file(path)?;
        if verbose {
            eprintln!("{} {}", "Scoped lineage saved to:".green(), path.display());
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&impact)?);
        return Ok(());
    }

    if !graph.contains_table(&impact.root) {
        println!("{} {}", "Table not found in lineage:".yellow(), table);
        return Ok(());
    }

    print_impact(&impact);

    Ok(())
}

/// Tables command - list tables or search columns
fn tables_command(
    config: &Config,
    input: &InputArgs,
    search: Option<&str>,
    verbose: bool,
) -> Result<()> {
    let config = effective_config(config, input);
    let batch = run_batch(&config, input, verbose)?;
    let graph = batch.graph();

    if let Some(query) = search {
        let matches = search_columns(graph, query);
        if matches.is_empty() {
            println!("{}", "No matching columns".yellow());
        }
        for column in matches {
            println!("  {}.{}", column.table.as_str().dimmed(), column.column.green());
        }
        return Ok(());
    }

    let stats = graph.stats();
    println!(
        "{} tables, {} columns, {} flow edges, {} join edges",
        stats.tables, stats.columns, stats.flow_edges, stats.join_edges
    );
    println!();

    for table in graph.tables() {
        let kind = if graph.is_defined(table) {
            "defined".green()
        } else if graph.is_cte(table) {
            "cte".cyan()
        } else {
            "physical".normal()
        };

        println!(
            "  {:<40} {:<10} {} columns",
            table.as_str(),
            kind,
            graph.columns(table).count()
        );
    }

    Ok(())
}

fn print_impact(impact: &Impact) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Column Lineage Impact".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("{} {}", "Table:".bold(), impact.root.as_str().green());
    println!();

    print_tables("Upstream", impact.upstream_tables(), impact, TableRole::Upstream);
    print_tables("Downstream", impact.downstream_tables(), impact, TableRole::Downstream);

    println!("{}", "=".repeat(60).bright_blue());
}

fn print_tables<'a>(
    title: &str,
    tables: impl Iterator<Item = &'a TableId>,
    impact: &Impact,
    role: TableRole,
) {
    let tables: Vec<&TableId> = tables.collect();
    let closure = match role {
        TableRole::Downstream => &impact.downstream,
        _ => &impact.upstream,
    };

    println!("{} {}", format!("{} tables:", title).bold(), tables.len());

    if tables.is_empty() {
        println!("  {}", "(none)".dimmed());
    }

    for (i, table) in tables.iter().enumerate() {
        let columns: Vec<&str> = closure
            .columns
            .iter()
            .filter(|c| &c.table == *table)
            .map(|c| c.column.as_str())
            .collect();

        let label = match role {
            TableRole::Downstream => table.as_str().yellow(),
            _ => table.as_str().cyan(),
        };
        println!("  {}. {} ({})", i + 1, label, columns.join(", "));
    }

    println!();
}

fn print_build_summary(report: &Report, output: &Path) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Lineage Build Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);
    println!();

    println!("{}", "Summary:".bold());
    println!("  Sources:    {}", report.summary.sources_processed);
    println!("  Statements: {}", report.summary.statements_extracted);

    if report.summary.sources_failed > 0 {
        println!("  Failed:     {}", report.summary.sources_failed.to_string().red().bold());
    } else {
        println!("  Failed:     {}", report.summary.sources_failed.to_string().green());
    }

    if let Some(stats) = &report.graph {
        println!(
            "  Graph:      {} tables, {} columns, {} flow edges, {} join edges",
            stats.tables, stats.columns, stats.flow_edges, stats.join_edges
        );
    }
    println!();

    let notable: Vec<_> = report
        .diagnostics
        .iter()
        .filter(|d| d.severity != Severity::Info)
        .collect();

    if notable.is_empty() {
        println!("{}", "✓ No issues found!".green().bold());
    } else {
        println!("{}", "Diagnostics:".bold());
        for diag in notable {
            let severity_str = match diag.severity {
                Severity::Error => "ERROR".red().bold(),
                Severity::Warn => "WARN".yellow().bold(),
                Severity::Info => "INFO".cyan(),
            };

            println!("  [{}] {}: {}", severity_str, diag.code, diag.message);

            if let Some(loc) = &diag.location {
                print!("    at {}", loc.file);
                if let Some(line) = loc.line {
                    print!(":{}", line);
                }
                println!();
            }
        }
    }

    if report.summary.info > 0 {
        println!("  {} informational notes (see report)", report.summary.info);
    }

    println!();
    println!("{} {}", "Lineage written to:".green(), output.display());
    println!("{}", "=".repeat(60).bright_blue());
}
