//! cwrgen CLI - Generate and validate CWR registration files
//!
//! # Main Commands
//!
//! ```bash
//! cwrgen generate export.csv        # CSV export → CW{yy}{seq}LUM_319.V22
//! cwrgen validate CW260001LUM_319.V22
//! cwrgen serve                      # Start HTTP server (port 3000)
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! cwrgen parse export.csv           # Show the discovered header and rows as JSON
//! cwrgen schema SPU --era legacy    # Print a record layout
//! cwrgen config -c business.json    # Check a business configuration
//! ```
//!
//! Without `--config`, the business configuration comes from the
//! environment (`CWR_CONFIG`, or `CWR_SENDER_NAME` / `CWR_SENDER_IPI` /
//! `CWR_TERRITORY` / `CWR_AGREEMENTS`), `.env` included.

use clap::{Parser, Subcommand};
use cwrgen::api::LOG_BROADCASTER;
use cwrgen::compose::AgreementPolicy;
use cwrgen::config::BusinessConfig;
use cwrgen::parser::parse_csv_file_auto;
use cwrgen::pipeline::{
    generate_from_csv, validate_file, write_output as write_cwr, GenerateOptions, ValidateOptions,
};
use cwrgen::schema::{Era, FieldKind, RecordSpec};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cwrgen")]
#[command(about = "Generate and validate CWR 2.2 registration files", long_about = None)]
struct Cli {
    /// Do not echo pipeline logs
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a CWR file from a CSV export
    Generate {
        /// Input CSV file
        input: PathBuf,

        /// Business configuration JSON (default: environment)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Format era: current or legacy
        #[arg(short, long, default_value = "current")]
        era: Era,

        /// Warn on unknown publishers instead of halting
        #[arg(long)]
        lenient: bool,

        /// Catalog every recording label must match
        #[arg(long)]
        catalog: Option<String>,

        /// File sequence number
        #[arg(short, long, default_value = "1")]
        sequence: u32,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Skip self-validation
        #[arg(long)]
        skip_validation: bool,

        /// Write the file even when self-validation finds issues
        #[arg(long)]
        force: bool,
    },

    /// Validate a CWR file
    Validate {
        /// Input CWR file
        input: PathBuf,

        /// Format era: current or legacy
        #[arg(short, long, default_value = "current")]
        era: Era,

        /// Catalog every recording label must match
        #[arg(long)]
        catalog: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a CSV export and output its rows as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print record layouts
    Schema {
        /// Record tag (default: all records)
        tag: Option<String>,

        /// Format era: current or legacy
        #[arg(short, long, default_value = "current")]
        era: Era,

        /// Print the layout as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load and check a business configuration
    Config {
        /// Business configuration JSON (default: environment)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Business configuration JSON (default: environment)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if cli.quiet {
        LOG_BROADCASTER.set_echo(false);
    }

    let result = match cli.command {
        Commands::Generate {
            input,
            config,
            era,
            lenient,
            catalog,
            sequence,
            output,
            skip_validation,
            force,
        } => {
            let options = GenerateOptions {
                era,
                agreement_policy: lenient.then_some(AgreementPolicy::Lenient),
                expected_catalog: catalog,
                sequence,
                skip_validation,
                timestamp: None,
            };
            cmd_generate(&input, config.as_deref(), options, &output, force).await
        }

        Commands::Validate {
            input,
            era,
            catalog,
            json,
        } => {
            let options = ValidateOptions {
                era,
                expected_catalog: catalog,
            };
            cmd_validate(&input, options, json).await
        }

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Schema { tag, era, json } => cmd_schema(tag.as_deref(), era, json),

        Commands::Config { config } => cmd_config(config.as_deref()),

        Commands::Serve { port, config } => cmd_serve(port, config.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<BusinessConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(p) => BusinessConfig::from_file(p)?,
        None => BusinessConfig::from_env()?,
    };
    Ok(config)
}

async fn cmd_generate(
    input: &Path,
    config: Option<&Path>,
    options: GenerateOptions,
    output_dir: &Path,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    eprintln!(
        "📄 Processing: {} (sender {}, {} agreements)",
        input.display(),
        config.sender_name,
        config.agreements.len()
    );

    let result = generate_from_csv(input, &config, options).await?;

    eprintln!("\n📊 Summary");
    eprintln!("   Works:        {}", result.file.transaction_count());
    eprintln!("   Lines:        {}", result.file.line_count());
    eprintln!("   Warnings:     {}", result.file.warnings.len());
    if let Some(ref report) = result.report {
        eprintln!("   Findings:     {}", report.findings.len());
    }

    let rejected = result.report.as_ref().is_some_and(|r| !r.is_clean());
    if rejected && !force {
        eprintln!("\n⚠️  {} not written: self-validation found issues (use --force to write anyway)", result.file_name);
        std::process::exit(1);
    }

    let path = write_cwr(output_dir, &result).await?;
    eprintln!("\n💾 Output written to: {}", path.display());

    if rejected {
        std::process::exit(1);
    }
    eprintln!("✨ Done!");
    Ok(())
}

async fn cmd_validate(
    input: &Path,
    options: ValidateOptions,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        LOG_BROADCASTER.set_echo(false);
    } else {
        eprintln!("✔️  Validating: {}", input.display());
    }

    let report = validate_file(input, options).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for finding in &report.findings {
            eprintln!("   [{:?}] line {}: {}", finding.severity, finding.line, finding.message);
            if !finding.raw_content.is_empty() {
                eprintln!("      {}", finding.raw_content);
            }
        }
        eprintln!(
            "\n📊 Results: {} lines, {} transactions, {} findings",
            report.stats.lines_read,
            report.stats.transactions,
            report.findings.len()
        );
    }

    if !report.is_clean() {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = parse_csv_file_auto(input)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(result.delimiter));
    match result.header_row {
        Some(row) => eprintln!("   Header row: {}", row + 1),
        None => eprintln!("   ⚠️  No header row recognized, using the first row"),
    }
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("✅ Parsed {} records", result.records.len());

    let json = serde_json::to_string_pretty(&result.records)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_schema(tag: Option<&str>, era: Era, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let registry = era.registry();
    let records: Vec<&RecordSpec> = match tag {
        Some(tag) => vec![registry.lookup(&tag.to_uppercase())?],
        None => registry.records().collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    for record in records {
        println!("{} ({} era, {} columns)", record.tag, era, record.width);
        for field in record.fields {
            let kind = match (field.constant, field.kind) {
                (true, _) => "literal",
                (false, FieldKind::Numeric) => "numeric",
                (false, FieldKind::Alphanumeric) => "alpha",
            };
            println!(
                "   [{:>3}:{:>3}] {:>3}  {:<8} {}",
                field.start,
                field.end(),
                field.length,
                kind,
                field.name
            );
        }
        println!();
    }
    Ok(())
}

fn cmd_config(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path)?;

    eprintln!("✅ Configuration valid");
    eprintln!("   Sender:    {} (IPI {})", config.sender_name, config.sender_ipi);
    eprintln!("   Territory: {}", config.territory);
    eprintln!("   Catalog:   {} / {}", config.default_catalog, config.default_label);
    eprintln!("   Agreements ({}):", config.agreements.len());
    for (name, id) in config.agreements.iter() {
        eprintln!("      {:<24} {}", name, id);
    }
    Ok(())
}

async fn cmd_serve(port: u16, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    cwrgen::api::start_server(port, config).await
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
