use clap::{Args, Parser, Subcommand};
use fpff::archive::{Fpff, FpffOptions};
use fpff::export::{ExportMode, ExportOptions};
use fpff::{Container, SectionType};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "fpff", about = "The FPFF typed-section container CLI")]
struct Cli {
    /// Log progress at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Payload {
    /// Section type: ascii, utf8, words, dwords, doubles, coord, ref, png, gif87, gif89
    #[arg(short = 't', long = "type")]
    ty: String,
    /// Inline text payload
    #[arg(long, conflicts_with = "input", required_unless_present = "input")]
    text: Option<String>,
    /// Read the payload from a file
    #[arg(short, long)]
    input: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an empty container
    Create {
        file: PathBuf,
        #[arg(short, long, default_value = "")]
        author: String,
    },
    /// Append a section, creating the container if missing
    Add {
        file: PathBuf,
        #[command(flatten)]
        payload: Payload,
    },
    /// Insert a section at an index
    Insert {
        file: PathBuf,
        index: usize,
        #[command(flatten)]
        payload: Payload,
    },
    /// Remove the section at an index
    Remove {
        file: PathBuf,
        index: usize,
    },
    /// List sections
    List {
        file: PathBuf,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show header metadata
    Info {
        file: PathBuf,
    },
    /// Write every section as its own file
    Export {
        file: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
        /// Render structured sections as text
        #[arg(short, long)]
        rendered: bool,
        #[arg(long, default_value = "section-")]
        prefix: String,
    },
}

#[derive(Serialize)]
struct SectionInfo {
    index:  usize,
    #[serde(rename = "type")]
    ty:     SectionType,
    size:   usize,
    blake3: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {

        // ── Create ───────────────────────────────────────────────────────────
        Commands::Create { file, author } => {
            Fpff::with_author(&author)?.write(&file)?;
            println!("Created: {}", file.display());
        }

        // ── Add ──────────────────────────────────────────────────────────────
        Commands::Add { file, payload } => {
            let mut doc = open_or_new(&file)?;
            let (ty, data) = load_payload(&payload)?;
            doc.add(data, ty)?;
            doc.write(&file)?;
            println!("  added  section {} ({})", doc.len() - 1, ty);
        }

        // ── Insert ───────────────────────────────────────────────────────────
        Commands::Insert { file, index, payload } => {
            let mut doc = Fpff::open(&file)?;
            let (ty, data) = load_payload(&payload)?;
            doc.insert(index, data, ty)?;
            doc.write(&file)?;
            println!("  inserted  section {} ({})", index, ty);
        }

        // ── Remove ───────────────────────────────────────────────────────────
        Commands::Remove { file, index } => {
            let mut doc = Fpff::open(&file)?;
            let removed = doc.remove(index)?;
            doc.write(&file)?;
            println!("  removed  section {} ({})", index, removed.section_type());
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { file, json } => {
            let doc = Fpff::open(&file)?;
            let infos = section_infos(doc.container());
            if json {
                println!("{}", serde_json::to_string_pretty(&infos)?);
            } else {
                println!("Container: {}", file.display());
                println!("{:>5}  {:<8} {:>12}  BLAKE3", "Index", "Type", "Size");
                for info in infos {
                    println!("{:>5}  {:<8} {:>12}  {}",
                        info.index, info.ty.name(), info.size, &info.blake3[..12]);
                }
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { file } => {
            let mut doc = Fpff::new();
            let trailing = doc.read(&file)?;
            let c = doc.container();
            let created = chrono::DateTime::from_timestamp(i64::from(c.timestamp), 0)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| c.timestamp.to_string());

            println!("── FPFF Container ───────────────────────────────────────");
            println!("  Path           {}", file.display());
            println!("  Format version {}", c.version());
            println!("  Created        {}", created);
            println!("  Author         {}", c.author);
            println!("  Sections       {}", c.len());
            println!("  Payload bytes  {}", c.iter().map(|s| s.len() as u64).sum::<u64>());
            println!("  Trailing bytes {}", trailing);
        }

        // ── Export ───────────────────────────────────────────────────────────
        Commands::Export { file, output_dir, rendered, prefix } => {
            let opts = FpffOptions {
                export: ExportOptions {
                    mode: if rendered { ExportMode::Rendered } else { ExportMode::Raw },
                    prefix,
                },
                ..FpffOptions::default()
            };
            let mut doc = Fpff::with_options(opts);
            doc.read(&file)?;
            let report = doc.export(&output_dir)?;
            for f in &report.written {
                println!("  exported  {}", f.path.display());
            }
            for f in &report.failures {
                eprintln!("  failed    section {}: {}", f.index, f.error);
            }
            if !report.is_complete() {
                eprintln!(
                    "{} of {} sections failed to export",
                    report.failures.len(),
                    report.attempted(),
                );
                std::process::exit(1);
            }
            println!("Exported to: {}", output_dir.display());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn open_or_new(path: &Path) -> Result<Fpff, Box<dyn std::error::Error>> {
    Ok(if path.exists() { Fpff::open(path)? } else { Fpff::new() })
}

fn load_payload(p: &Payload) -> Result<(SectionType, Vec<u8>), Box<dyn std::error::Error>> {
    let ty = SectionType::from_name(&p.ty)
        .ok_or_else(|| format!("Unknown section type '{}'", p.ty))?;
    let data = match (&p.text, &p.input) {
        (Some(text), _)     => text.clone().into_bytes(),
        (None, Some(path))  => std::fs::read(path)?,
        (None, None)        => return Err("either --text or --input is required".into()),
    };
    Ok((ty, data))
}

fn section_infos(c: &Container) -> Vec<SectionInfo> {
    c.iter()
        .enumerate()
        .map(|(index, s)| SectionInfo {
            index,
            ty:     s.section_type(),
            size:   s.len(),
            blake3: hex::encode(blake3::hash(s.data()).as_bytes()),
        })
        .collect()
}
