//! xlsgrid CLI - dump legacy .xls workbooks as delimited text

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use xlsgrid::{ReadOptions, Workbook, Worksheet};

#[derive(Parser)]
#[command(name = "xlsgrid")]
#[command(author, version, about = "Read legacy Excel (.xls) workbooks")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Codepage for 8-bit text when the workbook names none
    #[arg(long, global = true, default_value_t = 1252)]
    codepage: u16,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all sheets in a workbook
    Sheets {
        /// Input .xls file
        input: PathBuf,
    },

    /// Show information about a workbook
    Info {
        /// Input .xls file
        input: PathBuf,
    },

    /// Print cell text as delimited rows to stdout
    #[command(alias = "csv")]
    Dump {
        /// Input .xls file
        input: PathBuf,

        /// Sheet index (0-based) or name; all sheets when omitted
        #[arg(short, long)]
        sheet: Option<String>,

        /// Maximum number of rows to print
        #[arg(short = 'n', long)]
        max_rows: Option<usize>,

        /// Field delimiter (default: comma)
        #[arg(short, long, default_value = ",")]
        delimiter: char,

        /// strftime pattern for date cells
        #[arg(long, default_value = "%d.%m.%Y")]
        date_format: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = ReadOptions::new().with_fallback_codepage(cli.codepage);
    match cli.command {
        Commands::Sheets { input } => list_sheets(&input, options),
        Commands::Info { input } => show_info(&input, options),
        Commands::Dump {
            input,
            sheet,
            max_rows,
            delimiter,
            date_format,
        } => dump(
            &input,
            options.with_date_format(date_format),
            sheet.as_deref(),
            max_rows.unwrap_or(usize::MAX),
            delimiter,
        ),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open(input: &Path, options: ReadOptions) -> Result<Workbook> {
    Workbook::open_with_options(input, options)
        .with_context(|| format!("Failed to open '{}'", input.display()))
}

fn list_sheets(input: &Path, options: ReadOptions) -> Result<()> {
    let workbook = open(input, options)?;

    for (i, info) in workbook.sheet_infos().enumerate() {
        println!("{}\t{}\t{:?}", i, info.name, info.visibility);
    }

    Ok(())
}

fn show_info(input: &Path, options: ReadOptions) -> Result<()> {
    let workbook = open(input, options)?;

    println!("File: {}", input.display());
    println!("Format: {:?}", workbook.version());
    match workbook.codepage() {
        Some(cp) => println!("Codepage: {cp}"),
        None => println!("Codepage: (none)"),
    }
    println!("Date system: {:?}", workbook.date_mode());
    if let Some(author) = workbook.author() {
        println!("Author: {author}");
    }
    println!("Shared strings: {}", workbook.shared_strings().len());
    println!(
        "Styles: {} XF, {} fonts, {} formats",
        workbook.xfs().len(),
        workbook.fonts().len(),
        workbook.formats().len()
    );
    println!("Sheets: {}", workbook.sheet_count());

    for i in 0..workbook.sheet_count() {
        let sheet = workbook.sheet(i)?;
        println!();
        println!(
            "  Sheet {}: \"{}\" ({:?}, {:?})",
            i,
            sheet.name(),
            sheet.kind(),
            sheet.visibility()
        );
        if sheet.row_count() == 0 {
            println!("    Rows: empty");
        } else {
            let last = u32::from(sheet.max_row()) + 1;
            println!("    Rows: {} (last row {})", sheet.row_count(), last);
        }
        if !sheet.diagnostics().is_empty() {
            println!("    Problems: {}", sheet.diagnostics().len());
        }
    }

    if !workbook.diagnostics().is_empty() {
        println!();
        println!("Problems while reading workbook globals:");
        for problem in workbook.diagnostics() {
            println!("  {problem}");
        }
    }

    Ok(())
}

fn dump(
    input: &Path,
    options: ReadOptions,
    sheet: Option<&str>,
    max_rows: usize,
    delimiter: char,
) -> Result<()> {
    let workbook = open(input, options)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let grid = match sheet {
        None => workbook
            .read_all_cells(max_rows)
            .context("Failed to render cells")?,
        Some(selector) => {
            let sheet = select_sheet(&workbook, selector)?;
            sheet_grid(&sheet, max_rows)?
        }
    };

    for row in &grid {
        let line = row
            .iter()
            .map(|text| quote(text, delimiter))
            .collect::<Vec<_>>()
            .join(&delimiter.to_string());
        writeln!(out, "{line}").context("Failed to write to stdout")?;
    }
    out.flush().context("Failed to write to stdout")?;

    log::debug!("wrote {} rows", grid.len());
    Ok(())
}

fn select_sheet<'a>(workbook: &'a Workbook, selector: &str) -> Result<Worksheet<'a>> {
    let sheet = match selector.parse::<usize>() {
        Ok(index) => workbook.sheet(index),
        Err(_) => workbook.sheet_by_name(selector),
    };
    sheet.with_context(|| format!("Sheet '{selector}' not found"))
}

/// Rows `0..=max_row` of one sheet, capped at `max_rows`.
fn sheet_grid(sheet: &Worksheet<'_>, max_rows: usize) -> Result<Vec<Vec<String>>> {
    if sheet.row_count() == 0 {
        eprintln!("Warning: Sheet appears to be empty");
        return Ok(Vec::new());
    }
    let len = (usize::from(sheet.max_row()) + 1).min(max_rows);
    let mut grid = vec![Vec::new(); len];
    for row in sheet.rows() {
        let index = usize::from(row.index());
        if index >= len {
            break;
        }
        grid[index] = row
            .values()
            .with_context(|| format!("Failed to render row {}", index + 1))?;
    }
    Ok(grid)
}

/// Quote a field if it contains the delimiter, quotes or line breaks
fn quote(text: &str, delimiter: char) -> String {
    if text.contains(delimiter) || text.contains('"') || text.contains('\n') || text.contains('\r')
    {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}
