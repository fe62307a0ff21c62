//! pagelayout CLI - layout analysis for rendered PDF pages

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pagelayout::model::PageStats;
use pagelayout::render::{self, TableFallback};
use pagelayout::{
    Document, JsonFormat, JsonSource, LayoutAnalyzer, LayoutConfig, PageFailure, PageSelection,
    PrimitiveSource, RenderOptions,
};

#[derive(Parser)]
#[command(name = "pagelayout")]
#[command(version)]
#[command(about = "Recover columns, paragraphs, figures, tables and reading order from PDF page primitives", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Input file plus analyzer options.
#[derive(clap::Args)]
struct AnalysisArgs {
    /// Primitives JSON file ({"pages": [...]})
    #[arg(value_name = "FILE")]
    input: PathBuf,

    #[command(flatten)]
    options: AnalyzerOptions,
}

/// Analyzer options shared by every analysis command.
#[derive(clap::Args)]
struct AnalyzerOptions {
    /// Page range (e.g., "1-10", "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Layout configuration JSON (missing fields keep their defaults)
    #[arg(long, value_name = "FILE", env = "PAGELAYOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Analyze pages one at a time
    #[arg(long)]
    sequential: bool,

    /// Skip borderless table detection
    #[arg(long)]
    no_borderless: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze and write JSON, Markdown, table CSVs and SVG overlays
    Analyze {
        #[command(flatten)]
        args: AnalysisArgs,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Table rendering mode for Markdown
        #[arg(long, value_enum, default_value = "markdown")]
        table_mode: TableMode,
    },

    /// Analyze many primitive files into one output tree with a batch report
    Batch {
        /// Primitive JSON files, or directories whose *.json files are analyzed
        #[arg(value_name = "PATH", required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        options: AnalyzerOptions,

        /// Output directory (one subdirectory per input file)
        #[arg(short, long, value_name = "DIR", default_value = "batch_output")]
        output: PathBuf,

        /// Table rendering mode for Markdown
        #[arg(long, value_enum, default_value = "markdown")]
        table_mode: TableMode,
    },

    /// Analyze and print the layout as JSON
    Json {
        #[command(flatten)]
        args: AnalysisArgs,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Analyze and print the section tree as Markdown
    #[command(alias = "md")]
    Markdown {
        #[command(flatten)]
        args: AnalysisArgs,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Table rendering mode
        #[arg(long, value_enum, default_value = "markdown")]
        table_mode: TableMode,

        /// Maximum heading level (1-6)
        #[arg(long, default_value = "6")]
        max_heading: u8,

        /// Leave figures out of the output
        #[arg(long)]
        no_figures: bool,
    },

    /// Show per-page layout statistics
    Info {
        #[command(flatten)]
        args: AnalysisArgs,

        /// Print the statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum TableMode {
    /// Standard Markdown tables
    Markdown,
    /// HTML tables for merged cells
    Html,
}

impl From<TableMode> for TableFallback {
    fn from(mode: TableMode) -> Self {
        match mode {
            TableMode::Markdown => TableFallback::Markdown,
            TableMode::Html => TableFallback::Html,
        }
    }
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            args,
            output,
            table_mode,
        } => cmd_analyze(&args, output.as_deref(), table_mode),
        Commands::Batch {
            inputs,
            options,
            output,
            table_mode,
        } => cmd_batch(&inputs, &options, &output, table_mode),
        Commands::Json {
            args,
            output,
            compact,
        } => cmd_json(&args, output.as_deref(), compact),
        Commands::Markdown {
            args,
            output,
            table_mode,
            max_heading,
            no_figures,
        } => cmd_markdown(&args, output.as_deref(), table_mode, max_heading, no_figures),
        Commands::Info { args, json } => cmd_info(&args, json),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn page_selection(pages: Option<&str>) -> CliResult<PageSelection> {
    match pages {
        Some(p) => Ok(PageSelection::parse(p).map_err(|e| format!("Invalid page range: {}", e))?),
        None => Ok(PageSelection::All),
    }
}

fn build_analyzer(args: &AnalyzerOptions) -> CliResult<LayoutAnalyzer> {
    let mut config = match &args.config {
        Some(path) => {
            log::debug!("loading layout configuration from {}", path.display());
            LayoutConfig::from_json(&fs::read_to_string(path)?)?
        }
        None => LayoutConfig::default(),
    };
    if args.no_borderless {
        config = config.without_borderless_tables();
    }

    let mut analyzer = LayoutAnalyzer::new()
        .with_config(config)
        .with_pages(page_selection(args.pages.as_deref())?);
    if args.sequential {
        analyzer = analyzer.sequential();
    }
    Ok(analyzer)
}

/// Analyze with a progress bar fed by the streaming API.
fn analyze_with_progress(args: &AnalysisArgs) -> CliResult<Document> {
    let analyzer = build_analyzer(&args.options)?;
    let source = JsonSource::open(&args.input)?;
    let page_count = source.page_count();
    let selected = (0..page_count)
        .filter(|&i| analyzer.options().pages.includes_index(i))
        .count();

    let pb = ProgressBar::new(selected as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message("Analyzing pages...");

    let mut doc = Document::new();
    doc.source = Some(args.input.display().to_string());
    doc.page_count = page_count;
    for (index, result) in analyzer.analyze_stream(source)? {
        match result {
            Ok(page) => doc.add_page(page),
            Err(e) => doc.add_failure(PageFailure::new(index, e.to_string())),
        }
        pb.inc(1);
    }
    pb.finish_with_message("Done!");

    for failure in &doc.failures {
        eprintln!(
            "{} page {}: {}",
            "Warning:".yellow().bold(),
            failure.index + 1,
            failure.message
        );
    }
    Ok(doc)
}

fn write_or_print(output: Option<&Path>, content: &str) -> CliResult<()> {
    if let Some(path) = output {
        fs::write(path, content)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

/// Write layout.json, layout.md, table CSVs and SVG overlays; returns the CSV count.
fn write_outputs(doc: &Document, output_dir: &Path, render_options: &RenderOptions) -> CliResult<usize> {
    fs::create_dir_all(output_dir)?;
    fs::write(output_dir.join("layout.json"), render::to_json(doc, JsonFormat::Pretty)?)?;
    fs::write(output_dir.join("layout.md"), render::to_markdown(doc, render_options)?)?;

    let tables_dir = output_dir.join("tables");
    let overlay_dir = output_dir.join("overlay");
    fs::create_dir_all(&overlay_dir)?;
    let mut table_count = 0;
    for page in &doc.pages {
        let files = render::page_tables_to_csv(page)?;
        if !files.is_empty() {
            fs::create_dir_all(&tables_dir)?;
        }
        for (name, csv) in files {
            fs::write(tables_dir.join(name), csv)?;
            table_count += 1;
        }
        let svg = render::page_to_svg(page, render_options);
        fs::write(overlay_dir.join(format!("page{}.svg", page.index + 1)), svg)?;
    }
    Ok(table_count)
}

fn cmd_analyze(args: &AnalysisArgs, output: Option<&Path>, table_mode: TableMode) -> CliResult<()> {
    let output_dir = output.map(|p| p.to_path_buf()).unwrap_or_else(|| {
        let stem = args.input.file_stem().unwrap_or_default().to_string_lossy();
        PathBuf::from(format!("{}_layout", stem))
    });

    let doc = analyze_with_progress(args)?;
    let render_options = RenderOptions::new().with_table_fallback(table_mode.into());
    let table_count = write_outputs(&doc, &output_dir, &render_options)?;

    println!("\n{}", "Output files:".green().bold());
    println!("  {} layout.json", "├─".dimmed());
    println!("  {} layout.md", "├─".dimmed());
    println!("  {} tables/ ({} CSV files)", "├─".dimmed(), table_count);
    println!("  {} overlay/ ({} SVG files)", "└─".dimmed(), doc.pages.len());

    Ok(())
}

/// Primitive files named by `inputs`; a directory contributes its `*.json` files in name order.
fn collect_inputs(inputs: &[PathBuf]) -> CliResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

fn per(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

fn cmd_batch(inputs: &[PathBuf], options: &AnalyzerOptions, output: &Path, table_mode: TableMode) -> CliResult<()> {
    let files = collect_inputs(inputs)?;
    if files.is_empty() {
        return Err("no primitive JSON files found".into());
    }
    let analyzer = build_analyzer(options)?;
    let render_options = RenderOptions::new().with_table_fallback(table_mode.into());
    fs::create_dir_all(output)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut entries = Vec::with_capacity(files.len());
    let mut totals = PageStats::default();
    let mut total_pages = 0;
    let mut failed = Vec::new();
    for path in &files {
        let name = path.file_name().unwrap_or_default().to_string_lossy().to_string();
        let file_dir = output.join(path.file_stem().unwrap_or_default());
        pb.set_message(name.clone());

        let result = analyze_file(&analyzer, path)
            .and_then(|doc| write_outputs(&doc, &file_dir, &render_options).map(|tables| (doc, tables)));
        match result {
            Ok((doc, csv_files)) => {
                let stats = doc.stats();
                totals += stats;
                total_pages += doc.pages.len();
                entries.push(serde_json::json!({
                    "file": name,
                    "status": "success",
                    "output_dir": file_dir.display().to_string(),
                    "pages": doc.pages.len(),
                    "failed_pages": doc.failures.len(),
                    "csv_files": csv_files,
                    "stats": stats,
                }));
            }
            Err(e) => {
                log::warn!("batch: {} failed: {}", path.display(), e);
                entries.push(serde_json::json!({
                    "file": name,
                    "status": "error",
                    "error": e.to_string(),
                }));
                failed.push((name, e.to_string()));
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("Done!");

    let successful = files.len() - failed.len();
    let report = serde_json::json!({
        "summary": {
            "total_files": files.len(),
            "successful": successful,
            "failed": failed.len(),
            "total_pages": total_pages,
            "totals": totals,
        },
        "files": entries,
        "statistics": {
            "avg_figures_per_page": per(totals.figures, total_pages),
            "avg_tables_per_page": per(totals.tables, total_pages),
            "success_rate": per(successful, files.len()),
        },
    });
    let report_path = output.join("batch_report.json");
    fs::write(&report_path, serde_json::to_string_pretty(&report)?)?;

    println!("\n{}", "Batch Summary".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Files".bold(), files.len());
    println!("{}: {}", "Successful".bold(), successful.to_string().green());
    println!("{}: {}", "Failed".bold(), failed.len());
    println!("{}: {}", "Pages".bold(), total_pages);
    println!("{}: {}", "Figures".bold(), totals.figures);
    println!("{}: {}", "Tables".bold(), totals.tables);
    for (name, message) in &failed {
        println!("  {} {}: {}", "-".dimmed(), name, message.red());
    }
    println!("{} {}", "Report:".green(), report_path.display());

    Ok(())
}

fn analyze_file(analyzer: &LayoutAnalyzer, path: &Path) -> CliResult<Document> {
    let mut doc = analyzer.analyze_source(&JsonSource::open(path)?)?;
    doc.source = Some(path.display().to_string());
    Ok(doc)
}

fn cmd_json(args: &AnalysisArgs, output: Option<&Path>, compact: bool) -> CliResult<()> {
    let doc = analyze_with_progress(args)?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };

    write_or_print(output, &render::to_json(&doc, format)?)
}

fn cmd_markdown(
    args: &AnalysisArgs,
    output: Option<&Path>,
    table_mode: TableMode,
    max_heading: u8,
    no_figures: bool,
) -> CliResult<()> {
    let doc = analyze_with_progress(args)?;

    let render_options = RenderOptions::new()
        .with_table_fallback(table_mode.into())
        .with_max_heading(max_heading)
        .with_figure_placeholders(!no_figures);

    write_or_print(output, &render::to_markdown(&doc, &render_options)?)
}

fn cmd_info(args: &AnalysisArgs, json: bool) -> CliResult<()> {
    let doc = build_analyzer(&args.options)?.analyze_source(&JsonSource::open(&args.input)?)?;

    if json {
        let pages: Vec<serde_json::Value> = doc
            .pages
            .iter()
            .map(|page| serde_json::json!({ "page": page.index + 1, "stats": page.stats() }))
            .collect();
        let summary = serde_json::json!({
            "file": args.input.display().to_string(),
            "pages": doc.page_count,
            "failures": doc.failures,
            "per_page": pages,
            "totals": doc.stats(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", "Layout Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), args.input.display());
    println!("{}: {}", "Pages".bold(), doc.page_count);
    println!("{}: {}", "Analyzed".bold(), doc.pages.len());
    println!("{}: {}", "Failed".bold(), doc.failures.len());

    println!();
    println!("{}", "Per Page".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for page in &doc.pages {
        let s = page.stats();
        println!(
            "{} {:>3}: {} columns, {} paragraphs, {} headings, {} figures, {} tables, {} captions, {} diagnostics",
            "Page".bold(),
            page.index + 1,
            s.columns,
            s.paragraphs,
            s.headings,
            s.figures,
            s.tables,
            s.captions,
            s.diagnostics
        );
    }
    for failure in &doc.failures {
        println!("{} {:>3}: {}", "Page".bold(), failure.index + 1, failure.message.red());
    }

    let total = doc.stats();
    println!();
    println!("{}", "Totals".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Paragraphs".bold(), total.paragraphs);
    println!("{}: {}", "Headings".bold(), total.headings);
    println!("{}: {}", "Figures".bold(), total.figures);
    println!("{}: {}", "Tables".bold(), total.tables);
    println!("{}: {}", "Captions".bold(), total.captions);
    println!("{}: {}", "Diagnostics".bold(), total.diagnostics);

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pagelayout".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Layout analysis for rendered PDF pages");
    println!();
    println!("License: MIT");
}
