use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use shear_refactor::{ExtractSubclassParams, RefactorReport, SignatureRetype};
use shear_syntax::{parse, TokenStream};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "shear", version, about = "Extract-subclass refactoring for Java sources")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Move selected members of a class onto a generated subclass
    ExtractSubclass(ExtractArgs),
    /// Print parse errors for a single file
    Parse(ParseArgs),
}

#[derive(Args)]
struct ExtractArgs {
    /// JSON file holding the full parameter record; overrides the other flags
    #[arg(long)]
    params: Option<PathBuf>,
    /// Class whose members are being extracted
    #[arg(long)]
    source_class: Option<String>,
    /// Name for the generated subclass (defaults to `<source>extracted`)
    #[arg(long)]
    new_class: Option<String>,
    /// Field to move (repeatable)
    #[arg(long = "field")]
    fields: Vec<String>,
    /// Method to move (repeatable)
    #[arg(long = "method")]
    methods: Vec<String>,
    /// File declaring the source class
    #[arg(long)]
    file: Option<PathBuf>,
    /// Root to traverse for dependent files (defaults to current directory)
    #[arg(long, default_value = ".")]
    project_root: PathBuf,
    /// Directory for the generated subclass file (defaults to the source file's directory)
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Signature retyping policy: `unconditional` or `usage-gated`
    #[arg(long, default_value = "unconditional")]
    signature_retype: String,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ParseArgs {
    /// File to parse
    file: PathBuf,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::ExtractSubclass(args) => {
            let json = args.json;
            let params = build_params(args)?;
            info!(
                source_class = %params.source_class,
                new_class = %params.new_class,
                project_root = %params.project_root.display(),
                "running extract-subclass"
            );
            let report = shear_refactor::run(&params)
                .with_context(|| format!("extract-subclass of `{}` failed", params.source_class))?;
            if json {
                print_json(&report)?;
            } else {
                print_report(&report);
            }
            Ok(0)
        }
        Command::Parse(args) => {
            let text = std::fs::read_to_string(&args.file)
                .with_context(|| format!("failed to read {}", args.file.display()))?;
            let stream = TokenStream::of(text);
            let result = parse(&stream);
            if args.json {
                let errors: Vec<_> = result
                    .errors
                    .iter()
                    .map(|e| serde_json::json!({ "offset": e.offset, "message": e.message }))
                    .collect();
                print_json(&serde_json::json!({ "errors": errors }))?;
            } else {
                for error in &result.errors {
                    println!("{}: {}", error.offset, error.message);
                }
                if result.errors.is_empty() {
                    println!("no parse errors");
                }
            }
            Ok(if result.errors.is_empty() { 0 } else { 1 })
        }
    }
}

fn build_params(args: ExtractArgs) -> Result<ExtractSubclassParams> {
    if let Some(path) = &args.params {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        return serde_json::from_str(&text)
            .with_context(|| format!("invalid parameter file {}", path.display()));
    }

    let source_class = args
        .source_class
        .context("--source-class is required (or pass --params)")?;
    let source_file = args.file.context("--file is required (or pass --params)")?;
    let new_class = args
        .new_class
        .unwrap_or_else(|| ExtractSubclassParams::default_new_class(&source_class));
    let output_dir = args.output_dir.unwrap_or_else(|| {
        source_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf()
    });
    let signature_retype = match args.signature_retype.as_str() {
        "unconditional" => SignatureRetype::Unconditional,
        "usage-gated" => SignatureRetype::UsageGated,
        other => anyhow::bail!(
            "unknown signature-retype policy `{other}` (expected `unconditional` or `usage-gated`)"
        ),
    };

    Ok(ExtractSubclassParams {
        source_class,
        new_class,
        moved_fields: args.fields,
        moved_methods: args.methods,
        source_file,
        project_root: args.project_root,
        output_dir,
        signature_retype,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_report(report: &RefactorReport) {
    println!("generated: {}", report.generated_file.display());
    println!("constructors migrated: {}", report.migrated_constructors);
    println!("dependents scanned: {}", report.dependents_scanned);
    println!("files changed: {}", report.files_changed.len());
    for path in &report.files_changed {
        println!("  {}", path.display());
    }
    for skipped in &report.skipped {
        println!("skipped: {} ({})", skipped.path.display(), skipped.reason);
    }
}
