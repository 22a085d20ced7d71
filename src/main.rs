//! # WXR Convert CLI (`wxr`)
//!
//! ## Usage
//!
//! ```bash
//! wxr --config ./wxr.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `wxr convert <export.xml>` | Convert and write the JSON export |
//! | `wxr check <export.xml>` | Convert, then print the summary and diagnostics |
//! | `wxr config` | Print the default configuration |
//!
//! ## Examples
//!
//! ```bash
//! # Force https and drop www. on links to the exported site
//! wxr convert export.xml --output out/export.json --config ./wxr.toml
//!
//! # Copy dc:creator into an `author` field
//! wxr convert export.xml --transform dc:creator=author
//!
//! # See what a conversion would produce without writing
//! wxr convert export.xml --dry-run
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use wxr_convert::config;
use wxr_convert::convert;
use wxr_convert_core::options::TransformSpec;

/// WXR Convert: turn a WordPress export into per-entity field maps.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist the built-in defaults are used; see
/// `wxr config` for what they are.
#[derive(Parser)]
#[command(name = "wxr", version, about = "Convert WordPress WXR exports")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./wxr.toml")]
    config: PathBuf,

    /// Log routing decisions at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an export and write every entity as JSON.
    ///
    /// Writes to `--output`, else `[output].path`, else stdout.
    Convert {
        /// The WXR export file.
        input: PathBuf,

        /// Output file for the JSON export.
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Convert and print the summary without writing the export.
        #[arg(long)]
        dry_run: bool,

        /// Copy an element into a field, as `qname=field`. Repeatable.
        #[arg(long = "transform", value_parser = parse_key_val)]
        transforms: Vec<(String, String)>,
    },

    /// Convert without writing; print the summary and every diagnostic.
    ///
    /// Exits non-zero only when the document itself cannot be read.
    Check {
        /// The WXR export file.
        input: PathBuf,
    },

    /// Print the default configuration as TOML.
    Config,
}

/// Parse a `key=value` pair for `--transform` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Commands that don't require config
    if let Commands::Config = cli.command {
        print!("{}", config::DEFAULT_CONFIG);
        return Ok(());
    }

    let mut cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Convert {
            input,
            output,
            dry_run,
            transforms,
        } => {
            for (name, field) in transforms {
                if field.trim().is_empty() {
                    anyhow::bail!("--transform {}= needs a field name", name);
                }
                cfg.convert
                    .transforms
                    .insert(name, TransformSpec::Field { field });
            }
            convert::run_convert(&cfg, &input, output.as_deref(), dry_run)?;
        }
        Commands::Check { input } => {
            convert::run_check(&cfg, &input)?;
        }
        Commands::Config => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
