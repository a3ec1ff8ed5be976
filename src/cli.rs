//! Command-line surface (§6): a deliberately small, `clap`-derived
//! contract. Anything beyond these flags is out of scope.

use clap::Parser;

/// `--version`/`-v` is wired through `ArgAction::Version` rather than
/// `#[command(version)]`, since clap's default short for the generated
/// version flag is `-V` — already taken here by `--verbose`.
#[derive(Parser, Debug, Default)]
#[command(name = "ccon", about = "Minimal Linux container lifecycle orchestrator", version, disable_version_flag = true)]
pub struct Cli {
    /// Path to the JSON configuration file. Defaults to `config.json` in the
    /// current directory; ignored when `--config-string` is given.
    #[arg(long)]
    pub config: Option<String>,

    /// The configuration document itself, inline. Takes priority over
    /// `--config` when both are given.
    #[arg(long = "config-string")]
    pub config_string: Option<String>,

    /// Enables debug-level logging on stderr.
    #[arg(short = 'V', long)]
    pub verbose: bool,

    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: (),
}
