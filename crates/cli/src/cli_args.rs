//! Command-line argument parsing for the `pgate` binary.

use clap::{Parser, ValueEnum};

/// What a dry run prints.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// The interpolated start script
    #[default]
    Script,
    /// The projected environment, one `NAME=value` per line
    Env,
    /// The JSON snapshot of all parameters
    Json,
}

/// Command-line arguments for `pgate`.
///
/// Everything from the first positional word on is handed to the configured
/// command tree: sub-command names first, then that command's own arguments
/// and flags.
///
/// # Examples
///
/// ```rust
/// use clap::Parser;
/// use paramgate_cli::cli_args::Args;
///
/// let args = Args::parse_from(["pgate", "-d", "deploy", "prod", "--force"]);
/// assert!(args.dry_run);
/// assert_eq!(args.command_line, vec!["deploy", "prod", "--force"]);
/// ```
#[derive(Parser, Debug)]
#[command(term_width = 0)]
pub struct Args {
    /// Path to the commands definition config file YAML.
    ///
    /// If not provided, `$PARAMGATE_CONFIG` is used, then
    /// `~/.paramgate/commands.yml`.
    #[arg(long, short = 'c')]
    pub config_path: Option<String>,

    /// Validate and print instead of running the start script.
    #[arg(long, short = 'd', action)]
    pub dry_run: bool,

    /// What to print on a dry run.
    #[arg(long, short = 'o', value_enum, default_value_t = OutputFormat::Script)]
    pub format: OutputFormat,

    /// Log engine decisions to stderr (overridden by `RUST_LOG`).
    #[arg(long, short = 'v', action)]
    pub verbose: bool,

    /// Sub-command path followed by the command's own arguments and flags.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command_line: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_values() {
        let args = Args::parse_from(["pgate"]);

        assert!(args.config_path.is_none());
        assert!(!args.dry_run);
        assert!(!args.verbose);
        assert_eq!(args.format, OutputFormat::Script);
        assert!(args.command_line.is_empty());
    }

    #[test]
    fn test_args_short_flags() {
        let args = Args::parse_from(["pgate", "-c", "/custom/config.yml", "-d", "-o", "env", "-v"]);

        assert_eq!(args.config_path, Some("/custom/config.yml".to_string()));
        assert!(args.dry_run);
        assert!(args.verbose);
        assert_eq!(args.format, OutputFormat::Env);
    }

    #[test]
    fn test_args_long_flags() {
        let args = Args::parse_from([
            "pgate",
            "--config-path",
            "/custom/config.yml",
            "--dry-run",
            "--format",
            "json",
        ]);

        assert_eq!(args.config_path, Some("/custom/config.yml".to_string()));
        assert!(args.dry_run);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_command_flags_are_not_parsed_by_pgate() {
        let args = Args::parse_from(["pgate", "db", "migrate", "-v", "--steps=2", "-d"]);

        assert!(!args.verbose);
        assert!(!args.dry_run);
        assert_eq!(
            args.command_line,
            vec!["db", "migrate", "-v", "--steps=2", "-d"]
        );
    }
}
