use clap::Parser;

pub mod global;
pub mod root_commands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `inq` binary.
#[derive(Debug, Parser)]
#[command(name = "inq", version, about = "Inquest - investigation lifecycle tracker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Max results to return
    #[arg(short, long, global = true)]
    pub limit: Option<u32>,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Explicit config file instead of the user and project layers
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

impl Cli {
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            limit: self.limit,
            quiet: self.quiet,
            verbose: self.verbose,
            config: self.config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use pretty_assertions::assert_eq;

    use super::{Cli, Commands, OutputFormat};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_before_subcommand() {
        let cli = Cli::try_parse_from([
            "inq", "--format", "raw", "--limit", "5", "--verbose", "get", "inv-1",
        ])
        .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Raw);
        assert_eq!(cli.limit, Some(5));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Get(ref args) if args.id == "inv-1"));
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["inq", "migrations", "--quiet", "--config", "/tmp/inq.toml"])
            .expect("cli should parse");

        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Migrations));
        assert_eq!(cli.global_flags().config.as_deref(), Some("/tmp/inq.toml"));
    }

    #[test]
    fn output_format_rejects_invalid_value() {
        assert!(Cli::try_parse_from(["inq", "--format", "table", "config"]).is_err());
    }

    #[test]
    fn submit_collects_repeated_filters() {
        let cli = Cli::try_parse_from([
            "inq",
            "submit",
            "--user",
            "usr-1",
            "--query",
            "emergency purchases",
            "--filter",
            "state=SP",
            "--filter",
            "min_value=100000",
            "--anomaly-type",
            "price_deviation",
        ])
        .expect("cli should parse");

        let Commands::Submit(args) = cli.command else {
            panic!("expected submit");
        };
        assert_eq!(args.source, "contracts");
        assert_eq!(args.filters, vec!["state=SP", "min_value=100000"]);
        assert_eq!(args.anomaly_types, vec!["price_deviation"]);
    }

    #[test]
    fn advance_requires_phase_and_progress() {
        assert!(Cli::try_parse_from(["inq", "advance", "inv-1", "--progress", "0.5"]).is_err());

        let cli = Cli::try_parse_from([
            "inq", "advance", "inv-1", "--phase", "fetch", "--progress", "0.5", "--records", "40",
        ])
        .expect("cli should parse");
        let Commands::Advance(args) = cli.command else {
            panic!("expected advance");
        };
        assert_eq!(args.phase, "fetch");
        assert_eq!(args.records, Some(40));

        let cli = Cli::try_parse_from([
            "inq", "advance", "inv-1", "--phase", "x", "--progress", "0.6",
        ])
        .expect("cli should parse");
        let Commands::Advance(args) = cli.command else {
            panic!("expected advance");
        };
        assert_eq!(args.records, None);
    }
}
