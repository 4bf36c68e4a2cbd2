use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::models::{GradeLevel, HelpLevel, TextType};

#[derive(Parser, Debug)]
#[command(name = "skrivpartner", version, about = "Berätta din idé, så bygger vi texten tillsammans")]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(long, short, global = true, help = "Mirror all log events to stderr")]
    pub verbose: bool,
    #[arg(long, global = true, help = "Provider override, e.g. gemini or openai:gpt-4o-mini")]
    pub provider: Option<String>,
    #[arg(long, global = true, env = "SKRIVPARTNER_CONFIG_DIR", help = "Directory holding config.json")]
    pub config_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Turn an idea into a finished text
    Optimize(OptimizeArgs),
    /// Inspect or change stored configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Args, Debug, Clone)]
pub struct OptimizeArgs {
    /// The idea or draft; read from --file or stdin when omitted
    pub idea: Option<String>,
    #[arg(long, conflicts_with = "idea", help = "Read the idea from a text file")]
    pub file: Option<PathBuf>,
    #[arg(long = "help-level", value_enum, default_value_t = HelpLevel::Expand)]
    pub help_level: HelpLevel,
    #[arg(long = "text-type", value_enum, default_value_t = TextType::Essay)]
    pub text_type: TextType,
    #[arg(long, value_enum, ignore_case = true, default_value_t = GradeLevel::C)]
    pub grade: GradeLevel,
    #[arg(long, help = "Show the defense tips expanded")]
    pub tips: bool,
    #[arg(long, help = "Copy the optimized text to the clipboard")]
    pub copy: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the effective configuration with keys masked
    Show,
    /// Store an API key for a provider
    SetKey {
        provider: String,
        key: String,
    },
    /// Remove a stored API key
    DeleteKey {
        provider: String,
    },
    /// Default provider as name[:model]
    SetProvider {
        spec: String,
    },
    /// Override a provider's base URL
    SetUrl {
        provider: String,
        url: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_optimize_defaults() {
        let cli = Cli::try_parse_from(["skrivpartner", "optimize", "skolan borde börja senare"]).unwrap();
        let Commands::Optimize(args) = cli.command else {
            panic!("expected optimize");
        };
        assert_eq!(args.idea.as_deref(), Some("skolan borde börja senare"));
        assert_eq!(args.help_level, HelpLevel::Expand);
        assert_eq!(args.text_type, TextType::Essay);
        assert_eq!(args.grade, GradeLevel::C);
        assert!(!args.tips);
    }

    #[test]
    fn test_optimize_selectors() {
        let cli = Cli::try_parse_from([
            "skrivpartner",
            "--provider",
            "openai",
            "optimize",
            "--help-level",
            "humanize",
            "--text-type",
            "column",
            "--grade",
            "A",
            "text",
        ])
        .unwrap();
        assert_eq!(cli.provider.as_deref(), Some("openai"));
        let Commands::Optimize(args) = cli.command else {
            panic!("expected optimize");
        };
        assert_eq!(args.help_level, HelpLevel::HumanizeOnly);
        assert_eq!(args.text_type, TextType::Column);
        assert_eq!(args.grade, GradeLevel::A);
    }

    #[test]
    fn test_unknown_grade_rejected() {
        assert!(Cli::try_parse_from(["skrivpartner", "optimize", "--grade", "B", "x"]).is_err());
    }

    #[test]
    fn test_config_subcommands_have_help() {
        let cli = Cli::command();
        let config = cli.find_subcommand("config").unwrap();
        let subs: Vec<_> = config.get_subcommands().filter(|c| c.get_name() != "help").collect();
        let names: Vec<&str> = subs.iter().map(|c| c.get_name()).collect();
        assert_eq!(names, ["show", "set-key", "delete-key", "set-provider", "set-url"]);
        for sub in subs {
            assert!(sub.get_about().is_some(), "{} has no help", sub.get_name());
        }
    }
}
