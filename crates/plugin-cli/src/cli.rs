//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Plugin version resolution for hybrid-app projects
#[derive(Parser, Debug)]
#[command(name = "plugman-resolve")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project root (defaults to the current directory)
    #[arg(short, long, global = true, env = "PLUGMAN_PROJECT")]
    pub project: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options shared by commands that consult the registry.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryArgs {
    /// Version of the hosting tool to check requirements against
    #[arg(long)]
    pub tool_version: Option<String>,

    /// Local registry document (JSON keyed by plugin id)
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Local plugin search path; disables registry lookups
    #[arg(long)]
    pub searchpath: Option<String>,

    /// Never consult the registry
    #[arg(long)]
    pub noregistry: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Resolve plugin targets into fetchable specifiers
    ///
    /// Examples:
    ///   plugman-resolve resolve cordova-plugin-device
    ///   plugman-resolve resolve cordova-plugin-device@1.0.0 @scope/plugin
    Resolve {
        /// Plugin ids, specifiers, URLs or paths
        #[arg(required = true)]
        targets: Vec<String>,

        #[command(flatten)]
        registry: RegistryArgs,

        /// Install variable (NAME=value), may be repeated
        #[arg(long = "variable", value_name = "NAME=VALUE")]
        variables: Vec<String>,
    },

    /// Pick the highest release of a plugin compatible with the project
    Select {
        /// Plugin id
        plugin: String,

        #[command(flatten)]
        registry: RegistryArgs,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// List the unmet engine requirements of one plugin release
    Check {
        /// Plugin id
        plugin: String,

        /// Release to check
        version: String,

        #[command(flatten)]
        registry: RegistryArgs,
    },

    /// List top-level plugins that depend on a plugin
    Dependents {
        /// Plugin id
        plugin: String,

        /// Platform whose install state to read
        #[arg(long)]
        platform: String,
    },

    /// List dependencies of a plugin that nothing else uses
    Danglers {
        /// Plugin id
        plugin: String,

        /// Platform whose install state to read
        #[arg(long)]
        platform: String,
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
    fn test_parse_resolve_with_flags() {
        let cli = Cli::parse_from([
            "plugman-resolve",
            "resolve",
            "cordova-plugin-device",
            "--noregistry",
            "--variable",
            "API_KEY=x",
        ]);
        match cli.command {
            Some(Commands::Resolve {
                targets,
                registry,
                variables,
            }) => {
                assert_eq!(targets, vec!["cordova-plugin-device"]);
                assert!(registry.noregistry);
                assert_eq!(variables, vec!["API_KEY=x"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_danglers_requires_platform() {
        assert!(Cli::try_parse_from(["plugman-resolve", "danglers", "A"]).is_err());
        let cli = Cli::parse_from(["plugman-resolve", "danglers", "A", "--platform", "ios"]);
        assert_eq!(
            cli.command,
            Some(Commands::Danglers {
                plugin: "A".to_string(),
                platform: "ios".to_string(),
            })
        );
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::parse_from(["plugman-resolve", "dependents", "A", "--platform", "android", "-v"]);
        assert!(cli.verbose);
    }
}
