use crate::types::{LogLevel, OutputFormat, ToolLogLevel};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "qbs-session")]
#[command(about = "Resolve, build and inspect Qbs projects through a qbs session", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Settings file [default: $QBS_SESSION_CONFIG, else the user config dir]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Workspace root [default: current directory]
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Build tool executable, overriding the settings file
    #[arg(long, global = true)]
    pub qbs: Option<String>,

    /// Project file [default: first project file in the workspace]
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    #[arg(long, global = true)]
    pub profile: Option<String>,

    #[arg(long, default_value = "debug", global = true)]
    pub configuration: String,

    #[arg(long, default_value = "plain", global = true)]
    pub format: OutputFormat,

    #[arg(long, default_value = "warn", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "List project files in the workspace")]
    Projects,

    #[command(about = "List profiles known to the build tool")]
    Profiles,

    #[command(about = "List build configurations")]
    Configurations,

    #[command(about = "Resolve the project")]
    Resolve {
        /// Verbosity requested from the build tool
        #[arg(long)]
        tool_log_level: Option<ToolLogLevel>,
    },

    #[command(about = "Resolve, then build the project or selected products")]
    Build {
        #[command(flatten)]
        args: OperationArgs,
    },

    #[command(about = "Resolve, then remove build artifacts")]
    Clean {
        #[command(flatten)]
        args: OperationArgs,
    },

    #[command(about = "Resolve, then install the project or selected products")]
    Install {
        #[command(flatten)]
        args: OperationArgs,
    },

    #[command(about = "Resolve and list runnable products")]
    Products,

    #[command(about = "Resolve and print the environment a product runs in")]
    RunEnv {
        /// Full display name of the product
        product: String,
    },

    #[command(about = "Resolve and print the compiler configuration for a source file")]
    CodeModel {
        file: PathBuf,
    },

    #[command(about = "Inspect or create the settings file")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct OperationArgs {
    /// Restrict to this product (repeatable)
    #[arg(long = "product", short = 'p')]
    pub products: Vec<String>,

    /// Maximum parallel jobs; 0 lets the tool decide
    #[arg(long, short = 'j')]
    pub jobs: Option<u32>,

    /// Continue after errors where possible
    #[arg(long, short = 'k')]
    pub keep_going: bool,

    /// Verbosity requested from the build tool
    #[arg(long)]
    pub tool_log_level: Option<ToolLogLevel>,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Print the effective settings")]
    Show,

    #[command(about = "Print the settings file location")]
    Path,

    #[command(about = "Write a settings file with default values")]
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
