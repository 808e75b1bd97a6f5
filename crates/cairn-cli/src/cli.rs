use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Disable progress spinners
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Provide custom config file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set proxy
    #[arg(required = false, long, short = 'P', global = true)]
    pub proxy: Option<String>,

    /// Set request headers
    #[arg(required = false, long, short = 'H', global = true)]
    pub header: Option<Vec<String>>,

    /// Set user agent
    #[arg(required = false, long, short = 'A', global = true)]
    pub user_agent: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum HooksAction {
    /// List stored hook records
    #[clap(name = "list", visible_alias = "ls")]
    List,

    /// Store a new hook record
    #[command(arg_required_else_help = true)]
    Add {
        /// Display name of the hook
        #[arg(required = true)]
        name: String,

        /// Executable the hook attaches to
        #[arg(required = true)]
        target: String,

        /// Configuration file passed to the hook
        #[arg(required = false, long, default_value = "")]
        config: String,

        /// Store the record as inactive
        #[arg(required = false, long)]
        inactive: bool,
    },
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the configuration file to stdout
    Config {
        /// Open the configuration file in editor
        /// Optional value can be passed to set as editor (default is $EDITOR)
        #[arg(required = false, short, long)]
        edit: Option<Option<String>>,
    },

    /// Fetch remote manifests and the package manifests they list
    #[clap(name = "sync", visible_alias = "S", visible_alias = "fetch")]
    Sync {
        /// Remote manifest URIs to sync (default: every configured remote)
        #[arg(required = false)]
        uris: Vec<String>,

        /// Stop a source at its first failing package
        #[arg(required = false, long)]
        fail_fast: bool,

        /// Sync sources in parallel
        #[arg(required = false, long)]
        parallel: bool,
    },

    /// Show what is cached for each remote
    #[clap(name = "status", visible_alias = "st")]
    Status {
        /// Remote manifest URIs to inspect (default: every configured remote)
        #[arg(required = false)]
        uris: Vec<String>,
    },

    /// Print environment variables
    #[clap(name = "env")]
    Env,

    /// Generate default config
    #[clap(name = "defconfig")]
    DefConfig {
        /// Remote manifest URIs to include
        #[arg(required = false, short, long = "remote")]
        remotes: Vec<String>,
    },

    /// Manage hook settings records
    #[command(arg_required_else_help = true)]
    Hooks {
        #[clap(subcommand)]
        action: HooksAction,
    },
}
