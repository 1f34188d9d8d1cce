use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "trailshow")]
#[command(author, version, about)]
#[command(long_about = "An image slideshow viewer with a rhombus thumbnail trail.\n\n\
    Write a page in markdown, put images in a `::: slideshow` block and watch them rotate.\n\n\
    Examples:\n  \
    trailshow holiday.md                Show the page (fullscreen)\n  \
    trailshow holiday.md --windowed     Show the page in a window\n  \
    trailshow holiday.md --paused       Start with autoplay off\n  \
    trailshow check holiday.md          Validate a page without opening it")]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Page file to show
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Launch in a window instead of fullscreen
    #[arg(long, global = false)]
    pub windowed: bool,

    /// Start with autoplay paused
    #[arg(long, global = false)]
    pub paused: bool,

    /// Autoplay interval in milliseconds
    #[arg(long, global = false, value_parser = clap::value_parser!(u64).range(crate::config::MIN_INTERVAL_MS..))]
    pub interval: Option<u64>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a page and report its slideshows
    Check {
        /// Page file to check
        file: PathBuf,
    },

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Display current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. defaults.theme, defaults.interval_ms, defaults.start_paused)
        key: String,

        /// Value to set
        value: String,
    },
}

#[derive(Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        match self.command {
            Some(Commands::Check { file }) => {
                if !file.exists() {
                    anyhow::bail!("File not found: {}", file.display());
                }
                crate::commands::check::run(&file)
            }
            Some(Commands::Config { command }) => crate::commands::config::run(command),
            Some(Commands::Completion { shell }) => {
                crate::commands::completion::run(shell);
                Ok(())
            }
            Some(Commands::Version) => {
                crate::commands::version::run();
                Ok(())
            }
            None => {
                if let Some(file) = self.file {
                    if !file.exists() {
                        anyhow::bail!("File not found: {}", file.display());
                    }
                    crate::app::run(file, self.windowed, self.paused, self.interval)
                } else {
                    use clap::CommandFactory;
                    let mut cmd = Self::command();
                    cmd.print_help()?;
                    println!();
                    Ok(())
                }
            }
        }
    }
}
