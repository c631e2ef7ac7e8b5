//! Command-line interface for `git_issue`.
//!
//! This module provides the CLI parsing and command routing using clap.

pub mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use issue_core::merge::{PreferCurrent, PreferIncoming, ResolutionPolicy};
use issue_core::Status;
use std::path::PathBuf;

use crate::branch::BranchManager;
use crate::config::PartialConfig;
use crate::logging;
use crate::prompt::{AssumeYes, Confirm, InteractivePolicy, TerminalPrompt};
use crate::sync::Synchronizer;
use crate::workspace::Workspace;

/// git-issue - Issue tracking on an isolated git branch.
#[derive(Parser, Debug)]
#[command(name = "git-issue")]
#[command(
    author,
    version,
    about = "Distributed issue tracker stored on an isolated git branch",
    long_about = None,
    after_help = "Issues live on their own branch, attached as a worktree only while a command runs."
)]
pub struct Cli {
    /// Output format: text (default) or json
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Answer yes to every confirmation
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Resolve diverged fields without prompting
    #[arg(long, global = true, value_enum)]
    pub prefer: Option<Prefer>,

    /// Run as if started in this directory
    #[arg(short = 'C', global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Issue branch name
    #[arg(long, global = true)]
    pub branch: Option<String>,

    /// Worktree directory, relative to the repository root
    #[arg(long, global = true)]
    pub worktree: Option<PathBuf>,

    /// Remote to push to and pull from
    #[arg(long, global = true)]
    pub remote: Option<String>,

    /// Issue id prefix
    #[arg(long, global = true)]
    pub prefix: Option<String>,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Headless divergence resolution.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefer {
    /// Keep the renumbered (authoritative) value
    Current,
    /// Keep the diverged edit
    Incoming,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(flatten)]
    Issue(IssueCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Commands that run against a repository.
#[derive(Subcommand, Debug)]
pub enum IssueCommand {
    /// Create a new issue
    Create(CreateArgs),

    /// Edit an existing issue
    Edit(EditArgs),

    /// Add a comment to an issue
    Comment(CommentArgs),

    /// Show issue details
    Show(ShowArgs),

    /// List issues
    List(ListArgs),

    /// Mark an issue open
    Open(IssueArg),

    /// Mark an issue closed
    Close(IssueArg),

    /// Mark an issue in progress
    Active(IssueArg),

    /// Subscribe to an issue
    Subscribe(IssueArg),

    /// Unsubscribe from an issue
    Unsubscribe(IssueArg),

    /// Push the issue branch
    Push,

    /// Pull the issue branch
    Pull(PullArgs),

    /// Resolve conflicts left by a pull
    Merge,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// A few words to identify the issue
    #[arg(short, long)]
    pub summary: String,

    /// A more detailed description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Person to assign (`Name <email>` or `email`)
    #[arg(short, long)]
    pub assignee: Option<String>,

    /// Reporter (defaults to you)
    #[arg(short, long)]
    pub reporter: Option<String>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Issue id (`ISSUE-3` or `3`)
    pub id: String,

    #[arg(short, long)]
    pub summary: Option<String>,

    #[arg(short, long)]
    pub description: Option<String>,

    #[arg(short, long)]
    pub assignee: Option<String>,

    #[arg(short, long)]
    pub reporter: Option<String>,

    /// open, in_progress or closed
    #[arg(long)]
    pub status: Option<Status>,
}

#[derive(Args, Debug)]
pub struct CommentArgs {
    /// Issue id
    pub id: String,

    /// Comment text
    #[arg(short, long)]
    pub comment: String,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Issue id
    pub id: String,

    /// Include comments
    #[arg(long)]
    pub comments: bool,

    /// Maximum comments to show
    #[arg(long, default_value_t = 10)]
    pub comment_limit: usize,

    /// Comments to skip
    #[arg(long, default_value_t = 0)]
    pub comment_offset: usize,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Issues per page
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// Only issues with this status
    #[arg(long)]
    pub status: Option<Status>,
}

#[derive(Args, Debug)]
pub struct IssueArg {
    /// Issue id
    pub id: String,
}

#[derive(Args, Debug)]
pub struct PullArgs {
    /// Resolve conflicts automatically if the pull stops on them
    #[arg(long)]
    pub with_merge: bool,
}

impl Cli {
    fn config_flags(&self) -> PartialConfig {
        PartialConfig {
            branch: self.branch.clone(),
            worktree_dir: self.worktree.clone(),
            remote: self.remote.clone(),
            prefix: self.prefix.clone(),
            ..PartialConfig::default()
        }
    }
}

/// Divergence policy for `--prefer`; prompts when unset.
fn policy(prefer: Option<Prefer>) -> crate::Result<Box<dyn ResolutionPolicy>> {
    Ok(match prefer {
        Some(Prefer::Current) => Box::new(PreferCurrent),
        Some(Prefer::Incoming) => Box::new(PreferIncoming),
        None => Box::new(InteractivePolicy::terminal()?),
    })
}

/// Run the CLI.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet, None)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    let flags = cli.config_flags();
    let (json, prefer) = (cli.json, cli.prefer);
    let command = match cli.command {
        Commands::Completions { shell } => {
            commands::completions::execute(shell);
            return Ok(());
        }
        Commands::Issue(command) => command,
    };

    let start = match cli.directory {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let workspace = Workspace::discover(&start, flags)?;
    let confirm: Box<dyn Confirm> = if cli.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(TerminalPrompt)
    };
    let manager = BranchManager::new(&workspace, confirm.as_ref());

    match command {
        IssueCommand::Create(args) => commands::create::execute(args, &manager, json)?,
        IssueCommand::Edit(args) => commands::edit::execute(args, &manager, json)?,
        IssueCommand::Comment(args) => commands::comment::execute(args, &manager, json)?,
        IssueCommand::Show(args) => commands::show::execute(&args, &manager, json)?,
        IssueCommand::List(args) => commands::list::execute(&args, &manager, json)?,
        IssueCommand::Open(arg) => commands::status::execute(&arg.id, Status::Open, &manager, json)?,
        IssueCommand::Close(arg) => {
            commands::status::execute(&arg.id, Status::Closed, &manager, json)?;
        }
        IssueCommand::Active(arg) => {
            commands::status::execute(&arg.id, Status::InProgress, &manager, json)?;
        }
        IssueCommand::Subscribe(arg) => commands::subscribe::execute(&arg.id, true, &manager, json)?,
        IssueCommand::Unsubscribe(arg) => {
            commands::subscribe::execute(&arg.id, false, &manager, json)?;
        }
        IssueCommand::Push => commands::sync::push(Synchronizer::new(manager), json)?,
        IssueCommand::Pull(args) => {
            commands::sync::pull(Synchronizer::new(manager), args.with_merge, policy(prefer)?, json)?;
        }
        IssueCommand::Merge => {
            commands::sync::merge(Synchronizer::new(manager), policy(prefer)?, json)?;
        }
    }

    Ok(())
}
