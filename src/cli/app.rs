//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::img::{self, ImgArgs};
use super::output::{Output, OutputFormat};
use super::{post, setup, sync_cmd};
use crate::storage::Workspace;

#[derive(Parser)]
#[command(name = "blog")]
#[command(author, version, about = "Manage markdown blog posts and sync them with the blog database")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Config file (default: ~/.config/blog/config.json)
    #[arg(long, global = true, env = "BLOG_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Blog directory (default: ~/blogs)
    #[arg(long, global = true, env = "BLOG_DIR", value_name = "DIR")]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new blog post
    New {
        /// Slug (or title) of the post
        slug: String,
    },

    /// Open a blog post in $EDITOR
    Edit {
        /// Slug of the post
        slug: String,
    },

    /// Delete a blog post (local file and database row)
    Rm {
        /// Slug of the post
        slug: String,
    },

    /// List all local blog posts
    #[command(visible_alias = "ls")]
    List,

    /// Compare local posts with the database
    #[command(visible_alias = "st")]
    Status,

    /// Push local posts to the database
    Push {
        /// Only push this post
        slug: Option<String>,

        /// Preview without making changes
        #[arg(long, short = 'n')]
        dry_run: bool,
    },

    /// Pull posts from the database
    Pull {
        /// Only pull this post
        slug: Option<String>,

        /// Overwrite existing files
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Open the blog folder in the file manager
    Open,

    /// Configure the database and Cloudinary
    Setup,

    /// Show the current configuration
    Config {
        /// Run the interactive setup instead
        #[arg(long)]
        setup: bool,
    },

    /// Upload an image to Cloudinary and copy its URL
    Img {
        /// Image file
        file: PathBuf,

        /// Resize width in pixels (e.g. 800)
        #[arg(long, short = 'w', value_name = "PX")]
        width: Option<u32>,

        /// Custom public ID
        #[arg(long, short = 'n')]
        name: Option<String>,

        /// Alt text for the markdown snippet
        #[arg(long, short = 'a')]
        alt: Option<String>,
    },
}

/// Main entry point for the CLI
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(cli.format, cli.verbose);

    let workspace = Workspace::resolve(cli.config, cli.dir)?;
    output.verbose_ctx(
        "workspace",
        &format!(
            "config={}, dir={}",
            workspace.config_path().display(),
            workspace.blog_dir().display()
        ),
    );

    match cli.command {
        Commands::New { slug } => post::new_post(&output, &workspace, &slug)?,
        Commands::Edit { slug } => post::edit(&output, &workspace, &slug)?,
        Commands::Rm { slug } => post::remove(&output, &workspace, &slug).await?,
        Commands::List => post::list(&output, &workspace)?,
        Commands::Open => post::open(&output, &workspace)?,

        Commands::Status => sync_cmd::status(&output, &workspace).await?,
        Commands::Push { slug, dry_run } => {
            sync_cmd::push(&output, &workspace, slug.as_deref(), dry_run).await?
        }
        Commands::Pull { slug, force } => {
            sync_cmd::pull(&output, &workspace, slug.as_deref(), force).await?
        }

        Commands::Setup | Commands::Config { setup: true } => {
            setup::run(&output, &workspace).await?
        }
        Commands::Config { setup: false } => setup::show(&output, &workspace)?,

        Commands::Img {
            file,
            width,
            name,
            alt,
        } => {
            let args = ImgArgs {
                file,
                width,
                name,
                alt,
            };
            img::upload(&output, &workspace, args).await?
        }
    }

    output.verbose_ctx("done", "Command completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn aliases_and_flags() {
        let cli = Cli::try_parse_from(["blog", "ls"]).unwrap();
        assert!(matches!(cli.command, Commands::List));

        let cli = Cli::try_parse_from(["blog", "pull", "hello", "-f"]).unwrap();
        assert!(matches!(cli.command, Commands::Pull { slug: Some(ref s), force: true } if s == "hello"));

        let cli = Cli::try_parse_from(["blog", "push", "-n", "--format", "json"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Push { slug: None, dry_run: true }));

        let cli = Cli::try_parse_from(["blog", "img", "a.png", "-w", "800", "-a", "Alt"]).unwrap();
        assert!(matches!(cli.command, Commands::Img { width: Some(800), .. }));
    }
}
