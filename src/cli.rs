use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use quotevault::ScorerKind;

#[derive(Debug, Parser)]
#[command(
    name = "quotevault",
    about = "Archive screenshots and clips, find them again by their text"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a file to the archive
    Ingest(IngestArgs),
    /// Retrieve an item by id
    Get(GetArgs),
    /// Retrieve a random item
    Random(RandomArgs),
    /// Retrieve an item by id, or a random one if it does not exist
    Quote(QuoteArgs),
    /// Fuzzy search over recognized text
    Search(SearchArgs),
    /// List every item id
    List(ListArgs),
    /// Show archive status
    Status(StatusArgs),
    /// Rescan the store and index anything that is missing
    Recover,
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Ingest --

#[derive(Debug, Parser)]
pub struct IngestArgs {
    /// File to add
    pub file: PathBuf,

    /// Media type, when the file name has no usable extension
    #[arg(long)]
    pub ext: Option<String>,
}

// -- Get --

#[derive(Debug, Parser)]
pub struct GetArgs {
    /// Item id, e.g. 12 or #12
    pub id: String,

    /// Output metadata and text as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the item's bytes to this path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

// -- Random --

#[derive(Debug, Parser)]
pub struct RandomArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Quote --

#[derive(Debug, Parser)]
pub struct QuoteArgs {
    /// Item id; omitted or unknown ids pick a random item
    pub id: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// The search query
    pub query: String,

    /// Maximum number of distinct texts to return
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Minimum similarity score, 0.0 to 1.0
    #[arg(long)]
    pub min_score: Option<f32>,

    /// Similarity scorer: token-sort or partial
    #[arg(long, value_parser = parse_scorer)]
    pub scorer: Option<ScorerKind>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_scorer(s: &str) -> Result<ScorerKind, String> {
    s.parse().map_err(|e: quotevault::Error| e.to_string())
}

// -- List --

#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Output as JSON array
    #[arg(long)]
    pub json: bool,
}

// -- Status --

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "quotevault",
            &mut std::io::stdout(),
        );
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_search_defaults() {
        let cli = Cli::parse_from(["quotevault", "search", "hello"]);
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.query, "hello");
                assert_eq!(args.count, None);
                assert_eq!(args.min_score, None);
                assert_eq!(args.scorer, None);
                assert!(!args.json);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn parse_search_scorer() {
        let cli = Cli::parse_from([
            "quotevault",
            "search",
            "hi",
            "--scorer",
            "partial",
            "-n",
            "3",
        ]);
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.scorer, Some(ScorerKind::Partial));
                assert_eq!(args.count, Some(3));
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn parse_quote_without_id() {
        let cli = Cli::parse_from(["quotevault", "-q", "quote"]);
        assert!(cli.quiet);
        match cli.command {
            Command::Quote(args) => assert_eq!(args.id, None),
            _ => panic!("expected quote command"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::parse_from(["quotevault", "list", "-vv", "--data-dir", "/tmp/q"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/q")));
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
