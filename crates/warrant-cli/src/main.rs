//! `warrant`: command-line access to a justification graph store.
//!
//! Reads `warrant.toml` (or the path given with `--config`) and `WARRANT_*`
//! environment variables, opens the SQLite store, runs one command and prints
//! its result as JSON.
//!
//! # Usage
//!
//! ```
//! warrant resolve justification proposal.json
//! warrant search propositions "tallest man"
//! warrant main-search "federalist"
//! warrant justifications proposition 0190c1d2-...
//! warrant vote justification 0190c1d2-... positive
//! ```

use std::{
  io::Read as _,
  path::{Path, PathBuf},
  str::FromStr,
};

use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use warrant_core::{
  Proposed, Resolver,
  justification::{JustificationRootTarget, JustificationRootTargetType},
  vote::{NewVote, VotePolarity, VoteTargetType},
};
use warrant_store_sqlite::{SearchTable, SqliteStore};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Read and write a justification graph")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "warrant.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Read or create the entity described by a JSON file, or `{"id": ...}`
  /// to read a stored one. `-` or no path reads stdin.
  Resolve {
    #[arg(value_enum)]
    kind: ProposalKind,
    path: Option<PathBuf>,
  },

  /// Search one entity table, best matches first.
  Search {
    #[arg(value_parser = SearchTable::from_str)]
    table: SearchTable,
    text:  String,
  },

  /// Search propositions, writs, writ quotes and writ quote URLs at once.
  MainSearch { text: String },

  /// Print the justification tree of a proposition or statement.
  Justifications {
    #[arg(value_parser = discriminant::<JustificationRootTargetType>)]
    root_type: JustificationRootTargetType,
    id:        Uuid,
  },

  /// Media excerpts located at an equivalent URL.
  MatchUrl { url: String },

  /// Media excerpts located anywhere on a domain or its subdomains.
  MatchDomain { domain: String },

  /// Record the configured user's vote.
  Vote {
    #[arg(value_parser = discriminant::<VoteTargetType>)]
    target_type: VoteTargetType,
    target_id:   Uuid,
    #[arg(value_parser = discriminant::<VotePolarity>)]
    polarity:    VotePolarity,
  },

  /// Soft-delete a justification and its counter-justifications.
  DeleteJustification { id: Uuid },
}

/// Parse `counter-justification`-style input into a `SCREAMING_SNAKE_CASE`
/// discriminant.
fn discriminant<T: FromStr>(s: &str) -> Result<T, String> {
  s.trim()
    .to_ascii_uppercase()
    .replace('-', "_")
    .parse()
    .map_err(|_| format!("unrecognised value `{s}`"))
}

// ─── Config ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CliConfig {
  #[serde(default = "default_store_path")]
  store_path: PathBuf,
  /// Creator of new entities and owner of votes.
  #[serde(default)]
  user_id:    Option<Uuid>,
}

fn default_store_path() -> PathBuf { PathBuf::from("warrant.db") }

impl CliConfig {
  fn user_id(&self) -> anyhow::Result<Uuid> {
    self
      .user_id
      .context("this command writes; set `user_id` in the config or WARRANT_USER_ID")
  }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ProposalKind {
  Proposition,
  Persorg,
  Statement,
  WritQuote,
  Justification,
  MediaExcerpt,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("WARRANT"))
    .build()
    .context("failed to read config file")?;
  let cfg: CliConfig = settings
    .try_deserialize()
    .context("failed to deserialise CliConfig")?;

  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let resolver = Resolver::new(store);

  run(&resolver, &cfg, cli.command).await
}

async fn run(resolver: &Resolver<SqliteStore>, cfg: &CliConfig, command: Command) -> anyhow::Result<()> {
  let now = Utc::now();
  match command {
    Command::Resolve { kind, path } => {
      let input = read_input(path.as_deref())?;
      let user = cfg.user_id()?;
      match kind {
        ProposalKind::Proposition => {
          let p = parse_proposal(&input)?;
          print(&resolver.read_or_create_proposition(p, user, now).await?)
        }
        ProposalKind::Persorg => {
          let p = parse_proposal(&input)?;
          print(&resolver.read_or_create_persorg(p, user, now).await?)
        }
        ProposalKind::Statement => {
          let p = parse_proposal(&input)?;
          print(&resolver.read_or_create_statement(p, user, now).await?)
        }
        ProposalKind::WritQuote => {
          let p = parse_proposal(&input)?;
          print(&resolver.read_or_create_writ_quote(p, user, now).await?)
        }
        ProposalKind::Justification => {
          let p = parse_proposal(&input)?;
          print(&resolver.read_or_create_justification(p, user, now).await?)
        }
        ProposalKind::MediaExcerpt => {
          let p = parse_proposal(&input)?;
          print(&resolver.read_or_create_media_excerpt(p, user, now).await?)
        }
      }
    }
    Command::Search { table, text } => match table {
      SearchTable::Propositions => print(&resolver.search_propositions(&text).await?),
      SearchTable::MediaExcerpts => print(&resolver.search_media_excerpts(&text).await?),
      SearchTable::Sources => print(&resolver.search_sources(&text).await?),
      SearchTable::Persorgs => print(&resolver.search_persorgs(&text).await?),
      SearchTable::Writs => print(&resolver.search_writs(&text).await?),
      SearchTable::WritQuotes => print(&resolver.search_writ_quotes(&text).await?),
    },
    Command::MainSearch { text } => print(&resolver.main_search(&text).await?),
    Command::Justifications { root_type, id } => {
      let root = JustificationRootTarget::from_parts(root_type, id);
      print(
        &resolver
          .read_justifications_for_root_target(root, cfg.user_id)
          .await?,
      )
    }
    Command::MatchUrl { url } => print(&resolver.read_media_excerpts_matching_url(&url).await?),
    Command::MatchDomain { domain } => {
      print(&resolver.read_media_excerpts_matching_domain(&domain).await?)
    }
    Command::Vote { target_type, target_id, polarity } => {
      let vote = NewVote { target_type, target_id, polarity };
      print(&resolver.record_vote(cfg.user_id()?, vote, now).await?)
    }
    Command::DeleteJustification { id } => {
      print(&resolver.delete_justification(id, now).await?)
    }
  }
}

fn parse_proposal<T: DeserializeOwned>(input: &str) -> anyhow::Result<Proposed<T>> {
  serde_json::from_str(input).context("failed to parse proposal")
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

/// Read a file, or stdin for `None` and `-`.
fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
  match path {
    Some(p) if p != Path::new("-") => std::fs::read_to_string(p)
      .with_context(|| format!("reading {}", p.display())),
    _ => {
      let mut buf = String::new();
      std::io::stdin()
        .read_to_string(&mut buf)
        .context("reading stdin")?;
      Ok(buf)
    }
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
