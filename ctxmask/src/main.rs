//! Prompt builder for query-engine configuration questions.
//!
//! This binary loads one configuration namespace, picks the rows relevant
//! to a few datasets or entities, and writes an LLM prompt in which every
//! business identifier is replaced by a stable mask. The saved mask
//! dictionary turns the model's reply back into real names.
//!
//! # Privacy Guarantees
//! - Masked prompts never contain registered identifiers
//! - Mask dictionaries are written only where asked and never logged
//! - Database access is read-only; connection strings are redacted

mod output;
mod versions;

use anyhow::{Context, bail};
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use ctxmask_core::{
    ConnectionConfig, ContextMasker, LiteralPolicy, MaskingConfig, NamespaceSource, PromptConfig,
    PromptSession, RenderConfig, create_source_with_config, error::redact_database_url,
    logging::init_logging,
};
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::info;
use versions::VersionStore;

#[derive(Parser)]
#[command(name = "ctxmask")]
#[command(about = "Build masked LLM prompts from configuration namespaces")]
#[command(version)]
#[command(long_about = "
ctxmask - context picking and reversible masking for LLM prompts

Loads one namespace of query-engine configuration, resolves everything a
set of datasets or entities depends on, and renders it as INSERT
statements with every business identifier masked (ENT_1, P_3, PARAM_2...).

SOURCES:
- PostgreSQL (postgres://...), read-only
- JSON dump file ({ \"table\": [row, ...] })

EXAMPLES:
  ctxmask --source snapshot.json namespaces
  ctxmask --source postgres://localhost/qe pick -n AN --dataset sales --masks masks.json
  ctxmask generate -n AN --entity Person --prompt-version v2 --query 'Average age?' --out run/
  ctxmask unmask --masks run/masks.json < reply.txt
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(flatten)]
    pub source: SourceArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all logging except errors")]
    pub quiet: bool,
}

#[derive(Args)]
pub struct SourceArgs {
    /// Row source location
    #[arg(
        long,
        global = true,
        env = "DATABASE_URL",
        help = "PostgreSQL URL or JSON dump path (credentials will be sanitized in logs)"
    )]
    pub source: Option<String>,

    /// JSON dump used when no --source is given
    #[arg(long, global = true, env = "CTXMASK_SNAPSHOT", hide_env_values = true)]
    pub snapshot: Option<PathBuf>,

    /// Configuration schema
    #[arg(long, global = true, default_value = "qe_config")]
    pub schema: String,

    /// Maximum pooled database connections
    #[arg(long, global = true, default_value_t = 5)]
    pub max_connections: u32,
}

#[derive(Subcommand)]
pub enum Command {
    /// List namespace ids
    Namespaces,
    /// Print the masked context for some seeds
    Pick(PickArgs),
    /// Write masked and original prompts
    Generate(GenerateArgs),
    /// Mask stdin with a saved dictionary
    Mask(DictionaryArgs),
    /// Unmask stdin with a saved dictionary
    Unmask(DictionaryArgs),
    /// Manage saved system prompts
    Versions {
        #[command(subcommand)]
        command: VersionsCommand,
    },
}

/// Treatment of unrecognised quoted literals in formulas
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LiteralMode {
    /// Leave them as written
    #[default]
    Preserve,
    /// Mask them as generic objects
    Mask,
}

impl From<LiteralMode> for LiteralPolicy {
    fn from(mode: LiteralMode) -> Self {
        match mode {
            LiteralMode::Preserve => LiteralPolicy::Preserve,
            LiteralMode::Mask => LiteralPolicy::MaskAsOther,
        }
    }
}

#[derive(Args)]
pub struct SeedArgs {
    /// Namespace to load
    #[arg(short, long)]
    pub namespace: String,

    /// Dataset ids to resolve from
    #[arg(long = "dataset", value_delimiter = ',')]
    pub datasets: Vec<String>,

    /// Entity types to resolve from
    #[arg(long = "entity", value_delimiter = ',')]
    pub entities: Vec<String>,

    /// Literal masking policy
    #[arg(long, value_enum, default_value_t = LiteralMode::Preserve)]
    pub literals: LiteralMode,

    /// Search path written in the script preamble
    #[arg(long, default_value = "qe_config")]
    pub search_path: String,
}

#[derive(Args)]
pub struct PickArgs {
    #[command(flatten)]
    pub seeds: SeedArgs,

    /// Where to write the mask dictionary
    #[arg(long)]
    pub masks: Option<PathBuf>,
}

#[derive(Args)]
#[command(group(ArgGroup::new("query_input").required(true).args(["query", "query_file"])))]
#[command(group(ArgGroup::new("system_input").args(["system_prompt", "prompt_version"])))]
pub struct GenerateArgs {
    #[command(flatten)]
    pub seeds: SeedArgs,

    /// User question
    #[arg(long)]
    pub query: Option<String>,

    /// File holding the user question
    #[arg(long)]
    pub query_file: Option<PathBuf>,

    /// System prompt text
    #[arg(long)]
    pub system_prompt: Option<String>,

    /// Saved system prompt version to use
    #[arg(long)]
    pub prompt_version: Option<String>,

    /// Output directory
    #[arg(long)]
    pub out: PathBuf,

    /// Token budget of the target model
    #[arg(long, default_value_t = 128_000)]
    pub max_tokens: usize,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args)]
pub struct DictionaryArgs {
    /// Mask dictionary written by pick or generate
    #[arg(long)]
    pub masks: PathBuf,
}

#[derive(Args)]
pub struct StoreArgs {
    /// Prompt versions file
    #[arg(long = "versions-file", env = "CTXMASK_VERSIONS", default_value = "prompt_versions.json")]
    pub versions_file: PathBuf,
}

#[derive(Subcommand)]
pub enum VersionsCommand {
    /// List saved versions
    List(StoreArgs),
    /// Print one version
    Show {
        name: String,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Save stdin (or --prompt) as a version
    Save {
        name: String,
        #[arg(long)]
        prompt: Option<String>,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Delete a version
    Delete {
        name: String,
        #[command(flatten)]
        store: StoreArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose, cli.global.quiet)?;

    match &cli.command {
        Command::Namespaces => list_namespaces(&cli.source).await,
        Command::Pick(args) => pick(&cli.source, args).await,
        Command::Generate(args) => generate(&cli.source, args).await,
        Command::Mask(args) => transform_stdin(args, true).await,
        Command::Unmask(args) => transform_stdin(args, false).await,
        Command::Versions { command } => versions(command).await,
    }
}

async fn open_source(args: &SourceArgs) -> anyhow::Result<Box<dyn NamespaceSource>> {
    let location = match (&args.source, &args.snapshot) {
        (Some(source), _) => source.clone(),
        (None, Some(snapshot)) => snapshot.display().to_string(),
        (None, None) => {
            bail!("No row source: pass --source or set DATABASE_URL / CTXMASK_SNAPSHOT")
        }
    };

    let config =
        ConnectionConfig::new(args.schema.clone()).with_max_connections(args.max_connections);
    let source = create_source_with_config(&location, config)
        .await
        .with_context(|| {
            format!(
                "Failed to open row source {}",
                redact_database_url_or_path(&location)
            )
        })?;
    info!("Using {}", source.describe());
    Ok(source)
}

fn redact_database_url_or_path(location: &str) -> String {
    if ctxmask_core::adapters::is_database_url(location) {
        redact_database_url(location)
    } else {
        location.to_string()
    }
}

async fn load_session(source: &SourceArgs, seeds: &SeedArgs) -> anyhow::Result<PromptSession> {
    let source = open_source(source).await?;
    let rows = source
        .fetch_namespace_context(&seeds.namespace)
        .await
        .with_context(|| format!("Failed to load namespace {}", seeds.namespace))?;

    let mut session = PromptSession::new()
        .with_masking(MaskingConfig::new().with_literal_policy(seeds.literals.into()))
        .with_render(RenderConfig::new().with_search_path(seeds.search_path.clone()));
    session.load_snapshot(rows);
    Ok(session)
}

async fn list_namespaces(source: &SourceArgs) -> anyhow::Result<()> {
    let source = open_source(source).await?;
    for namespace in source.list_namespaces().await? {
        println!("{}", namespace);
    }
    Ok(())
}

async fn pick(source: &SourceArgs, args: &PickArgs) -> anyhow::Result<()> {
    let mut session = load_session(source, &args.seeds).await?;
    let picked = session.pick_context(&args.seeds.datasets, &args.seeds.entities)?;

    if let Some(path) = &args.masks {
        output::save_masks(path, &picked.masks).await?;
        info!("Wrote {} masks to {}", picked.masks.len(), path.display());
    }
    print!("{}", picked.sql);
    Ok(())
}

async fn generate(source: &SourceArgs, args: &GenerateArgs) -> anyhow::Result<()> {
    let user_query = match (&args.query, &args.query_file) {
        (Some(query), _) => query.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read query from {}", path.display()))?,
        (None, None) => bail!("Either --query or --query-file is required"),
    };

    let system_prompt = match (&args.system_prompt, &args.prompt_version) {
        (Some(prompt), _) => prompt.clone(),
        (None, Some(name)) => VersionStore::new(&args.store.versions_file)
            .get(name)
            .await?
            .with_context(|| format!("No saved prompt version named '{}'", name))?
            .prompt,
        (None, None) => String::new(),
    };

    let mut session = load_session(source, &args.seeds)
        .await?
        .with_prompt(PromptConfig::default().with_max_tokens(args.max_tokens));
    let prompts = session.generate_final_prompts(
        &args.seeds.namespace,
        &args.seeds.datasets,
        &args.seeds.entities,
        &system_prompt,
        &user_query,
    )?;

    output::save_prompts(&args.out, &prompts).await?;
    println!("Prompts written to {}", args.out.display());
    println!("Masks: {}", prompts.masks.len());
    println!(
        "Estimated tokens: {}{}",
        prompts.token_count,
        if prompts.over_budget { " (over budget)" } else { "" }
    );
    Ok(())
}

async fn transform_stdin(args: &DictionaryArgs, mask: bool) -> anyhow::Result<()> {
    let entries = output::load_masks(&args.masks).await?;
    let masker = ContextMasker::restore(MaskingConfig::default(), entries);

    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read stdin")?;

    let result = if mask {
        masker.mask_text(&input)?
    } else {
        masker.unmask_text(&input)?
    };

    let mut stdout = tokio::io::stdout();
    stdout.write_all(result.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

async fn versions(command: &VersionsCommand) -> anyhow::Result<()> {
    match command {
        VersionsCommand::List(store) => {
            let versions = VersionStore::new(&store.versions_file).load().await?;
            for (name, version) in &versions {
                println!("{}\tcreated {}\tmodified {}", name, version.created, version.modified);
            }
        }
        VersionsCommand::Show { name, store } => {
            let version = VersionStore::new(&store.versions_file)
                .get(name)
                .await?
                .with_context(|| format!("No saved prompt version named '{}'", name))?;
            println!("{}", version.prompt);
        }
        VersionsCommand::Save { name, prompt, store } => {
            let prompt = match prompt {
                Some(prompt) => prompt.clone(),
                None => {
                    let mut input = String::new();
                    tokio::io::stdin()
                        .read_to_string(&mut input)
                        .await
                        .context("Failed to read prompt from stdin")?;
                    input
                }
            };
            let version = VersionStore::new(&store.versions_file)
                .save_version(name, &prompt)
                .await?;
            println!("Saved '{}' (modified {})", name, version.modified);
        }
        VersionsCommand::Delete { name, store } => {
            if VersionStore::new(&store.versions_file).delete_version(name).await? {
                println!("Deleted '{}'", name);
            } else {
                bail!("No saved prompt version named '{}'", name);
            }
        }
    }
    Ok(())
}
