use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use monarch_bridge::app::{
    App, DEFAULT_ASSOCIATION_LIMIT, DEFAULT_ASSOCIATION_OFFSET, DEFAULT_SEARCH_CATEGORY,
    DEFAULT_SEARCH_LIMIT, DEFAULT_SEARCH_OFFSET, DEFAULT_SIMILARITY_LIMIT,
};
use monarch_bridge::config::ConfigLoader;
use monarch_bridge::domain::{Direction, Identifier};
use monarch_bridge::error::BridgeError;
use monarch_bridge::output::JsonOutput;
use monarch_bridge::server;

#[derive(Parser)]
#[command(name = "monarch-bridge")]
#[command(about = "Simplified REST facade over the Monarch Initiative knowledge graph")]
#[command(version, author)]
struct Cli {
    /// JSON config file (defaults to ./monarch-bridge.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the HTTP API")]
    Serve(ServeArgs),
    #[command(about = "Search entities by free text")]
    Search(SearchArgs),
    #[command(about = "List associations in one direction, e.g. disease-genes MONDO:0009061")]
    Associations(AssociationArgs),
    #[command(about = "Describe one or more entities")]
    Entity(EntityArgs),
    #[command(about = "Rank entities by phenotype-profile similarity")]
    ProfileSearch(ProfileSearchArgs),
    #[command(about = "Resolve one publication id (PMID, ISBN, OMIM)")]
    Publication(PublicationArgs),
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long)]
    bind: Option<String>,
}

#[derive(Args)]
struct SearchArgs {
    term: String,

    #[arg(long, default_value = DEFAULT_SEARCH_CATEGORY)]
    category: String,

    #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
    limit: u32,

    #[arg(long, default_value_t = DEFAULT_SEARCH_OFFSET)]
    offset: u32,
}

#[derive(Args)]
struct AssociationArgs {
    #[arg(value_enum)]
    direction: Direction,

    id: Identifier,

    #[arg(long, default_value_t = DEFAULT_ASSOCIATION_LIMIT)]
    limit: u32,

    #[arg(long, default_value_t = DEFAULT_ASSOCIATION_OFFSET)]
    offset: u32,
}

#[derive(Args)]
struct EntityArgs {
    #[arg(required = true)]
    ids: Vec<Identifier>,
}

#[derive(Args)]
struct ProfileSearchArgs {
    #[arg(required = true)]
    ids: Vec<Identifier>,

    #[arg(long, default_value_t = DEFAULT_SIMILARITY_LIMIT)]
    limit: u32,
}

#[derive(Args)]
struct PublicationArgs {
    id: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(report) = run().await {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<BridgeError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &BridgeError) -> u8 {
    match error {
        BridgeError::InvalidIdentifier(_) | BridgeError::InvalidQuery(_) => 2,
        BridgeError::MonarchHttp(_)
        | BridgeError::MonarchStatus { .. }
        | BridgeError::SemsimHttp(_)
        | BridgeError::SemsimStatus { .. }
        | BridgeError::OpenLibraryHttp(_)
        | BridgeError::OpenLibraryStatus { .. }
        | BridgeError::PubmedHttp(_)
        | BridgeError::PubmedStatus { .. } => 3,
        _ => 1,
    }
}

async fn run() -> miette::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Commands::Serve(args) = &cli.command {
        if let Some(bind) = &args.bind {
            settings.bind = bind.clone();
        }
    }
    let app = App::from_settings(&settings)?;

    match cli.command {
        Commands::Serve(_) => server::serve(app, &settings).await?,
        Commands::Search(args) => {
            let result = app
                .search_entity(&args.term, &args.category, args.limit, args.offset)
                .await?;
            JsonOutput::print_search(&result).into_diagnostic()?;
        }
        Commands::Associations(args) => {
            let result = app
                .associations(args.direction, &args.id, args.limit, args.offset)
                .await?;
            JsonOutput::print_associations(&result).into_diagnostic()?;
        }
        Commands::Entity(args) => {
            let result = app.get_entities(&args.ids).await?;
            JsonOutput::print_entities(&result).into_diagnostic()?;
        }
        Commands::ProfileSearch(args) => {
            let result = app.search_phenotype_profiles(args.ids, args.limit).await?;
            JsonOutput::print_similarity(&result).into_diagnostic()?;
        }
        Commands::Publication(args) => {
            let record = app.publications().resolve(args.id.trim()).await;
            JsonOutput::print_publication(&record).into_diagnostic()?;
        }
    }
    Ok(())
}
