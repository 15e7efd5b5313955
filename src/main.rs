use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use modman::commands::{self, Config};
use modman::http::HttpClient;
use modman::minecraft::VersionCatalog;
use modman::runtime::RealRuntime;
use modman::source::SourceRegistry;

/// modman - Fabric Minecraft server mod manager
///
/// Installs, updates and migrates mods from Modrinth and Forgejo,
/// following mod dependencies automatically.
///
/// If the FORGEJO_API_KEY environment variable is set, mods hosted on
/// the Forgejo package registry are searched as well.
///
/// Examples:
///   modman install lithium       # Install a mod by name or id
///   modman migrate 1.20.4        # Move every mod to a new game version
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Server root directory (defaults to the current directory; also via MODMAN_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "MODMAN_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub server_root: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Set up the mod manager in a Fabric server directory
    Init,

    /// Install one or more mods, following their dependencies
    Install(InstallArgs),

    /// Uninstall mods, removing dependencies nothing else needs
    Uninstall(UninstallArgs),

    /// Update every installed mod to its latest version
    Update,

    /// Toggle the essential flag on mods and their dependencies
    Essential(EssentialArgs),

    /// List the installed mods
    List,

    /// Move every installed mod to another Minecraft version
    Migrate(MigrateArgs),

    /// Check whether a migration would succeed, without changing anything
    MigratePossible(MigratePossibleArgs),
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Mod names or ids
    #[arg(value_name = "MOD", required = true)]
    pub mods: Vec<String>,

    /// Mark the mods (and their dependencies) as essential
    #[arg(long)]
    pub essential: bool,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct UninstallArgs {
    /// Names or ids of installed mods
    #[arg(value_name = "MOD", required = true)]
    pub mods: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct EssentialArgs {
    /// Names or ids of installed mods
    #[arg(value_name = "MOD", required = true)]
    pub mods: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct MigrateArgs {
    /// Target Minecraft version (prompted for when omitted)
    #[arg(value_name = "VERSION")]
    pub version: Option<String>,

    /// Only require essential mods to be available on the target
    #[arg(long, short = 'f')]
    pub force: bool,
}

#[derive(clap::Args, Debug)]
pub struct MigratePossibleArgs {
    /// Target Minecraft version
    #[arg(value_name = "VERSION")]
    pub version: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = RealRuntime;

    let client = reqwest::Client::builder()
        .user_agent(concat!("modman-cli/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let http = HttpClient::new(client);
    let catalog = VersionCatalog::new(http.clone());

    let config = Config::new(&runtime, cli.server_root)?;
    if !matches!(cli.command, Commands::Init) {
        config.ensure_initialised(&runtime)?;
    }

    match cli.command {
        Commands::Init => {
            commands::init::init(&runtime, &catalog, &config).await?;
        }
        Commands::Install(args) => {
            let registry = SourceRegistry::from_env(&runtime, &http);
            for token in &args.mods {
                commands::install::install(
                    &runtime,
                    &http,
                    &registry,
                    &config,
                    token,
                    args.essential,
                    args.yes,
                )
                .await?;
            }
        }
        Commands::Uninstall(args) => {
            for token in &args.mods {
                commands::uninstall::uninstall(&runtime, &config, token)?;
            }
        }
        Commands::Update => {
            let registry = SourceRegistry::from_env(&runtime, &http);
            commands::update::update(&runtime, &http, &registry, &config).await?;
        }
        Commands::Essential(args) => {
            for token in &args.mods {
                commands::essential::toggle_essential(&runtime, &config, token)?;
            }
        }
        Commands::List => {
            commands::list::list(&runtime, &config)?;
        }
        Commands::Migrate(args) => {
            let registry = SourceRegistry::from_env(&runtime, &http);
            let version = match args.version {
                Some(version) => version,
                None => {
                    modman::minecraft::ask_version(
                        &runtime,
                        &catalog,
                        "Which Minecraft version do you want to migrate to?",
                    )
                    .await?
                }
            };
            commands::migrate::migrate(
                &runtime, &http, &registry, &catalog, &config, &version, args.force,
            )
            .await?;
        }
        Commands::MigratePossible(args) => {
            let registry = SourceRegistry::from_env(&runtime, &http);
            let possible = commands::migrate::is_migrate_possible(
                &runtime,
                &registry,
                &catalog,
                &config,
                &args.version,
                false,
            )
            .await?;
            if possible {
                println!("Migration to Minecraft {} is possible", args.version);
            } else {
                println!("Migration to Minecraft {} is NOT possible", args.version);
            }
        }
    }
    Ok(())
}
