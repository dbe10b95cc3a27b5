//! Members panel
//!
//! Signed-in member's own view: who they are, where to edit their profile
//! and logout. The melon-head variant behaves the same but never searches
//! for configuration; it is handed a file explicitly.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use membership::app::App;
use membership::config::Config;
use membership::logging;
use membership::panels::{ProfilePage, WelcomePage};

#[derive(Parser)]
#[command(name = "membership-panel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Members panel: your membership profile")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (TOML, or a panel config.json)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Panel variant
    #[arg(long, value_enum, default_value_t = Variant::Members, global = true)]
    variant: Variant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Variant {
    Members,
    MelonHead,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in through the browser
    Login,

    /// End the stored session
    Logout,

    /// Greet the signed-in user
    Whoami,

    /// Show the profile page
    Profile {
        /// Open the account settings in the browser
        #[arg(long)]
        open: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    match (cli.variant, cli.config.as_deref()) {
        (Variant::MelonHead, None) => bail!("The melon-head panel needs --config"),
        (_, path) => Config::resolve(path).context("Failed to load configuration"),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    logging::init(&config.logging, "membership=warn");
    let app = App::new(config)?;
    tracing::debug!(variant = ?cli.variant, "Members panel");

    match cli.command {
        Commands::Login => {
            app.login().await?;
            println!("Logged in");
        }

        Commands::Logout => {
            let mut page = ProfilePage::new(app.account_url());
            if page.logout(app.provider(), app.token_store()).await? {
                println!("Logged out");
            } else {
                println!("Not logged in");
            }
        }

        Commands::Whoami => {
            let token = app.token(true).await?;
            let mut page = WelcomePage::new(app.account_url());
            page.load(app.provider(), token.as_ref()).await?;
            println!("{}", page.render());
        }

        Commands::Profile { open } => {
            let token = app.token(true).await?;
            let mut page = ProfilePage::new(app.account_url());
            page.load(app.provider(), token.as_ref()).await?;
            println!("{}", page.render());
            if open {
                page.open_settings();
            }
        }
    }

    Ok(())
}
