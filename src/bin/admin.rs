//! Membership administration panel
//!
//! Command-line front end for the administration panel pages:
//! - Log in and out of the identity provider
//! - Browse, add and edit members through the data API
//! - Call the membership API (status, stats, notes, removal, workplaces, raw requests)

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use membership::app::App;
use membership::config::{generate_default_config, Config};
use membership::logging;
use membership::model::{
    Address, Language, MemberFilter, MemberOverview, NewOccupation, NewWorkplace,
};
use membership::panels::{
    optional_text, parse_date, MemberDetailPage, MembersTable, NewMemberForm, Submission,
    WelcomePage,
};
use membership::ApiAdapter;

#[derive(Parser)]
#[command(name = "membership-admin")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Administration panel for union member records")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (TOML, or a panel config.json)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in through the browser
    Login,

    /// End the stored session
    Logout,

    /// Show the welcome page for the signed-in user
    Whoami,

    /// Show membership API status
    Status,

    /// Show member counts
    Stats,

    /// Show the token claims the membership API sees
    Session,

    /// GET a membership API path and print the response
    Raw {
        /// Path relative to the API URL, e.g. members/current
        path: String,
    },

    /// Member records
    Members {
        #[command(subcommand)]
        command: MembersCommand,
    },

    /// Workplaces (membership API)
    Workplaces {
        #[command(subcommand)]
        command: WorkplacesCommand,
    },

    /// Print or write a default config file
    Config {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum MembersCommand {
    /// List members
    List {
        /// Ask the membership API instead (all, current, past, new)
        #[arg(long)]
        filter: Option<MemberFilter>,
        /// Rows per page (100, 50, 25)
        #[arg(long, default_value = "100")]
        page_size: usize,
        /// Page to show, starting at 1
        #[arg(long, default_value = "1")]
        page: usize,
    },

    /// Show one member with address and occupations
    Show {
        member_number: i64,
    },

    /// Add a member, and optionally their occupation
    Add {
        /// Left out, the database picks the next number
        #[arg(long)]
        member_number: Option<String>,
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        date_of_birth: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        postal_code: Option<String>,
        /// cs or en
        #[arg(long, default_value = "cs")]
        language: String,
        #[arg(long)]
        phone_number: Option<String>,
        #[arg(long)]
        company_name: Option<String>,
        #[arg(long)]
        position: Option<String>,
    },

    /// Edit personal fields; an empty value clears the field
    Update {
        member_number: i64,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        date_of_birth: Option<String>,
        #[arg(long)]
        phone_number: Option<String>,
        #[arg(long)]
        language: Option<Language>,
    },

    /// Edit the postal address
    Address {
        member_number: i64,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        postal_code: Option<String>,
    },

    /// Set the member's occupation
    Occupation {
        member_number: i64,
        #[arg(long)]
        company_name: Option<String>,
        #[arg(long)]
        position: Option<String>,
    },

    /// Set or clear the internal note (membership API)
    Note {
        member_number: i64,
        /// Left out, the note is cleared
        text: Option<String>,
    },

    /// Mark a member as having left (membership API)
    Remove {
        member_number: i64,
    },
}

#[derive(Subcommand)]
pub enum WorkplacesCommand {
    /// List workplaces
    List,

    /// Create a workplace
    Add {
        name: String,
        #[arg(long)]
        email: String,
    },

    /// List members of a workplace
    Members {
        workplace_id: Uuid,
    },

    /// Assign a member to a workplace
    Assign {
        workplace_id: Uuid,
        member_number: i64,
    },

    /// Remove a member from a workplace
    Unassign {
        workplace_id: Uuid,
        member_number: i64,
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

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Config { output } = &cli.command {
        return write_default_config(output.as_ref());
    }

    let config = Config::resolve(cli.config.as_deref()).context("Failed to load configuration")?;
    logging::init(&config.logging, "membership=warn");
    let app = App::new(config)?;
    let json = cli.format == "json";

    match cli.command {
        Commands::Login => {
            app.login().await?;
            println!("Logged in");
        }

        Commands::Logout => {
            if app.logout().await? {
                println!("Logged out");
            } else {
                println!("Not logged in");
            }
        }

        Commands::Whoami => {
            let token = app.token(true).await?;
            let mut page = WelcomePage::new(app.account_url());
            page.load(app.provider(), token.as_ref()).await?;
            match page.user_info() {
                Some(info) if json => print_json(info)?,
                _ => println!("{}", page.render()),
            }
        }

        Commands::Status => {
            let api = app.api(app.optional_token().await?)?;
            let status = api.status().await?;
            if json {
                print_json(&status)?;
            } else {
                println!("Membership API: {}", api.base_url());
                println!("{}", "-".repeat(60));
                println!("Status:        {} {}", status.http_status, status.http_message);
                println!("Authorization: {}", connected(status.authorization_connected));
                println!("Database:      {}", connected(status.database_connected));
            }
        }

        Commands::Stats => {
            let api = app.api(app.token(true).await?)?;
            let stats = api.members_stats().await?;
            if json {
                print_json(&stats)?;
            } else {
                println!("{:<10} {}", "New", stats.new);
                println!("{:<10} {}", "Current", stats.current);
                println!("{:<10} {}", "Past", stats.past);
            }
        }

        Commands::Session => {
            let api = app.api(app.token(true).await?)?;
            print_json(&api.current_session().await?)?;
        }

        Commands::Raw { path } => {
            let api = app.api(app.optional_token().await?)?;
            let response = api.get(&path).await?;
            let status = response.status();
            let body = response.text().await.context("Failed to read response body")?;
            println!("{}", status);
            println!("{}", body);
        }

        Commands::Members { command } => run_members(&app, command, json).await?,

        Commands::Workplaces { command } => run_workplaces(&app, command, json).await?,

        Commands::Config { output } => write_default_config(output.as_ref())?,
    }

    Ok(())
}

async fn run_members(app: &App, command: MembersCommand, json: bool) -> anyhow::Result<()> {
    let token = app.token(true).await?;

    match command {
        MembersCommand::List {
            filter: Some(filter),
            ..
        } => {
            let members = app.api(token)?.list_members(filter).await?;
            if json {
                print_json(&members)?;
            } else {
                print_overview(&members);
            }
        }

        MembersCommand::List {
            filter: None,
            page_size,
            page,
        } => {
            let client = app.data_api(token)?;
            let mut table = MembersTable::new();
            if !table.set_page_size(page_size) {
                bail!("Unsupported page size {} (use 100, 50 or 25)", page_size);
            }
            table.load(&client).await?;
            table.set_page(page.saturating_sub(1));
            if json {
                print_json(table.current_page())?;
            } else {
                println!("{}", table.render());
            }
        }

        MembersCommand::Show { member_number } => {
            let client = app.data_api(token)?;
            let mut page = MemberDetailPage::new(member_number);
            page.load(&client).await?;
            match page.member() {
                Some(member) if json => print_json(&serde_json::json!({
                    "member": member,
                    "occupations": page.occupations(),
                }))?,
                _ => println!("{}", page.render()),
            }
        }

        MembersCommand::Add {
            member_number,
            email,
            first_name,
            last_name,
            date_of_birth,
            address,
            city,
            postal_code,
            language,
            phone_number,
            company_name,
            position,
        } => {
            let mut form = NewMemberForm::new();
            form.set_member_number(member_number.as_deref().unwrap_or_default())?;
            form.set_email(&email);
            form.set_first_name(first_name.as_deref().unwrap_or_default());
            form.set_last_name(last_name.as_deref().unwrap_or_default());
            form.set_date_of_birth(date_of_birth.as_deref().unwrap_or_default())?;
            form.set_address(address.as_deref().unwrap_or_default());
            form.set_city(city.as_deref().unwrap_or_default());
            form.set_postal_code(postal_code.as_deref().unwrap_or_default());
            form.set_language(&language)?;
            form.set_phone_number(phone_number.as_deref().unwrap_or_default());
            form.set_company_name(company_name.as_deref().unwrap_or_default());
            form.set_position(position.as_deref().unwrap_or_default());

            let client = app.data_api(token)?;
            let Submission::Done(saved) = form.save(&client).await? else {
                bail!("Another save is still running");
            };
            if json {
                print_json(&serde_json::json!({
                    "id": saved.id,
                    "member": saved.member,
                    "occupation": saved.occupation,
                }))?;
            } else {
                println!("Saved member {}", saved.id);
                if saved.occupation.is_some() {
                    println!("Saved occupation");
                }
            }
        }

        MembersCommand::Update {
            member_number,
            email,
            first_name,
            last_name,
            date_of_birth,
            phone_number,
            language,
        } => {
            let client = app.data_api(token)?;
            let mut page = MemberDetailPage::new(member_number);
            page.load(&client).await?;
            let mut member = page.member().cloned().context("Member not loaded")?;

            if let Some(value) = email {
                member.email = optional_text(&value);
            }
            if let Some(value) = first_name {
                member.first_name = optional_text(&value);
            }
            if let Some(value) = last_name {
                member.last_name = optional_text(&value);
            }
            if let Some(value) = date_of_birth {
                member.date_of_birth = parse_date(&value)?;
            }
            if let Some(value) = phone_number {
                member.phone_number = optional_text(&value);
            }
            if let Some(value) = language {
                member.language = value;
            }

            expect_done(page.update_member(&client, member).await?)?;
            println!("{}", page.render());
        }

        MembersCommand::Address {
            member_number,
            address,
            city,
            postal_code,
        } => {
            let client = app.data_api(token)?;
            let mut page = MemberDetailPage::new(member_number);
            page.load(&client).await?;
            let current = page.member().map(|m| m.address()).unwrap_or_default();

            let updated = Address {
                address: address.map(|v| optional_text(&v)).unwrap_or(current.address),
                city: city.map(|v| optional_text(&v)).unwrap_or(current.city),
                postal_code: postal_code.map(|v| optional_text(&v)).unwrap_or(current.postal_code),
            };
            expect_done(page.update_address(&client, updated).await?)?;
            println!("{}", page.render());
        }

        MembersCommand::Occupation {
            member_number,
            company_name,
            position,
        } => {
            let client = app.data_api(token)?;
            let mut page = MemberDetailPage::new(member_number);
            page.load(&client).await?;

            let occupation = NewOccupation {
                company_name: company_name.as_deref().and_then(optional_text),
                position: position.as_deref().and_then(optional_text),
                member_id: None,
            };
            expect_done(page.update_occupation(&client, occupation).await?)?;
            println!("{}", page.render());
        }

        MembersCommand::Note {
            member_number,
            text: note,
        } => {
            let api = app.api(token)?;
            let id = member_id(&api, member_number).await?;
            let member = api.update_note(id, note.as_deref().and_then(optional_text)).await?;
            if json {
                print_json(&member)?;
            } else {
                println!("Note of member {}: {}", member_number, member.note.unwrap_or_default());
            }
        }

        MembersCommand::Remove { member_number } => {
            let api = app.api(token)?;
            let id = member_id(&api, member_number).await?;
            let member = api.remove_member(id).await?;
            if json {
                print_json(&member)?;
            } else {
                println!(
                    "Member {} left at {}",
                    member_number,
                    member.left_at.map(|t| t.to_rfc3339()).unwrap_or_default()
                );
            }
        }
    }

    Ok(())
}

async fn run_workplaces(app: &App, command: WorkplacesCommand, json: bool) -> anyhow::Result<()> {
    let api = app.api(app.token(true).await?)?;

    match command {
        WorkplacesCommand::List => {
            let workplaces = api.list_workplaces().await?;
            if json {
                print_json(&workplaces)?;
            } else {
                println!("{:<38} {:<30} {}", "Id", "Name", "Email");
                println!("{}", "-".repeat(100));
                for workplace in &workplaces {
                    println!("{:<38} {:<30} {}", workplace.id, workplace.name, workplace.email);
                }
            }
        }

        WorkplacesCommand::Add { name, email } => {
            let workplace = NewWorkplace {
                name: optional_text(&name),
                email: optional_text(&email),
            };
            workplace.validate()?;
            let created = api.create_workplace(&workplace).await?;
            if json {
                print_json(&created)?;
            } else {
                println!("Created workplace {}", created.id);
            }
        }

        WorkplacesCommand::Members { workplace_id } => {
            let members = api.workplace_members(workplace_id).await?;
            if json {
                print_json(&members)?;
            } else {
                print_overview(&members);
            }
        }

        WorkplacesCommand::Assign {
            workplace_id,
            member_number,
        } => {
            let id = member_id(&api, member_number).await?;
            api.assign_to_workplace(workplace_id, id).await?;
            println!("Assigned member {} to workplace {}", member_number, workplace_id);
        }

        WorkplacesCommand::Unassign {
            workplace_id,
            member_number,
        } => {
            let id = member_id(&api, member_number).await?;
            api.remove_from_workplace(workplace_id, id).await?;
            println!("Removed member {} from workplace {}", member_number, workplace_id);
        }
    }

    Ok(())
}

/// Membership API id of a member number
async fn member_id(api: &ApiAdapter, member_number: i64) -> anyhow::Result<Uuid> {
    api.list_members(MemberFilter::All)
        .await?
        .into_iter()
        .find(|m| m.member_number == member_number)
        .map(|m| m.id)
        .with_context(|| format!("Member number {} not found", member_number))
}

fn print_overview(members: &[MemberOverview]) {
    println!(
        "{:<8} {:<24} {:<30} {:<20} {}",
        "Number", "Name", "Email", "City", "Companies"
    );
    println!("{}", "-".repeat(100));
    for member in members {
        let name = [member.first_name.as_deref(), member.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let companies = member
            .company_names
            .iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let left = if member.left_at.is_some() { " (left)" } else { "" };
        println!(
            "{:<8} {:<24} {:<30} {:<20} {}{}",
            member.member_number,
            name,
            member.email.as_deref().unwrap_or_default(),
            member.city.as_deref().unwrap_or_default(),
            companies,
            left
        );
    }
    println!("\nTotal: {} members", members.len());
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_default_config(output: Option<&PathBuf>) -> anyhow::Result<()> {
    let content = generate_default_config();
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {:?}", path))?;
            println!("Config written to {:?}", path);
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn expect_done<T>(submission: Submission<T>) -> anyhow::Result<T> {
    match submission {
        Submission::Done(value) => Ok(value),
        Submission::Busy => bail!("Another save is still running"),
    }
}

fn connected(ok: bool) -> &'static str {
    if ok {
        "connected"
    } else {
        "not connected"
    }
}
