use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use cafe_client::App;
use cafe_client::admin::{UndoReport, UserDirectory};
use cafe_client::confirm::{AssumeYes, Confirm, Deletion};
use cafe_client::gateway::Upload;
use cafe_client::schedule::{Week, day_label};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use shared::config::load_config;
use shared::types::{LoginData, RegistrationData, Role, UserId, VoteKind};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "cafe")]
#[command(about = "Coffee-shop site client", long_about = None)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "cafe.toml")]
    config: String,

    /// Answer yes to every confirmation and skip the undo prompt
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the session
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "CAFE_PASSWORD")]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "CAFE_PASSWORD")]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show who is signed in
    Whoami,
    /// List users (creator only)
    Users {
        #[arg(short, long, default_value = "")]
        search: String,
    },
    /// Change a user's role (creator only)
    SetRole { id: String, role: Role },
    /// Set a user's reputation (creator only)
    SetReputation {
        id: String,
        #[arg(allow_hyphen_values = true)]
        reputation: i64,
    },
    /// Delete a user (creator only)
    DeleteUser { id: String },
    /// Vote on someone's reputation
    Vote { id: String, direction: Direction },
    /// List the menu
    Drinks {
        #[arg(short, long, default_value = "all")]
        category: String,
    },
    /// Replace your avatar with an image file
    Avatar { path: PathBuf },
    /// Remove your avatar
    DeleteAvatar,
    /// List news posts
    News,
    /// Show the shift schedule for the week containing a date
    Schedule {
        /// YYYY-MM-DD, defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    Up,
    Down,
}

impl From<Direction> for VoteKind {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Up => VoteKind::Up,
            Direction::Down => VoteKind::Down,
        }
    }
}

/// Yes/no on stdin.
struct Prompt;

impl Confirm for Prompt {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config))?;
    debug!("Loaded config: {:?}", config);

    let app = App::create(&config);
    let confirm: &dyn Confirm = if cli.yes { &AssumeYes } else { &Prompt };

    let result = run(&app, cli.command, confirm, cli.yes).await;
    app.dispose();
    result
}

async fn run(app: &App, command: Commands, confirm: &dyn Confirm, yes: bool) -> Result<()> {
    match command {
        Commands::Login { username, password } => {
            let user = app
                .auth()
                .login(&LoginData { username, password })
                .await
                .context("Login failed")?;
            println!("Signed in as {} ({})", user.username, user.role.title());
        }
        Commands::Register {
            username,
            email,
            password,
        } => {
            let form = RegistrationData {
                username,
                email,
                password,
            };
            match app.auth().register(&form).await.context("Registration failed")? {
                Some(user) => println!("Registered and signed in as {}", user.username),
                None => println!("Registered {}. Sign in to continue.", form.username),
            }
        }
        Commands::Logout => {
            app.auth().logout();
            println!("Signed out");
        }
        Commands::Whoami => match app.session().snapshot().user() {
            Some(user) => println!(
                "{} (id {}, {}, reputation {})",
                user.username,
                user.id,
                user.role.title(),
                user.reputation
            ),
            None => println!("Not signed in"),
        },
        Commands::Users { search } => {
            let users = app.user_directory().fetch(&search).await?;
            for u in users {
                println!("{:>6}  {:<20} {:<8} {:>5}", u.id, u.username, u.role, u.reputation);
            }
        }
        Commands::SetRole { id, role } => {
            let dir = loaded_directory(app).await?;
            let user = dir.set_role(&UserId::new(id), role).await?;
            println!("{} is now {}", user.username, user.role);
            offer_undo(&dir, yes).await?;
        }
        Commands::SetReputation { id, reputation } => {
            let dir = loaded_directory(app).await?;
            let user = dir.set_reputation(&UserId::new(id), reputation).await?;
            println!("{} now has reputation {}", user.username, user.reputation);
            offer_undo(&dir, yes).await?;
        }
        Commands::DeleteUser { id } => {
            let dir = loaded_directory(app).await?;
            match dir.delete_user(&UserId::new(id), confirm).await? {
                Deletion::Deleted => println!("Deleted"),
                Deletion::Declined => println!("Cancelled"),
            }
        }
        Commands::Vote { id, direction } => {
            let status = app
                .reputation()
                .vote(&UserId::new(id), direction.into())
                .await?;
            match (status.has_voted, status.vote_type) {
                (true, Some(kind)) => println!("Voted {}", kind),
                _ => println!("Vote withdrawn"),
            }
            if let Some(rep) = status.reputation {
                println!("Reputation: {}", rep);
            }
        }
        Commands::Drinks { category } => {
            let menu = app.menu();
            menu.load().await?;
            for d in menu.by_category(&category) {
                let price = d.price.map(|p| format!("{:.2}", p)).unwrap_or_else(|| "-".into());
                let rating = d.rating.map(|r| format!("{:.1}", r)).unwrap_or_else(|| "-".into());
                println!("{:>4}  {:<24} {:>8}  {}", d.id, d.name, price, rating);
            }
        }
        Commands::Avatar { path } => {
            let upload = Upload::from_path(&path)
                .with_context(|| format!("Could not read {}", path.display()))?;
            let user = app.profile().upload_avatar(upload).await?;
            if let Some(avatar) = user.avatar {
                println!("Avatar: {}", app.api().asset_url(&avatar));
            }
        }
        Commands::DeleteAvatar => match app.profile().delete_avatar(confirm).await? {
            Deletion::Deleted => println!("Avatar removed"),
            Deletion::Declined => println!("Cancelled"),
        },
        Commands::News => {
            for post in app.news().list().await? {
                println!(
                    "{:>4}  {:<40} {:>3} likes  {:>3} comments",
                    post.id, post.title, post.likes_count, post.comments_count
                );
            }
        }
        Commands::Schedule { date } => {
            let week = Week::containing(date.unwrap_or_else(|| Local::now().date_naive()));
            let table = app.schedule().fetch_week(week).await?;

            println!("Week {}", week.label());
            if table.is_empty() {
                println!("No shifts");
            }
            for employee in table.employees() {
                println!(
                    "{} ({}h)",
                    employee.username,
                    table.total_hours(&employee.id)
                );
                for day in week.days() {
                    for shift in table.shifts_for(&employee.id, day) {
                        println!(
                            "  {:<10} {}-{}",
                            day_label(day),
                            shift.start_time,
                            shift.end_time
                        );
                    }
                }
            }
        }
    }
    Ok(())
}

async fn loaded_directory(app: &App) -> Result<UserDirectory> {
    let dir = app.user_directory();
    dir.fetch("").await.context("Could not load users")?;
    Ok(dir)
}

/// Give the user the undo window to change their mind.
async fn offer_undo(dir: &UserDirectory, yes: bool) -> Result<()> {
    let Some(pending) = dir.pending_undo() else {
        return Ok(());
    };
    if yes {
        return Ok(());
    }

    let window = pending.remaining();
    println!("Undo? [y/N] ({}s)", window.as_secs());

    let answer = tokio::time::timeout(
        window,
        tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line).map(|_| line)
        }),
    )
    .await;

    let wants_undo = match answer {
        Ok(Ok(Ok(line))) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        _ => false,
    };
    if !wants_undo {
        return Ok(());
    }

    match dir.undo().await? {
        UndoReport::Nothing => bail!("The undo window has closed"),
        UndoReport::Reverted(id) => println!("Reverted {}", id),
        UndoReport::RevertedLocally(id) => {
            info!("Server did not accept the reversal for {}", id);
            println!("Could not revert {} on the server", id);
        }
    }
    Ok(())
}
