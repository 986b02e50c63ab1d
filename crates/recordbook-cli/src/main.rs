//! Recordbook - command-line front end for the student/faculty records portal.
//!
//! Every command runs through the same `Portal` the browser front end uses,
//! so role checks, review rules, and enrollment rollback behave identically.

use std::io;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use recordbook_core::auth::{Session, SessionData, TokenStore};
use recordbook_core::models::{
    Actor, ClubDirectory, ClubRole, Decision, LeaveQuery, ReviewBoard, Role, SubmissionStatus,
};
use recordbook_core::{ApiClient, Config, Portal};

/// Log file prefix inside the data directory
const LOG_FILE_PREFIX: &str = "recordbook.log";

#[derive(Parser, Debug)]
#[command(name = "recordbook")]
#[command(about = "Student and faculty records portal from the terminal")]
#[command(version)]
struct Args {
    /// Backend URL, used instead of the config file when RECORDBOOK_BASE_URL is unset
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Also write logs to a daily file in the data directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with a portal token
    Login {
        /// Account id issued by the portal
        id: String,
        /// student or faculty
        #[arg(value_parser = parse_role)]
        role: Role,
    },
    /// Forget the saved session and token
    Logout,
    /// Home screen for the signed-in role
    Home,
    /// Your submitted records and their review status
    Approvals,
    /// Leave requests (students: your own; faculty: the review list)
    LeaveRequests {
        /// Filter by status (faculty only)
        #[arg(long, value_parser = parse_status)]
        status: Option<SubmissionStatus>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Approve or reject a pending submission
    Decide {
        /// Submission or leave request id
        id: String,
        /// approve or reject
        #[arg(value_parser = parse_decision)]
        decision: Decision,
        /// Required when rejecting
        #[arg(long, default_value = "")]
        remarks: String,
    },
    /// Join a club
    Enroll {
        club_id: String,
        #[arg(long, default_value = "member", value_parser = parse_club_role)]
        role: ClubRole,
        #[arg(long, default_value_t = 0)]
        amount_paid: u32,
    },
    /// List clubs and your memberships
    Clubs,
    /// Semester results
    Results,
}

fn parse_role(s: &str) -> Result<Role, String> {
    Role::parse(s).ok_or_else(|| format!("unknown role '{}' (expected student or faculty)", s))
}

fn parse_status(s: &str) -> Result<SubmissionStatus, String> {
    SubmissionStatus::parse(s).ok_or_else(|| format!("unknown status '{}'", s))
}

fn parse_decision(s: &str) -> Result<Decision, String> {
    Decision::parse(s).ok_or_else(|| format!("unknown decision '{}' (expected approve or reject)", s))
}

fn parse_club_role(s: &str) -> Result<ClubRole, String> {
    ClubRole::parse(s).ok_or_else(|| format!("unknown club role '{}'", s))
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard must stay alive for file logs to be flushed.
fn init_tracing(config: &Config, log_file: bool) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file.then(|| config.data_dir()) {
        Some(Ok(dir)) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        Some(Err(e)) => {
            eprintln!("Warning: file logging disabled: {}", e);
            (None, None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let mut config = Config::load()?;
    if let Some(url) = args.base_url.clone() {
        config.base_url = Some(url);
    }

    let _guard = init_tracing(&config, args.log_file);
    info!("Recordbook CLI starting");

    let data_dir = config.data_dir()?;
    let mut session = Session::new(data_dir);

    match args.command {
        Command::Login { id, role } => login(&mut config, &mut session, id, role),
        Command::Logout => logout(&mut session),
        command => {
            let portal = open_portal(&config, &mut session)?;
            run(&portal, command, args.json).await
        }
    }
}

fn login(config: &mut Config, session: &mut Session, id: String, role: Role) -> Result<()> {
    let token = rpassword::prompt_password("Token: ").context("Failed to read token")?;
    let token = token.trim();
    if token.is_empty() {
        bail!("No token entered");
    }

    let actor = Actor { id, role };
    TokenStore::store(&actor.id, token)?;
    session.update(SessionData::new(actor.clone(), Utc::now()));
    session.save()?;

    config.last_account = Some(actor.id.clone());
    config.save()?;

    info!(account = %actor.id, role = %actor.role, "Signed in");
    println!("Signed in as {} ({})", actor.id, actor.role);
    Ok(())
}

fn logout(session: &mut Session) -> Result<()> {
    session.load(Utc::now())?;
    if let Some(actor) = session.actor() {
        if let Err(e) = TokenStore::delete(&actor.id) {
            warn!(error = %e, "Failed to remove stored token");
        }
    }
    session.clear()?;
    println!("Signed out");
    Ok(())
}

fn open_portal(config: &Config, session: &mut Session) -> Result<Portal> {
    if !session.load(Utc::now())? {
        bail!("Not signed in (or the session expired). Run `recordbook login <id> <role>`.");
    }
    let actor = session
        .actor()
        .cloned()
        .context("Session file has no account")?;
    let token = TokenStore::get(&actor.id)
        .with_context(|| format!("No stored token for {}", actor.id))?;

    let client = ApiClient::new(config.base_url())?.with_token(token);
    Ok(Portal::from_config(actor, Arc::new(client), config))
}

async fn run(portal: &Portal, command: Command, json: bool) -> Result<()> {
    let role = portal.actor().role;
    match command {
        Command::Home => match role {
            Role::Student => {
                let home = portal.student_home(false).await?;
                if json {
                    return print_json(&home);
                }
                println!("{} ({})", home.student.name, home.student.id);
                println!("Achievements: {}", home.counts.total());
                print_board("Submissions", &home.approvals);
                for announcement in &home.announcements {
                    println!("* {}", announcement.title);
                }
            }
            Role::Faculty => {
                let dashboard = portal.faculty_dashboard(false).await?;
                if json {
                    return print_json(&dashboard);
                }
                println!("{} ({})", dashboard.faculty.name, dashboard.faculty.id);
                print_board("Awaiting review", &dashboard.queue);
            }
        },
        Command::Approvals => {
            let board = portal.student_approvals(false).await?;
            if json {
                return print_json(&board);
            }
            print_board("Submissions", &board);
        }
        Command::LeaveRequests { status, page } => {
            let board = match role {
                Role::Student => portal.student_leave_requests(false).await?,
                Role::Faculty => {
                    let query = LeaveQuery {
                        status,
                        ..LeaveQuery::default()
                    }
                    .page(page);
                    portal.leave_requests(&query, false).await?
                }
            };
            if json {
                return print_json(&board);
            }
            print_board("Leave requests", &board);
        }
        Command::Decide {
            id,
            decision,
            remarks,
        } => {
            let mut submission = portal.find_reviewable(&id, &LeaveQuery::pending()).await?;
            portal.decide(&mut submission, decision, &remarks).await?;
            if json {
                return print_json(&submission);
            }
            println!("{} is now {}", submission.id, submission.status);
        }
        Command::Enroll {
            club_id,
            role,
            amount_paid,
        } => {
            // Load the directory first so the join shows up immediately.
            portal.clubs(false).await?;
            let result = portal.enroll(&club_id, role, amount_paid).await;
            for notice in portal.notices() {
                eprintln!("{}", notice.message);
            }
            let outcome = result?;
            if json {
                return print_json(&outcome.enrollment);
            }
            println!("Joined {} as {}", outcome.club_id, role);
        }
        Command::Clubs => {
            let directory = portal.clubs(false).await?;
            if json {
                return print_json(&directory);
            }
            print_clubs(&directory);
        }
        Command::Results => {
            let sheet = portal.results(false).await?;
            if json {
                return print_json(&sheet);
            }
            for semester in &sheet.semesters {
                let sgpa = semester
                    .effective_sgpa()
                    .map(|g| format!("{:.2}", g))
                    .unwrap_or_else(|| "-".to_string());
                println!("Semester {}: SGPA {}", semester.semester, sgpa);
            }
            if let Some(cgpa) = sheet.effective_cgpa() {
                println!("CGPA {:.2}", cgpa);
            }
        }
        Command::Login { .. } | Command::Logout => bail!("session commands do not need a portal"),
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_board(title: &str, board: &ReviewBoard) {
    let stats = &board.stats;
    println!(
        "{} ({} pending, {} approved, {} rejected)",
        title, stats.pending, stats.approved, stats.rejected
    );
    for item in &board.items {
        println!(
            "  {:<24} {:<11} {:<9} {}",
            item.id,
            item.kind().display_name(),
            item.status,
            item.payload.headline()
        );
    }
}

fn print_clubs(directory: &ClubDirectory) {
    for club in &directory.clubs {
        let marker = if directory.is_enrolled(&club.id) { "*" } else { " " };
        println!("{} {:<24} {:<24} {}", marker, club.id, club.name, club.display_fee());
    }
}
