use std::error::Error;

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use engine::{
    Account, Balances, CleanupPlan, DuplicateGroup, Engine, FiscalYear, FiscalYearPatch,
    NewFiscalYear, NewTransaction, Role, confirmation_phrase, plan_cleanup,
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

mod prompt;
mod settings;

type CliResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(name = "clubledger_admin")]
#[command(about = "Admin utilities for the club ledger (duplicates, fiscal years)")]
struct Cli {
    /// Database connection string. Overrides the configured database.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Acting user, checked against the club's role matrix.
    #[arg(long = "as", env = "CLUBLEDGER_USER", global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply or inspect schema migrations.
    Migrate(Migrate),
    #[command(flatten)]
    Ledger(LedgerCommand),
}

/// Commands that run against a migrated database through the engine.
#[derive(Subcommand, Debug)]
enum LedgerCommand {
    Club(Club),
    Member(Member),
    Tx(Tx),
    Duplicates(Duplicates),
    FiscalYear(FiscalYearCmd),
}

#[derive(Args, Debug)]
struct Migrate {
    #[command(subcommand)]
    command: MigrateCommand,
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    Up,
    Down {
        #[arg(long)]
        steps: Option<u32>,
    },
    Fresh,
    Status,
}

#[derive(Args, Debug)]
struct Club {
    #[command(subcommand)]
    command: ClubCommand,
}

#[derive(Subcommand, Debug)]
enum ClubCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        owner: String,
    },
}

#[derive(Args, Debug)]
struct Member {
    #[command(subcommand)]
    command: MemberCommand,
}

#[derive(Subcommand, Debug)]
enum MemberCommand {
    Set {
        #[arg(long)]
        club: String,
        #[arg(long)]
        member: String,
        #[arg(long, value_parser = parse_role)]
        role: Role,
    },
    Remove {
        #[arg(long)]
        club: String,
        #[arg(long)]
        member: String,
    },
    List {
        #[arg(long)]
        club: String,
    },
}

#[derive(Args, Debug)]
struct Tx {
    #[command(subcommand)]
    command: TxCommand,
}

#[derive(Subcommand, Debug)]
enum TxCommand {
    Add(TxAddArgs),
    List {
        #[arg(long)]
        club: String,
    },
    Reconcile {
        #[arg(long)]
        club: String,
        #[arg(long)]
        id: Uuid,
        /// Mark the record as not reconciled.
        #[arg(long)]
        undo: bool,
    },
    Delete {
        #[arg(long)]
        club: String,
        #[arg(long)]
        id: Uuid,
    },
}

#[derive(Args, Debug)]
struct TxAddArgs {
    #[arg(long)]
    club: String,
    #[arg(long)]
    sequence_number: String,
    #[arg(long)]
    date: NaiveDate,
    /// Signed amount in cents.
    #[arg(long, allow_hyphen_values = true)]
    amount: i64,
    #[arg(long, value_parser = parse_account, default_value = "current")]
    account: Account,
    #[arg(long)]
    counterparty: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    reconciled: bool,
}

#[derive(Args, Debug)]
struct Duplicates {
    #[command(subcommand)]
    command: DuplicatesCommand,
}

#[derive(Subcommand, Debug)]
enum DuplicatesCommand {
    /// List duplicated sequence numbers and what a cleanup would delete.
    Scan {
        #[arg(long)]
        club: String,
        #[arg(long)]
        json: bool,
    },
    /// Delete every duplicate except the retained record of each group.
    Clean {
        #[arg(long)]
        club: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Debug)]
struct FiscalYearCmd {
    #[command(subcommand)]
    command: FiscalYearCommand,
}

#[derive(Subcommand, Debug)]
enum FiscalYearCommand {
    Create {
        #[arg(long)]
        club: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[arg(long, allow_hyphen_values = true, default_value_t = 0)]
        opening_current: i64,
        #[arg(long, allow_hyphen_values = true, default_value_t = 0)]
        opening_savings: i64,
    },
    List {
        #[arg(long)]
        club: String,
    },
    Show {
        #[arg(long)]
        club: String,
        #[arg(long)]
        id: Uuid,
    },
    Close {
        #[arg(long)]
        club: String,
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        yes: bool,
    },
    Reopen {
        #[arg(long)]
        club: String,
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        yes: bool,
    },
    /// Lock a closed year for good. Asks to retype a confirmation phrase.
    PermanentlyClose {
        #[arg(long)]
        club: String,
        #[arg(long)]
        id: Uuid,
    },
    Update {
        #[arg(long)]
        club: String,
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long, allow_hyphen_values = true)]
        opening_current: Option<i64>,
        #[arg(long, allow_hyphen_values = true)]
        opening_savings: Option<i64>,
    },
}

fn parse_role(raw: &str) -> Result<Role, String> {
    Role::try_from(raw).map_err(|err| err.to_string())
}

fn parse_account(raw: &str) -> Result<Account, String> {
    Account::try_from(raw).map_err(|err| err.to_string())
}

/// Render cents as a decimal amount.
fn format_minor(amount_minor: impl Into<i128>) -> String {
    let amount_minor = amount_minor.into();
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

fn acting_user(user: Option<&str>) -> CliResult<&str> {
    user.ok_or_else(|| "missing acting user: pass --as or set CLUBLEDGER_USER".into())
}

async fn connect_db(database_url: &str) -> CliResult<DatabaseConnection> {
    tracing::debug!("connecting to {database_url}");
    let db = Database::connect(database_url).await?;
    Ok(db)
}

fn print_group(group: &DuplicateGroup) {
    println!(
        "{}: {} records, keeping {}",
        group.sequence_number,
        group.members().len(),
        group.to_keep().id
    );
    for record in group.to_delete() {
        println!(
            "  delete {} ({} {} {}{})",
            record.id,
            record.occurred_on,
            format_minor(record.amount_minor),
            record.created_at.format("%Y-%m-%d %H:%M"),
            if record.reconciled { ", reconciled" } else { "" }
        );
    }
}

fn print_plan(plan: &CleanupPlan) {
    println!(
        "{} duplicate groups, {} records to delete ({} reconciled)",
        plan.total_groups, plan.total_to_delete, plan.reconciled_to_delete
    );
}

fn print_fiscal_year(fy: &FiscalYear) {
    println!(
        "{} {} [{} - {}] {}",
        fy.id, fy.year, fy.start_date, fy.end_date, fy.status
    );
    println!(
        "  opening: current {} savings {}",
        format_minor(fy.opening_balances.current_minor),
        format_minor(fy.opening_balances.savings_minor)
    );
    if let Some(closing) = fy.closing_balances {
        println!(
            "  closing: current {} savings {}",
            format_minor(closing.current_minor),
            format_minor(closing.savings_minor)
        );
    }
    if let Some(variance) = fy.variance() {
        println!(
            "  variance: current {} ({:.2}%) savings {} ({:.2}%)",
            format_minor(variance.current.diff_minor),
            variance.current.percent,
            format_minor(variance.savings.diff_minor),
            variance.savings.percent
        );
    }
    if let (Some(at), Some(by)) = (fy.closed_at, fy.closed_by.as_deref()) {
        println!("  closed {} by {by}", at.format("%Y-%m-%d %H:%M"));
    }
    if let (Some(at), Some(by)) = (
        fy.permanently_closed_at,
        fy.permanently_closed_by.as_deref(),
    ) {
        println!("  permanently closed {} by {by}", at.format("%Y-%m-%d %H:%M"));
    }
}

async fn run_migrate(db: &DatabaseConnection, command: MigrateCommand) -> CliResult<()> {
    match command {
        MigrateCommand::Up => Migrator::up(db, None).await?,
        MigrateCommand::Down { steps } => Migrator::down(db, steps).await?,
        MigrateCommand::Fresh => Migrator::fresh(db).await?,
        MigrateCommand::Status => {
            Migrator::status(db).await?;
            return Ok(());
        }
    }
    tracing::info!("migrations done");
    Ok(())
}

async fn run_duplicates(
    engine: &Engine,
    user: &str,
    command: DuplicatesCommand,
) -> CliResult<()> {
    match command {
        DuplicatesCommand::Scan { club, json } => {
            let groups = engine.scan_duplicates(&club, user).await?;
            let plan = plan_cleanup(&groups);
            if json {
                let out = serde_json::json!({ "groups": groups, "plan": plan });
                println!("{}", serde_json::to_string_pretty(&out)?);
                return Ok(());
            }
            groups.iter().for_each(print_group);
            print_plan(&plan);
        }
        DuplicatesCommand::Clean { club, yes } => {
            let groups = engine.scan_duplicates(&club, user).await?;
            let plan = plan_cleanup(&groups);
            if plan.is_empty() {
                println!("no duplicates found");
                return Ok(());
            }
            print_plan(&plan);
            if !yes && !prompt::confirm("Delete these records?")? {
                println!("cleanup cancelled");
                return Ok(());
            }

            let report = engine.clean_up_duplicates(&club, &plan, user).await?;
            println!("{report}");
            for failure in &report.failures {
                eprintln!("  {}: {}", failure.id, failure.reason);
            }
            if !report.is_complete() {
                return Err(format!("{} deletions failed", report.failed()).into());
            }
        }
    }
    Ok(())
}

async fn run_fiscal_year(
    engine: &Engine,
    user: &str,
    command: FiscalYearCommand,
) -> CliResult<()> {
    match command {
        FiscalYearCommand::Create {
            club,
            year,
            start,
            end,
            opening_current,
            opening_savings,
        } => {
            let id = engine
                .new_fiscal_year(
                    &club,
                    NewFiscalYear {
                        year,
                        start_date: start,
                        end_date: end,
                        opening_balances: Balances::new(opening_current, opening_savings),
                    },
                    user,
                )
                .await?;
            println!("created fiscal year {year} ({id})");
        }
        FiscalYearCommand::List { club } => {
            for fy in engine.list_fiscal_years(&club, user).await? {
                println!(
                    "{} {} [{} - {}] {}",
                    fy.id, fy.year, fy.start_date, fy.end_date, fy.status
                );
            }
        }
        FiscalYearCommand::Show { club, id } => {
            print_fiscal_year(&engine.fiscal_year(&club, id, user).await?);
        }
        FiscalYearCommand::Close { club, id, yes } => {
            let fy = engine.fiscal_year(&club, id, user).await?;
            if !yes && !prompt::confirm(&format!("Close fiscal year {}?", fy.year))? {
                println!("close cancelled");
                return Ok(());
            }
            let fy = engine.close_fiscal_year(&club, id, user, Utc::now()).await?;
            print_fiscal_year(&fy);
        }
        FiscalYearCommand::Reopen { club, id, yes } => {
            let fy = engine.fiscal_year(&club, id, user).await?;
            if !yes && !prompt::confirm(&format!("Reopen fiscal year {}?", fy.year))? {
                println!("reopen cancelled");
                return Ok(());
            }
            let fy = engine.reopen_fiscal_year(&club, id, user).await?;
            print_fiscal_year(&fy);
        }
        FiscalYearCommand::PermanentlyClose { club, id } => {
            let fy = engine.fiscal_year(&club, id, user).await?;
            if !prompt::confirm(&format!("Permanently close fiscal year {}?", fy.year))? {
                println!("permanent close cancelled");
                return Ok(());
            }
            let confirmed = prompt::confirm_phrase(
                "This cannot be undone. The year and its records will be locked forever.",
                &confirmation_phrase(fy.year),
            )?;
            if !confirmed {
                println!("confirmation phrase did not match, nothing changed");
                return Ok(());
            }
            let fy = engine
                .permanently_close_fiscal_year(&club, id, true, user, Utc::now())
                .await?;
            print_fiscal_year(&fy);
        }
        FiscalYearCommand::Update {
            club,
            id,
            start,
            end,
            opening_current,
            opening_savings,
        } => {
            let opening_balances = if opening_current.is_some() || opening_savings.is_some() {
                let current = engine.fiscal_year(&club, id, user).await?.opening_balances;
                Some(Balances::new(
                    opening_current.unwrap_or(current.current_minor),
                    opening_savings.unwrap_or(current.savings_minor),
                ))
            } else {
                None
            };
            let fy = engine
                .update_fiscal_year(
                    &club,
                    id,
                    FiscalYearPatch {
                        start_date: start,
                        end_date: end,
                        opening_balances,
                    },
                    user,
                )
                .await?;
            print_fiscal_year(&fy);
        }
    }
    Ok(())
}

async fn run_ledger(
    engine: &Engine,
    user: Option<&str>,
    command: LedgerCommand,
) -> CliResult<()> {
    match command {
        LedgerCommand::Club(Club {
            command: ClubCommand::Create { name, owner },
        }) => {
            let club_id = engine.new_club(&name, &owner).await?;
            println!("created club: {name} ({club_id})");
        }
        LedgerCommand::Member(Member { command }) => {
            let user = acting_user(user)?;
            match command {
                MemberCommand::Set { club, member, role } => {
                    engine.set_member_role(&club, &member, role, user).await?;
                    println!("{member} is now {role} of {club}");
                }
                MemberCommand::Remove { club, member } => {
                    engine.remove_member(&club, &member, user).await?;
                    println!("removed {member} from {club}");
                }
                MemberCommand::List { club } => {
                    for (member, role) in engine.list_members(&club, user).await? {
                        println!("{member}\t{role}");
                    }
                }
            }
        }
        LedgerCommand::Tx(Tx { command }) => {
            let user = acting_user(user)?;
            match command {
                TxCommand::Add(args) => {
                    let id = engine
                        .add_transaction(
                            &args.club,
                            NewTransaction {
                                sequence_number: args.sequence_number,
                                occurred_on: args.date,
                                amount_minor: args.amount,
                                account: args.account,
                                counterparty: args.counterparty,
                                description: args.description,
                                reconciled: args.reconciled,
                            },
                            user,
                            Utc::now(),
                        )
                        .await?;
                    println!("added transaction {id}");
                }
                TxCommand::List { club } => {
                    for record in engine.list_transactions(&club, user).await? {
                        println!(
                            "{}\t{}\t{}\t{}\t{}{}",
                            record.id,
                            record.sequence_number,
                            record.occurred_on,
                            record.account,
                            format_minor(record.amount_minor),
                            if record.reconciled { "\treconciled" } else { "" }
                        );
                    }
                }
                TxCommand::Reconcile { club, id, undo } => {
                    engine.set_reconciled(&club, id, !undo, user).await?;
                    println!("transaction {id} reconciled: {}", !undo);
                }
                TxCommand::Delete { club, id } => {
                    engine.delete_transaction(&club, id, user).await?;
                    println!("deleted transaction {id}");
                }
            }
        }
        LedgerCommand::Duplicates(Duplicates { command }) => {
            run_duplicates(engine, acting_user(user)?, command).await?;
        }
        LedgerCommand::FiscalYear(FiscalYearCmd { command }) => {
            run_fiscal_year(engine, acting_user(user)?, command).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(format!(
            "clubledger_admin={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let database_url = cli
        .database_url
        .clone()
        .unwrap_or_else(|| settings.database.url());
    let db = connect_db(&database_url).await?;

    match cli.command {
        Command::Migrate(Migrate { command }) => run_migrate(&db, command).await,
        Command::Ledger(command) => {
            Migrator::up(&db, None).await?;
            let engine = Engine::builder().database(db).build().await?;
            run_ledger(&engine, cli.user.as_deref(), command).await
        }
    }
}
