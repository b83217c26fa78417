use std::{
    error::Error,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use clap::{Parser, Subcommand};
use rusqlite::Connection;
use time::{Date, macros::format_description};
use tokio::{signal, time::MissedTickBehavior};

use budgeteur_recurring::{
    CatchUpReport, Clock, DEFAULT_LOG_PATH, Direction, LocalClock, RecurrenceKind,
    RecurrenceParams, RecurringSchedule, ScheduleId, SchedulePayload, TagId, TagName, Transaction,
    TransactionSink, catch_up, create_rule, create_schedule, create_tag, get_all_rules,
    get_all_schedules, get_all_tags, get_schedule, get_transactions_after_catch_up, initialize_db,
    run_due, set_active, setup_logging, skip,
};

/// A utility for managing and firing the recurring transactions of budgeteur_rs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "BUDGETEUR_DB_PATH")]
    db_path: PathBuf,

    /// The canonical name of the local timezone, e.g. "Pacific/Auckland".
    /// Decides which date counts as today.
    #[arg(long, env = "BUDGETEUR_TIMEZONE", default_value = "Etc/UTC")]
    timezone: String,

    /// File path to write debug logs to.
    #[arg(long, default_value = DEFAULT_LOG_PATH)]
    log_path: PathBuf,

    /// How long to wait for another process to release the database before giving up.
    #[arg(long, default_value_t = 5000)]
    busy_timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database tables if they do not exist.
    Init,

    /// Create a recurring transaction.
    Create {
        /// A short description, e.g. "Rent".
        #[arg(long)]
        name: String,

        /// The size of the transaction.
        #[arg(long)]
        amount: f64,

        /// Record the transaction as income instead of an expense.
        #[arg(long)]
        credit: bool,

        /// One of monthly, weekly or yearly.
        #[arg(long, value_parser = parse_kind)]
        kind: RecurrenceKind,

        /// The day of the month (1-31) for monthly and yearly schedules.
        #[arg(long)]
        day_of_month: Option<u8>,

        /// The day of the week (0 = Sunday to 6 = Saturday) for weekly schedules.
        #[arg(long)]
        weekday: Option<u8>,

        /// The month (1-12) for yearly schedules.
        #[arg(long)]
        month_of_year: Option<u8>,

        /// The ID of a tag to attach to each transaction. May be repeated.
        #[arg(long = "label")]
        labels: Vec<TagId>,

        /// The first occurrence as YYYY-MM-DD. Defaults to the first occurrence from today.
        #[arg(long, value_parser = parse_date)]
        start: Option<Date>,
    },

    /// List all recurring transactions.
    List,

    /// Fire each due recurring transaction once.
    RunDue {
        /// Fire the schedules due as of this date (YYYY-MM-DD) instead of today.
        #[arg(long, value_parser = parse_date)]
        as_of: Option<Date>,
    },

    /// Fire due recurring transactions periodically until interrupted.
    Watch {
        /// Seconds between catch-up passes.
        #[arg(long, default_value_t = 3600)]
        interval_secs: u64,
    },

    /// Move past the due occurrence of a schedule without recording a transaction.
    Skip {
        /// The ID of the schedule.
        id: ScheduleId,
    },

    /// Stop a schedule from firing, keeping its history.
    Pause {
        /// The ID of the schedule.
        id: ScheduleId,
    },

    /// Let a paused schedule fire again.
    Resume {
        /// The ID of the schedule.
        id: ScheduleId,
    },

    /// Bring schedules up to date and list all transactions.
    Transactions,

    /// Create a tag that schedules can use as a label.
    AddTag {
        /// The name of the tag, e.g. "Housing".
        name: String,
    },

    /// List all tags.
    Tags,

    /// Tag every recurring transaction whose name starts with `pattern`.
    AddRule {
        /// The start of the transaction names to match, ignoring case.
        pattern: String,

        /// The ID of the tag to apply.
        tag_id: TagId,
    },

    /// List the auto-tagging rules, in the order they are tried.
    Rules,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    setup_logging(&args.log_path)?;

    let clock = LocalClock::new(&args.timezone)?;
    let connection = Connection::open(&args.db_path)?;
    connection.busy_timeout(Duration::from_millis(args.busy_timeout_ms))?;
    initialize_db(&connection)?;

    let result = match args.command {
        Command::Init => {
            println!("Database ready at {:#?}", args.db_path);
            Ok(())
        }
        Command::Create {
            name,
            amount,
            credit,
            kind,
            day_of_month,
            weekday,
            month_of_year,
            labels,
            start,
        } => RecurrenceParams::new(day_of_month, weekday, month_of_year)
            .and_then(|params| {
                let payload = SchedulePayload {
                    name,
                    amount,
                    direction: if credit {
                        Direction::Credit
                    } else {
                        Direction::Debit
                    },
                    labels,
                };
                let builder = RecurringSchedule::build(payload, kind, params).next_occurrence(start);

                create_schedule(builder, clock.today(), &connection)
            })
            .map(|schedule| print_schedules(&[schedule], clock.today())),
        Command::List => get_all_schedules(&connection)
            .map(|schedules| print_schedules(&schedules, clock.today())),
        Command::RunDue { as_of } => {
            let as_of = as_of.unwrap_or_else(|| clock.today());
            run_due(as_of, &TransactionSink, &connection).map(|report| print_report(&report))
        }
        Command::Watch { interval_secs } => {
            return watch(connection, clock, interval_secs).await;
        }
        Command::Skip { id } => get_schedule(id, &connection)
            .and_then(|schedule| skip(&schedule, clock.today(), &connection))
            .map(|schedule| print_schedules(&[schedule], clock.today())),
        Command::Pause { id } => set_active(id, false, &connection)
            .map(|schedule| print_schedules(&[schedule], clock.today())),
        Command::Resume { id } => set_active(id, true, &connection)
            .map(|schedule| print_schedules(&[schedule], clock.today())),
        Command::Transactions => get_transactions_after_catch_up(&clock, &connection)
            .map(|transactions| print_transactions(&transactions)),
        Command::AddTag { name } => TagName::new(&name)
            .and_then(|name| create_tag(name, &connection))
            .map(|tag| println!("{:>4}  {}", tag.id, tag.name)),
        Command::Tags => get_all_tags(&connection).map(|tags| {
            for tag in tags {
                println!("{:>4}  {}", tag.id, tag.name);
            }
        }),
        Command::AddRule { pattern, tag_id } => create_rule(&pattern, tag_id, &connection)
            .map(|rule| println!("{:>4}  {:<24} -> tag {}", rule.id, rule.pattern, rule.tag_id)),
        Command::Rules => get_all_rules(&connection).map(|rules| {
            for rule in rules {
                println!("{:>4}  {:<24} -> tag {}", rule.id, rule.pattern, rule.tag_id);
            }
        }),
    };

    if let Err(error) = result {
        print_error(&error);
        return Err(error.into());
    }

    Ok(())
}

/// Run a catch-up pass every `interval_secs` seconds until ctrl+c or the
/// terminate signal is received.
async fn watch(
    connection: Connection,
    clock: LocalClock,
    interval_secs: u64,
) -> Result<(), Box<dyn Error>> {
    let connection = Arc::new(Mutex::new(connection));
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    tracing::info!(
        "Watching for due schedules every {interval_secs}s in {}",
        clock.timezone()
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let connection = connection.clone();
                let clock = clock.clone();

                let result = tokio::task::spawn_blocking(move || {
                    let connection = connection
                        .lock()
                        .map_err(|_| budgeteur_recurring::Error::DatabaseLockError)?;

                    catch_up(&clock, &TransactionSink, &connection)
                })
                .await?;

                if let Err(error) = result {
                    tracing::error!("Catch-up pass failed: {error}");
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Stopping the catch-up loop.");
                break;
            }
        }
    }

    Ok(())
}

/// Waits for either the ctrl+c or terminate signal, whichever comes first.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::debug!("Received ctrl+c signal."),
        _ = terminate => tracing::debug!("Received terminate signal."),
    }
}

fn parse_date(text: &str) -> Result<Date, String> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .map_err(|error| format!("expected a date like 2024-01-31: {error}"))
}

fn parse_kind(text: &str) -> Result<RecurrenceKind, String> {
    text.parse().map_err(|error: budgeteur_recurring::Error| error.to_string())
}

fn print_schedules(schedules: &[RecurringSchedule], today: Date) {
    for schedule in schedules {
        let next = schedule
            .next_occurrence
            .map_or("-".to_owned(), |date| date.to_string());
        let last = schedule
            .last_occurrence
            .map_or("-".to_owned(), |date| date.to_string());

        println!(
            "{:>4}  {:<24} {:>10.2} {:?}  {:<7} next {next}  last {last}  ({})",
            schedule.id,
            schedule.payload.name,
            schedule.payload.amount,
            schedule.payload.direction,
            schedule.kind,
            schedule.state(today)
        );
    }
}

fn print_report(report: &CatchUpReport<Transaction>) {
    println!("Fired {} schedule(s).", report.fired.len());
    print_transactions(&report.fired);

    for (id, error) in &report.failed {
        print_error(format!("Schedule {id} failed: {error}"));
    }

    if !report.deferred.is_empty() {
        println!(
            "Schedule(s) {:?} were changed by another process and will be retried on the next run.",
            report.deferred
        );
    }
}

fn print_transactions(transactions: &[Transaction]) {
    for transaction in transactions {
        println!(
            "{:>6}  {}  {:>10.2}  {}",
            transaction.id, transaction.date, transaction.amount, transaction.description
        );
    }
}

fn print_error(error: impl ToString) {
    eprintln!(
        "\x1b[31;1m{}\x1b[0m",
        capitalise_first_char(&error.to_string())
    )
}

/// From https://crates.io/crates/capitalize
fn capitalise_first_char(string: &str) -> String {
    let mut chars = string.chars();
    let Some(first) = chars.next() else {
        return String::with_capacity(0);
    };
    first.to_uppercase().chain(chars).collect()
}
