use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;
use tracker_cli::cli::{Cli, Command, collect_overrides, expand_alias, split_command_line};
use tracker_cli::render;
use tracker_core::api::HttpApi;
use tracker_core::auth;
use tracker_core::board::{AssumeYes, Confirm, Outcome, TaskBoard, TaskEdit, TaskForm};
use tracker_core::config::{self, Config, palette_for_theme};
use tracker_core::datetime::now_local;
use tracker_core::error::AppError;
use tracker_core::model::{Category, Task, TaskStatus};
use tracker_core::notify::notifier_from_env;
use tracker_core::storage::session_store;

const LOG_ENV_VAR: &str = "PROGRESS_TRACKER_LOG";
const VERBOSE_FILTER: &str = "warn,tracker=debug,tracker_cli=debug,tracker_core=debug";

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Reads yes/no answers from stdin. Prompts go to stderr so JSON output stays clean.
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        eprint!("{prompt} [y/N] ");
        let _ = io::stderr().flush();

        let mut answer = String::new();
        match io::stdin().read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        }
    }
}

fn read_password() -> Result<String, AppError> {
    eprint!("Password: ");
    let _ = io::stderr().flush();

    let mut password = String::new();
    io::stdin()
        .read_line(&mut password)
        .map_err(|err| AppError::io(err.to_string()))?;
    Ok(password.trim_end_matches(['\r', '\n']).to_string())
}

fn print_task_line(action: &str, task: &Task, json: bool) -> Result<(), AppError> {
    if json {
        println!("{}", render::task_json(task, now_local())?);
    } else {
        println!("{action}: {} (#{})", task.title, task.id);
    }
    Ok(())
}

fn print_cancelled(json: bool) {
    if json {
        println!("{}", serde_json::json!({ "cancelled": true }));
    } else {
        println!("Cancelled");
    }
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn open_api(config: &Config, access_token: Option<&str>) -> Result<HttpApi, AppError> {
    Ok(HttpApi::new(config.api_base_url(), config.reminder_endpoint)?.with_access_token(access_token))
}

fn run_command(cli: Cli, base: &Config) -> Result<(), AppError> {
    let overrides = collect_overrides(&cli.config_override)?;
    let config = config::merge_overrides(base, &overrides);
    let palette = palette_for_theme(config.theme.as_deref());
    let session_path = session_store::session_path()?;
    let json = cli.json;

    match cli.command {
        Command::Login { username, password } => {
            let password = match password {
                Some(value) => value,
                None => read_password()?,
            };
            let api = open_api(&config, None)?;
            auth::login(&api, &session_path, &username, &password)?;
            if json {
                println!("{}", serde_json::json!({ "logged_in": true, "username": username.trim() }));
            } else {
                println!("Logged in as {}", username.trim());
            }
            return Ok(());
        }
        Command::Logout => {
            auth::logout(&session_path)?;
            if json {
                println!("{}", serde_json::json!({ "logged_in": false }));
            } else {
                println!("Logged out");
            }
            return Ok(());
        }
        _ => {}
    }

    let session = session_store::load_session(&session_path)?;
    let api = open_api(&config, session.access_token())?;
    let mut board = TaskBoard::new(&api);
    board.mount(&session).into_result()?;

    let confirm: &dyn Confirm = if cli.yes { &AssumeYes } else { &StdinConfirm };
    let now = now_local();

    match cli.command {
        Command::Login { .. } | Command::Logout => {}
        Command::Board => {
            let columns = board.columns();
            let uncategorized = board.uncategorized();
            let failed_count = board.failed().len();
            if json {
                println!(
                    "{}",
                    render::board_json(&columns, &uncategorized, failed_count, now)?
                );
            } else {
                println!(
                    "{}",
                    render::board_text(&columns, &uncategorized, failed_count, &palette, now)
                );
            }
        }
        Command::Failed => {
            let failed = board.failed();
            if json {
                println!("{}", render::tasks_json(&failed, now)?);
            } else {
                println!("{}", render::failed_text(&failed, &palette)?);
            }
        }
        Command::Show { id } => {
            let task = board.get(id)?;
            if json {
                println!("{}", render::task_json(task, now)?);
            } else {
                println!("{}", render::task_detail_text(task, &palette, now)?);
            }
        }
        Command::Add {
            title,
            category,
            description,
            target_date,
        } => {
            let mut form = TaskForm {
                title: title.unwrap_or_default(),
                description: description.unwrap_or_default(),
                category: category.parse::<Category>()?,
                target_date: target_date.unwrap_or_default(),
            };
            let task = board.create(&mut form)?;
            print_task_line("Added task", &task, json)?;
        }
        Command::Status { id, status } => {
            let status = status.parse::<TaskStatus>()?;
            match board.change_status(id, status, confirm)? {
                Outcome::Done(task) => {
                    if json {
                        println!("{}", render::task_json(&task, now)?);
                    } else {
                        println!(
                            "Updated task: {} (#{}) -> {}",
                            task.title,
                            task.id,
                            render::status_label(task.status, &palette)
                        );
                    }
                }
                Outcome::Cancelled => print_cancelled(json),
            }
        }
        Command::Edit {
            id,
            title,
            description,
            category,
            target_date,
        } => {
            let edit = TaskEdit {
                title,
                description,
                category: category.map(|value| value.parse::<Category>()).transpose()?,
                target_date,
            };
            let task = board.edit(id, &edit)?;
            print_task_line("Updated task", &task, json)?;
        }
        Command::Delete { id } => match board.delete_failed(id, confirm)? {
            Outcome::Done(task) => print_task_line("Deleted task", &task, json)?,
            Outcome::Cancelled => print_cancelled(json),
        },
        Command::Remind { id, datetime } => {
            let reminder = board.add_reminder(id, &datetime)?;
            if json {
                println!("{}", serde_json::json!(reminder));
            } else {
                println!("Reminder set for task #{} at {}", reminder.task, reminder.remind_at);
            }
        }
        Command::CheckReminders => {
            let sent = board.check_reminders()?;
            if json {
                println!("{}", serde_json::json!({ "sent": sent }));
            } else {
                println!("Server sent {sent} reminder(s)");
            }
        }
        Command::Cleanup => {
            let deleted = board.cleanup_failed()?;
            if json {
                println!("{}", serde_json::json!({ "deleted": deleted }));
            } else {
                println!("Removed {deleted} expired failed task(s)");
            }
        }
        Command::Notify => {
            let notifier = notifier_from_env()?;
            let outcome = board.notify_due_reminders(notifier.as_ref(), now);

            for failure in &outcome.failures {
                eprintln!(
                    "WARN: notification for task #{} failed: {}",
                    failure.task_id, failure.error
                );
            }

            if json {
                let notified: Vec<_> = outcome
                    .notified
                    .iter()
                    .map(|(task_id, reminder)| {
                        serde_json::json!({ "task": task_id, "remind_at": reminder.remind_at })
                    })
                    .collect();
                println!("{}", serde_json::Value::Array(notified));
            } else if outcome.notified.is_empty() {
                println!("No reminders due");
            } else {
                for (task_id, reminder) in &outcome.notified {
                    let title = board
                        .get(*task_id)
                        .map(|task| task.title.as_str())
                        .unwrap_or("?");
                    println!(
                        "Notified task: {} (#{}) at {}",
                        title, task_id, reminder.remind_at
                    );
                }
            }
        }
    }

    Ok(())
}

fn run_line(args: Vec<String>, config: &Config) -> Result<(), AppError> {
    let args = expand_alias(args, &config.aliases)?;
    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push("tracker".to_string());
    argv.extend(args);

    let cli = match Cli::try_parse_from(argv) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.print().map_err(|err| AppError::io(err.to_string()))?;
            return Ok(());
        }
        Err(err) => return Err(normalize_parse_error(err)),
    };
    run_command(cli, config)
}

fn run_interactive(config: &Config) -> Result<(), AppError> {
    let mut input = String::new();

    loop {
        print!("tracker> ");
        let _ = io::stdout().flush();

        input.clear();
        let bytes = io::stdin()
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        if let Err(err) = run_line(args, config) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn load_config() -> Config {
    let load = config::load_config_with_fallback();
    if let Some(err) = load.error {
        tracing::warn!(error = %err, "using default configuration");
    }
    load.config
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = args.iter().any(|arg| arg == "--verbose" || arg == "-v");
    init_tracing(verbose);

    let config = load_config();

    let result = if args.is_empty() {
        run_interactive(&config)
    } else {
        run_line(args, &config)
    };

    if let Err(err) = result {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::VERBOSE_FILTER;
    use tracing_subscriber::EnvFilter;

    #[test]
    fn verbose_filter_keeps_dependencies_at_warn() {
        assert!(EnvFilter::try_new(VERBOSE_FILTER).is_ok());

        let directives: Vec<&str> = VERBOSE_FILTER.split(',').collect();
        assert_eq!(directives[0], "warn");
        assert!(directives.contains(&"tracker_core=debug"));
        assert!(!directives.contains(&"debug"));
    }
}
