use clap::{Parser, Subcommand};
use std::collections::HashMap;
use tracker_core::config::{ConfigOverrides, ReminderEndpoint, canonical_key};
use tracker_core::error::AppError;
use tracker_core::model::TaskId;

#[derive(Parser, Debug)]
#[command(author, version, about = "Progress tracker client", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Answer yes to confirmation prompts
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Log requests to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and store the access and refresh tokens
    ///
    /// Example: tracker login ana --password secret
    Login {
        username: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored tokens
    Logout,
    /// Show active tasks grouped by category
    ///
    /// Example: tracker board
    Board,
    /// List failed tasks and when they expire
    ///
    /// Example: tracker failed
    Failed,
    /// Show details, history and reminders of a task
    ///
    /// Example: tracker show 4
    Show { id: TaskId },
    /// Create a task
    ///
    /// Example: tracker add "Apply to ACME" --category internship
    /// Example: tracker add "Hack night" -c hackathon --target-date 2025-12-24T18:00
    Add {
        title: Option<String>,
        #[arg(short = 'c', long, default_value = "project")]
        category: String,
        #[arg(short = 'd', long)]
        description: Option<String>,
        #[arg(long = "target-date", value_name = "DATETIME")]
        target_date: Option<String>,
    },
    /// Change a task's status (pending, progress, success, failure)
    ///
    /// Example: tracker status 4 success
    Status { id: TaskId, status: String },
    /// Edit a task's fields
    ///
    /// Example: tracker edit 4 --title "Apply to ACME (round 2)"
    /// Example: tracker edit 4 --target-date "" (clears the date)
    Edit {
        id: TaskId,
        #[arg(long)]
        title: Option<String>,
        #[arg(short = 'd', long)]
        description: Option<String>,
        #[arg(short = 'c', long)]
        category: Option<String>,
        #[arg(long = "target-date", value_name = "DATETIME")]
        target_date: Option<String>,
    },
    /// Delete a failed task
    ///
    /// Example: tracker delete 4
    Delete { id: TaskId },
    /// Set a reminder for a task
    ///
    /// Example: tracker remind 4 "2025-12-24 09:00"
    Remind { id: TaskId, datetime: String },
    /// Ask the server to send due reminders
    CheckReminders,
    /// Ask the server to purge failed tasks past their retention window
    Cleanup,
    /// Raise desktop notifications for due reminders
    Notify,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    ApiBaseUrl,
    ReminderEndpoint,
    Theme,
    Alias(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let (field, remainder) = key_raw
        .split_once('.')
        .map(|(field, rest)| (field.trim(), Some(rest.trim())))
        .unwrap_or((key_raw.trim(), None));

    let canonical_field = canonical_key(field);
    if canonical_field.is_empty() {
        return Err("override key cannot be empty".to_string());
    }

    let scalar = |target: ConfigOverrideTarget| {
        if remainder.is_some() {
            Err(format!("{canonical_field} override cannot have subfields"))
        } else {
            Ok(ParsedConfigOverride {
                target,
                value: value.clone(),
            })
        }
    };

    match canonical_field.as_str() {
        "theme" => scalar(ConfigOverrideTarget::Theme),
        "api_url" | "api_base_url" => scalar(ConfigOverrideTarget::ApiBaseUrl),
        "reminder_endpoint" => scalar(ConfigOverrideTarget::ReminderEndpoint),
        "aliases" | "alias" => {
            let alias_name = remainder
                .filter(|segment| !segment.is_empty())
                .ok_or_else(|| "aliases override requires an alias name".to_string())?;
            Ok(ParsedConfigOverride {
                target: ConfigOverrideTarget::Alias(alias_name.to_string()),
                value: value.clone(),
            })
        }
        other => Err(format!("unknown config field '{other}'")),
    }
}

pub fn collect_overrides(raw: &[String]) -> Result<ConfigOverrides, AppError> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry).map_err(AppError::invalid_input)?;
        match parsed.target {
            ConfigOverrideTarget::ApiBaseUrl => overrides.api_base_url = Some(parsed.value),
            ConfigOverrideTarget::ReminderEndpoint => {
                overrides.reminder_endpoint = Some(ReminderEndpoint::parse(&parsed.value)?)
            }
            ConfigOverrideTarget::Theme => overrides.theme = Some(parsed.value),
            ConfigOverrideTarget::Alias(name) => {
                overrides.aliases.insert(name, parsed.value);
            }
        }
    }
    Ok(overrides)
}

/// Replaces a leading alias with its configured expansion.
pub fn expand_alias(
    args: Vec<String>,
    aliases: &HashMap<String, String>,
) -> Result<Vec<String>, AppError> {
    let Some(first) = args.first() else {
        return Ok(args);
    };
    let Some(expansion) = aliases.get(first) else {
        return Ok(args);
    };

    let mut expanded = split_command_line(expansion)?;
    if expanded.is_empty() {
        return Err(AppError::invalid_input(format!("alias '{first}' is empty")));
    }
    expanded.extend(args.into_iter().skip(1));
    Ok(expanded)
}

pub fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            quoted = true;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() || quoted {
                args.push(std::mem::take(&mut current));
                quoted = false;
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() || quoted {
        args.push(current);
    }

    Ok(args)
}
