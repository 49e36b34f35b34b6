mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use cli::{Cli, Command, FilterArgs};
use taskdesk::app::{parse_due_date, App};
use taskdesk::config::Config;
use taskdesk::export::ExportFormat;
use taskdesk::model::{Priority, Status, TaskView};
use taskdesk::output;
use taskdesk::query::{DateFilter, SortField, SortOrder, TaskFilter, TaskSort};

fn init_logging(config: &Config) {
    // RUST_LOG overrides the configured level.
    env_logger::Builder::new()
        .filter_level(config.log_level())
        .parse_default_env()
        .format_timestamp_secs()
        .init();
}

fn ensure_db_dir(db_path: &str) -> Result<()> {
    if db_path == ":memory:" {
        return Ok(());
    }
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_tasks(tasks: &[TaskView], json: bool) -> Result<()> {
    if json {
        print_json(&tasks)
    } else {
        print!("{}", output::format_task_list(tasks));
        Ok(())
    }
}

fn build_filter(args: FilterArgs) -> Result<TaskFilter> {
    let mut filter = TaskFilter {
        search: args.search,
        archived: match (args.archived, args.all) {
            (true, _) => Some(true),
            (false, true) => None,
            (false, false) => Some(false),
        },
        ..TaskFilter::default()
    };
    if let Some(status) = args.status {
        filter = filter.status(Status::parse(&status)?);
    }
    if let Some(priority) = args.priority {
        filter = filter.priority(Priority::parse(&priority)?);
    }
    if let Some(date) = args.date {
        filter = filter.date(DateFilter::parse(&date)?);
    }
    if let Some(from) = args.due_from {
        filter.due_from = parse_due_date(&from)?;
    }
    if let Some(to) = args.due_to {
        // Inclusive of the whole end day.
        filter.due_to = parse_due_date(&to)?
            .map(|d| d + chrono::Duration::days(1) - chrono::Duration::microseconds(1));
    }
    Ok(filter)
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load config")?;
    init_logging(&config);

    if let Some(db) = cli.db {
        config.database.path = Some(db);
    }
    let db_path = config.db_path();
    ensure_db_dir(&db_path)?;
    let app = App::open(&config).with_context(|| format!("failed to open {db_path}"))?;

    match cli.command {
        Command::Init => {
            eprintln!("Initialized database at {db_path}");
        }

        Command::Add {
            title,
            desc,
            priority,
            due,
        } => {
            let view = app.create_task(&title, &desc, &priority, &due)?;
            println!("{}", view.task.id);
            eprintln!("Added task {} '{}'", view.task.id, view.task.title);
        }

        Command::Edit {
            id,
            title,
            desc,
            priority,
            due,
        } => {
            let current = app.get_task(id)?.task;
            let due = match due {
                Some(d) => d,
                None => current
                    .due_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            };
            let view = app.update_task(
                id,
                title.as_deref().unwrap_or(&current.title),
                desc.as_deref().unwrap_or(&current.description),
                priority.as_deref().unwrap_or(current.priority.as_str()),
                &due,
            )?;
            eprintln!("Updated task {id} '{}'", view.task.title);
        }

        Command::Rm { id } => {
            app.delete_task(id)?;
            eprintln!("Removed task {id}");
        }

        Command::Show { id, json } => {
            let view = app.get_task(id)?;
            if json {
                print_json(&view)?;
            } else {
                print!("{}", output::format_task_detail(&view));
            }
        }

        Command::List {
            filter,
            sort,
            order,
            page,
            page_size,
            json,
        } => {
            let filter = build_filter(filter)?;
            let sort = TaskSort::new(SortField::parse(&sort)?, SortOrder::parse(&order)?);
            match page {
                Some(page) => {
                    let size = page_size.unwrap_or(config.page_size() as i64);
                    let result = app.get_tasks_page(&filter, &sort, page, size)?;
                    if json {
                        print_json(&result)?;
                    } else {
                        print!("{}", output::format_page(&result));
                    }
                }
                None => print_tasks(&app.get_tasks(&filter, &sort)?, json)?,
            }
        }

        Command::Toggle { id } => {
            let view = app.toggle_status(id)?;
            eprintln!("Task {id} is now {}", view.task.status);
        }

        Command::Archive { id } => {
            app.archive_task(id)?;
            eprintln!("Archived task {id}");
        }

        Command::Archived { json } => print_tasks(&app.get_archived_tasks()?, json)?,

        Command::Stats { json } => {
            let stats = app.get_stats()?;
            if json {
                print_json(&stats)?;
            } else {
                print!("{}", output::format_stats(&stats));
            }
        }

        Command::Dashboard { json } => {
            let dash = app.get_dashboard_stats()?;
            if json {
                print_json(&dash)?;
            } else {
                print!("{}", output::format_dashboard(&dash));
            }
        }

        Command::Completion { period, json } => {
            let report = app.get_completion_rate(&period)?;
            if json {
                print_json(&report)?;
            } else {
                print!("{}", output::format_completion(&report));
            }
        }

        Command::Overdue { json } => print_tasks(&app.get_overdue_tasks()?, json)?,

        Command::High { json } => print_tasks(&app.get_high_priority_tasks()?, json)?,

        Command::ByPriority { json } => {
            let groups = app.get_tasks_by_priority()?;
            if json {
                print_json(&groups)?;
            } else {
                print!("{}", output::format_priority_groups(&groups));
            }
        }

        Command::Export {
            filter,
            format,
            output,
        } => {
            let format = ExportFormat::parse(&format)?;
            let rendered = app.export(format, &build_filter(filter)?)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!("Exported to {}", path.display());
                }
                None => print!("{rendered}"),
            }
        }

        Command::Health => {
            let health = app.health_check();
            print_json(&health)?;
            if health.status != "ok" {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
