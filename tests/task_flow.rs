use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use taskdesk::app::App;
use taskdesk::clock::ManualClock;
use taskdesk::config::Config;
use taskdesk::export::ExportFormat;
use taskdesk::model::{Priority, Status};
use taskdesk::query::{SortField, SortOrder, TaskFilter, TaskSort};
use taskdesk::Error;

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap(),
    ))
}

#[test]
fn create_toggle_dashboard_delete() {
    let app = App::in_memory(clock()).unwrap();

    let created = app.create_task("Buy milk", "", "high", "").unwrap();
    let id = created.task.id;
    assert!(id > 0);
    assert_eq!(created.task.status, Status::Active);
    assert_eq!(created.task.priority, Priority::High);

    let toggled = app.toggle_status(id).unwrap();
    assert_eq!(toggled.task.status, Status::Completed);
    assert!(toggled.task.completed_at.is_some());

    let dash = app.get_dashboard_stats().unwrap();
    assert!(dash.status_breakdown[&Status::Completed] >= 1);

    app.delete_task(id).unwrap();
    assert!(matches!(app.get_task(id), Err(Error::NotFound { .. })));
}

#[test]
fn stats_stay_consistent_through_a_session() {
    let clock = clock();
    let app = App::in_memory(clock.clone()).unwrap();

    let mut ids = Vec::new();
    for (i, priority) in ["low", "medium", "high", "", "urgent"].iter().enumerate() {
        let due = if i % 2 == 0 { "2026-10-18" } else { "" };
        ids.push(app.create_task(&format!("task {i}"), "", priority, due).unwrap().task.id);
    }
    app.toggle_status(ids[0]).unwrap();
    app.toggle_status(ids[3]).unwrap();

    let stats = app.get_stats().unwrap();
    assert_eq!(stats.total_tasks, 5);
    assert_eq!(stats.total_tasks, stats.active_tasks + stats.completed_tasks);
    assert_eq!(stats.completed_tasks, 2);
    assert_eq!(stats.week_tasks, 2);

    clock.advance(Duration::days(3));
    let stats = app.get_stats().unwrap();
    assert_eq!(stats.overdue_tasks, 2);
    assert_eq!(app.get_overdue_tasks().unwrap().len(), 2);

    let groups = app.get_tasks_by_priority().unwrap();
    assert_eq!(groups[&Priority::Medium].len(), 2);
    assert_eq!(groups[&Priority::High].len(), 1);
    assert!(groups[&Priority::Low].is_empty());
}

#[test]
fn paging_through_a_filtered_listing() {
    let app = App::in_memory(clock()).unwrap();
    for i in 0..7 {
        let priority = if i % 2 == 0 { "high" } else { "low" };
        app.create_task(&format!("item {i}"), "", priority, "").unwrap();
    }
    let filter = TaskFilter::default().priority(Priority::High).archived(false);
    let sort = TaskSort::new(SortField::Title, SortOrder::Asc);

    let first = app.get_tasks_page(&filter, &sort, 1, 3).unwrap();
    assert_eq!(first.total_count, 4);
    let titles: Vec<_> = first.tasks.iter().map(|v| v.task.title.as_str()).collect();
    assert_eq!(titles, vec!["item 0", "item 2", "item 4"]);

    let beyond = app.get_tasks_page(&filter, &sort, 5, 3).unwrap();
    assert!(beyond.tasks.is_empty());
    assert_eq!(beyond.total_count, 4);
}

#[test]
fn completed_tasks_resist_renaming_but_take_notes() {
    let app = App::in_memory(clock()).unwrap();
    let id = app.create_task("Write report", "", "medium", "").unwrap().task.id;
    app.toggle_status(id).unwrap();

    let err = app
        .update_task(id, "Rewrite report", "", "medium", "")
        .unwrap_err();
    assert_eq!(err.code(), "conflict");

    let updated = app
        .update_task(id, "Write report", "sent on Friday", "medium", "")
        .unwrap();
    assert_eq!(updated.task.description, "sent on Friday");
}

#[test]
fn file_backed_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.database.path = Some(dir.path().join("tasks.db").to_string_lossy().into_owned());

    let id = {
        let app = App::open(&config).unwrap();
        app.create_task("persisted", "kept on disk", "low", "").unwrap().task.id
    };

    let app = App::open(&config).unwrap();
    let view = app.get_task(id).unwrap();
    assert_eq!(view.task.title, "persisted");
    assert_eq!(view.task.description, "kept on disk");
    assert_eq!(app.health_check().status, "ok");
}

#[test]
fn export_json_lists_visible_tasks() {
    let app = App::in_memory(clock()).unwrap();
    app.create_task("one", "", "low", "").unwrap();
    app.create_task("two", "", "high", "").unwrap();

    let json = app
        .export(ExportFormat::Json, &TaskFilter::default().archived(false))
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["count"], 2);
    assert_eq!(value["tasks"][0]["title"], "two");
}
