//! Task exports: CSV, JSON and a standalone HTML report. All three take
//! already-filtered rows; nothing here touches storage.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::TaskView;
use crate::query::TaskFilter;

pub const CSV_HEADER: [&str; 10] = [
    "ID",
    "Title",
    "Description",
    "Status",
    "Priority",
    "Due Date",
    "Created At",
    "Updated At",
    "Completed At",
    "Is Overdue",
];

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Html,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "html" => Ok(Self::Html),
            _ => Err(Error::validation(
                "export format",
                format!("'{s}' must be csv, json, or html"),
            )),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Html => "html",
        }
    }
}

pub fn render(
    format: ExportFormat,
    tasks: &[TaskView],
    filter: &TaskFilter,
    now: DateTime<Utc>,
) -> Result<String> {
    match format {
        ExportFormat::Csv => Ok(to_csv(tasks)),
        ExportFormat::Json => to_json(tasks, filter, now),
        ExportFormat::Html => Ok(to_html(tasks, filter, now)),
    }
}

fn fmt_ts(ts: Option<&DateTime<Utc>>) -> String {
    ts.map(|t| t.format(TS_FORMAT).to_string())
        .unwrap_or_default()
}

/// Quote a field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn push_csv_row<I, S>(out: &mut String, fields: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let row: Vec<String> = fields.into_iter().map(|f| csv_field(f.as_ref())).collect();
    out.push_str(&row.join(","));
    out.push_str("\r\n");
}

pub fn to_csv(tasks: &[TaskView]) -> String {
    let mut out = String::new();
    push_csv_row(&mut out, CSV_HEADER);
    for view in tasks {
        let t = &view.task;
        push_csv_row(
            &mut out,
            [
                t.id.to_string(),
                t.title.clone(),
                t.description.clone(),
                t.status.to_string(),
                t.priority.to_string(),
                fmt_ts(t.due_date.as_ref()),
                fmt_ts(Some(&t.created_at)),
                fmt_ts(Some(&t.updated_at)),
                fmt_ts(t.completed_at.as_ref()),
                view.is_overdue.to_string(),
            ],
        );
    }
    out
}

#[derive(Serialize)]
struct JsonExport<'a> {
    exported_at: DateTime<Utc>,
    filter: &'a TaskFilter,
    count: usize,
    tasks: &'a [TaskView],
}

pub fn to_json(tasks: &[TaskView], filter: &TaskFilter, now: DateTime<Utc>) -> Result<String> {
    let doc = JsonExport {
        exported_at: now,
        filter,
        count: tasks.len(),
        tasks,
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<title>Tasks Report</title>
<style>
body { font-family: sans-serif; margin: 20px; }
.filter-info { background: #f5f5f5; padding: 10px; margin-bottom: 20px; }
table { width: 100%; border-collapse: collapse; }
th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
th { background-color: #f2f2f2; }
.status-completed { color: #28a745; }
.priority-high { color: #dc3545; font-weight: bold; }
.overdue { background-color: #ffebee; }
</style>
</head>
<body>
"#;

pub fn to_html(tasks: &[TaskView], filter: &TaskFilter, now: DateTime<Utc>) -> String {
    let mut out = String::from(HTML_HEAD);
    out.push_str("<h1>Tasks Report</h1>\n");
    out.push_str(&format!(
        "<p>Generated on: {}</p>\n<p>Total tasks: {}</p>\n",
        now.format(TS_FORMAT),
        tasks.len()
    ));

    out.push_str("<div class=\"filter-info\">\n<h3>Applied Filters:</h3>\n");
    if let Some(status) = filter.status {
        out.push_str(&format!("<p>Status: {status}</p>\n"));
    }
    if let Some(priority) = filter.priority {
        out.push_str(&format!("<p>Priority: {priority}</p>\n"));
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        out.push_str(&format!("<p>Search: {}</p>\n", escape_html(search)));
    }
    out.push_str("</div>\n");

    out.push_str(
        "<table>\n<thead>\n<tr><th>ID</th><th>Title</th><th>Status</th>\
         <th>Priority</th><th>Due Date</th><th>Created</th></tr>\n</thead>\n<tbody>\n",
    );
    for view in tasks {
        let t = &view.task;
        let row_class = if view.is_overdue { "overdue" } else { "" };
        let due = t
            .due_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        out.push_str(&format!(
            "<tr class=\"{row_class}\"><td>{}</td><td>{}</td>\
             <td class=\"status-{status}\">{status}</td>\
             <td class=\"priority-{priority}\">{priority}</td>\
             <td>{due}</td><td>{}</td></tr>\n",
            t.id,
            escape_html(&t.title),
            t.created_at.format("%Y-%m-%d"),
            status = t.status,
            priority = t.priority,
        ));
    }
    out.push_str("</tbody>\n</table>\n</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, Status, Task};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, 10, 0, 0).unwrap()
    }

    fn view(id: i64, title: &str, description: &str, overdue: bool) -> TaskView {
        TaskView {
            task: Task {
                id,
                title: title.into(),
                description: description.into(),
                status: Status::Active,
                priority: Priority::High,
                due_date: Some(Utc.with_ymd_and_hms(2026, 8, 30, 0, 0, 0).unwrap()),
                archived: false,
                created_at: Utc.with_ymd_and_hms(2026, 8, 1, 9, 30, 0).unwrap(),
                updated_at: Utc.with_ymd_and_hms(2026, 8, 2, 9, 30, 0).unwrap(),
                completed_at: None,
            },
            is_overdue: overdue,
        }
    }

    #[test]
    fn csv_has_header_and_rows() {
        let csv = to_csv(&[view(1, "Buy milk", "", true)]);
        let lines: Vec<&str> = csv.split("\r\n").collect();
        assert_eq!(
            lines[0],
            "ID,Title,Description,Status,Priority,Due Date,Created At,Updated At,Completed At,Is Overdue"
        );
        assert_eq!(
            lines[1],
            "1,Buy milk,,active,high,2026-08-30 00:00:00,2026-08-01 09:30:00,2026-08-02 09:30:00,,true"
        );
        assert_eq!(lines[2], "");
    }

    #[test]
    fn csv_quotes_special_fields() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");

        let csv = to_csv(&[view(2, "eggs, bread", "x", false)]);
        assert!(csv.contains("2,\"eggs, bread\",x,"));
    }

    #[test]
    fn json_wraps_rows_with_metadata() {
        let filter = TaskFilter::default().status(Status::Active);
        let json = to_json(&[view(1, "a", "", false), view(2, "b", "", true)], &filter, now())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["count"], 2);
        assert_eq!(value["filter"]["status"], "active");
        assert_eq!(value["tasks"][1]["is_overdue"], true);
        assert_eq!(value["tasks"][0]["title"], "a");
        assert!(value["exported_at"].as_str().unwrap().starts_with("2026-09-01T10:00:00"));
    }

    #[test]
    fn html_escapes_user_text() {
        let filter = TaskFilter::default().search("<b>");
        let html = to_html(&[view(1, "<script>alert('x')</script>", "", true)], &filter, now());
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("<p>Search: &lt;b&gt;</p>"));
        assert!(html.contains("<tr class=\"overdue\">"));
        assert!(html.contains("<p>Total tasks: 1</p>"));
    }

    #[test]
    fn format_names() {
        assert_eq!(ExportFormat::parse("CSV").unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::parse("html").unwrap().extension(), "html");
        assert!(ExportFormat::parse("pdf").is_err());
    }
}
