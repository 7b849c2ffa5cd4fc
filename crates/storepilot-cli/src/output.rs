use std::fmt::Write as _;
use std::path::Path;

use storepilot_config::AppConfig;
use storepilot_db::{EventEntry, TraceEntry};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn event_line(entry: &EventEntry) -> String {
    let time = entry.time.format(TIME_FORMAT);
    let user = entry
        .user_id
        .as_ref()
        .map(|u| format!(" user {u}"))
        .unwrap_or_default();
    match (&entry.event, &entry.prompt, &entry.reply) {
        (Some(event), _, _) => format!("[{time}]{user}: {event}"),
        (None, Some(prompt), reply) => format!(
            "[{time}]{user}\n  > {prompt}\n  < {}",
            reply.as_deref().unwrap_or_default()
        ),
        (None, None, _) => format!("[{time}]{user}"),
    }
}

pub fn trace_line(entry: &TraceEntry) -> String {
    format!(
        "[{}] {}: {}",
        entry.time.format(TIME_FORMAT),
        entry.direction.as_str().to_uppercase(),
        entry.content
    )
}

/// Settings checklist for `storepilot check`. Only presence is shown.
pub fn check_report(config: &AppConfig, db_path: &Path) -> String {
    let mut report = String::new();
    for (name, present) in config.presence() {
        let mark = if present { "ok" } else { "missing" };
        let _ = writeln!(report, "{name:<24} {mark}");
    }
    let _ = writeln!(report, "{:<24} {}", "assistant.base_url", config.assistant.base_url);
    let _ = writeln!(report, "{:<24} {}", "debug", config.debug);
    let _ = writeln!(report, "{:<24} {}", "database", db_path.display());
    match config.ensure_task_ready() {
        Ok(()) => report.push_str("Ready to run tasks.\n"),
        Err(_) => {
            let _ = writeln!(report, "{}", storepilot_config::MISSING_CREDENTIALS_NOTICE);
        }
    }
    if let Err(e) = config.ensure_store_ready() {
        let _ = writeln!(report, "Store requests will fail: {e}");
    }
    report
}
