use std::fs;
use std::path::Path;

use serde::Serialize;
use threadloom_core::{parse_rows, ThreadPlan};

use crate::commands::{CommandResult, EXIT_INPUT};

#[derive(Debug, Serialize)]
struct PreviewOutcome<'a> {
    command: &'static str,
    status: &'static str,
    source: String,
    thread_count: usize,
    message_count: usize,
    plan: &'a ThreadPlan,
}

/// Builds the thread plan for a local CSV exactly as an upload would,
/// without any platform calls.
pub fn run(
    path: &Path,
    uploader: &str,
    rows_per_message: usize,
    json_output: bool,
) -> CommandResult {
    let payload = match fs::read_to_string(path) {
        Ok(payload) => payload,
        Err(error) => {
            return CommandResult::failure(
                "preview",
                "input_read",
                format!("could not read `{}`: {error}", path.display()),
                EXIT_INPUT,
            );
        }
    };

    let rows = match parse_rows(&payload) {
        Ok(rows) => rows,
        Err(error) => {
            return CommandResult::failure(
                "preview",
                "csv_parse",
                format!("`{}`: {error}", path.display()),
                EXIT_INPUT,
            );
        }
    };

    let plan = ThreadPlan::build(uploader, rows, rows_per_message.max(1));

    let output = if json_output {
        let outcome = PreviewOutcome {
            command: "preview",
            status: "ok",
            source: path.display().to_string(),
            thread_count: plan.thread_count(),
            message_count: plan.message_count(),
            plan: &plan,
        };
        match serde_json::to_string_pretty(&outcome) {
            Ok(output) => output,
            Err(error) => {
                return CommandResult::failure("preview", "serialization", error.to_string(), 1);
            }
        }
    } else {
        render_human(&plan)
    };

    CommandResult { exit_code: 0, output }
}

fn render_human(plan: &ThreadPlan) -> String {
    if plan.is_empty() {
        return "preview: no rows carry an owner, nothing would be posted".to_string();
    }

    let mut lines = vec![format!(
        "preview: {} thread(s), {} message(s)",
        plan.thread_count(),
        plan.message_count()
    )];

    for channel in &plan.channels {
        lines.push(format!("#{}", channel.channel_key));
        for thread in &channel.threads {
            lines.push(format!(
                "  - {} ({} row(s), {} message(s))",
                thread.title,
                thread.row_count,
                thread.messages.len()
            ));
        }
        for rejected in &channel.rejected {
            lines.push(format!(
                "  ! {}-{} rejected: {}",
                rejected.identity, rejected.deadline, rejected.reason
            ));
        }
    }

    lines.join("\n")
}
