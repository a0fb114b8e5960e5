//! Notification composer
//!
//! Pure string construction for the three message shapes (diff, summary,
//! acquisition alert) plus the host header every outbound message carries.
//! Text targets Telegram's legacy `Markdown` parse mode: anything that did
//! not come from this module goes inside a code span.

use crate::diff::StateDiff;
use crate::state::RetainedState;
use std::fmt::Write;

pub const DIFF_HEADER: &str = "Disk health status has changed!";
pub const NO_ACTIVE_PROBLEMS: &str = "✅ Test complete. No active problems found.";

/// Wrap free text in a code span. A backtick cannot be escaped inside one,
/// so it is replaced.
pub fn code_span(text: &str) -> String {
    format!("`{}`", text.replace('`', "'"))
}

/// Message for a detected change. `recovered_from` is the previous
/// acquisition failure text when the probe works again.
pub fn diff_message(diff: &StateDiff, recovered_from: Option<&str>) -> String {
    let mut message = String::new();
    let _ = write!(message, "{}\n\n", DIFF_HEADER);

    if let Some(failure) = recovered_from {
        let _ = write!(
            message,
            "🟢 *Health probe recovered:*\n{} no longer occurs.\n\n",
            code_span(failure)
        );
    }

    for record in &diff.changed_or_new {
        let _ = write!(
            message,
            "🔴 *Problem Detected/Changed:*\n{}\n\n",
            code_span(&record.description)
        );
    }

    // The key is the "Disk[id](Model)" prefix, enough to name the device
    for device_key in &diff.resolved {
        let _ = write!(
            message,
            "🟢 *Problem Resolved:*\n{} is now OK.\n\n",
            code_span(device_key)
        );
    }

    message
}

/// Full current-state summary for on-demand checks
pub fn summary_message(state: &RetainedState) -> String {
    match state {
        RetainedState::AcquisitionFailed(failure) => format!(
            "⚠️ Test complete. Current problems are unknown, the health probe is failing:\n\n{}",
            code_span(failure)
        ),
        RetainedState::Problems(problems) if problems.is_empty() => NO_ACTIVE_PROBLEMS.to_string(),
        RetainedState::Problems(problems) => {
            let lines: Vec<String> = problems
                .records()
                .map(|r| code_span(&r.description))
                .collect();
            format!("ℹ️ Test complete. Current active problems:\n\n{}", lines.join("\n"))
        }
    }
}

/// Alert sent when the health source itself fails
pub fn acquisition_alert(failure: &str) -> String {
    format!("⚠️ *Failed to run health probe:*\n{}", code_span(failure))
}

/// Prefix identifying the originating host
pub fn with_host_header(host: &str, body: &str) -> String {
    format!("🖥️ *Host:* {}\n\n{}", code_span(host), body)
}
