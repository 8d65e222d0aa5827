//! Output formatting for audit snapshots

use nimbus_core::{AuditSnapshot, Result};

/// Format an audit snapshot as text
pub fn format_text(snapshot: &AuditSnapshot, show_resources: bool) -> String {
    let mut output = String::new();

    // Header
    output.push_str(&format!("Nimbus Cloud Posture Audit\n{}\n\n", "=".repeat(26)));

    output.push_str(&format!("State: {}\n", snapshot.state));
    output.push_str(&format!(
        "Progress: {}/{} ({}%)\n",
        snapshot.completed,
        snapshot.total,
        snapshot.percent_complete()
    ));
    if let Some(duration) = snapshot.duration() {
        output.push_str(&format!(
            "Duration: {:.1}s\n",
            duration.num_milliseconds() as f64 / 1000.0
        ));
    }
    output.push('\n');

    // Summary
    output.push_str("Summary\n-------\n");
    output.push_str(&format!("Resources Reported: {}\n", snapshot.resource_count()));
    output.push_str(&format!("Degraded Checks: {}\n\n", snapshot.degraded_count()));

    // Per-check results
    output.push_str("Checks\n------\n");
    for (index, slot) in snapshot.results.iter().enumerate() {
        match slot {
            Some(result) => {
                let marker = if result.is_degraded() { "!" } else { "+" };
                output.push_str(&format!(
                    "[{}] {:>2}. {} / {}: {} resources\n",
                    marker,
                    index,
                    result.category,
                    result.check_name,
                    result.resources.len()
                ));
                if result.is_degraded() {
                    output.push_str(&format!("        Notes: {}\n", result.notes));
                }
                if show_resources {
                    for resource in &result.resources {
                        let cell = resource.to_cell().unwrap_or_else(|e| e.to_string());
                        output.push_str(&format!("        - {}\n", cell));
                    }
                }
            }
            None => output.push_str(&format!("[ ] {:>2}. pending\n", index)),
        }
    }

    output
}

/// Format an audit snapshot as JSON
pub fn format_json(snapshot: &AuditSnapshot, pretty: bool) -> Result<String> {
    if pretty {
        serde_json::to_string_pretty(snapshot).map_err(Into::into)
    } else {
        serde_json::to_string(snapshot).map_err(Into::into)
    }
}
