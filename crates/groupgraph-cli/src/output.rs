//! Terminal output formatting.

use chrono::{DateTime, Utc};
use colored::Colorize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use groupgraph_core::model::Group;

/// Print groups as a table.
pub fn print_groups_table(groups: &[Group]) {
    if groups.is_empty() {
        println!("{}", "No groups found.".dimmed());
        return;
    }

    println!("{:<12} {:<32} {:>8} {:>9} {:<16}", "ID", "Name", "Members", "Messages", "Last message");
    println!("{}", "─".repeat(81));

    for group in groups {
        let name = truncate_visual(&group.name, 30);
        let padding = 32usize.saturating_sub(UnicodeWidthStr::width(name.as_str()));
        println!(
            "{:<12} {}{} {:>8} {:>9} {:<16}",
            group.id.cyan(),
            name,
            " ".repeat(padding),
            member_cell(group),
            group.messages.count,
            format_timestamp(group.messages.last_message_created_at).dimmed()
        );
    }

    println!("\n{} groups", groups.len().to_string().bold());
}

/// Roster size, or `-` when the listing left the roster out.
fn member_cell(group: &Group) -> String {
    if group.has_roster() {
        group.members.len().to_string()
    } else {
        "-".to_string()
    }
}

/// Render unix seconds as `YYYY-MM-DD HH:MM` (UTC); `-` for zero or out of range.
pub fn format_timestamp(secs: i64) -> String {
    if secs == 0 {
        return "-".to_string();
    }
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Truncate a string to fit within `max_width` terminal columns.
pub fn truncate_visual(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    if max_width <= 3 {
        return ".".repeat(max_width);
    }
    let mut result = String::new();
    let mut current_width = 0;
    for ch in s.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if current_width + ch_width > max_width - 2 {
            break;
        }
        result.push(ch);
        current_width += ch_width;
    }
    result.push_str("..");
    result
}
