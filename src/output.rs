//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! Output is **quote-centric**. The primary line for every entry is the
//! affirmation itself or its area, with ids, permalinks, and counters shown
//! as indented context lines underneath.
//!
//! # Output Format
//!
//! ## Card (interactive session)
//!
//! ```text
//! Filed under: SEO
//!     "Sitemaps are suggestions."
//!     https://marketeraffirmations.com/a/seo/01g5xz8j
//! [Affirm Me]  next · area · copy · download · share · link · help · quit
//! ```
//!
//! ## Areas
//!
//! ```text
//! Areas
//! 001 General (6)  *
//! 002 Agency (2)
//! ```
//!
//! ## Check
//!
//! ```text
//! affirmations.json
//!     Records: 19
//!     Entries: 25
//!     001 General (6)
//!     ...
//!     Collisions: none
//! ```
//!
//! ## Top
//!
//! ```text
//! 001 01g5xz8j seo
//!     Shares: 4, Downloads: 6, Total: 10
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>` or `String`)
//! for testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::area::Area;
use crate::content::Pool;
use crate::permalink::IdIndex;
use crate::session::CurrentSelection;
use crate::store::TopEntry;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{head}...")
    }
}

fn area_line(index: usize, area: Area, count: usize) -> String {
    format!("{} {} ({})", format_index(index), area.menu_label(), count)
}

// ============================================================================
// Notices
// ============================================================================

/// A transient notice such as `Copied` or `Download failed`.
pub fn format_notice(message: &str) -> String {
    format!("» {message}")
}

pub fn print_notice(message: &str) {
    println!("{}", format_notice(message));
}

/// A step of a one-shot command, such as `==> Checking affirmations.json`.
pub fn format_status(message: &str) -> String {
    format!("==> {message}")
}

pub fn print_status(message: &str) {
    println!("{}", format_status(message));
}

// ============================================================================
// Card
// ============================================================================

pub const COMMAND_HINT: &str = "next · area · copy · download · share · link · help · quit";

pub fn format_card(
    selection: &CurrentSelection,
    permalink: Option<&str>,
    button: &str,
) -> Vec<String> {
    let mut lines = vec![
        format!("Filed under: {}", selection.area.filed_under_label()),
        format!("{}\"{}\"", indent(1), selection.text),
    ];
    if let Some(url) = permalink {
        lines.push(format!("{}{}", indent(1), url));
    }
    lines.push(format!("[{button}]  {COMMAND_HINT}"));
    lines
}

pub fn print_card(selection: &CurrentSelection, permalink: Option<&str>, button: &str) {
    println!();
    for line in format_card(selection, permalink, button) {
        println!("{}", line);
    }
}

/// The placeholder shown while an unresolved permalink is on screen.
pub fn format_placeholder(text: &str) -> Vec<String> {
    vec![format!("{}{}", indent(1), text)]
}

pub fn print_placeholder(text: &str) {
    for line in format_placeholder(text) {
        println!("{}", line);
    }
}

pub fn format_help() -> Vec<String> {
    [
        ("next", "show another affirmation (also: Enter)"),
        ("area <key>", "switch area, keeping the quote on screen"),
        ("areas", "list areas"),
        ("copy", "copy the quote, attribution, and link"),
        ("download", "save the card as a PNG"),
        ("share", "share the card"),
        ("link", "print the permalink"),
        ("quit", "leave"),
    ]
    .into_iter()
    .map(|(command, what)| format!("{}{:<12}{}", indent(1), command, what))
    .collect()
}

pub fn print_help() {
    for line in format_help() {
        println!("{}", line);
    }
}

// ============================================================================
// Areas
// ============================================================================

/// Area menu with entry counts; the selected area is starred.
pub fn format_areas(pool: &Pool, selected: Option<Area>) -> Vec<String> {
    let mut lines = vec!["Areas".to_string()];
    for (pos, (area, count)) in pool.counts().into_iter().enumerate() {
        let mut line = area_line(pos + 1, area, count);
        if selected == Some(area) {
            line.push_str("  *");
        }
        lines.push(line);
        lines.push(format!("{}key: {}", indent(1), area.key()));
    }
    lines
}

pub fn print_areas(pool: &Pool, selected: Option<Area>) {
    for line in format_areas(pool, selected) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Content report: record and entry counts, per-area counts, id collisions.
pub fn format_check_report(
    source: &str,
    records: usize,
    pool: &Pool,
    index: &IdIndex,
) -> Vec<String> {
    let mut lines = vec![
        source.to_string(),
        format!("{}Records: {}", indent(1), records),
        format!("{}Entries: {}", indent(1), pool.len()),
    ];
    for (pos, (area, count)) in pool.counts().into_iter().enumerate() {
        lines.push(format!("{}{}", indent(1), area_line(pos + 1, area, count)));
    }
    if index.collisions().is_empty() {
        lines.push(format!("{}Collisions: none", indent(1)));
    } else {
        lines.push(format!(
            "{}Collisions: {}",
            indent(1),
            index.collisions().len()
        ));
        for (id, area, text) in index.collisions() {
            lines.push(format!(
                "{}{} {} \"{}\"",
                indent(2),
                id,
                area,
                truncate_text(text, 40)
            ));
        }
    }
    lines
}

pub fn print_check_report(source: &str, records: usize, pool: &Pool, index: &IdIndex) {
    for line in format_check_report(source, records, pool, index) {
        println!("{}", line);
    }
}

// ============================================================================
// Id
// ============================================================================

pub fn format_id(area: Area, id: &str, permalink: &str) -> Vec<String> {
    vec![
        id.to_string(),
        format!("{}Area: {}", indent(1), area.key()),
        format!("{}Permalink: {}", indent(1), permalink),
    ]
}

pub fn print_id(area: Area, id: &str, permalink: &str) {
    for line in format_id(area, id, permalink) {
        println!("{}", line);
    }
}

// ============================================================================
// Top
// ============================================================================

pub fn format_top(entries: &[TopEntry]) -> Vec<String> {
    if entries.is_empty() {
        return vec!["No engagement recorded yet".to_string()];
    }
    entries
        .iter()
        .enumerate()
        .flat_map(|(pos, entry)| {
            [
                format!("{} {} {}", format_index(pos + 1), entry.id, entry.area),
                format!(
                    "{}Shares: {}, Downloads: {}, Total: {}",
                    indent(1),
                    entry.shares,
                    entry.downloads,
                    entry.total
                ),
            ]
        })
        .collect()
}

pub fn print_top(entries: &[TopEntry]) {
    for line in format_top(entries) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
