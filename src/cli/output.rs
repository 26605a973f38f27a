//! CLI output formatting
//!
//! Provides colored output, spinners, and formatting utilities.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Output helper for consistent CLI formatting
pub struct Output;

impl Output {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue(), message);
    }

    /// Print a header
    pub fn header(message: &str) {
        println!("\n{}", message.bold());
    }

    /// Print the banner opening a workflow
    pub fn banner(title: &str) {
        println!("\n\n{}", banner_line(title).bold());
    }

    /// Echo the arguments a workflow runs with
    pub fn args(pairs: &[(&str, String)]) {
        println!("{}", "Args:".dimmed());
        for (key, value) in pairs {
            Self::kv(key, value);
        }
    }

    /// Print a key-value pair
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", key.dimmed(), value);
    }

    /// Print a list item
    pub fn list_item(item: &str) {
        println!("  • {}", item);
    }

    /// Create a spinner with a message
    pub fn spinner(message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("hardcoded template must be valid")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    /// Format a repo name consistently
    pub fn repo_name(name: &str) -> String {
        name.cyan().bold().to_string()
    }

    /// Format a branch name consistently
    pub fn branch_name(name: &str) -> String {
        name.magenta().to_string()
    }

    /// Format a file outcome or run status
    pub fn status(status: &str) -> String {
        match status.to_lowercase().as_str() {
            "created" | "success" => status.green().to_string(),
            "updated" => status.yellow().to_string(),
            "unchanged" | "skipped" => status.dimmed().to_string(),
            "failed" | "failure" => status.red().to_string(),
            _ => status.to_string(),
        }
    }
}

/// Title centered in an 80-column rule of `=`
pub fn banner_line(title: &str) -> String {
    format!("{:=^80}", format!(" {} ", title))
}

/// Table builder for formatted output
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    column_widths: Vec<usize>,
}

impl Table {
    /// Create a new table with headers
    pub fn new(headers: Vec<&str>) -> Self {
        let headers: Vec<String> = headers.into_iter().map(|s| s.to_string()).collect();
        let column_widths = headers.iter().map(|h| h.chars().count()).collect();
        Self {
            headers,
            rows: Vec::new(),
            column_widths,
        }
    }

    /// Add a row to the table
    pub fn add_row(&mut self, row: Vec<String>) {
        for (i, cell) in row.iter().enumerate() {
            if i < self.column_widths.len() {
                self.column_widths[i] = self.column_widths[i].max(cell.chars().count());
            }
        }
        self.rows.push(row);
    }

    fn render_row(&self, row: &[String]) -> String {
        row.iter()
            .enumerate()
            .map(|(i, cell)| {
                let width = self.column_widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = width)
            })
            .collect::<Vec<_>>()
            .join("  ")
    }

    /// Print the table
    pub fn print(&self) {
        println!("{}", self.render_row(&self.headers).bold());

        let sep_line: String = self
            .column_widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  ");
        println!("{}", sep_line.dimmed());

        for row in &self.rows {
            println!("{}", self.render_row(row));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_line_is_centered() {
        let line = banner_line("Syncing template");
        assert_eq!(line.chars().count(), 80);
        assert!(line.starts_with("===="));
        assert!(line.contains(" Syncing template "));
    }

    #[test]
    fn test_table_widths_follow_longest_cell() {
        let mut table = Table::new(vec!["Repo", "Created"]);
        table.add_row(vec!["INF1007/hw1-alice".to_string(), "2".to_string()]);
        assert_eq!(table.column_widths, vec![17, 7]);
        assert_eq!(
            table.render_row(&["a".to_string(), "1".to_string()]),
            format!("{:17}  {:7}", "a", "1")
        );
        table.print();
    }
}
