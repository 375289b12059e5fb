//! Live terminal table

use super::{batch_header_lines, export_all, row_prefix, table_head, OutputSink};
use crate::error::Result;
use crate::models::{Batch, BaseRequest, OutputTargets, Severity, Tag, Transaction};
use colored::{ColoredString, Colorize};
use std::io::{self, Write};
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing::warn;

/// Prints batches and rows as they happen, then writes the result files
pub struct ConsoleSink<W: Write + Send> {
    out: W,
    colors: bool,
    targets: OutputTargets,
}

impl ConsoleSink<io::Stdout> {
    /// Console sink writing to stdout with colors
    pub fn stdout(targets: OutputTargets) -> Self {
        Self::new(io::stdout(), targets)
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    /// Creates a sink writing to `out`
    pub fn new(out: W, targets: OutputTargets) -> Self {
        Self {
            out,
            colors: true,
            targets,
        }
    }

    /// Enables or disables ANSI colors
    pub fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }

    /// Consumes the sink and returns the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint_tag(&self, tag: &Tag) -> String {
        let cell = format!(" {} ", tag.info);
        if !self.colors {
            return cell;
        }

        let painted: ColoredString = match tag.severity {
            Severity::High => cell.as_str().on_red(),
            Severity::Medium => cell.as_str().on_yellow(),
            Severity::Low => cell.as_str().on_green(),
            Severity::Info => cell.as_str().on_cyan(),
        };
        painted.black().bold().to_string()
    }

    fn prefix(&self) -> String {
        if self.colors {
            "[+]".green().bold().to_string()
        } else {
            "[+]".to_string()
        }
    }

    fn write_lines(&mut self, lines: &[String]) {
        let result = lines
            .iter()
            .try_for_each(|line| writeln!(self.out, "{line}"))
            .and_then(|()| self.out.flush());
        if let Err(e) = result {
            warn!("Unable to write to console: {e}");
        }
    }

    fn summary_lines(batches: &[Batch]) -> Vec<String> {
        let severities = [
            (Severity::High, "High"),
            (Severity::Medium, "Medium"),
            (Severity::Low, "Low"),
            (Severity::Info, "Info"),
        ];

        let mut builder = Builder::default();
        builder.push_record(["Severity", "Tags"]);
        for (severity, label) in &severities {
            let count: usize = batches.iter().map(|b| b.count_by_severity(*severity)).sum();
            builder.push_record([label.to_string(), count.to_string()]);
        }

        let transactions: usize = batches.iter().map(|b| b.transactions.len()).sum();
        let failed = batches
            .iter()
            .flat_map(|b| b.transactions.iter())
            .filter(|t| t.error().is_some())
            .count();
        builder.push_record(["Transactions".to_string(), transactions.to_string()]);
        builder.push_record(["Failed".to_string(), failed.to_string()]);

        let mut table = builder.build();
        table.with(Style::rounded());

        let mut lines = vec![String::new()];
        lines.extend(table.to_string().lines().map(str::to_string));
        lines
    }
}

impl<W: Write + Send> OutputSink for ConsoleSink<W> {
    fn batch_header(&mut self, request: &BaseRequest) {
        let prefix = self.prefix();
        let mut lines = vec![String::new()];
        lines.extend(
            batch_header_lines(request)
                .into_iter()
                .map(|line| format!("{prefix} {line}")),
        );
        lines.extend(table_head().iter().map(|line| line.to_string()));
        self.write_lines(&lines);
    }

    fn transaction_row(&mut self, transaction: &Transaction) {
        let mut row = row_prefix(transaction);
        for tag in &transaction.tags {
            row.push(' ');
            row.push_str(&self.paint_tag(tag));
        }
        self.write_lines(&[row]);
    }

    fn complete(&mut self, batches: &[Batch]) -> Result<()> {
        let summary = Self::summary_lines(batches);
        self.write_lines(&summary);
        export_all(batches, &self.targets)
    }
}
