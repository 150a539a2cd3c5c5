use crate::storage::DbStats;
use crate::sync::SyncReport;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
pub struct OutcomeRow {
    #[tabled(rename = "Table")]
    pub table: String,
    #[tabled(rename = "Written")]
    pub written: usize,
    #[tabled(rename = "Skipped")]
    pub skipped: usize,
    #[tabled(rename = "Failed")]
    pub failed: usize,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

/// Row counts per owned table
pub fn db_stats_table(stats: &DbStats) -> String {
    let mut builder = TableBuilder::new();
    for (table, rows) in &stats.tables {
        builder.add_row(table.as_str(), &rows.to_string());
    }
    builder.add_row("total", &stats.total().to_string());
    builder.build()
}

/// Written / skipped / failed counts of a sync run
pub fn outcome_table(report: &SyncReport) -> String {
    let rows: Vec<OutcomeRow> = report
        .tables
        .iter()
        .map(|(table, outcome)| OutcomeRow {
            table: table.to_string(),
            written: outcome.written,
            skipped: outcome.skipped,
            failed: outcome.failed,
        })
        .collect();

    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}
