//! Terminal summaries using comfy-table.

use comfy_table::{Cell, CellAlignment, Table};

use paperbench::{BenchResult, LoadSummary};

/// Table of records loaded per store.
pub fn loads_table(loads: &[LoadSummary]) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Database", "Records", "Seconds"]);

    for load in loads {
        table.add_row(vec![
            Cell::new(load.store.display_name()),
            Cell::new(load.records).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.3}", load.elapsed.as_secs_f64()))
                .set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

/// Table of timed operations, in run order.
pub fn results_table(results: &[BenchResult]) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Database", "Operation", "Records", "Seconds"]);

    for result in results {
        table.add_row(vec![
            Cell::new(result.store.display_name()),
            Cell::new(result.operation),
            Cell::new(result.records_processed).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.6}", result.seconds())).set_alignment(CellAlignment::Right),
        ]);
    }

    format!("{}\n{} operation(s)", table, results.len())
}
