use std::{collections::HashMap, sync::Arc};

use log::debug;

use crate::{
    common::Database,
    error::DbError,
    execution::Op,
    optimizer::{int_histogram::IntHistogram, string_histogram::StringHistogram},
    storage::{
        schema::{Schema, Type},
        tuple::Cell,
    },
    transaction::Transaction,
    types::DbResult,
    utils::HandyRwLock,
};

/// Default cost of reading one page from disk, in arbitrary planner
/// units.
pub const IO_COST_PER_PAGE: usize = 1000;

/// Default number of histogram buckets per column.
pub const NUM_HIST_BINS: usize = 100;

enum ColumnHistogram {
    Int(IntHistogram),
    Str(StringHistogram),
}

/// Scan statistics for one table: tuple count, page count and one
/// equi-width histogram per column. Built with a two-pass scan, first
/// finding the integer column ranges, then filling the bucket counts.
/// Immutable afterwards.
pub struct TableStats {
    num_pages: usize,
    num_tuples: usize,
    io_cost_per_page: usize,
    histograms: Vec<ColumnHistogram>,
}

impl TableStats {
    pub fn new(table_id: u32, io_cost_per_page: usize) -> Result<Self, DbError> {
        let table_rc = Database::catalog()
            .get_table(&table_id)
            .ok_or_else(|| DbError::NoSuchTable(format!("table id {}", table_id)))?;

        let (schema, num_pages): (Schema, usize) = {
            let table = table_rc.rl();
            (table.get_schema(), table.get_num_pages())
        };
        let column_count = schema.fields.len();

        let tx = Transaction::new();

        // pass 1: integer column ranges; string values go straight
        // into their histograms, their codes need no range discovery
        let mut mins = vec![i32::max_value(); column_count];
        let mut maxs = vec![i32::min_value(); column_count];
        let mut histograms: Vec<ColumnHistogram> = schema
            .fields
            .iter()
            .map(|field| match field.field_type {
                Type::Int => {
                    // placeholder, rebuilt once the range is known
                    ColumnHistogram::Int(IntHistogram::new(NUM_HIST_BINS, 0, 0))
                }
                Type::Str(_) => {
                    ColumnHistogram::Str(StringHistogram::new(NUM_HIST_BINS))
                }
            })
            .collect();

        let mut num_tuples = 0;
        let mut iter = table_rc.rl().iterator(&tx);
        while let Some(tuple) = iter.try_next()? {
            num_tuples += 1;
            for i in 0..column_count {
                match (&mut histograms[i], tuple.get_cell(i)) {
                    (ColumnHistogram::Int(_), Cell::Int(v)) => {
                        mins[i] = mins[i].min(v);
                        maxs[i] = maxs[i].max(v);
                    }
                    (ColumnHistogram::Str(hist), Cell::String(s)) => {
                        hist.add_value(&s);
                    }
                    _ => {
                        return Err(DbError::SchemaMismatch(format!(
                            "column {} does not match its declared type",
                            i
                        )))
                    }
                }
            }
        }

        for i in 0..column_count {
            if let ColumnHistogram::Int(_) = histograms[i] {
                let (min, max) = if mins[i] <= maxs[i] {
                    (mins[i], maxs[i])
                } else {
                    // empty table
                    (0, 0)
                };
                histograms[i] =
                    ColumnHistogram::Int(IntHistogram::new(NUM_HIST_BINS, min, max));
            }
        }

        // pass 2: fill the integer bucket counts
        let mut iter = table_rc.rl().iterator(&tx);
        while let Some(tuple) = iter.try_next()? {
            for i in 0..column_count {
                if let ColumnHistogram::Int(hist) = &mut histograms[i] {
                    hist.add_value(tuple.get_cell(i).get_int()?);
                }
            }
        }

        tx.commit()?;

        debug!(
            "collected stats for table {}: {} tuples over {} pages",
            table_id, num_tuples, num_pages
        );

        Ok(Self {
            num_pages,
            num_tuples,
            io_cost_per_page,
            histograms,
        })
    }

    /// Cost of a full sequential scan.
    pub fn estimate_scan_cost(&self) -> usize {
        self.num_pages * self.io_cost_per_page
    }

    /// Number of tuples a predicate with the given selectivity keeps.
    pub fn estimate_table_cardinality(&self, selectivity: f64) -> usize {
        (self.num_tuples as f64 * selectivity).floor() as usize
    }

    /// Selectivity of `field op constant`, dispatched on the column
    /// type.
    pub fn estimate_selectivity(
        &self,
        field: usize,
        op: Op,
        constant: &Cell,
    ) -> Result<f64, DbError> {
        match (&self.histograms[field], constant) {
            (ColumnHistogram::Int(hist), Cell::Int(v)) => {
                Ok(hist.estimate_selectivity(op, *v))
            }
            (ColumnHistogram::Str(hist), Cell::String(s)) => {
                Ok(hist.estimate_selectivity(op, s))
            }
            _ => Err(DbError::IllegalArgument(format!(
                "constant {:?} does not match the type of column {}",
                constant, field
            ))),
        }
    }

    pub fn avg_selectivity(&self, field: usize, _op: Op) -> f64 {
        match &self.histograms[field] {
            ColumnHistogram::Int(hist) => hist.avg_selectivity(),
            ColumnHistogram::Str(hist) => hist.avg_selectivity(),
        }
    }

    pub fn get_num_tuples(&self) -> usize {
        self.num_tuples
    }

    pub fn get_num_pages(&self) -> usize {
        self.num_pages
    }

    /// Build statistics for every table in the catalog and publish
    /// them in the process-wide registry, keyed by table name.
    pub fn compute_statistics() -> DbResult {
        let table_ids: Vec<u32> = Database::catalog().table_id_iterator().collect();

        for table_id in table_ids {
            let table_name = Database::catalog()
                .get_table_name(&table_id)
                .unwrap_or_default();
            let stats = TableStats::new(table_id, IO_COST_PER_PAGE)?;
            Database::mut_table_stats().insert(table_name, Arc::new(stats));
        }
        Ok(())
    }

    pub fn get_table_stats(table_name: &str) -> Option<Arc<TableStats>> {
        Database::table_stats().get(table_name).cloned()
    }

    /// Replace the whole registry. Test hook.
    pub fn set_stats_map(stats: HashMap<String, Arc<TableStats>>) {
        *Database::mut_table_stats() = stats;
    }
}
