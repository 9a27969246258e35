pub mod int_histogram;
pub mod string_histogram;
pub mod table_stats;

pub use int_histogram::IntHistogram;
pub use string_histogram::StringHistogram;
pub use table_stats::TableStats;
