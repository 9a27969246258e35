use core::fmt;

use crate::execution::Op;

/// Equi-width histogram over a fixed integer range.
///
/// Every bucket spans `(max - min + 1) / B` values; values outside
/// `[min, max]` are ignored on insert. Selectivity for a comparison is
/// read off the bucket counts, interpolating linearly inside the
/// bucket that contains the constant.
pub struct IntHistogram {
    buckets: Vec<usize>,
    min: i32,
    max: i32,
    width: f64,
    total: usize,
}

impl IntHistogram {
    pub fn new(bucket_count: usize, min: i32, max: i32) -> Self {
        assert!(bucket_count > 0, "histogram needs at least one bucket");
        assert!(min <= max, "invalid histogram range [{}, {}]", min, max);

        let span = (max as i64 - min as i64 + 1) as f64;
        Self {
            buckets: vec![0; bucket_count],
            min,
            max,
            width: span / bucket_count as f64,
            total: 0,
        }
    }

    pub fn add_value(&mut self, v: i32) {
        if v < self.min || v > self.max {
            return;
        }

        let index = self.bucket_index(v as i64);
        self.buckets[index] += 1;
        self.total += 1;
    }

    fn bucket_index(&self, v: i64) -> usize {
        let index = ((v - self.min as i64) as f64 / self.width) as usize;
        index.min(self.buckets.len() - 1)
    }

    pub fn estimate_selectivity(&self, op: Op, v: i32) -> f64 {
        let v = v as i64;
        match op {
            Op::LessThan => self.less_than(v),
            Op::LessThanOrEq => self.less_than(v + 1),
            Op::GreaterThan => 1.0 - self.less_than(v + 1),
            Op::GreaterThanOrEq => 1.0 - self.less_than(v),
            Op::Equals | Op::Like => self.less_than(v + 1) - self.less_than(v),
            Op::NotEquals => 1.0 - (self.less_than(v + 1) - self.less_than(v)),
        }
    }

    /// Estimated fraction of values strictly below `v`.
    fn less_than(&self, v: i64) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        if v <= self.min as i64 {
            return 0.0;
        }
        if v >= self.max as i64 {
            return 1.0;
        }

        let index = self.bucket_index(v);
        let full_buckets: usize = self.buckets[..index].iter().sum();

        let bucket_start = self.min as f64 + index as f64 * self.width;
        let partial =
            (self.buckets[index] as f64 / self.width) * (v as f64 - bucket_start);

        (full_buckets as f64 + partial) / self.total as f64
    }

    pub fn avg_selectivity(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }

        self.buckets
            .iter()
            .map(|count| *count as f64 / self.total as f64)
            .sum::<f64>()
            / self.buckets.len() as f64
    }

    pub fn total_count(&self) -> usize {
        self.total
    }

    pub fn bucket_counts(&self) -> &[usize] {
        &self.buckets
    }
}

impl fmt::Display for IntHistogram {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "IntHistogram {{ range: [{}, {}], width: {}, total: {} }}",
            self.min, self.max, self.width, self.total
        )
    }
}
