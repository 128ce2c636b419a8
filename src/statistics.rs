//! Iteration statistics table.
//!
//! Ingredients register their columns up front ("barrier", "radius", …),
//! set cell values while they work, and the solver loop prints one row per
//! outer iteration.  All output is gated on `verbose`.

use crate::algebra::FloatT;
use std::collections::HashMap;

const HEADER_EVERY: usize = 15;

#[derive(Debug, Clone)]
struct Column {
    name: String,
    width: usize,
    order: i32,
}

#[derive(Debug)]
pub struct Statistics {
    verbose: bool,
    columns: Vec<Column>,
    values: HashMap<String, String>,
    lines_since_header: usize,
}

impl Statistics {
    pub const INT_WIDTH: usize = 7;
    pub const DOUBLE_WIDTH: usize = 14;
    pub const STRING_WIDTH: usize = 26;

    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            columns: Vec::new(),
            values: HashMap::new(),
            lines_since_header: 0,
        }
    }

    pub fn add_column(&mut self, name: &str, width: usize, order: i32) {
        if self.columns.iter().any(|c| c.name == name) {
            return;
        }
        self.columns.push(Column {
            name: name.to_string(),
            width,
            order,
        });
        self.columns.sort_by_key(|c| c.order);
    }

    pub fn start_new_line(&mut self) {
        self.values.clear();
    }

    pub fn set_integer(&mut self, name: &str, value: usize) {
        self.values.insert(name.to_string(), format!("{value}"));
    }

    pub fn set_float<T: FloatT>(&mut self, name: &str, value: T) {
        self.values.insert(name.to_string(), format!("{value:.4e}"));
    }

    pub fn set_string(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.to_string());
    }

    fn print_header(&self) {
        let mut rule = String::new();
        let mut header = String::new();
        for column in &self.columns {
            rule.push_str(&"-".repeat(column.width));
            header.push_str(&format!("{:>width$}", column.name, width = column.width));
        }
        println!("{rule}");
        println!("{header}");
        println!("{rule}");
    }

    pub fn print_current_line(&mut self) {
        if !self.verbose {
            return;
        }
        if self.lines_since_header % HEADER_EVERY == 0 {
            self.print_header();
        }
        self.lines_since_header += 1;

        let mut line = String::new();
        for column in &self.columns {
            let cell = self.values.get(&column.name).map_or("-", String::as_str);
            line.push_str(&format!("{cell:>width$}", width = column.width));
        }
        println!("{line}");
    }

    /// Verbose-gated notice for numerical fall-back paths (discarded
    /// least-squares multipliers, non-descent merit directions, …).
    pub fn notice(&self, message: &str) {
        if self.verbose {
            println!("note: {message}");
        }
    }

    pub fn print_summary(&self, message: &str) {
        if self.verbose {
            println!("{message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_are_ordered_and_deduplicated() {
        let mut statistics = Statistics::new(false);
        statistics.add_column("objective", Statistics::DOUBLE_WIDTH, 2);
        statistics.add_column("iter", Statistics::INT_WIDTH, 1);
        statistics.add_column("objective", Statistics::DOUBLE_WIDTH, 9);
        assert_eq!(statistics.columns.len(), 2);
        assert_eq!(statistics.columns[0].name, "iter");
    }
}
