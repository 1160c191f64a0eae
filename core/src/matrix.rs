//! Strategy x symbol control matrix

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::types::StrategyCell;

/// Figures shown above the matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MatrixStats {
    pub total: usize,
    pub active: usize,
    pub symbols: usize,
}

/// Cells keyed by `(strategy, symbol)` in first-seen order
#[derive(Debug, Clone, Default)]
pub struct StrategyMatrix {
    cells: IndexMap<(String, String), bool>,
}

impl StrategyMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cells(cells: impl IntoIterator<Item = StrategyCell>) -> Self {
        let mut matrix = Self::new();
        matrix.replace(cells);
        matrix
    }

    /// Drop the current cells and take `cells`; a repeated key keeps the last state
    pub fn replace(&mut self, cells: impl IntoIterator<Item = StrategyCell>) {
        self.cells.clear();
        for cell in cells {
            self.cells.insert((cell.strategy_name, cell.symbol), cell.enabled);
        }
    }

    /// Set one cell, inserting it when unknown
    pub fn set(&mut self, strategy: &str, symbol: &str, enabled: bool) {
        match self.cells.get_mut(&(strategy.to_string(), symbol.to_string())) {
            Some(state) => *state = enabled,
            None => {
                self.cells.insert((strategy.to_string(), symbol.to_string()), enabled);
            }
        }
    }

    pub fn get(&self, strategy: &str, symbol: &str) -> Option<bool> {
        self.cells.get(&(strategy.to_string(), symbol.to_string())).copied()
    }

    /// Flip a known cell and return its new state
    pub fn toggle(&mut self, strategy: &str, symbol: &str) -> Option<bool> {
        let state = self.cells.get_mut(&(strategy.to_string(), symbol.to_string()))?;
        *state = !*state;
        Some(*state)
    }

    /// Distinct strategy names, first-seen order
    pub fn strategies(&self) -> Vec<&str> {
        self.cells
            .keys()
            .map(|(strategy, _)| strategy.as_str())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct symbols, first-seen order
    pub fn symbols(&self) -> Vec<&str> {
        self.cells
            .keys()
            .map(|(_, symbol)| symbol.as_str())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn cells(&self) -> impl Iterator<Item = StrategyCell> + '_ {
        self.cells
            .iter()
            .map(|((strategy, symbol), enabled)| StrategyCell::new(strategy, symbol, *enabled))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn stats(&self) -> MatrixStats {
        MatrixStats {
            total: self.cells.len(),
            active: self.cells.values().filter(|enabled| **enabled).count(),
            symbols: self.symbols().len(),
        }
    }
}
