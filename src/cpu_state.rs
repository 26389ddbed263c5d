use devcycle_common::{Cell, CellId, SimParams};
use std::collections::BTreeMap;

/// Live population held by the host, keyed by stable id.
#[derive(Debug)]
pub struct CpuState {
    pub params: SimParams,
    pub cells: BTreeMap<CellId, Cell>,
    /// Intracellular species concentration, one per cell.
    pub species: BTreeMap<CellId, f64>,
    /// Well-mixed extracellular signal.
    pub signal: f64,
    next_id: CellId,
}

impl CpuState {
    pub fn new(params: SimParams) -> Self {
        Self { params, cells: BTreeMap::new(), species: BTreeMap::new(), signal: 0.0, next_id: 0 }
    }

    /// Registers a cell under a fresh id.
    pub fn spawn(&mut self, cell: Cell, species: f64) -> CellId {
        let id = self.next_id;
        self.next_id += 1;
        self.cells.insert(id, cell);
        self.species.insert(id, species);
        id
    }

    pub fn remove(&mut self, id: CellId) -> Option<(Cell, f64)> {
        let cell = self.cells.remove(&id)?;
        let species = self.species.remove(&id).unwrap_or(0.0);
        Some((cell, species))
    }

    /// Ids of cells requesting division, in ascending order.
    pub fn flagged_ids(&self) -> Vec<CellId> {
        self.cells.iter().filter(|(_, c)| c.divide_flag).map(|(&id, _)| id).collect()
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn has_capacity(&self) -> bool {
        self.cells.len() < self.params.max_cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devcycle_common::CellType;

    fn params(max_cells: usize) -> SimParams {
        SimParams {
            total_steps: 1,
            record_interval_steps: 1,
            ticks_per_hour: 10,
            dt_hours: 0.1,
            growth_per_tick: 0.0,
            initial_volume: 1.0,
            max_cells,
            seed: 0,
        }
    }

    #[test]
    fn ids_are_never_reused() {
        let mut state = CpuState::new(params(8));
        let a = state.spawn(Cell::default(), 0.5);
        let (cell, species) = state.remove(a).unwrap();
        assert_eq!(cell.cell_type, CellType::Germinating);
        assert_eq!(species, 0.5);
        let b = state.spawn(Cell::default(), 0.0);
        assert_ne!(a, b);
        assert!(state.remove(a).is_none());
    }

    #[test]
    fn flagged_ids_are_sorted() {
        let mut state = CpuState::new(params(2));
        for flag in [true, false, true] {
            state.spawn(Cell { divide_flag: flag, ..Cell::default() }, 0.0);
        }
        assert_eq!(state.flagged_ids(), vec![0, 2]);
        assert!(!state.has_capacity());
    }
}
