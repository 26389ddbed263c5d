use crate::cell::{Cell, CellId, CellType};
use crate::genes::GeneLevels;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Population summary at one recorded tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    /// Coarse time (`tick / ticks_per_hour`).
    pub hours: f64,
    pub total_cell_count: u32,
    /// Cells per state, keyed by short label (`RBr`, `IBe`, ...).
    pub cell_type_counts: BTreeMap<String, u32>,
    pub mean_rna: GeneLevels,
    pub mean_protein: GeneLevels,
    pub transitions_since_last: u32,
    pub divisions_since_last: u32,
    /// Well-mixed signal concentration held by the host.
    pub signal_level: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub cells: Option<Vec<(CellId, Cell)>>,
}

impl Snapshot {
    pub fn from_cells(tick: u64, hours: f64, cells: &BTreeMap<CellId, Cell>, include_cells: bool) -> Self {
        let mut cell_type_counts: BTreeMap<String, u32> =
            CellType::ALL.iter().map(|t| (t.label().to_string(), 0)).collect();
        let mut rna = GeneLevels::zero();
        let mut protein = GeneLevels::zero();
        for cell in cells.values() {
            *cell_type_counts.entry(cell.cell_type.label().to_string()).or_insert(0) += 1;
            rna.accumulate(&cell.rna);
            protein.accumulate(&cell.protein);
        }
        let n = cells.len();
        let inv = if n > 0 { 1.0 / n as f64 } else { 0.0 };

        Snapshot {
            tick,
            hours,
            total_cell_count: n as u32,
            cell_type_counts,
            mean_rna: rna.scaled(inv),
            mean_protein: protein.scaled(inv),
            transitions_since_last: 0,
            divisions_since_last: 0,
            signal_level: 0.0,
            cells: include_cells.then(|| cells.iter().map(|(&id, c)| (id, c.clone())).collect()),
        }
    }

    pub fn count(&self, cell_type: CellType) -> u32 {
        self.cell_type_counts.get(cell_type.label()).copied().unwrap_or(0)
    }
}
