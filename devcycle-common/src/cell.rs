use crate::genes::GeneLevels;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier assigned by the host.
pub type CellId = u64;

/// Developmental stage of a cell.
///
/// Declaration order is the developmental order; transitions only ever move
/// to a later variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    /// Elementary body waiting out its germination delay.
    Germinating,
    /// Growing, dividing reticulate body.
    ReplicatingPermissive,
    /// Growing reticulate body committed to producing intermediate daughters.
    ReplicatingCommitted,
    /// Non-growing, clearing the repressor and building the commitment gene.
    IntermediateEarly,
    /// Non-growing, accumulating the terminal maturation gene.
    IntermediateLate,
    /// Terminal infectious form.
    Infectious,
}

impl CellType {
    pub const ALL: [CellType; 6] = [
        CellType::Germinating,
        CellType::ReplicatingPermissive,
        CellType::ReplicatingCommitted,
        CellType::IntermediateEarly,
        CellType::IntermediateLate,
        CellType::Infectious,
    ];

    /// Short lab label used in logs and output tables.
    pub fn label(self) -> &'static str {
        match self {
            CellType::Germinating => "EBg",
            CellType::ReplicatingPermissive => "RBr",
            CellType::ReplicatingCommitted => "RBe",
            CellType::IntermediateEarly => "IBr",
            CellType::IntermediateLate => "IBe",
            CellType::Infectious => "EB",
        }
    }

    pub fn is_replicating(self) -> bool {
        matches!(self, CellType::ReplicatingPermissive | CellType::ReplicatingCommitted)
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-agent state. Owned by the host; the regulator only touches it inside
/// `init_cell`, `update` and `divide`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub cell_type: CellType,
    /// Current size, written by host biophysics.
    pub volume: f64,
    /// Size above which division is requested.
    pub target_volume: f64,
    /// Live growth multiplier; 0 for non-growing stages.
    pub growth_rate: f64,
    /// Frozen rate carried across division, used once growth stops.
    pub parent_growth_rate: f64,
    pub rna: GeneLevels,
    pub protein: GeneLevels,
    /// Elapsed tick at which germination becomes possible.
    pub germination_time: f64,
    /// Latest gate output, in percent.
    pub conversion_probability: f64,
    /// Render colour derived from protein levels.
    pub color: [f64; 3],
    pub divide_flag: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            cell_type: CellType::Germinating,
            volume: 0.0,
            target_volume: 0.0,
            growth_rate: 0.0,
            parent_growth_rate: 0.0,
            rna: GeneLevels::zero(),
            protein: GeneLevels::zero(),
            germination_time: 0.0,
            conversion_probability: 0.0,
            color: [0.0; 3],
            divide_flag: false,
        }
    }
}

impl Cell {
    pub fn of_type(cell_type: CellType) -> Self {
        Cell { cell_type, ..Cell::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn developmental_order_is_declaration_order() {
        let mut sorted = CellType::ALL;
        sorted.sort();
        assert_eq!(sorted, CellType::ALL);
        assert!(CellType::Germinating < CellType::Infectious);
    }

    #[test]
    fn default_cell_is_zeroed_germinating() {
        let cell = Cell::default();
        assert_eq!(cell.cell_type, CellType::Germinating);
        assert_eq!(cell.growth_rate, 0.0);
        assert!(!cell.divide_flag);
        assert_eq!(cell.protein, GeneLevels::zero());
    }

    #[test]
    fn only_rb_forms_replicate() {
        let replicating: Vec<_> = CellType::ALL.iter().filter(|t| t.is_replicating()).collect();
        assert_eq!(
            replicating,
            vec![&CellType::ReplicatingPermissive, &CellType::ReplicatingCommitted]
        );
    }
}
