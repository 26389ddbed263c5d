use serde::{Deserialize, Serialize};

/// Simulation clock owned by the host and threaded through `update`.
///
/// Advanced exactly once per tick, before any cell is visited, so every cell
/// in a tick observes the same elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimClock {
    tick: u64,
    ticks_per_hour: u64,
}

impl SimClock {
    pub fn new(ticks_per_hour: u64) -> Self {
        SimClock { tick: 0, ticks_per_hour: ticks_per_hour.max(1) }
    }

    /// Clock positioned at an arbitrary tick, mostly for tests and restarts.
    pub fn at(tick: u64, ticks_per_hour: u64) -> Self {
        SimClock { tick, ticks_per_hour: ticks_per_hour.max(1) }
    }

    /// Moves to the next tick and returns it.
    pub fn advance(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn ticks_per_hour(&self) -> u64 {
        self.ticks_per_hour
    }

    /// Elapsed time in ticks, for comparison with per-cell tick thresholds.
    pub fn elapsed(&self) -> f64 {
        self.tick as f64
    }

    /// Coarse "hour-like" time unit fed to the transition gate.
    pub fn hours(&self) -> f64 {
        self.tick as f64 / self.ticks_per_hour as f64
    }

    /// True when the coarse time is an exact integer.
    pub fn is_hour_aligned(&self) -> bool {
        self.tick % self.ticks_per_hour == 0
    }
}

impl Default for SimClock {
    fn default() -> Self {
        SimClock::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_one_tick() {
        let mut clock = SimClock::new(10);
        assert_eq!(clock.advance(), 1);
        assert_eq!(clock.advance(), 2);
        assert_eq!(clock.tick(), 2);
        assert_eq!(clock.hours(), 0.2);
    }

    #[test]
    fn alignment_only_on_whole_hours() {
        let aligned: Vec<u64> = (1..=35)
            .filter(|&t| SimClock::at(t, 10).is_hour_aligned())
            .collect();
        assert_eq!(aligned, vec![10, 20, 30]);
    }

    #[test]
    fn zero_ticks_per_hour_is_coerced() {
        let clock = SimClock::at(7, 0);
        assert_eq!(clock.ticks_per_hour(), 1);
        assert!(clock.is_hour_aligned());
    }
}
