use std::fmt;

use instant::Instant;

/// Stages of one simulation tick, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPhase {
    Network,
    Skills,
    Movement,
    SpatialRebuild,
    Combat,
}

impl TickPhase {
    pub const ALL: [TickPhase; 5] = [
        Self::Network,
        Self::Skills,
        Self::Movement,
        Self::SpatialRebuild,
        Self::Combat,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Network => "net",
            Self::Skills => "skills",
            Self::Movement => "move",
            Self::SpatialRebuild => "grid",
            Self::Combat => "combat",
        }
    }
}

/// Weight of the newest sample in the moving average.
const EMA_ALPHA: f64 = 0.1;

#[derive(Debug, Clone, Copy, Default)]
struct PhaseTiming {
    avg_us: f64,
    peak_us: f64,
    runs: u64,
}

/// Wall time spent in each tick phase.
///
/// Phases a context never runs (a replica skips the simulation stages) are
/// left out of the `Display` breakdown.
#[derive(Debug, Default)]
pub struct TickTimers {
    phases: [PhaseTiming; TickPhase::ALL.len()],
}

impl TickTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Charge the time since `started` to `phase`.
    pub fn record(&mut self, phase: TickPhase, started: Instant) {
        self.record_us(phase, started.elapsed().as_secs_f64() * 1_000_000.0);
    }

    fn record_us(&mut self, phase: TickPhase, us: f64) {
        let t = &mut self.phases[phase as usize];
        // Seed with the first sample so the average doesn't ramp up from zero.
        t.avg_us = if t.runs == 0 {
            us
        } else {
            t.avg_us + (us - t.avg_us) * EMA_ALPHA
        };
        t.peak_us = t.peak_us.max(us);
        t.runs += 1;
    }

    pub fn average_us(&self, phase: TickPhase) -> f64 {
        self.phases[phase as usize].avg_us
    }

    pub fn peak_us(&self, phase: TickPhase) -> f64 {
        self.phases[phase as usize].peak_us
    }

    pub fn runs(&self, phase: TickPhase) -> u64 {
        self.phases[phase as usize].runs
    }

    /// Smoothed cost of a whole tick.
    pub fn total_us(&self) -> f64 {
        self.phases.iter().map(|t| t.avg_us).sum()
    }

    /// Start a fresh peak window, e.g. after logging a breakdown.
    pub fn reset_peaks(&mut self) {
        for t in &mut self.phases {
            t.peak_us = 0.0;
        }
    }
}

impl fmt::Display for TickTimers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick {:.1}us", self.total_us())?;
        for phase in TickPhase::ALL {
            let t = self.phases[phase as usize];
            if t.runs > 0 {
                write!(f, " | {} {:.1}us (peak {:.1})", phase.label(), t.avg_us, t.peak_us)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_seeds_average() {
        let mut timers = TickTimers::new();
        timers.record_us(TickPhase::Combat, 40.0);
        assert_eq!(timers.average_us(TickPhase::Combat), 40.0);

        timers.record_us(TickPhase::Combat, 140.0);
        assert!((timers.average_us(TickPhase::Combat) - 50.0).abs() < 1e-9);
        assert_eq!(timers.peak_us(TickPhase::Combat), 140.0);
        assert_eq!(timers.runs(TickPhase::Combat), 2);
        assert_eq!(timers.runs(TickPhase::Network), 0);
    }

    #[test]
    fn reset_peaks_keeps_averages() {
        let mut timers = TickTimers::new();
        timers.record_us(TickPhase::Movement, 12.0);
        timers.reset_peaks();
        assert_eq!(timers.peak_us(TickPhase::Movement), 0.0);
        assert_eq!(timers.average_us(TickPhase::Movement), 12.0);
    }

    #[test]
    fn breakdown_skips_phases_never_run() {
        let mut timers = TickTimers::new();
        timers.record_us(TickPhase::Network, 3.0);
        timers.record_us(TickPhase::SpatialRebuild, 5.0);
        let line = timers.to_string();
        assert_eq!(
            line,
            "tick 8.0us | net 3.0us (peak 3.0) | grid 5.0us (peak 5.0)"
        );
    }
}
