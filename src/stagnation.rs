//! Adaptive mutation rate driven by stagnation of the best fitness.
//!
//! Every generation the monitor sees the current best fitness. A value that
//! does not beat the previous one counts as a stalled generation; after
//! `threshold` of them in a row the rate jumps to the escalated value and the
//! count starts over. The first improvement restores the baseline.

#[derive(Clone, Debug)]
pub struct StagnationMonitor {
    threshold: u32,
    baseline: f64,
    escalated: f64,
    stalled: u32,
    last_best: f64,
    rate: f64,
}

impl StagnationMonitor {
    /// `threshold == 0` disables escalation
    pub fn new(threshold: u32, baseline: f64, escalated: f64) -> Self {
        Self {
            threshold,
            baseline,
            escalated,
            stalled: 0,
            last_best: f64::NEG_INFINITY,
            rate: baseline,
        }
    }

    /// feed one generation's best fitness, get back the rate to use next
    pub fn observe(&mut self, best: f64) -> f64 {
        if best <= self.last_best {
            self.stalled += 1;
        } else {
            self.stalled = 0;
            self.rate = self.baseline;
        }

        if self.threshold > 0 && self.stalled >= self.threshold {
            self.rate = self.escalated;
            self.stalled = 0;
        }

        self.last_best = best;
        self.rate
    }

    #[inline]
    pub fn current_rate(&self) -> f64 {
        self.rate
    }

    #[inline]
    pub fn is_escalated(&self) -> bool {
        self.rate != self.baseline
    }

    /// generations since the last improvement or escalation
    #[inline]
    pub fn stalled_generations(&self) -> u32 {
        self.stalled
    }
}
