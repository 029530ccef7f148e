use super::types::Timestep;

/// A simulation clock that hands out consecutive timesteps of fixed duration.
///
/// The clock never stops on its own; the engine stops when its source runs dry.
/// An optional limit caps the number of ticks.
///
/// # Examples
///
/// ```
/// use microgrid_sim::sim::clock::Clock;
///
/// let mut clock = Clock::new(0.5).with_limit(3);
/// let mut starts = Vec::new();
///
/// while let Some(t) = clock.tick() {
///     starts.push(t.start_hours());
/// }
/// assert_eq!(starts, vec![0.0, 0.5, 1.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Clock {
    /// Index of the next timestep
    current: usize,
    /// Interval length in hours
    duration_hours: f64,
    /// Maximum number of ticks, if any
    limit: Option<usize>,
}

impl Clock {
    /// Creates an unbounded clock with the given step duration.
    ///
    /// # Arguments
    ///
    /// * `duration_hours` - Length of every timestep in hours
    pub fn new(duration_hours: f64) -> Self {
        Self {
            current: 0,
            duration_hours,
            limit: None,
        }
    }

    /// Caps the clock at `total` ticks.
    pub fn with_limit(mut self, total: usize) -> Self {
        self.limit = Some(total);
        self
    }

    /// The timestep the next tick will return, without advancing.
    pub fn peek(&self) -> Timestep {
        Timestep::new(self.current, self.duration_hours)
    }

    /// Number of ticks handed out so far.
    pub fn elapsed(&self) -> usize {
        self.current
    }

    /// Whether the limit has been reached.
    pub fn is_done(&self) -> bool {
        self.limit.is_some_and(|total| self.current >= total)
    }

    /// Advances the clock by one step.
    ///
    /// # Returns
    ///
    /// * `Some(timestep)` - The timestep before advancing
    /// * `None` - If the clock has reached its limit
    pub fn tick(&mut self) -> Option<Timestep> {
        if self.is_done() {
            return None;
        }
        let t = self.peek();
        self.current += 1;
        Some(t)
    }
}
