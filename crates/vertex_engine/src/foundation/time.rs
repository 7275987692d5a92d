//! Frame timing

/// Per-engine frame clock
///
/// Tracks the delta of the last tick, accumulated totals and a frame counter.
/// The scaled delta is what the scene receives; the unscaled values are kept
/// for host code that must ignore slow-motion or pause effects.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTime {
    delta_time: f64,
    total_time: f64,
    unscaled_total_time: f64,
    time_scale: f64,
    frame_count: u64,
}

impl Default for FrameTime {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTime {
    /// Create a clock at frame zero with a time scale of 1.0
    pub fn new() -> Self {
        Self {
            delta_time: 0.0,
            total_time: 0.0,
            unscaled_total_time: 0.0,
            time_scale: 1.0,
            frame_count: 0,
        }
    }

    /// Advance the clock by one frame of `delta_time` seconds
    pub fn advance(&mut self, delta_time: f64) {
        self.delta_time = delta_time;
        self.total_time += delta_time * self.time_scale;
        self.unscaled_total_time += delta_time;
        self.frame_count += 1;
    }

    /// Seconds the last frame took, scaled by the time scale
    pub fn delta_time(&self) -> f64 {
        self.delta_time * self.time_scale
    }

    /// Seconds the last frame took, ignoring the time scale
    pub fn unscaled_delta_time(&self) -> f64 {
        self.delta_time
    }

    /// Scaled seconds since the first frame
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    /// Unscaled seconds since the first frame
    pub fn unscaled_total_time(&self) -> f64 {
        self.unscaled_total_time
    }

    /// Current time scale (1.0 is real time)
    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Set the time scale; negative values are clamped to zero
    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale.max(0.0);
    }

    /// Number of frames advanced so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Average frames per second over the unscaled lifetime of the clock
    pub fn average_fps(&self) -> f64 {
        if self.unscaled_total_time > 0.0 {
            self.frame_count as f64 / self.unscaled_total_time
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_advance_accumulates() {
        let mut time = FrameTime::new();
        time.advance(0.25);
        time.advance(0.25);

        assert_eq!(time.frame_count(), 2);
        assert_relative_eq!(time.total_time(), 0.5);
        assert_relative_eq!(time.delta_time(), 0.25);
        assert_relative_eq!(time.average_fps(), 4.0);
    }

    #[test]
    fn test_time_scale_affects_scaled_values_only() {
        let mut time = FrameTime::new();
        time.set_time_scale(0.5);
        time.advance(1.0);

        assert_relative_eq!(time.delta_time(), 0.5);
        assert_relative_eq!(time.unscaled_delta_time(), 1.0);
        assert_relative_eq!(time.total_time(), 0.5);
        assert_relative_eq!(time.unscaled_total_time(), 1.0);
    }

    #[test]
    fn test_negative_time_scale_is_clamped() {
        let mut time = FrameTime::new();
        time.set_time_scale(-3.0);
        assert_eq!(time.time_scale(), 0.0);
    }
}
