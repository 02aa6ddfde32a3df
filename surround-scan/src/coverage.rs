/// Angular coverage of a rotating heading, bucketed into fixed segments.
use constants::scan::COVERAGE_BUCKET_DEGREES;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageState {
    Tracking,
    Complete,
}

/// Records which heading buckets have been swept since the last reset.
/// Large jumps between samples are interpolated along the shortest turn so
/// a coarse update rate still marks every bucket it passed through.
#[derive(Debug, Clone)]
pub struct SegmentCoverageTracker {
    bucket_degrees: f32,
    required: usize,
    last_heading: f32,
    visited: HashSet<usize>,
    state: CoverageState,
}

impl Default for SegmentCoverageTracker {
    fn default() -> Self {
        Self::new(COVERAGE_BUCKET_DEGREES)
    }
}

impl SegmentCoverageTracker {
    /// Bucket sizes that do not divide 360 leave a final, narrower bucket.
    pub fn new(bucket_degrees: f32) -> Self {
        let bucket_degrees = if bucket_degrees > 0.0 && bucket_degrees <= 360.0 {
            bucket_degrees
        } else {
            COVERAGE_BUCKET_DEGREES
        };
        Self {
            bucket_degrees,
            required: (360.0 / bucket_degrees).ceil() as usize,
            last_heading: 0.0,
            visited: HashSet::new(),
            state: CoverageState::Tracking,
        }
    }

    pub fn reset(&mut self, heading_degrees: f32) {
        self.visited.clear();
        self.last_heading = heading_degrees;
        self.state = CoverageState::Tracking;
    }

    /// Feed the current heading. Returns true only on the call that
    /// completes coverage.
    pub fn advance(&mut self, heading_degrees: f32) -> bool {
        if self.state == CoverageState::Complete {
            return false;
        }

        let delta = shortest_turn(self.last_heading, heading_degrees);
        self.mark(self.last_heading);

        let steps = (delta.abs() / self.bucket_degrees).ceil() as usize;
        let step = self.bucket_degrees.copysign(delta);
        for i in 1..=steps {
            let offset = if (step * i as f32).abs() > delta.abs() {
                delta
            } else {
                step * i as f32
            };
            self.mark(self.last_heading + offset);
        }

        self.last_heading = heading_degrees;

        if self.visited.len() >= self.required {
            self.state = CoverageState::Complete;
            return true;
        }
        false
    }

    pub fn state(&self) -> CoverageState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == CoverageState::Complete
    }

    /// Visited fraction in [0, 1].
    pub fn coverage(&self) -> f32 {
        (self.visited.len() as f32 / self.required as f32).min(1.0)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn required_count(&self) -> usize {
        self.required
    }

    pub fn bucket_of(&self, heading_degrees: f32) -> usize {
        let normalized = heading_degrees.rem_euclid(360.0);
        ((normalized / self.bucket_degrees).floor() as usize).min(self.required - 1)
    }

    fn mark(&mut self, heading_degrees: f32) {
        let bucket = self.bucket_of(heading_degrees);
        self.visited.insert(bucket);
    }
}

/// Signed turn from `from` to `to`, wrapped into [-180, 180).
fn shortest_turn(from: f32, to: f32) -> f32 {
    (to - from + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_steps_complete_after_a_full_turn() {
        let mut tracker = SegmentCoverageTracker::new(10.0);
        tracker.reset(0.0);

        let mut completed_at = None;
        for heading in 1..=360 {
            if tracker.advance(heading as f32) {
                completed_at = Some(heading);
            }
        }

        assert!(tracker.is_complete());
        assert_eq!(tracker.required_count(), 36);
        assert!(completed_at.is_some_and(|h| h <= 360));
        assert_eq!(tracker.coverage(), 1.0);
    }

    #[test]
    fn partial_turn_is_not_complete() {
        let mut tracker = SegmentCoverageTracker::new(10.0);
        tracker.reset(0.0);
        for heading in 1..=180 {
            assert!(!tracker.advance(heading as f32));
        }
        assert_eq!(tracker.state(), CoverageState::Tracking);
        assert!(tracker.coverage() > 0.45 && tracker.coverage() < 0.55);
    }

    // Deltas wrap into [-180, 180): 0 -> 350 is a 10 degree turn backwards,
    // so only the two buckets on that turn are visited.
    #[test]
    fn backwards_wrap_is_a_short_turn() {
        let mut tracker = SegmentCoverageTracker::new(10.0);
        tracker.reset(0.0);
        tracker.advance(350.0);

        assert_eq!(tracker.visited_count(), 2);
        assert!(tracker.visited.contains(&0));
        assert!(tracker.visited.contains(&35));
    }

    #[test]
    fn large_jump_marks_intermediate_buckets() {
        let mut tracker = SegmentCoverageTracker::new(10.0);
        tracker.reset(5.0);
        tracker.advance(175.0);

        for bucket in 0..=17 {
            assert!(tracker.visited.contains(&bucket), "bucket {bucket} missing");
        }
        assert_eq!(tracker.visited_count(), 18);
    }

    #[test]
    fn complete_is_terminal_until_reset() {
        let mut tracker = SegmentCoverageTracker::new(90.0);
        tracker.reset(0.0);
        let completions: usize = [90.0, 180.0, 270.0, 359.0, 10.0, 200.0]
            .into_iter()
            .filter(|heading| tracker.advance(*heading))
            .count();
        assert_eq!(completions, 1);
        assert!(tracker.is_complete());

        tracker.reset(45.0);
        assert_eq!(tracker.state(), CoverageState::Tracking);
        assert_eq!(tracker.visited_count(), 0);
    }

    #[test]
    fn negative_headings_normalize() {
        let tracker = SegmentCoverageTracker::new(10.0);
        assert_eq!(tracker.bucket_of(-5.0), 35);
        assert_eq!(tracker.bucket_of(725.0), 0);
    }
}
