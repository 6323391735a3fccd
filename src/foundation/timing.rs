use std::time::Duration;

use crate::foundation::error::{StillclipError, StillclipResult};

/// Interval slept between append-readiness polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Rational frames-per-second.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds); must be > 0.
    pub den: u32,
}

impl Fps {
    /// Construct a rational FPS, rejecting zero terms.
    pub fn new(num: u32, den: u32) -> StillclipResult<Self> {
        if num == 0 {
            return Err(StillclipError::writer("Fps num must be > 0"));
        }
        if den == 0 {
            return Err(StillclipError::writer("Fps den must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Frames per second as a float.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

/// Frame timing policy for the generated clip.
///
/// The defaults reproduce the fixed policy of the pipeline: 2 identical
/// frames, timestamped one second apart, in a 30 fps timescale. Frame `i` is
/// presented at `i * frame_duration / fps` seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTiming {
    /// Timescale in frames per second.
    pub fps: u32,
    /// Number of identical frames appended to the container.
    pub frame_count: u32,
    /// Seconds each frame is held before the next timestamp.
    pub seconds_per_frame: u32,
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self {
            fps: 30,
            frame_count: 2,
            seconds_per_frame: 1,
        }
    }
}

impl FrameTiming {
    /// Reject zero fields; every term participates in timestamp math.
    pub fn validate(&self) -> StillclipResult<()> {
        if self.fps == 0 {
            return Err(StillclipError::writer("frame timing fps must be non-zero"));
        }
        if self.frame_count == 0 {
            return Err(StillclipError::writer(
                "frame timing frame_count must be non-zero",
            ));
        }
        if self.seconds_per_frame == 0 {
            return Err(StillclipError::writer(
                "frame timing seconds_per_frame must be non-zero",
            ));
        }
        Ok(())
    }

    /// Duration of one frame in timescale ticks (`fps * seconds_per_frame`).
    pub fn frame_duration(&self) -> u32 {
        self.fps * self.seconds_per_frame
    }

    /// The rate frames enter the encoder: `fps / frame_duration` frames per
    /// second, so consecutive frames land `seconds_per_frame` apart.
    pub fn input_rate(&self) -> StillclipResult<Fps> {
        Fps::new(self.fps, self.frame_duration())
    }

    /// Presentation time of `frame_index` in seconds.
    pub fn presentation_time_secs(&self, frame_index: u32) -> f64 {
        f64::from(frame_index) * f64::from(self.frame_duration()) / f64::from(self.fps)
    }

    /// Per-frame append attempts before giving up (one poll per attempt).
    pub fn append_attempt_budget(&self) -> u32 {
        self.fps
    }
}

/// 0-based position of a frame in the output timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct FrameIndex(pub u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fixed_policy() {
        let t = FrameTiming::default();
        assert_eq!(t.fps, 30);
        assert_eq!(t.frame_count, 2);
        assert_eq!(t.seconds_per_frame, 1);
        assert_eq!(t.frame_duration(), 30);
        assert_eq!(t.append_attempt_budget(), 30);
    }

    #[test]
    fn presentation_times_are_one_second_apart() {
        let t = FrameTiming::default();
        assert_eq!(t.presentation_time_secs(0), 0.0);
        assert_eq!(t.presentation_time_secs(1), 1.0);

        let rate = t.input_rate().unwrap();
        assert_eq!(rate, Fps { num: 30, den: 30 });
        assert_eq!(rate.as_f64(), 1.0);
    }

    #[test]
    fn validate_rejects_zero_terms() {
        let zero_fps = FrameTiming {
            fps: 0,
            ..FrameTiming::default()
        };
        assert!(zero_fps.validate().is_err());

        let zero_frames = FrameTiming {
            frame_count: 0,
            ..FrameTiming::default()
        };
        assert!(zero_frames.validate().is_err());

        let zero_hold = FrameTiming {
            seconds_per_frame: 0,
            ..FrameTiming::default()
        };
        assert!(zero_hold.validate().is_err());
    }

    #[test]
    fn fps_rejects_zero_terms() {
        assert!(Fps::new(0, 1).is_err());
        assert!(Fps::new(1, 0).is_err());
    }
}
