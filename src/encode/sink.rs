use crate::assets::decode::RasterFrame;
use crate::foundation::error::{StillclipError, StillclipResult};
use crate::foundation::timing::{FrameIndex, FrameTiming, POLL_INTERVAL};

/// Outcome of a single append attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The frame was accepted by the session input.
    Appended,
    /// The session input has no capacity right now; poll again later.
    NotReady,
}

/// Sink contract for appending identical frames in presentation order.
///
/// Ordering contract: `try_append` is called with strictly increasing
/// [`FrameIndex`] values; a successful append consumes the index.
pub trait EncodeSink {
    /// Poll readiness and append in one step.
    ///
    /// Returns [`AppendOutcome::NotReady`] when the input cannot take more
    /// data yet; an `Err` is a hard append failure and aborts the sequence.
    fn try_append(
        &mut self,
        idx: FrameIndex,
        frame: &RasterFrame,
    ) -> StillclipResult<AppendOutcome>;

    /// Flush and close the session. The sink is invalid for reuse afterward.
    fn finish(&mut self) -> StillclipResult<()>;
}

/// Append one frame, sleeping [`POLL_INTERVAL`] between readiness polls.
///
/// The budget is `timing.append_attempt_budget()` attempts total; exhausting
/// it fails with an error naming the frame index and attempt count.
pub(crate) fn append_with_retry(
    sink: &mut dyn EncodeSink,
    idx: FrameIndex,
    frame: &RasterFrame,
    timing: &FrameTiming,
) -> StillclipResult<()> {
    let budget = timing.append_attempt_budget();
    let mut appended = false;
    let mut attempt = 0u32;

    while !appended && attempt < budget {
        match sink.try_append(idx, frame)? {
            AppendOutcome::Appended => appended = true,
            AppendOutcome::NotReady => {
                tracing::debug!(frame = idx.0, attempt, "session input not ready, waiting");
                std::thread::sleep(POLL_INTERVAL);
            }
        }
        attempt += 1;
    }

    if !appended {
        return Err(StillclipError::writer(format!(
            "append of frame {} did not become ready after {attempt} attempts",
            idx.0
        )));
    }
    Ok(())
}

/// Append every frame of the sequence in presentation order.
pub(crate) fn stream_frames(
    sink: &mut dyn EncodeSink,
    frame: &RasterFrame,
    timing: &FrameTiming,
) -> StillclipResult<()> {
    for i in 0..timing.frame_count {
        tracing::debug!(
            frame = i,
            pts_secs = timing.presentation_time_secs(i),
            "appending frame"
        );
        append_with_retry(sink, FrameIndex(i), frame, timing)?;
    }
    Ok(())
}
