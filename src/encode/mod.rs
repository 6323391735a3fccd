//! Frame-sequence encoding.
//!
//! Streams N identical presentations of the decoded source image into a
//! freshly created MP4 container, honoring the bounded append-readiness
//! retry contract.

/// `ffmpeg`-backed encoding session (MP4 output via system `ffmpeg`).
pub mod ffmpeg;
/// Generic encode sink trait and the append retry loop.
pub mod sink;

use std::path::Path;

use crate::assets::decode::decode_image_file;
use crate::encode::ffmpeg::FfmpegEncodeSession;
use crate::encode::sink::{stream_frames, EncodeSink};
use crate::foundation::error::StillclipResult;
use crate::foundation::timing::FrameTiming;

/// Encode `timing.frame_count` identical presentations of the image at
/// `source` into a new MP4 container at `out_path`.
///
/// The container is finalized before this returns; on success the file is a
/// playable first-pass clip with dimensions equal to the source image.
pub fn encode_frame_sequence(
    source: &Path,
    out_path: &Path,
    timing: &FrameTiming,
) -> StillclipResult<()> {
    timing.validate()?;

    let frame = decode_image_file(source)?;
    tracing::info!(
        width = frame.width,
        height = frame.height,
        frames = timing.frame_count,
        "encoding frame sequence"
    );

    let mut session = FfmpegEncodeSession::create(out_path, frame.width, frame.height, timing)?;
    stream_frames(&mut session, &frame, timing)?;
    session.finish()
}
