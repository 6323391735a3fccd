//! Stillclip turns a single still image into a short, broadly compatible
//! H.264 MP4 clip.
//!
//! The pipeline runs three stages in strict order, each gated on the
//! previous one's success:
//!
//! - prepare the destination path (remove any existing file)
//! - stream identical frames into an intermediate container ([`encode`])
//! - re-encode the intermediate through a quality-preset second pass
//!   ([`normalize`])
//!
//! [`ConvertSession`] sequences the stages and reports lifecycle events to a
//! [`ConversionObserver`]. Encoding and probing shell out to the system
//! `ffmpeg`/`ffprobe` binaries.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod foundation;

pub mod encode;
pub mod normalize;
pub mod session;

pub use crate::assets::decode::{RasterFrame, decode_image, decode_image_file};
pub use crate::foundation::error::{StillclipError, StillclipResult};
pub use crate::foundation::timing::{Fps, FrameIndex, FrameTiming, POLL_INTERVAL};

pub use crate::encode::encode_frame_sequence;
pub use crate::encode::ffmpeg::{FfmpegEncodeSession, is_ffmpeg_on_path};
pub use crate::encode::sink::{AppendOutcome, EncodeSink};
pub use crate::normalize::pass::{ExportPreset, normalize_container};
pub use crate::normalize::probe::{MediaProbe, probe_video};
pub use crate::session::convert_session::{
    ConversionJob, ConversionObserver, ConversionState, ConvertSession, NoopObserver,
};
