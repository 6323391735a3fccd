//! Second-pass container normalization.
//!
//! The first-pass container is probed, its video track pulled into a fresh
//! quality-preset transcode, and the result written to the final destination.

/// Export pass to the final destination.
pub mod pass;
/// `ffprobe`-based inspection of the intermediate container.
pub mod probe;
