use std::path::Path;

use crate::foundation::error::{StillclipError, StillclipResult};
use crate::normalize::probe::probe_video;

/// Quality preset for the normalizing export pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportPreset {
    /// Near-lossless output; CRF adapts to the source resolution.
    #[default]
    HighestQuality,
}

impl ExportPreset {
    /// CRF for the given video height. Smaller sources keep lower CRF since
    /// quality loss is more visible and the size cost is negligible.
    pub(crate) fn crf_for_height(self, height: u32) -> u32 {
        match self {
            ExportPreset::HighestQuality => {
                if height <= 480 {
                    12
                } else if height <= 720 {
                    14
                } else if height <= 1080 {
                    15
                } else {
                    18
                }
            }
        }
    }

    pub(crate) fn encoder_preset(self) -> &'static str {
        match self {
            ExportPreset::HighestQuality => "slow",
        }
    }
}

/// Re-encode the intermediate container at `intermediate` into `dest`.
///
/// The intermediate is probed first; its video track (and only that track)
/// is transcoded over the full duration into a fresh H.264/MP4 at the
/// preset's quality. The destination is written exactly once, here.
pub fn normalize_container(
    intermediate: &Path,
    dest: &Path,
    preset: ExportPreset,
) -> StillclipResult<()> {
    let probe = probe_video(intermediate)?;
    tracing::info!(
        duration_sec = probe.duration_sec,
        width = probe.width,
        height = probe.height,
        "normalizing container"
    );

    let crf = preset.crf_for_height(probe.height);
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-y", "-i"])
        .arg(intermediate)
        .args([
            "-map",
            "0:v:0",
            "-an",
            "-c:v",
            "libx264",
            "-preset",
            preset.encoder_preset(),
            "-crf",
            &crf.to_string(),
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ])
        .arg(dest)
        .output()
        .map_err(|e| StillclipError::export(format!("failed to run ffmpeg for export: {e}")))?;

    if !out.status.success() {
        return Err(StillclipError::export(format!(
            "export to '{}' failed: {}",
            dest.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_quality_crf_adapts_to_resolution() {
        let p = ExportPreset::HighestQuality;
        assert_eq!(p.crf_for_height(480), 12);
        assert_eq!(p.crf_for_height(600), 14);
        assert_eq!(p.crf_for_height(1080), 15);
        assert_eq!(p.crf_for_height(2160), 18);
        assert_eq!(p.encoder_preset(), "slow");
    }
}
