use std::path::Path;

use crate::foundation::error::{StillclipError, StillclipResult};

/// Video-track facts extracted from a container by `ffprobe`.
#[derive(Clone, Debug)]
pub struct MediaProbe {
    /// Video width in pixels.
    pub width: u32,
    /// Video height in pixels.
    pub height: u32,
    /// Frame rate numerator.
    pub fps_num: u32,
    /// Frame rate denominator.
    pub fps_den: u32,
    /// Container duration in seconds (0.0 when unreported).
    pub duration_sec: f64,
    /// Frame count of the video stream, when the container reports it.
    pub nb_frames: Option<u64>,
}

/// Probe `path` and return its video track facts.
///
/// Fails with a composition error when the file cannot be read as a media
/// asset or exposes no video track.
pub fn probe_video(path: &Path) -> StillclipResult<MediaProbe> {
    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| StillclipError::composition(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(StillclipError::composition(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    parse_probe_output(&out.stdout)
}

pub(crate) fn parse_probe_output(bytes: &[u8]) -> StillclipResult<MediaProbe> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
        nb_frames: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let parsed: ProbeOut = serde_json::from_slice(bytes)
        .map_err(|e| StillclipError::composition(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| StillclipError::composition("no video track found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| StillclipError::composition("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| StillclipError::composition("missing video height from ffprobe"))?;

    let (fps_num, fps_den) = parse_ff_ratio(video_stream.r_frame_rate.as_deref().unwrap_or("0/1"))
        .ok_or_else(|| StillclipError::composition("invalid video r_frame_rate"))?;
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);
    let nb_frames = video_stream
        .nb_frames
        .as_ref()
        .and_then(|s| s.parse::<u64>().ok());

    Ok(MediaProbe {
        width,
        height,
        fps_num,
        fps_den,
        duration_sec,
        nb_frames,
    })
}

fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if b == 0 {
        return None;
    }
    Some((a, b))
}
