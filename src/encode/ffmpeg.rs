use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{SyncSender, TrySendError, sync_channel};

use crate::assets::decode::RasterFrame;
use crate::encode::sink::{AppendOutcome, EncodeSink};
use crate::foundation::error::{StillclipError, StillclipResult};
use crate::foundation::timing::{FrameIndex, FrameTiming};

/// Frames are flattened over opaque black; H.264 output carries no alpha.
const BG_RGBA: [u8; 4] = [0, 0, 0, 255];

/// Capacity of the channel feeding the encoder's stdin. One slot keeps the
/// readiness poll honest: "ready" means the feeder has drained the previous
/// frame into the pipe.
const FEED_CHANNEL_CAPACITY: usize = 1;

/// Encoding session that spawns the system `ffmpeg` and streams raw RGBA
/// frames into it through a bounded channel.
///
/// A feeder thread owns the child's stdin; [`EncodeSink::try_append`] reports
/// [`AppendOutcome::NotReady`] while the channel is full. The session is
/// finalized by [`EncodeSink::finish`] and invalid for reuse afterward.
#[derive(Debug)]
pub struct FfmpegEncodeSession {
    child: Option<Child>,
    feeder: Option<std::thread::JoinHandle<std::io::Result<()>>>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    tx: Option<SyncSender<Vec<u8>>>,

    scratch: Vec<u8>,
    width: u32,
    height: u32,
    last_idx: Option<FrameIndex>,
}

impl FfmpegEncodeSession {
    /// Spawn `ffmpeg` writing an H.264/yuv420p MP4 container at `out_path`,
    /// sized `width`x`height`, with raw frames arriving at the timing's
    /// rational input rate.
    pub fn create(
        out_path: &Path,
        width: u32,
        height: u32,
        timing: &FrameTiming,
    ) -> StillclipResult<Self> {
        if width == 0 || height == 0 {
            return Err(StillclipError::writer(
                "encode width/height must be non-zero",
            ));
        }
        if !width.is_multiple_of(2) || !height.is_multiple_of(2) {
            return Err(StillclipError::writer(
                "encode width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        let rate = timing.input_rate()?;

        ensure_parent_dir(out_path)?;

        if !is_ffmpeg_on_path() {
            return Err(StillclipError::writer(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        // Input: raw RGBA8 frames on stdin. `-r` before `-i` sets the input
        // framerate, which fixes each frame's presentation timestamp at
        // `index * den / num` seconds.
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{width}x{height}"),
            "-r",
            &format!("{}/{}", rate.num, rate.den),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ])
        .arg(out_path);

        let mut child = cmd.spawn().map_err(|e| {
            StillclipError::writer(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| StillclipError::writer("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| StillclipError::writer("failed to open ffmpeg stderr (unexpected)"))?;

        let (tx, rx) = sync_channel::<Vec<u8>>(FEED_CHANNEL_CAPACITY);
        let feeder = std::thread::spawn(move || {
            use std::io::Write as _;
            for buf in rx {
                stdin.write_all(&buf)?;
            }
            // Dropping stdin signals end-of-input to ffmpeg.
            Ok(())
        });
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        Ok(Self {
            child: Some(child),
            feeder: Some(feeder),
            stderr_drain: Some(stderr_drain),
            tx: Some(tx),
            scratch: vec![0u8; (width * height * 4) as usize],
            width,
            height,
            last_idx: None,
        })
    }

    /// Reap the child and threads after a broken feed, returning a writer
    /// error that carries the encoder's exit status and stderr.
    fn feed_broken(&mut self, what: &str) -> StillclipError {
        drop(self.tx.take());

        let feeder_err = match self.feeder.take().map(|h| h.join()) {
            Some(Ok(Err(e))) => Some(e.to_string()),
            Some(Err(_)) => Some("feeder thread panicked".to_string()),
            _ => None,
        };

        let mut detail = String::new();
        if let Some(mut child) = self.child.take() {
            if let Ok(status) = child.wait() {
                detail = format!(" (ffmpeg exited with status {status}");
                if let Some(Ok(Ok(stderr_bytes))) = self.stderr_drain.take().map(|h| h.join()) {
                    let stderr = String::from_utf8_lossy(&stderr_bytes);
                    if !stderr.trim().is_empty() {
                        detail.push_str(": ");
                        detail.push_str(stderr.trim());
                    }
                }
                detail.push(')');
            }
        }

        match feeder_err {
            Some(e) => StillclipError::writer(format!("{what}: {e}{detail}")),
            None => StillclipError::writer(format!("{what}{detail}")),
        }
    }
}

impl EncodeSink for FfmpegEncodeSession {
    fn try_append(
        &mut self,
        idx: FrameIndex,
        frame: &RasterFrame,
    ) -> StillclipResult<AppendOutcome> {
        if let Some(last) = self.last_idx
            && idx <= last
        {
            return Err(StillclipError::writer(
                "encode session received out-of-order frame index",
            ));
        }

        if frame.width != self.width || frame.height != self.height {
            return Err(StillclipError::writer(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.width, self.height
            )));
        }
        if frame.rgba8_premul.len() != self.scratch.len() {
            return Err(StillclipError::writer(
                "frame pixel data size mismatch with width*height*4",
            ));
        }

        flatten_premul_over_bg_to_opaque_rgba8(&mut self.scratch, &frame.rgba8_premul, BG_RGBA)?;

        let Some(tx) = self.tx.as_ref() else {
            return Err(StillclipError::writer(
                "encode session is already finalized",
            ));
        };

        match tx.try_send(self.scratch.clone()) {
            Ok(()) => {
                self.last_idx = Some(idx);
                Ok(AppendOutcome::Appended)
            }
            Err(TrySendError::Full(_)) => Ok(AppendOutcome::NotReady),
            Err(TrySendError::Disconnected(_)) => {
                Err(self.feed_broken("encoder input closed while appending"))
            }
        }
    }

    fn finish(&mut self) -> StillclipResult<()> {
        // Closing the channel marks the input finished; the feeder drains the
        // remaining frame, drops stdin, and ffmpeg finalizes the container.
        drop(self.tx.take());

        let feeder = self
            .feeder
            .take()
            .ok_or_else(|| StillclipError::writer("encode session is already finalized"))?;
        let feed_result = feeder
            .join()
            .map_err(|_| StillclipError::writer("feeder thread panicked"))?;

        let mut child = self
            .child
            .take()
            .ok_or_else(|| StillclipError::writer("encode session not started"))?;
        let status = child.wait().map_err(|e| {
            StillclipError::writer(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| StillclipError::writer("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| StillclipError::writer(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if let Err(e) = feed_result {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(StillclipError::writer(format!(
                "failed to write frames to ffmpeg stdin: {e}{}",
                if stderr.trim().is_empty() {
                    String::new()
                } else {
                    format!(" ({})", stderr.trim())
                }
            )));
        }
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(StillclipError::writer(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> StillclipResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(StillclipError::writer(
            "flatten_premul_over_bg_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = bg_rgba[0] as u16;
    let bg_g = bg_rgba[1] as u16;
    let bg_b = bg_rgba[2] as u16;

    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = s[3] as u16;
        if a == 255 {
            d.copy_from_slice(s);
            d[3] = 255;
            continue;
        }

        let inv = 255u16 - a;
        let r = s[0] as u16 + mul_div255(bg_r, inv);
        let g = s[1] as u16 + mul_div255(bg_g, inv);
        let b = s[2] as u16 + mul_div255(bg_b, inv);

        d[0] = r.min(255) as u8;
        d[1] = g.min(255) as u8;
        d[2] = b.min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> StillclipResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_rejects_zero_dimensions() {
        let err = FfmpegEncodeSession::create(
            Path::new("target/out.mp4"),
            0,
            10,
            &FrameTiming::default(),
        )
        .unwrap_err();
        assert!(matches!(err, StillclipError::Writer(_)));
    }

    #[test]
    fn create_rejects_odd_dimensions() {
        let err = FfmpegEncodeSession::create(
            Path::new("target/out.mp4"),
            11,
            10,
            &FrameTiming::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("even"));
    }

    #[test]
    fn flatten_premul_alpha_0_returns_bg() {
        let src = vec![0u8, 0, 0, 0];
        let mut dst = vec![0u8; 4];
        flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [10, 20, 30, 255]).unwrap();
        assert_eq!(dst, vec![10, 20, 30, 255]);
    }

    #[test]
    fn flatten_premul_alpha_255_is_identity() {
        let src = vec![1u8, 2, 3, 255];
        let mut dst = vec![0u8; 4];
        flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [10, 20, 30, 255]).unwrap();
        assert_eq!(dst, src);
    }

    #[test]
    fn flatten_premul_half_alpha_over_black() {
        // Premultiplied red @ 50% alpha stays 128,0,0 over black.
        let src = vec![128u8, 0u8, 0u8, 128u8];
        let mut dst = vec![0u8; 4];
        flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [0, 0, 0, 255]).unwrap();
        assert_eq!(dst, vec![128u8, 0u8, 0u8, 255u8]);
    }
}
