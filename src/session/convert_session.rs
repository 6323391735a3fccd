use std::path::{Path, PathBuf};

use crate::encode::encode_frame_sequence;
use crate::foundation::error::{StillclipError, StillclipResult};
use crate::foundation::timing::FrameTiming;
use crate::normalize::pass::{ExportPreset, normalize_container};

/// One conversion: a source image path paired with a destination video path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionJob {
    /// Path to the source raster image (PNG/JPEG).
    pub source_image: PathBuf,
    /// Path the output MP4 is written to; any existing file is replaced.
    pub dest_video: PathBuf,
}

impl ConversionJob {
    /// Pair a source image with a destination video path.
    pub fn new(source_image: impl Into<PathBuf>, dest_video: impl Into<PathBuf>) -> Self {
        Self {
            source_image: source_image.into(),
            dest_video: dest_video.into(),
        }
    }
}

/// Lifecycle position of a conversion. Strictly forward-progressing;
/// `Failed` is absorbing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConversionState {
    /// `run` has not been called.
    NotStarted,
    /// Clearing the destination path.
    Preparing,
    /// Streaming frames into the intermediate container.
    Encoding,
    /// Second-pass export to the destination.
    Normalizing,
    /// The destination holds a complete, playable video.
    Completed,
    /// A stage failed; carries the error's display form.
    Failed(String),
}

/// Lifecycle callbacks fired by [`ConvertSession::run`].
///
/// `on_start` fires exactly once before any I/O; exactly one of `on_failure`
/// or `on_complete` follows, and both are terminal.
pub trait ConversionObserver {
    /// The conversion is about to begin.
    fn on_start(&mut self);
    /// The conversion failed with `error`; no further callbacks fire.
    fn on_failure(&mut self, error: &StillclipError);
    /// The destination now holds a complete video; no further callbacks fire.
    fn on_complete(&mut self);
}

/// Observer that ignores every callback.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl ConversionObserver for NoopObserver {
    fn on_start(&mut self) {}
    fn on_failure(&mut self, _error: &StillclipError) {}
    fn on_complete(&mut self) {}
}

/// Drives one [`ConversionJob`] through prepare → encode → normalize.
///
/// Each stage is gated on the previous one's success; the first error aborts
/// the pipeline. There is no cancellation and no rollback: a failure after
/// encoding has begun may leave the intermediate file on disk.
#[derive(Debug)]
pub struct ConvertSession {
    job: ConversionJob,
    timing: FrameTiming,
    preset: ExportPreset,
    state: ConversionState,
}

impl ConvertSession {
    /// Create a session with the default timing (2 frames, 30 fps timescale)
    /// and highest-quality export preset.
    pub fn new(job: ConversionJob) -> Self {
        Self {
            job,
            timing: FrameTiming::default(),
            preset: ExportPreset::default(),
            state: ConversionState::NotStarted,
        }
    }

    /// Override the frame timing policy.
    pub fn with_timing(mut self, timing: FrameTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Override the export preset.
    pub fn with_preset(mut self, preset: ExportPreset) -> Self {
        self.preset = preset;
        self
    }

    /// Current lifecycle position.
    pub fn state(&self) -> &ConversionState {
        &self.state
    }

    /// Where the first-pass container is written: a sibling of the
    /// destination with a `pass1` extension prefix.
    pub fn intermediate_path(&self) -> PathBuf {
        let ext = self
            .job
            .dest_video
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4");
        self.job.dest_video.with_extension(format!("pass1.{ext}"))
    }

    /// Run the conversion to completion or first failure.
    ///
    /// Fires the observer's `on_start` before any I/O, then exactly one of
    /// `on_complete` / `on_failure`. A session runs at most once.
    pub fn run(&mut self, observer: &mut dyn ConversionObserver) -> StillclipResult<()> {
        if self.state != ConversionState::NotStarted {
            return Err(StillclipError::prepare(
                "conversion session has already run",
            ));
        }

        observer.on_start();

        match self.run_stages() {
            Ok(()) => {
                self.state = ConversionState::Completed;
                tracing::info!(dest = %self.job.dest_video.display(), "conversion completed");
                observer.on_complete();
                Ok(())
            }
            Err(e) => {
                self.state = ConversionState::Failed(e.to_string());
                tracing::info!(error = %e, "conversion failed");
                observer.on_failure(&e);
                Err(e)
            }
        }
    }

    fn run_stages(&mut self) -> StillclipResult<()> {
        self.state = ConversionState::Preparing;
        tracing::info!(dest = %self.job.dest_video.display(), "preparing output path");
        prepare_output_path(&self.job.dest_video)?;

        self.state = ConversionState::Encoding;
        let intermediate = self.intermediate_path();
        encode_frame_sequence(&self.job.source_image, &intermediate, &self.timing)?;

        self.state = ConversionState::Normalizing;
        normalize_container(&intermediate, &self.job.dest_video, self.preset)?;

        std::fs::remove_file(&intermediate).map_err(|e| {
            StillclipError::prepare(format!(
                "failed to remove intermediate file '{}': {e}",
                intermediate.display()
            ))
        })?;
        Ok(())
    }
}

/// Guarantee no existing file occupies `path` before encoding begins.
///
/// No other side effects; a removal failure carries the underlying cause.
pub(crate) fn prepare_output_path(path: &Path) -> StillclipResult<()> {
    if !path.exists() {
        return Ok(());
    }
    tracing::debug!(path = %path.display(), "removing existing output file");
    std::fs::remove_file(path).map_err(|e| {
        StillclipError::prepare(format!(
            "failed to remove existing file '{}': {e}",
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "stillclip_{tag}_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[derive(Default)]
    struct RecordingObserver {
        starts: u32,
        completes: u32,
        failures: Vec<String>,
    }

    impl ConversionObserver for RecordingObserver {
        fn on_start(&mut self) {
            self.starts += 1;
        }
        fn on_failure(&mut self, error: &StillclipError) {
            self.failures.push(error.to_string());
        }
        fn on_complete(&mut self) {
            self.completes += 1;
        }
    }

    #[test]
    fn prepare_leaves_missing_path_alone() {
        let root = temp_root("prepare_missing");
        prepare_output_path(&root.join("nope.mp4")).unwrap();
    }

    #[test]
    fn prepare_removes_existing_file() {
        let root = temp_root("prepare_existing");
        let path = root.join("out.mp4");
        std::fs::write(&path, b"junk").unwrap();

        prepare_output_path(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn intermediate_path_is_a_sibling_with_pass1_suffix() {
        let session = ConvertSession::new(ConversionJob::new("/in/pic.png", "/tmp/out.mp4"));
        assert_eq!(
            session.intermediate_path(),
            PathBuf::from("/tmp/out.pass1.mp4")
        );
    }

    #[test]
    fn undecodable_source_fails_without_creating_destination() {
        let root = temp_root("bad_source");
        let source = root.join("not_an_image.png");
        std::fs::write(&source, b"junk bytes").unwrap();
        let dest = root.join("out.mp4");

        let mut session = ConvertSession::new(ConversionJob::new(&source, &dest));
        let mut observer = RecordingObserver::default();
        let err = session.run(&mut observer).unwrap_err();

        assert!(matches!(err, StillclipError::Decode(_)));
        assert!(!dest.exists());
        assert_eq!(observer.starts, 1);
        assert_eq!(observer.completes, 0);
        assert_eq!(observer.failures.len(), 1);
        assert!(matches!(session.state(), ConversionState::Failed(_)));
    }

    #[test]
    fn session_refuses_to_run_twice() {
        let root = temp_root("run_twice");
        let source = root.join("missing.png");
        let dest = root.join("out.mp4");

        let mut session = ConvertSession::new(ConversionJob::new(&source, &dest));
        let _ = session.run(&mut NoopObserver);
        let err = session.run(&mut NoopObserver).unwrap_err();
        assert!(err.to_string().contains("already run"));
    }
}
