use std::path::PathBuf;

use clap::Parser;

use stillclip::{ConversionJob, ConversionObserver, ConvertSession, StillclipError};

/// Convert a still image into a short MP4 clip (requires `ffmpeg` on PATH).
#[derive(Parser, Debug)]
#[command(name = "stillclip", version)]
struct Cli {
    /// Input image (PNG or JPEG).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path. Defaults to the input path with an `mp4` extension.
    #[arg(long)]
    out: Option<PathBuf>,
}

struct ProgressObserver {
    out_path: PathBuf,
}

impl ConversionObserver for ProgressObserver {
    fn on_start(&mut self) {
        eprintln!("converting...");
    }

    fn on_failure(&mut self, error: &StillclipError) {
        eprintln!("conversion failed: {error}");
    }

    fn on_complete(&mut self) {
        eprintln!("wrote {}", self.out_path.display());
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let out = cli
        .out
        .unwrap_or_else(|| cli.in_path.with_extension("mp4"));

    let mut session = ConvertSession::new(ConversionJob::new(&cli.in_path, &out));
    let mut observer = ProgressObserver {
        out_path: out.clone(),
    };
    session.run(&mut observer)?;
    Ok(())
}
