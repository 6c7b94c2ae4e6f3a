//! Replay a JSON-lines landmark recording through a full session
//!
//! Usage: postura-replay [--config <file.json>] [--json-logs] <recording.jsonl>

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use postura_core::{ManualClock, PosturaError, PosturaResult};
use postura_runtime::{
    init_tracing, DeviceProfile, ExperienceDriver, LogFormat, RecordedSource, RuntimeConfig,
    SilentAudioPlayer, TracingPresenter,
};

const USAGE: &str = "usage: postura-replay [--config <file.json>] [--json-logs] <recording.jsonl>";

struct ReplayOptions {
    recording: PathBuf,
    config: Option<PathBuf>,
    json_logs: bool,
}

fn parse_args() -> PosturaResult<ReplayOptions> {
    let mut recording = None;
    let mut config = None;
    let mut json_logs = false;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json-logs" => json_logs = true,
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| PosturaError::Config(format!("--config needs a path\n{USAGE}")))?;
                config = Some(PathBuf::from(path));
            }
            _ if recording.is_none() => recording = Some(PathBuf::from(arg)),
            _ => return Err(PosturaError::Config(format!("unexpected argument {arg}\n{USAGE}"))),
        }
    }

    let recording = recording.ok_or_else(|| PosturaError::Config(USAGE.to_string()))?;
    Ok(ReplayOptions {
        recording,
        config,
        json_logs,
    })
}

#[tokio::main]
async fn main() -> PosturaResult<()> {
    let opts = parse_args()?;

    let mut config = match &opts.config {
        Some(path) => RuntimeConfig::from_json_file(path)?,
        None => RuntimeConfig::default(),
    };
    if opts.json_logs {
        config.log_format = LogFormat::Json;
    }
    init_tracing(config.log_format)?;

    let profile = DeviceProfile::detect(config.device);
    let model = config.model_variant(&profile);
    info!(
        device = ?config.device,
        cores = profile.cores,
        model = model.asset_name(),
        stride = config.frame_stride(),
        "replay configured"
    );

    let clock = ManualClock::new();
    let mut source = RecordedSource::from_file(&opts.recording)?.with_clock(clock.clone());
    info!(frames = source.len(), path = %opts.recording.display(), "recording loaded");

    let mut driver = ExperienceDriver::with_config(
        &config,
        Arc::new(SilentAudioPlayer::new(Duration::ZERO)),
        Arc::new(TracingPresenter),
        Arc::new(clock),
    )?;
    driver.run(&mut source).await;

    let stats = driver.stats();
    info!(
        final_phase = driver.current_phase(),
        finished = driver.machine().is_finished(),
        processed = stats.frames_processed,
        skipped = stats.frames_skipped,
        detector_errors = stats.detector_errors,
        "replay finished"
    );
    Ok(())
}
