use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use introseek::audio::decode::Decoder;
use introseek::cli::Cli;
use introseek::config;
use introseek::hash::content_hash;
use introseek::sink::{DetectionRecord, JsonLinesSink, ResultSink};
use introseek::{AudioSource, ChromaExtractor, FfmpegDecoder, SearchController};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect introseek.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = std::path::PathBuf::from("introseek.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("introseek").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        None
    });

    let mut cfg = config::Config::default();
    if let Some(ref path) = config_path {
        if let Some(loaded) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            cfg = loaded;
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    // CLI threshold wins when changed from its default
    if cli.threshold != 0.8 {
        cfg.search.coarse_threshold = cli.threshold;
    }
    cfg.validate()?;

    log::info!("Target: {}", cli.target.display());
    log::info!("Reference: {}", cli.reference.display());

    // Content identity for the result record and the rescan check
    let identity = match content_hash(&cli.target) {
        Ok((hash, size)) => {
            log::info!("Target hash: {} (size: {} bytes)", hash, size);
            Some((hash, size))
        }
        Err(e) => {
            log::warn!("Could not compute target hash: {}", e);
            None
        }
    };

    let file_name = cli
        .target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| cli.target.display().to_string());

    let mut sink = JsonLinesSink::new(cli.results.clone());
    let hash = identity.as_ref().map(|(h, _)| h.as_str());
    if !cli.force && sink.contains(&file_name, hash) {
        log::info!("Target already known, skipping (use --force to rescan)");
        return Ok(());
    }

    let decoder = FfmpegDecoder::new(cfg.audio.sample_rate);
    let source = AudioSource::new(&decoder, cfg.search.slide_interval);
    let extractor = ChromaExtractor::new(cfg.audio.sample_rate, cfg.audio.hop_length);
    let controller = SearchController::new(source, extractor, cfg.search);

    // Probed once; the scan reuses it instead of spawning ffprobe again
    let total_duration = decoder.probe_duration(&cli.target);
    let pb = match total_duration {
        Some(total) => {
            let pb = ProgressBar::new(total.ceil() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len}s scanned")
                    .unwrap()
                    .progress_chars("=>-"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };

    let outcome = controller
        .run_with_progress(&cli.target, &cli.reference, total_duration, |start_seconds| {
            pb.set_position(start_seconds as u64);
        })
        .context("Search failed")?;
    pb.finish_and_clear();

    match (outcome.matched, outcome.timestamp) {
        (true, Some(timestamp)) => {
            let end = timestamp + outcome.reference_duration;
            println!(
                "Match found at {} - {} (correlation {:.4})",
                format_timestamp(timestamp),
                format_timestamp(end),
                outcome.score
            );

            let (target_hash, file_size) = match identity {
                Some((h, s)) => (Some(h), Some(s)),
                None => (None, None),
            };
            sink.save(&DetectionRecord {
                file_name,
                target_hash,
                file_size,
                start_seconds: timestamp,
                end_seconds: end,
                score: outcome.score,
                outro_length_seconds: cli.outro_length,
            })?;
            Ok(())
        }
        _ => {
            match outcome.timestamp {
                Some(best) => println!(
                    "No match above threshold {:.2}; best candidate {} (correlation {:.4})",
                    cfg.search.coarse_threshold,
                    format_timestamp(best),
                    outcome.score
                ),
                None => println!("No match found"),
            }
            std::process::exit(1);
        }
    }
}

/// mm:ss for human-facing output.
fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
