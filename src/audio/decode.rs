use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{DetectError, Result};

/// Mono PCM audio at a fixed sample rate, samples normalized to [-1, 1].
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Narrow decode boundary so the search can run against a synthetic
/// in-memory decoder in tests instead of spawning external processes.
pub trait Decoder {
    /// Decode an entire file, mono, at the decoder's configured sample rate.
    fn load_full(&self, path: &Path) -> Result<AudioBuffer>;

    /// Decode `duration` seconds starting at `start` seconds.
    fn load_window(&self, path: &Path, start: f64, duration: f64) -> Result<AudioBuffer>;

    /// Best-effort total duration in seconds. `None` is not an error.
    fn probe_duration(&self, path: &Path) -> Option<f64>;

    fn sample_rate(&self) -> u32;
}

/// Decoder backed by an external `ffmpeg` process emitting raw s16le PCM
/// on stdout, plus `ffprobe` for duration probing.
pub struct FfmpegDecoder {
    sample_rate: u32,
}

impl FfmpegDecoder {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    fn run_ffmpeg(&self, path: &Path, seek: Option<(f64, f64)>) -> Result<AudioBuffer> {
        let mut cmd = Command::new("ffmpeg");
        if let Some((start, duration)) = seek {
            cmd.arg("-ss").arg(start.to_string());
            cmd.arg("-t").arg(duration.to_string());
        }
        cmd.arg("-i")
            .arg(path)
            .args(["-vn", "-acodec", "pcm_s16le"])
            .arg("-ar")
            .arg(self.sample_rate.to_string())
            .args(["-ac", "1", "-f", "s16le", "-"]);

        let child = cmd
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                DetectError::DecodeFailure(format!(
                    "failed to spawn ffmpeg (is ffmpeg installed?): {}",
                    e
                ))
            })?;

        let output = child
            .wait_with_output()
            .map_err(|e| DetectError::DecodeFailure(format!("failed to wait for ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DetectError::DecodeFailure(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.lines().last().unwrap_or("")
            )));
        }

        Ok(AudioBuffer {
            samples: pcm_s16le_to_f32(&output.stdout),
            sample_rate: self.sample_rate,
        })
    }
}

impl Decoder for FfmpegDecoder {
    fn load_full(&self, path: &Path) -> Result<AudioBuffer> {
        if !path.exists() {
            return Err(DetectError::InputNotFound(path.to_path_buf()));
        }
        let buffer = self.run_ffmpeg(path, None)?;
        log::info!(
            "Decoded {}: {} samples, {}Hz, {:.1}s",
            path.display(),
            buffer.samples.len(),
            buffer.sample_rate,
            buffer.duration_seconds()
        );
        Ok(buffer)
    }

    fn load_window(&self, path: &Path, start: f64, duration: f64) -> Result<AudioBuffer> {
        if !path.exists() {
            return Err(DetectError::InputNotFound(path.to_path_buf()));
        }
        self.run_ffmpeg(path, Some((start, duration)))
    }

    fn probe_duration(&self, path: &Path) -> Option<f64> {
        let output = Command::new("ffprobe")
            .args(["-v", "error", "-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(path)
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }

        String::from_utf8_lossy(&output.stdout).trim().parse().ok()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

fn pcm_s16le_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm_conversion_normalizes_to_unit_range() {
        let bytes = [0x00, 0x80, 0xff, 0x7f, 0x00, 0x00];
        let samples = pcm_s16le_to_f32(&bytes);
        assert_eq!(samples.len(), 3);
        assert!((samples[0] - (-1.0)).abs() < 1e-6);
        assert!((samples[1] - (32767.0 / 32768.0)).abs() < 1e-6);
        assert_eq!(samples[2], 0.0);
    }

    #[test]
    fn pcm_conversion_ignores_trailing_odd_byte() {
        let samples = pcm_s16le_to_f32(&[0x00, 0x00, 0x12]);
        assert_eq!(samples.len(), 1);
    }
}
