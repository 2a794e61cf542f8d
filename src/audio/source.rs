use std::path::{Path, PathBuf};

use super::decode::{AudioBuffer, Decoder};
use crate::error::Result;

/// Streaming and random access over a target file, built on a [`Decoder`].
pub struct AudioSource<'a, D: Decoder> {
    decoder: &'a D,
    slide_interval: f64,
}

/// One overlapping window of the target stream.
pub struct Window {
    pub buffer: AudioBuffer,
    pub start_seconds: f64,
}

impl<'a, D: Decoder> AudioSource<'a, D> {
    pub fn new(decoder: &'a D, slide_interval: f64) -> Self {
        Self {
            decoder,
            slide_interval,
        }
    }

    pub fn load_full(&self, path: &Path) -> Result<AudioBuffer> {
        self.decoder.load_full(path)
    }

    /// Best-effort total duration of `path`, straight from the decoder.
    pub fn probe_duration(&self, path: &Path) -> Option<f64> {
        self.decoder.probe_duration(path)
    }

    /// Lazy sequence of overlapping windows of `window_duration` seconds,
    /// successive starts advancing by the slide interval. Windows overlap
    /// whenever the window duration exceeds the slide interval.
    /// `total_duration` is the caller's pre-probed duration, used only to
    /// bound the stream; `None` streams until the decode ends.
    pub fn stream_windows(
        &self,
        path: &Path,
        window_duration: f64,
        total_duration: Option<f64>,
    ) -> WindowStream<'a, D> {
        match total_duration {
            Some(total) => log::info!("Target duration: {:.1}s", total),
            None => log::warn!("Unknown target duration, streaming until decode ends"),
        }

        WindowStream {
            decoder: self.decoder,
            path: path.to_path_buf(),
            window_duration,
            slide_interval: self.slide_interval,
            total_duration,
            next_start: 0.0,
            windows_yielded: 0,
            done: false,
        }
    }

    /// Bounded random access for refinement. The start is clamped to >= 0;
    /// any decode failure or empty result yields `None`, never an error.
    pub fn extract_snippet(
        &self,
        path: &Path,
        start_seconds: f64,
        duration_seconds: f64,
    ) -> Option<AudioBuffer> {
        let start = start_seconds.max(0.0);
        match self.decoder.load_window(path, start, duration_seconds) {
            Ok(buffer) if !buffer.is_empty() => Some(buffer),
            Ok(_) => None,
            Err(e) => {
                log::debug!("Snippet extraction at {:.1}s unavailable: {}", start, e);
                None
            }
        }
    }
}

/// Pull-based iterator over target windows. A decode failure on the very
/// first window is fatal; a failure on any later window is treated as
/// end-of-stream, since a finite decoder commonly fails once the input is
/// exhausted. An empty decode also ends the stream.
pub struct WindowStream<'a, D: Decoder> {
    decoder: &'a D,
    path: PathBuf,
    window_duration: f64,
    slide_interval: f64,
    total_duration: Option<f64>,
    next_start: f64,
    windows_yielded: usize,
    done: bool,
}

impl<D: Decoder> Iterator for WindowStream<'_, D> {
    type Item = Result<Window>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(total) = self.total_duration {
            if self.next_start >= total {
                self.done = true;
                return None;
            }
        }

        let start = self.next_start;
        let buffer = match self
            .decoder
            .load_window(&self.path, start, self.window_duration)
        {
            Ok(buffer) => buffer,
            Err(e) => {
                self.done = true;
                if self.windows_yielded == 0 {
                    return Some(Err(e));
                }
                log::info!("Decode ended at {:.1}s ({}), treating as end of stream", start, e);
                return None;
            }
        };

        if buffer.is_empty() {
            self.done = true;
            return None;
        }

        self.windows_yielded += 1;
        self.next_start = start + self.slide_interval;

        log::debug!(
            "Window {}: {:.1}s - {:.1}s ({:.1}s actual)",
            self.windows_yielded,
            start,
            start + self.window_duration,
            buffer.duration_seconds()
        );

        Some(Ok(Window {
            buffer,
            start_seconds: start,
        }))
    }
}
