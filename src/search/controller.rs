use std::path::Path;

use crate::audio::chroma::{ChromaExtractor, FeatureMatrix};
use crate::audio::decode::Decoder;
use crate::audio::source::AudioSource;
use crate::config::SearchConfig;
use crate::error::Result;

use super::correlate::{cross_correlate, offset_to_seconds, peak};

/// Which pass produced a candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchStage {
    Coarse,
    Refined,
}

#[derive(Clone, Copy, Debug)]
pub struct MatchCandidate {
    pub time_seconds: f64,
    pub score: f32,
    pub stage: MatchStage,
}

/// Terminal result of one search. `matched` holds only when the returned
/// score reached the configured coarse threshold.
#[derive(Clone, Copy, Debug)]
pub struct SearchOutcome {
    pub matched: bool,
    pub timestamp: Option<f64>,
    pub score: f32,
    /// Duration of the reference clip, for computing the match end time.
    pub reference_duration: f64,
}

/// Running best across one scan. The score never decreases.
struct SearchState {
    best_time: Option<f64>,
    best_score: f32,
}

impl SearchState {
    fn new() -> Self {
        Self {
            best_time: None,
            best_score: 0.0,
        }
    }

    /// Adopts the candidate only on strict improvement.
    fn observe(&mut self, time_seconds: f64, score: f32) -> bool {
        if score > self.best_score {
            self.best_score = score;
            self.best_time = Some(time_seconds);
            true
        } else {
            false
        }
    }
}

/// Two-stage search for the position of a reference clip inside a target
/// stream: a coarse scan over overlapping windows at the slide interval,
/// with a bounded fine-grained refinement around promising hits.
pub struct SearchController<'a, D: Decoder> {
    source: AudioSource<'a, D>,
    extractor: ChromaExtractor,
    params: SearchConfig,
}

impl<'a, D: Decoder> SearchController<'a, D> {
    pub fn new(source: AudioSource<'a, D>, extractor: ChromaExtractor, params: SearchConfig) -> Self {
        Self {
            source,
            extractor,
            params,
        }
    }

    pub fn run(&self, target: &Path, reference: &Path) -> Result<SearchOutcome> {
        let total_duration = self.source.probe_duration(target);
        self.run_with_progress(target, reference, total_duration, |_| {})
    }

    /// Runs the full search. `total_duration` is the caller's pre-probed
    /// target duration (callers that already probed for a progress display
    /// pass it through instead of probing again); `progress` is called with
    /// each coarse window's start time, in increasing order.
    pub fn run_with_progress(
        &self,
        target: &Path,
        reference: &Path,
        total_duration: Option<f64>,
        mut progress: impl FnMut(f64),
    ) -> Result<SearchOutcome> {
        let reference_audio = self.source.load_full(reference)?;
        let reference_duration = reference_audio.duration_seconds();
        let reference_features = self.extractor.extract(&reference_audio);
        drop(reference_audio);

        log::info!(
            "Reference: {:.1}s, {} feature frames, coarse threshold {:.2}",
            reference_duration,
            reference_features.frame_count(),
            self.params.coarse_threshold
        );

        let mut state = SearchState::new();

        for window in self.source.stream_windows(target, reference_duration, total_duration) {
            let window = window?;
            progress(window.start_seconds);

            let candidate = self.extractor.extract(&window.buffer);
            if candidate.frame_count() < reference_features.frame_count() {
                // Window too short to contain the reference
                continue;
            }

            let scores = cross_correlate(&reference_features, &candidate);
            let Some((offset, coarse_score)) = peak(&scores) else {
                continue;
            };
            let coarse = MatchCandidate {
                time_seconds: window.start_seconds
                    + offset_to_seconds(
                        offset,
                        reference_features.rows(),
                        self.extractor.hop_length(),
                        self.extractor.sample_rate(),
                    ),
                score: coarse_score,
                stage: MatchStage::Coarse,
            };

            if state.observe(coarse.time_seconds, coarse.score) {
                log::info!(
                    "New best match at {:.1}s (correlation {:.4})",
                    coarse.time_seconds,
                    coarse.score
                );
            }

            if coarse.score >= self.params.refinement_trigger {
                let refined = self.refine(
                    target,
                    &reference_features,
                    coarse.time_seconds,
                    reference_duration,
                );
                if state.observe(refined.time_seconds, refined.score) {
                    log::info!(
                        "Refined best match at {:.1}s (correlation {:.4})",
                        refined.time_seconds,
                        refined.score
                    );
                }
            }

            // Tests the window's original coarse score and reports the coarse
            // candidate, even when refinement has just moved the running best
            // elsewhere. Established behavior, kept as-is.
            if coarse.score >= self.params.coarse_threshold {
                log::info!(
                    "Match found at {:.1}s (correlation {:.4})",
                    coarse.time_seconds,
                    coarse.score
                );
                return Ok(SearchOutcome {
                    matched: true,
                    timestamp: Some(coarse.time_seconds),
                    score: coarse.score,
                    reference_duration,
                });
            }
        }

        log::info!(
            "Scan exhausted, best correlation {:.4}{}",
            state.best_score,
            state
                .best_time
                .map(|t| format!(" at {:.1}s", t))
                .unwrap_or_default()
        );

        Ok(SearchOutcome {
            matched: state.best_score >= self.params.coarse_threshold && state.best_time.is_some(),
            timestamp: state.best_time,
            score: state.best_score,
            reference_duration,
        })
    }

    /// Fine-grained pass around a coarse anchor: slides a reference-length
    /// sub-window through a snippet of
    /// `[anchor - refinement_window, anchor + refinement_window + reference_duration]`
    /// in refinement-interval steps, stopping early on a score at or above
    /// the refinement stop threshold. When the snippet cannot be extracted
    /// the anchor is returned unchanged with score 0 - a degradation, not
    /// an error.
    pub fn refine(
        &self,
        target: &Path,
        reference: &FeatureMatrix,
        anchor_seconds: f64,
        reference_duration: f64,
    ) -> MatchCandidate {
        let snippet_start = anchor_seconds - self.params.refinement_window;
        let snippet_duration = 2.0 * self.params.refinement_window + reference_duration;

        log::info!("Refining around {:.1}s", anchor_seconds);

        let Some(snippet) = self.source.extract_snippet(target, snippet_start, snippet_duration)
        else {
            log::warn!("Snippet unavailable, keeping coarse anchor at {:.1}s", anchor_seconds);
            return MatchCandidate {
                time_seconds: anchor_seconds,
                score: 0.0,
                stage: MatchStage::Refined,
            };
        };

        let actual_start = snippet_start.max(0.0);
        let snippet_seconds = snippet.duration_seconds();
        let sample_rate = self.extractor.sample_rate() as f64;

        let mut best = MatchCandidate {
            time_seconds: anchor_seconds,
            score: 0.0,
            stage: MatchStage::Refined,
        };

        let mut window_start = 0.0f64;
        while window_start < snippet_seconds - reference_duration {
            let begin = (window_start * sample_rate) as usize;
            let end = ((window_start + reference_duration) * sample_rate) as usize;
            if end > snippet.samples.len() {
                break;
            }

            let features = self.extractor.extract_samples(&snippet.samples[begin..end]);
            if features.frame_count() >= reference.frame_count() {
                let scores = cross_correlate(reference, &features);
                if let Some((offset, score)) = peak(&scores) {
                    let time = actual_start
                        + window_start
                        + offset_to_seconds(
                            offset,
                            reference.rows(),
                            self.extractor.hop_length(),
                            self.extractor.sample_rate(),
                        );

                    if score > best.score {
                        best.score = score;
                        best.time_seconds = time;
                        log::debug!("Fine-grained match: {:.1}s (correlation {:.4})", time, score);
                    }

                    if score >= self.params.refinement_stop {
                        log::info!("Strong match at {:.1}s, stopping refinement", best.time_seconds);
                        break;
                    }
                }
            }

            window_start += self.params.refinement_interval;
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::SearchState;

    #[test]
    fn best_score_never_decreases() {
        let mut state = SearchState::new();
        assert!(state.observe(10.0, 0.3));
        assert!(!state.observe(20.0, 0.2));
        assert_eq!(state.best_time, Some(10.0));
        assert!(state.observe(30.0, 0.5));
        assert_eq!(state.best_time, Some(30.0));
        assert_eq!(state.best_score, 0.5);
    }

    #[test]
    fn equal_score_is_not_an_improvement() {
        let mut state = SearchState::new();
        assert!(state.observe(5.0, 0.4));
        assert!(!state.observe(9.0, 0.4));
        assert_eq!(state.best_time, Some(5.0));
    }
}
