use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_hop_length")]
    pub hop_length: usize,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct SearchConfig {
    /// Seconds the coarse window advances each iteration.
    #[serde(default = "default_slide_interval")]
    pub slide_interval: f64,
    /// Coarse correlation score that ends the scan immediately.
    #[serde(default = "default_coarse_threshold")]
    pub coarse_threshold: f32,
    /// Coarse score at which the fine-grained pass is attempted.
    #[serde(default = "default_refinement_trigger")]
    pub refinement_trigger: f32,
    /// Fine-grained score at which refinement stops early.
    #[serde(default = "default_refinement_stop")]
    pub refinement_stop: f32,
    /// Seconds searched before/after the anchor in the fine-grained pass.
    #[serde(default = "default_refinement_window")]
    pub refinement_window: f64,
    /// Seconds the fine-grained sub-window advances each step.
    #[serde(default = "default_refinement_interval")]
    pub refinement_interval: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            hop_length: default_hop_length(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            slide_interval: default_slide_interval(),
            coarse_threshold: default_coarse_threshold(),
            refinement_trigger: default_refinement_trigger(),
            refinement_stop: default_refinement_stop(),
            refinement_window: default_refinement_window(),
            refinement_interval: default_refinement_interval(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.search.refinement_trigger <= self.search.refinement_stop,
            "refinement_trigger ({}) must not exceed refinement_stop ({})",
            self.search.refinement_trigger,
            self.search.refinement_stop
        );
        anyhow::ensure!(self.search.slide_interval > 0.0, "slide_interval must be positive");
        anyhow::ensure!(
            self.search.refinement_interval > 0.0,
            "refinement_interval must be positive"
        );
        anyhow::ensure!(self.audio.hop_length > 0, "hop_length must be positive");
        Ok(())
    }
}

fn default_sample_rate() -> u32 { 22050 }
fn default_hop_length() -> usize { 1024 }
fn default_slide_interval() -> f64 { 3.0 }
fn default_coarse_threshold() -> f32 { 0.8 }
fn default_refinement_trigger() -> f32 { 0.42 }
fn default_refinement_stop() -> f32 { 0.8 }
fn default_refinement_window() -> f64 { 15.0 }
fn default_refinement_interval() -> f64 { 0.5 }

pub fn load_config(path: &PathBuf) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}
