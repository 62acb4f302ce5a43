//! Configuration and Shader Hot-Reload
//!
//! Watches config.toml and the configured postprocess shader files, sending
//! reload events through a channel for the application to handle. The
//! postprocess chain itself is rebuilt by whoever owns the shader set, on
//! its own thread.

use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use crate::{Config, ConfigError};

/// Events emitted by the shader watcher
#[derive(Debug, Clone)]
pub enum ShaderEvent {
    /// Configuration file changed, contains new config
    ConfigReloaded(Config),
    /// Postprocess shader list or contents changed, contains the sources
    /// in chain order
    PostprocessChanged(Vec<String>),
    /// Error occurred during reload
    ReloadError(String),
}

/// Decides which event, if any, a changed path produces
struct WatchState {
    config_path: PathBuf,
    base_dir: PathBuf,
    config: Config,
    shader_paths: Vec<PathBuf>,
    debounce: Duration,
    last_config_event: Option<Instant>,
    last_shader_event: Option<Instant>,
}

impl WatchState {
    fn new(config_path: PathBuf, config: Config, debounce: Duration) -> Self {
        let base_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let shader_paths = config.postprocess_paths(&base_dir);
        Self {
            config_path,
            base_dir,
            config,
            shader_paths,
            debounce,
            last_config_event: None,
            last_shader_event: None,
        }
    }

    /// Directories that must be watched to see every relevant file
    fn watch_dirs(&self) -> BTreeSet<PathBuf> {
        std::iter::once(&self.config_path)
            .chain(&self.shader_paths)
            .filter_map(|path| path.parent())
            .map(Path::to_path_buf)
            .collect()
    }

    fn handle(&mut self, path: &Path, now: Instant) -> Vec<ShaderEvent> {
        let mut events = Vec::new();

        if path == self.config_path {
            if debounced(&mut self.last_config_event, now, self.debounce) {
                return events;
            }

            log::info!("Config file changed, reloading...");
            match Config::load_from(&self.config_path) {
                Ok(new_config) => {
                    let list_changed =
                        new_config.shaders.postprocess != self.config.shaders.postprocess;
                    self.shader_paths = new_config.postprocess_paths(&self.base_dir);
                    self.config = new_config.clone();
                    events.push(ShaderEvent::ConfigReloaded(new_config));
                    if list_changed {
                        events.push(self.postprocess_event());
                    }
                }
                Err(e) => {
                    log::error!("Failed to reload config: {}", e);
                    events.push(ShaderEvent::ReloadError(e.to_string()));
                }
            }
        } else if self.shader_paths.iter().any(|p| p == path) {
            if debounced(&mut self.last_shader_event, now, self.debounce) {
                return events;
            }

            log::info!("Postprocess shader {:?} changed, reloading...", path);
            events.push(self.postprocess_event());
        }

        events
    }

    fn postprocess_event(&self) -> ShaderEvent {
        ShaderEvent::PostprocessChanged(self.config.load_postprocess_chain(&self.base_dir))
    }
}

/// Returns true if an event at `now` falls inside the debounce window
fn debounced(last: &mut Option<Instant>, now: Instant, window: Duration) -> bool {
    if let Some(previous) = *last {
        if now.saturating_duration_since(previous) < window {
            return true;
        }
    }
    *last = Some(now);
    false
}

/// Watches the configuration file and postprocess shaders for changes
pub struct ShaderWatcher {
    _watcher: RecommendedWatcher,
    receiver: Receiver<ShaderEvent>,
}

impl ShaderWatcher {
    /// Watch `config_path` and the shaders `config` lists, with default options
    pub fn new(config_path: PathBuf, config: &Config) -> Result<Self, ConfigError> {
        ShaderWatcherBuilder::new().build(config_path, config)
    }

    /// Try to receive a shader event without blocking
    pub fn try_recv(&self) -> Option<ShaderEvent> {
        self.receiver.try_recv().ok()
    }

    /// Block until the next event, or `None` once the watcher is gone
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ShaderEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Get all pending events
    pub fn drain_events(&self) -> Vec<ShaderEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Builder for creating a ShaderWatcher with custom options
pub struct ShaderWatcherBuilder {
    debounce_ms: u64,
    poll_interval_ms: u64,
}

impl Default for ShaderWatcherBuilder {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            poll_interval_ms: 1000,
        }
    }
}

impl ShaderWatcherBuilder {
    /// Create a new builder with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set debounce duration in milliseconds
    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Set the poll interval used by polling backends
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Build the watcher
    ///
    /// The set of watched directories is fixed here. A reloaded config that
    /// names shaders in a new directory needs a new watcher.
    pub fn build(self, config_path: PathBuf, config: &Config) -> Result<ShaderWatcher, ConfigError> {
        let (tx, rx) = mpsc::channel();

        let mut state = WatchState::new(
            config_path,
            config.clone(),
            Duration::from_millis(self.debounce_ms),
        );
        let watch_dirs = state.watch_dirs();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        return;
                    }
                    let now = Instant::now();
                    for path in &event.paths {
                        for shader_event in state.handle(path, now) {
                            let _ = tx.send(shader_event);
                        }
                    }
                }
                Err(e) => {
                    log::error!("Watch error: {:?}", e);
                }
            },
            NotifyConfig::default().with_poll_interval(Duration::from_millis(self.poll_interval_ms)),
        )
        .map_err(|e| ConfigError::WatchError(e.to_string()))?;

        for dir in &watch_dirs {
            if dir.exists() {
                watcher
                    .watch(dir, RecursiveMode::NonRecursive)
                    .map_err(|e| ConfigError::WatchError(e.to_string()))?;
                log::info!("Watching directory: {:?}", dir);
            } else {
                log::warn!("Not watching missing directory {:?}", dir);
            }
        }

        Ok(ShaderWatcher {
            _watcher: watcher,
            receiver: rx,
        })
    }
}
