use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};

pub mod allocate;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod ffmpeg;
pub mod init;
pub mod layout;
pub mod render;
pub mod script;
pub mod segment;
pub mod srt;
pub mod timeline;

pub use engine::build_timeline;
pub use timeline::RenderTimeline;
pub use error::EngineError;

pub type RenderLogHook = Arc<Mutex<dyn Fn(&str) + Send + Sync + 'static>>;

static LOG_HOOK: Lazy<Mutex<Option<RenderLogHook>>> = Lazy::new(|| Mutex::new(None));

/// Installs a callback that receives every tagged progress line, e.g. for a
/// host process that forwards render progress to its own log.
pub fn set_log_hook(hook: Option<RenderLogHook>) {
    if let Ok(mut guard) = LOG_HOOK.lock() {
        *guard = hook;
    }
}

pub(crate) fn logv(tag: &str, message: &str) {
    eprintln!("[{}] {}", tag, message);

    if let Ok(guard) = LOG_HOOK.lock() {
        if let Some(hook) = guard.as_ref() {
            if let Ok(callback) = hook.lock() {
                let line = format!("[{}] {}", tag, message);
                callback(&line);
            }
        }
    }
}

pub(crate) fn logi(message: impl AsRef<str>) {
    logv("INFO", message.as_ref());
}

pub(crate) fn logok(message: impl AsRef<str>) {
    logv("OK", message.as_ref());
}

pub(crate) fn logw(message: impl AsRef<str>) {
    logv("WARN", message.as_ref());
}
