//! Centralized configuration for SramVault.
//!
//! Goals:
//! - Single place for the tunables the host hands over (autosave on/off, interval).
//! - SramConfig::from_env() reads the SRAM_* env vars; with_* setters override.
//!
//! Env:
//! - SRAM_SNAPSHOTS          = 0|1|true|false|on|off (default off)
//! - SRAM_AUTOSAVE_INTERVAL  = seconds (default 300, 0 => 300)
//! - SRAM_TMP_DIR            = directory for per-slot scratch images
//! - SRAM_ROOT_DIR           = base for relative save paths

use std::fmt;
use std::path::{Path, PathBuf};

use crate::consts::DEFAULT_AUTOSAVE_INTERVAL_SECS;

#[derive(Clone, Debug)]
pub struct SramConfig {
    /// Master switch: when false the engine refuses mounts and poll() is a no-op.
    /// Env: SRAM_SNAPSHOTS (default false)
    pub autosave_enabled: bool,

    /// Autosave interval in seconds. 0 is treated as the default (300).
    /// Env: SRAM_AUTOSAVE_INTERVAL
    pub autosave_interval_secs: u32,

    /// Where per-slot scratch images live (ephemeral storage).
    /// Env: SRAM_TMP_DIR (default: std::env::temp_dir())
    pub tmp_dir: PathBuf,

    /// Base directory for relative save paths. None => current dir.
    /// Env: SRAM_ROOT_DIR
    pub root_dir: Option<PathBuf>,
}

impl Default for SramConfig {
    fn default() -> Self {
        Self {
            autosave_enabled: false,
            autosave_interval_secs: DEFAULT_AUTOSAVE_INTERVAL_SECS,
            tmp_dir: std::env::temp_dir(),
            root_dir: None,
        }
    }
}

fn parse_flag(v: &str) -> bool {
    let s = v.trim().to_ascii_lowercase();
    s == "1" || s == "true" || s == "on" || s == "yes"
}

impl SramConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("SRAM_SNAPSHOTS") {
            cfg.autosave_enabled = parse_flag(&v);
        }

        if let Ok(v) = std::env::var("SRAM_AUTOSAVE_INTERVAL") {
            if let Ok(n) = v.trim().parse::<u32>() {
                cfg.autosave_interval_secs = n;
            }
        }

        if let Ok(v) = std::env::var("SRAM_TMP_DIR") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.tmp_dir = PathBuf::from(s);
            }
        }

        if let Ok(v) = std::env::var("SRAM_ROOT_DIR") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.root_dir = Some(PathBuf::from(s));
            }
        }

        cfg
    }

    pub fn with_autosave_enabled(mut self, on: bool) -> Self {
        self.autosave_enabled = on;
        self
    }

    pub fn with_autosave_interval_secs(mut self, secs: u32) -> Self {
        self.autosave_interval_secs = secs;
        self
    }

    pub fn with_tmp_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.tmp_dir = dir.into();
        self
    }

    pub fn with_root_dir<P: Into<PathBuf>>(mut self, dir: Option<P>) -> Self {
        self.root_dir = dir.map(Into::into);
        self
    }

    /// Finish the builder and obtain the configuration.
    pub fn build(self) -> Self {
        self
    }

    /// Effective autosave interval in milliseconds (0 => default, saturated to u32 ms range).
    pub fn interval_ms(&self) -> u64 {
        let mut secs = self.autosave_interval_secs;
        if secs == 0 {
            secs = DEFAULT_AUTOSAVE_INTERVAL_SECS;
        }
        secs = secs.min(u32::MAX / 1000);
        secs as u64 * 1000
    }

    /// Logical save path -> absolute path (relative paths hang off root_dir).
    pub fn resolve(&self, p: &Path) -> PathBuf {
        match &self.root_dir {
            Some(root) if p.is_relative() => crate::util::absolute(&root.join(p)),
            _ => crate::util::absolute(p),
        }
    }
}

impl fmt::Display for SramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SramConfig {{ \
             autosave_enabled: {}, \
             autosave_interval_secs: {}, \
             tmp_dir: {}, \
             root_dir: {} \
             }}",
            self.autosave_enabled,
            self.autosave_interval_secs,
            self.tmp_dir.display(),
            self.root_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "default(cwd)".to_string()),
        )
    }
}
