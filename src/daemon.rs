//! Background daemon that drives the refresh scheduler and the
//! persistence bridge on a timer.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::interval;

use crate::app::{AppContext, Result, RoostError};
use crate::bridge::PushOutcome;
use crate::config::Config;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Refresh interval in seconds
    pub refresh_interval_secs: u64,
    /// Whether to run a refresh immediately on start
    pub refresh_on_start: bool,
}

impl DaemonConfig {
    /// Build from the app config, with an optional CLI override taking
    /// precedence over `refresh_interval` from the config file.
    pub fn from_config(config: &Config, interval_override: Option<&str>) -> Result<Self> {
        let interval = interval_override.unwrap_or(&config.refresh_interval);
        Ok(Self {
            refresh_interval_secs: Self::parse_interval(interval)
                .map_err(RoostError::Config)?,
            refresh_on_start: true,
        })
    }

    /// Parse an interval like "30m", "1h", "6h", "1d", or raw seconds.
    pub fn parse_interval(s: &str) -> std::result::Result<u64, String> {
        let s = s.trim().to_lowercase();
        let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
            Some(idx) => s.split_at(idx),
            None => (s.as_str(), ""),
        };

        let value: u64 = digits
            .parse()
            .map_err(|_| format!("invalid interval {:?}, use forms like 30m, 1h, 1d", s))?;

        let secs = match unit {
            "" | "s" => value,
            "m" => value * 60,
            "h" => value * 3600,
            "d" => value * 86400,
            _ => return Err(format!("unknown interval unit {:?} in {:?}", unit, s)),
        };

        if secs == 0 {
            return Err("interval must be positive".to_string());
        }
        Ok(secs)
    }

    /// Render an interval back into the shortest exact suffix form.
    pub fn format_interval(secs: u64) -> String {
        for (unit_secs, suffix) in [(86400, "d"), (3600, "h"), (60, "m")] {
            if secs >= unit_secs && secs % unit_secs == 0 {
                return format!("{}{}", secs / unit_secs, suffix);
            }
        }
        format!("{}s", secs)
    }
}

/// Single-instance guard: holds the PID file for the lifetime of the
/// daemon and removes it on drop.
struct PidFile {
    path: Option<PathBuf>,
}

impl PidFile {
    fn default_path() -> Option<PathBuf> {
        dirs::runtime_dir()
            .or_else(dirs::cache_dir)
            .map(|d| d.join("roost").join("daemon.pid"))
    }

    /// The PID recorded in `path`, if the file exists and that process is
    /// still alive. A stale file from a dead process reads as `None`.
    fn read_live_pid(path: &Path) -> Option<u32> {
        let pid: u32 = fs::read_to_string(path).ok()?.trim().parse().ok()?;
        process_exists(pid).then_some(pid)
    }

    fn acquire() -> Result<Self> {
        let Some(path) = Self::default_path() else {
            // No runtime dir to claim; run without the guard.
            return Ok(Self { path: None });
        };

        if let Some(pid) = Self::read_live_pid(&path) {
            return Err(RoostError::Other(format!(
                "another daemon is already running (PID {})",
                pid
            )));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, format!("{}\n", std::process::id()))?;
        Ok(Self { path: Some(path) })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Some(path) = &self.path {
            let _ = fs::remove_file(path);
        }
    }
}

#[cfg(unix)]
fn process_exists(pid: u32) -> bool {
    use std::process::Command;
    Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(windows)]
fn process_exists(pid: u32) -> bool {
    use std::process::Command;
    Command::new("tasklist")
        .args(["/FI", &format!("PID eq {}", pid)])
        .output()
        .map(|o| String::from_utf8_lossy(&o.stdout).contains(&pid.to_string()))
        .unwrap_or(false)
}

/// Resolves when SIGTERM or SIGINT arrives (Ctrl-C elsewhere).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
                return;
            }
        };
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = tokio::signal::ctrl_c() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Daemon runner
pub struct Daemon<'a> {
    ctx: &'a AppContext,
    config: DaemonConfig,
}

impl<'a> Daemon<'a> {
    pub fn new(ctx: &'a AppContext, config: DaemonConfig) -> Self {
        Self { ctx, config }
    }

    /// Run until SIGTERM/SIGINT. The caller still owns the context and is
    /// expected to drain the push queue afterwards.
    pub async fn run(&self) -> Result<()> {
        let _pid = PidFile::acquire()?;

        tracing::info!(
            "daemon started (refresh interval {}, PID {})",
            DaemonConfig::format_interval(self.config.refresh_interval_secs),
            std::process::id()
        );

        if self.config.refresh_on_start {
            self.run_cycle().await;
        }

        let mut timer = interval(Duration::from_secs(self.config.refresh_interval_secs));
        timer.tick().await; // Skip the first immediate tick

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = timer.tick() => self.run_cycle().await,
            }
        }

        tracing::info!("daemon shutting down");
        Ok(())
    }

    /// Run one refresh cycle and enqueue a push of the result.
    async fn run_cycle(&self) {
        match self.ctx.refresher.refresh_all().await {
            Ok(Some(summary)) => {
                tracing::info!(
                    "refresh cycle done: {} updated, {} unchanged, {} failed",
                    summary.updated,
                    summary.unchanged,
                    summary.failed
                );
                match self.ctx.bridge.push(&self.ctx.registry) {
                    Ok(PushOutcome::Enqueued) => {}
                    Ok(PushOutcome::QueueFull) => {
                        tracing::warn!("push queue full; snapshot dropped until next cycle");
                    }
                    Err(e) => tracing::error!("push failed: {}", e),
                }
            }
            Ok(None) => tracing::debug!("refresh already in progress; trigger dropped"),
            Err(e) => tracing::error!("refresh failed: {}", e),
        }
    }
}

/// Stop a running daemon by reading the PID file and signalling it.
pub fn stop_daemon() -> std::result::Result<(), String> {
    let path =
        PidFile::default_path().ok_or_else(|| "could not determine PID file path".to_string())?;
    let pid = match PidFile::read_live_pid(&path) {
        Some(pid) => pid,
        None => return Err("no daemon is running".to_string()),
    };

    signal_stop(pid)?;
    let _ = fs::remove_file(&path);
    Ok(())
}

#[cfg(unix)]
fn signal_stop(pid: u32) -> std::result::Result<(), String> {
    use std::process::Command;
    let status = Command::new("kill")
        .args(["-TERM", &pid.to_string()])
        .status()
        .map_err(|e| format!("failed to send signal: {}", e))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("failed to stop daemon (PID {})", pid))
    }
}

#[cfg(windows)]
fn signal_stop(pid: u32) -> std::result::Result<(), String> {
    use std::process::Command;
    let status = Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/F"])
        .status()
        .map_err(|e| format!("failed to stop process: {}", e))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("failed to stop daemon (PID {})", pid))
    }
}

/// Check daemon status
pub fn daemon_status() -> String {
    match PidFile::default_path() {
        Some(path) if path.exists() => match PidFile::read_live_pid(&path) {
            Some(pid) => format!("Daemon is running (PID: {})", pid),
            None => "Daemon is not running (stale PID file)".to_string(),
        },
        _ => "Daemon is not running".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval_units() {
        for (input, expected) in [
            ("45s", 45),
            ("30m", 1800),
            ("1h", 3600),
            ("6h", 21600),
            ("1d", 86400),
            ("90", 90),
            (" 2h ", 7200),
        ] {
            assert_eq!(DaemonConfig::parse_interval(input).unwrap(), expected, "{}", input);
        }
    }

    #[test]
    fn test_parse_interval_rejects_garbage_and_zero() {
        for input in ["", "h", "1w", "-5m", "0", "0h", "1hh"] {
            assert!(DaemonConfig::parse_interval(input).is_err(), "{}", input);
        }
    }

    #[test]
    fn test_format_interval_shortest_exact_form() {
        assert_eq!(DaemonConfig::format_interval(86400), "1d");
        assert_eq!(DaemonConfig::format_interval(7200), "2h");
        assert_eq!(DaemonConfig::format_interval(1800), "30m");
        assert_eq!(DaemonConfig::format_interval(90), "90s");
        // A day and a half is not an exact number of days.
        assert_eq!(DaemonConfig::format_interval(129600), "36h");
    }

    #[test]
    fn test_parse_format_round_trip() {
        for input in ["30m", "1h", "2d", "45s"] {
            let secs = DaemonConfig::parse_interval(input).unwrap();
            assert_eq!(DaemonConfig::format_interval(secs), input);
        }
    }

    #[test]
    fn test_from_config_uses_config_interval() {
        let config = Config {
            refresh_interval: "30m".to_string(),
            ..Config::default()
        };
        let daemon = DaemonConfig::from_config(&config, None).unwrap();
        assert_eq!(daemon.refresh_interval_secs, 1800);
        assert!(daemon.refresh_on_start);
    }

    #[test]
    fn test_from_config_cli_override_wins() {
        let config = Config {
            refresh_interval: "30m".to_string(),
            ..Config::default()
        };
        let daemon = DaemonConfig::from_config(&config, Some("2h")).unwrap();
        assert_eq!(daemon.refresh_interval_secs, 7200);
    }

    #[test]
    fn test_from_config_bad_interval_is_config_error() {
        let config = Config {
            refresh_interval: "soon".to_string(),
            ..Config::default()
        };
        let err = DaemonConfig::from_config(&config, None).unwrap_err();
        assert!(matches!(err, RoostError::Config(_)));
    }

    #[test]
    fn test_default_config_interval_parses() {
        let config = Config::default();
        assert!(DaemonConfig::parse_interval(&config.refresh_interval).is_ok());
    }
}
