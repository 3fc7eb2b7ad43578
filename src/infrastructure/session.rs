//! Browser session management
//!
//! Launches and tears down one isolated Chromium instance per job attempt.
//! Isolation means an own profile directory (cookies, cache, local storage),
//! an own user agent, and a window position offset per worker slot so
//! concurrently visible windows do not fully overlap.

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::services::SessionError;
use crate::infrastructure::database_paths::default_profile_root;
use crate::infrastructure::user_agents::random_desktop_user_agent;

/// Vertical stacking step between concurrently visible browser windows.
const WINDOW_OFFSET_PX: u32 = 50;
const VIEWPORT_WIDTH: u32 = 1200;
const VIEWPORT_HEIGHT: u32 = 800;

/// Configuration for launching browser sessions.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Run without a visible window.
    pub headless: bool,
    /// Explicit executable path; skips the search order when set.
    pub executable_override: Option<PathBuf>,
    /// Directory under which per-session profile directories are created.
    pub profile_root: PathBuf,
    /// Ceiling for the browser process to come up.
    pub launch_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: false,
            executable_override: None,
            profile_root: default_profile_root(),
            launch_timeout: Duration::from_secs(20),
        }
    }
}

/// One live browser process, exclusively owned by one job attempt.
pub struct BrowserSession {
    /// Display id, e.g. "worker-1-5f3a".
    pub id: String,
    pub worker_index: usize,
    browser: Option<Browser>,
    page: Option<Page>,
    profile_dir: PathBuf,
    handler_task: tokio::task::JoinHandle<()>,
}

impl BrowserSession {
    /// The single page this session drives. `None` after release.
    pub fn page(&self) -> Option<&Page> {
        self.page.as_ref()
    }
}

/// Acquires and releases isolated browser sessions.
pub struct SessionManager {
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Resolve the browser executable. Search order: explicit override,
    /// platform default install locations, then the `browser/` directory
    /// bundled next to the application's own executable.
    fn resolve_executable(&self) -> Result<PathBuf, SessionError> {
        if let Some(path) = &self.config.executable_override {
            return if path.exists() {
                Ok(path.clone())
            } else {
                Err(SessionError::BrowserNotFound)
            };
        }

        let mut candidates: Vec<PathBuf> = if cfg!(target_os = "windows") {
            let mut paths = vec![
                PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
                PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
            ];
            if let Ok(local) = std::env::var("LOCALAPPDATA") {
                paths.push(PathBuf::from(format!(
                    r"{local}\Google\Chrome\Application\chrome.exe"
                )));
            }
            paths
        } else if cfg!(target_os = "macos") {
            vec![PathBuf::from(
                "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            )]
        } else {
            vec![
                PathBuf::from("/usr/bin/google-chrome"),
                PathBuf::from("/usr/bin/google-chrome-stable"),
                PathBuf::from("/usr/bin/chromium"),
                PathBuf::from("/usr/bin/chromium-browser"),
            ]
        };

        // App-bundled browser directory, next to our own executable
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let bundled = dir.join("browser");
                if cfg!(target_os = "windows") {
                    candidates.push(bundled.join("chrome.exe"));
                } else if cfg!(target_os = "macos") {
                    candidates.push(bundled.join("chrome-mac/Chromium.app/Contents/MacOS/Chromium"));
                } else {
                    candidates.push(bundled.join("chrome"));
                }
            }
        }

        candidates
            .into_iter()
            .find(|p| p.exists())
            .ok_or(SessionError::BrowserNotFound)
    }

    /// Create the uniquely named profile directory for one session.
    fn create_profile_dir(&self, worker_index: usize) -> Result<PathBuf, SessionError> {
        let name = format!(
            "worker-{}-{}-{}",
            worker_index,
            chrono::Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );
        let dir = self.config.profile_root.join(name);
        std::fs::create_dir_all(&dir).map_err(|e| SessionError::ProfileDir {
            dir: dir.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(dir)
    }

    /// Launch an isolated session for the given worker slot.
    pub async fn acquire(&self, worker_index: usize) -> Result<BrowserSession, SessionError> {
        let executable = self.resolve_executable()?;
        let profile_dir = self.create_profile_dir(worker_index)?;

        let window_y = worker_index as u32 * WINDOW_OFFSET_PX;
        let user_agent = random_desktop_user_agent();

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&executable)
            .user_data_dir(&profile_dir)
            .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
            .viewport(Viewport {
                width: VIEWPORT_WIDTH,
                height: VIEWPORT_HEIGHT,
                ..Viewport::default()
            })
            .launch_timeout(self.config.launch_timeout)
            // Sandbox off: a declared trust-boundary relaxation so sessions
            // run under the restricted environments some crawlers live in.
            .no_sandbox()
            .arg(format!("--window-position=0,{window_y}"))
            .arg("--disable-infobars")
            .arg("--no-default-browser-check")
            .arg("--ignore-certificate-errors");

        if !self.config.headless {
            builder = builder.with_head();
        }

        let config = builder
            .build()
            .map_err(SessionError::LaunchFailed)?;

        info!(
            worker_index,
            executable = %executable.display(),
            window_y,
            "launching browser session"
        );

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SessionError::LaunchFailed(e.to_string()))?;

        // The CDP event stream must be drained for the session to make
        // progress; the task ends when the browser disconnects.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SessionError::LaunchFailed(e.to_string()))?;
        page.set_user_agent(user_agent)
            .await
            .map_err(|e| SessionError::LaunchFailed(e.to_string()))?;

        debug!(worker_index, user_agent, "session ready");

        Ok(BrowserSession {
            id: format!("worker-{}-{}", worker_index, Uuid::new_v4().simple()),
            worker_index,
            browser: Some(browser),
            page: Some(page),
            profile_dir,
            handler_task,
        })
    }

    /// Terminate the browser process (if still running) and remove the
    /// session's profile directory. Idempotent; called on every exit path
    /// of a job attempt, including timeout abandonment.
    pub async fn release(&self, mut session: BrowserSession) {
        if let Some(page) = session.page.take() {
            let _ = page.close().await;
        }

        if let Some(mut browser) = session.browser.take() {
            // Graceful close first, then force kill so no child process
            // survives the attempt.
            let _ = browser.close().await;
            let _ = browser.kill().await;
        }

        session.handler_task.abort();

        if session.profile_dir.exists() {
            if let Err(e) = tokio::fs::remove_dir_all(&session.profile_dir).await {
                warn!(
                    session = %session.id,
                    dir = %session.profile_dir.display(),
                    "failed to remove session profile dir: {e}"
                );
            }
        }

        debug!(session = %session.id, "session released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_override_is_browser_not_found() {
        let manager = SessionManager::new(SessionConfig {
            executable_override: Some(PathBuf::from("/definitely/not/a/browser")),
            ..SessionConfig::default()
        });

        assert!(matches!(
            manager.resolve_executable(),
            Err(SessionError::BrowserNotFound)
        ));
    }

    #[test]
    fn profile_dirs_are_unique_per_call() {
        let root = tempfile::tempdir().unwrap();
        let manager = SessionManager::new(SessionConfig {
            profile_root: root.path().to_path_buf(),
            ..SessionConfig::default()
        });

        let a = manager.create_profile_dir(0).unwrap();
        let b = manager.create_profile_dir(0).unwrap();
        assert_ne!(a, b);
        assert!(a.exists() && b.exists());

        let name = a.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("worker-0-"));
    }
}
