//! Scan result state and the auto-redirect countdown.

use super::actions::{ActionError, Clipboard, Navigator};
use super::classify::{classify, ScanKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Pause between a URL being decoded and the automatic redirect.
pub const REDIRECT_DELAY: Duration = Duration::from_secs(1);

/// A pending navigation. Dropping it cancels the redirect.
pub struct RedirectTimer {
    url: String,
    handle: Option<JoinHandle<()>>,
}

impl RedirectTimer {
    fn start(url: String, delay: Duration, navigator: Arc<dyn Navigator>) -> Self {
        let target = url.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            log::info!("Redirecting to {}", target);
            if let Err(e) = navigator.open(&target) {
                log::error!("Auto-redirect failed: {}", e);
            }
        });
        Self {
            url,
            handle: Some(handle),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn cancel(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Waits for the countdown. `true` once the navigation was attempted.
    ///
    /// Dropping the returned future before it completes still cancels.
    async fn finish(mut self) -> bool {
        let Some(handle) = self.handle.as_mut() else {
            return false;
        };
        let fired = handle.await.is_ok();
        self.handle = None;
        fired
    }
}

impl Drop for RedirectTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// The latest decoded payload and what the user chose to do with it.
pub struct ScanSession {
    result: Option<String>,
    auto_redirect: bool,
    delay: Duration,
    timer: Option<RedirectTimer>,
    navigator: Arc<dyn Navigator>,
}

impl ScanSession {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self {
            result: None,
            auto_redirect: true,
            delay: REDIRECT_DELAY,
            timer: None,
            navigator,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn kind(&self) -> Option<ScanKind> {
        self.result.as_deref().map(classify)
    }

    pub fn auto_redirect(&self) -> bool {
        self.auto_redirect
    }

    pub fn redirect_pending(&self) -> bool {
        self.timer.is_some()
    }

    /// Records a new result. Any countdown for the previous one is cancelled
    /// before a new one may start.
    pub fn on_scan(&mut self, text: impl Into<String>) {
        self.cancel_redirect();
        let text = text.into();
        log::debug!("Scan result: {:?} ({:?})", text, classify(&text));
        self.result = Some(text);
        self.arm();
    }

    /// Clears the result so scanning can start over.
    pub fn reset(&mut self) {
        self.cancel_redirect();
        self.result = None;
    }

    pub fn set_auto_redirect(&mut self, enabled: bool) {
        self.auto_redirect = enabled;
        self.cancel_redirect();
        self.arm();
    }

    pub fn toggle_auto_redirect(&mut self) {
        self.set_auto_redirect(!self.auto_redirect);
    }

    /// Stops a running countdown. Returns whether one was running.
    pub fn cancel_redirect(&mut self) -> bool {
        match self.timer.take() {
            Some(timer) => {
                log::debug!("Cancelled redirect to {}", timer.url());
                timer.cancel();
                true
            }
            None => false,
        }
    }

    /// Waits for the running countdown, if any. `true` when it fired.
    pub async fn wait_redirect(&mut self) -> bool {
        match self.timer.take() {
            Some(timer) => timer.finish().await,
            None => false,
        }
    }

    pub fn copy(&self, clipboard: &dyn Clipboard) -> Result<bool, ActionError> {
        match self.result.as_deref() {
            Some(text) => clipboard.copy_text(text).map(|()| true),
            None => Ok(false),
        }
    }

    /// Opens the result right away. Plain text is never navigated to.
    pub fn open_link(&mut self) -> Result<bool, ActionError> {
        self.cancel_redirect();
        match self.result.as_deref() {
            Some(text) if classify(text) == ScanKind::Url => {
                self.navigator.open(text).map(|()| true)
            }
            _ => Ok(false),
        }
    }

    fn arm(&mut self) {
        if !self.auto_redirect {
            return;
        }
        if let Some(text) = self.result.as_deref() {
            if classify(text) == ScanKind::Url {
                self.timer = Some(RedirectTimer::start(
                    text.to_string(),
                    self.delay,
                    Arc::clone(&self.navigator),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        opened: Mutex<Vec<String>>,
    }

    impl Navigator for Recorder {
        fn open(&self, url: &str) -> Result<(), ActionError> {
            self.opened.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    impl Clipboard for Recorder {
        fn copy_text(&self, text: &str) -> Result<(), ActionError> {
            self.opened.lock().unwrap().push(format!("copy:{}", text));
            Ok(())
        }
    }

    fn session() -> (ScanSession, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let session = ScanSession::new(recorder.clone());
        (session, recorder)
    }

    fn opened(recorder: &Recorder) -> Vec<String> {
        recorder.opened.lock().unwrap().clone()
    }

    #[tokio::test(start_paused = true)]
    async fn url_redirects_after_the_delay() {
        let (mut session, recorder) = session();
        session.on_scan("https://example.com");
        assert_eq!(session.kind(), Some(ScanKind::Url));
        assert!(session.redirect_pending());

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(opened(&recorder).is_empty());

        assert!(session.wait_redirect().await);
        assert_eq!(opened(&recorder), vec!["https://example.com"]);
    }

    #[tokio::test(start_paused = true)]
    async fn plain_text_never_redirects() {
        let (mut session, recorder) = session();
        session.on_scan("hello world");
        assert_eq!(session.kind(), Some(ScanKind::Text));
        assert!(!session.redirect_pending());
        assert!(!session.wait_redirect().await);
        assert!(opened(&recorder).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_cancels_the_countdown() {
        let (mut session, recorder) = session();
        session.on_scan("https://example.com");
        session.reset();
        assert!(session.result().is_none());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(opened(&recorder).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rescan_replaces_the_pending_redirect() {
        let (mut session, recorder) = session();
        session.on_scan("https://first.example");
        tokio::time::sleep(Duration::from_millis(500)).await;
        session.on_scan("https://second.example");

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(opened(&recorder), vec!["https://second.example"]);
    }

    #[tokio::test(start_paused = true)]
    async fn toggling_auto_redirect() {
        let (mut session, recorder) = session();
        session.set_auto_redirect(false);
        session.on_scan("https://example.com");
        assert!(!session.redirect_pending());

        session.toggle_auto_redirect();
        assert!(session.auto_redirect());
        assert!(session.redirect_pending());

        session.toggle_auto_redirect();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(opened(&recorder).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_cancel_mid_countdown() {
        let (mut session, recorder) = session();
        session.on_scan("https://example.com");
        assert!(session.cancel_redirect());
        assert!(!session.cancel_redirect());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(opened(&recorder).is_empty());
        assert_eq!(session.result(), Some("https://example.com"));
    }

    #[tokio::test(start_paused = true)]
    async fn manual_open_and_copy() {
        let (mut session, recorder) = session();
        session.set_auto_redirect(false);

        session.on_scan("hello world");
        assert!(!session.open_link().unwrap());
        assert!(session.copy(recorder.as_ref()).unwrap());

        session.on_scan("https://example.com");
        assert!(session.open_link().unwrap());
        assert_eq!(
            opened(&recorder),
            vec!["copy:hello world", "https://example.com"]
        );
    }
}
