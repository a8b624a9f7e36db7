//! Event loop that owns a scan session.
//!
//! All fact updates pass through one task. Network exchanges run in their own
//! tasks and report back as events, so a slow request never stalls the loop or
//! the timer.

use super::session::{DoneTally, ScanEvent, ScanSession};
use super::status::ScanStatus;
use super::timer::ScanTimer;
use super::transport::ScanTransport;
use crate::cancel::CancellationToken;
use crate::config::ScannerConfig;
use crate::conflicts::{ClientSnapshot, UnregisteredClients};
use crate::error::{GlyphError, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// What a page shows for its scan, published after every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanView {
    pub status: ScanStatus,
    pub text: String,
    pub tally: DoneTally,
}

impl ScanView {
    fn of(session: &ScanSession) -> Self {
        Self {
            status: session.status(),
            text: session.status_text(),
            tally: session.done_tally(),
        }
    }
}

/// Requests from the page to its driver.
#[derive(Debug)]
enum ScanCommand {
    Submit(UnregisteredClients),
    Enable,
    Stop,
}

/// Runs a [`ScanSession`] on its own task.
pub struct ScanDriver {
    session: ScanSession,
    transport: Arc<dyn ScanTransport>,
    events_tx: mpsc::Sender<ScanEvent>,
    view_tx: watch::Sender<ScanView>,
}

impl ScanDriver {
    /// Start a driver for a page load.
    ///
    /// If the snapshot carries a scanner deadline, a timer is started for it.
    pub fn start(snapshot: &ClientSnapshot, transport: Arc<dyn ScanTransport>) -> ScanHandle {
        let timer = snapshot
            .detect_conflicts_until
            .map(|until| ScanTimer::until(until, Utc::now()));
        Self::spawn(ScanSession::from_snapshot(snapshot), transport, timer)
    }

    /// Spawn the loop for `session`. Must be called inside a tokio runtime.
    pub fn spawn(
        session: ScanSession,
        transport: Arc<dyn ScanTransport>,
        timer: Option<ScanTimer>,
    ) -> ScanHandle {
        let (commands_tx, commands_rx) = mpsc::channel(ScannerConfig::EVENT_QUEUE_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(ScannerConfig::EVENT_QUEUE_CAPACITY);
        let (view_tx, view_rx) = watch::channel(ScanView::of(&session));
        let cancel = CancellationToken::new();

        if let Some(timer) = timer {
            tokio::spawn(timer.run(events_tx.clone(), cancel.clone()));
        }

        let driver = Self {
            session,
            transport,
            events_tx,
            view_tx,
        };
        let task = tokio::spawn(driver.run(commands_rx, events_rx, cancel.clone()));

        ScanHandle {
            commands: commands_tx,
            view: view_rx,
            cancel,
            task,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<ScanCommand>,
        mut events: mpsc::Receiver<ScanEvent>,
        cancel: CancellationToken,
    ) -> ScanSession {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = events.recv() => self.apply(event),
                _ = cancel.cancelled() => break,
            }
        }
        cancel.cancel();
        self.session
    }

    fn handle_command(&mut self, command: ScanCommand) {
        match command {
            ScanCommand::Submit(detected) => {
                self.apply(ScanEvent::SubmitStarted);
                let transport = self.transport.clone();
                let events = self.events_tx.clone();
                tokio::spawn(async move {
                    let event = match transport.report_conflicts(&detected).await {
                        Ok(()) => ScanEvent::SubmitFinished {
                            success: true,
                            message: None,
                            detected,
                        },
                        Err(e) => {
                            warn!("Conflict report failed: {}", e);
                            ScanEvent::SubmitFinished {
                                success: false,
                                message: Some(e.to_string()),
                                detected,
                            }
                        }
                    };
                    let _ = events.send(event).await;
                });
            }
            ScanCommand::Enable => self.exchange_scanner(true),
            ScanCommand::Stop => {
                self.apply(ScanEvent::UserAttemptedStop);
                self.exchange_scanner(false);
            }
        }
    }

    /// Start a scanner exchange. Its reply carries the exchange number, so a
    /// reply that arrives after a newer exchange started is ignored.
    fn exchange_scanner(&mut self, enable: bool) {
        self.apply(ScanEvent::ScannerSubmitStarted);
        let exchange = self.session.scanner_exchange();
        let transport = self.transport.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let event = match transport.set_scanner(enable).await {
                Ok(()) => ScanEvent::ScannerSubmitFinished {
                    exchange,
                    success: true,
                    message: None,
                },
                Err(e) => {
                    let e = GlyphError::UserAction {
                        message: format!(
                            "Could not {} the scanner: {}",
                            if enable { "enable" } else { "stop" },
                            e
                        ),
                    };
                    warn!("{}", e);
                    ScanEvent::ScannerSubmitFinished {
                        exchange,
                        success: false,
                        message: Some(e.to_string()),
                    }
                }
            };
            let _ = events.send(event).await;
        });
    }

    fn apply(&mut self, event: ScanEvent) {
        let before = self.session.status();
        let after = self.session.apply(event);
        if before != after {
            info!("Scan status {} -> {}", before, after);
        }
        self.view_tx.send_replace(ScanView::of(&self.session));
    }
}

/// Page-side handle to a running [`ScanDriver`].
pub struct ScanHandle {
    commands: mpsc::Sender<ScanCommand>,
    view: watch::Receiver<ScanView>,
    cancel: CancellationToken,
    task: JoinHandle<ScanSession>,
}

impl ScanHandle {
    /// Submit this page's detected conflicts.
    pub async fn submit(&self, detected: UnregisteredClients) -> Result<()> {
        self.send(ScanCommand::Submit(detected)).await
    }

    /// Ask the server to turn the scanner on.
    pub async fn enable(&self) -> Result<()> {
        self.send(ScanCommand::Enable).await
    }

    /// Ask the server to turn the scanner off. Not retried on failure.
    pub async fn stop(&self) -> Result<()> {
        self.send(ScanCommand::Stop).await
    }

    /// The latest published view.
    pub fn current(&self) -> ScanView {
        self.view.borrow().clone()
    }

    /// Subscribe to view updates.
    pub fn subscribe(&self) -> watch::Receiver<ScanView> {
        self.view.clone()
    }

    /// Wait until the status satisfies `pred`.
    pub async fn wait_for(&mut self, mut pred: impl FnMut(&ScanStatus) -> bool) -> Result<ScanView> {
        let view = self
            .view
            .wait_for(|view| pred(&view.status))
            .await
            .map_err(|_| GlyphError::internal("Scan driver stopped"))?;
        Ok(view.clone())
    }

    /// Stop the loop and the timer, returning the final session.
    pub async fn shutdown(self) -> Result<ScanSession> {
        self.cancel.cancel();
        drop(self.commands);
        self.task
            .await
            .map_err(|e| GlyphError::internal(format!("Scan driver task failed: {}", e)))
    }

    async fn send(&self, command: ScanCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| GlyphError::internal("Scan driver stopped"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Default)]
    struct FakeTransport {
        fail_reports: AtomicBool,
        fail_scanner: AtomicBool,
        scanner_calls: AtomicUsize,
    }

    #[async_trait]
    impl ScanTransport for FakeTransport {
        async fn report_conflicts(&self, _observations: &UnregisteredClients) -> Result<()> {
            if self.fail_reports.load(Ordering::SeqCst) {
                Err(GlyphError::Network {
                    message: "report failed".into(),
                    status_code: Some(500),
                })
            } else {
                Ok(())
            }
        }

        async fn set_scanner(&self, _enable: bool) -> Result<()> {
            self.scanner_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_scanner.load(Ordering::SeqCst) {
                Err(GlyphError::Network {
                    message: "toggle failed".into(),
                    status_code: Some(500),
                })
            } else {
                Ok(())
            }
        }
    }

    fn clients(ids: &[&str]) -> UnregisteredClients {
        ids.iter().map(|id| (id.to_string(), json!({}))).collect()
    }

    #[tokio::test]
    async fn test_submit_reaches_done() {
        let transport = Arc::new(FakeTransport::default());
        let mut handle = ScanDriver::spawn(ScanSession::new(clients(&["a", "b"])), transport, None);
        assert_eq!(handle.current().status, ScanStatus::Running);

        handle.submit(clients(&["a", "b", "c"])).await.unwrap();
        let view = handle.wait_for(|s| *s == ScanStatus::Done).await.unwrap();
        assert_eq!(view.tally, DoneTally { new_on_page: 1, total: 3 });
        assert_eq!(view.text, "Page scan complete");

        let session = handle.shutdown().await.unwrap();
        assert_eq!(session.aggregate().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_submit_is_error() {
        let transport = Arc::new(FakeTransport::default());
        transport.fail_reports.store(true, Ordering::SeqCst);
        let mut handle = ScanDriver::spawn(ScanSession::default(), transport, None);

        handle.submit(clients(&["a"])).await.unwrap();
        let view = handle.wait_for(|s| *s == ScanStatus::Error).await.unwrap();
        assert!(view.text.contains("report failed"));
    }

    #[tokio::test]
    async fn test_stop_reaches_stopped() {
        let transport = Arc::new(FakeTransport::default());
        let mut handle = ScanDriver::spawn(ScanSession::default(), transport.clone(), None);

        handle.stop().await.unwrap();
        handle.wait_for(|s| *s == ScanStatus::Stopped).await.unwrap();
        assert_eq!(transport.scanner_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_stop_is_error_without_retry() {
        let transport = Arc::new(FakeTransport::default());
        transport.fail_scanner.store(true, Ordering::SeqCst);
        let mut handle = ScanDriver::spawn(ScanSession::default(), transport.clone(), None);

        handle.stop().await.unwrap();
        let view = handle.wait_for(|s| *s == ScanStatus::Error).await.unwrap();
        assert!(view.text.contains("Could not stop the scanner"));
        assert!(view.text.contains("toggle failed"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(transport.scanner_calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.current().status, ScanStatus::Error);
    }

    #[tokio::test]
    async fn test_enable_reaches_ready() {
        let transport = Arc::new(FakeTransport::default());
        let mut handle = ScanDriver::spawn(ScanSession::default(), transport, None);
        handle.enable().await.unwrap();
        handle.wait_for(|s| *s == ScanStatus::Ready).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_expires_session() {
        let transport = Arc::new(FakeTransport::default());
        let timer = ScanTimer::new(Instant::now() + Duration::from_secs(600));
        let mut handle = ScanDriver::spawn(ScanSession::default(), transport, Some(timer));

        let view = handle.wait_for(|s| *s == ScanStatus::Expired).await.unwrap();
        assert_eq!(view.text, "Timer expired");
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_runs_timer_from_snapshot_deadline() {
        let snapshot = ClientSnapshot::new(
            clients(&["a"]),
            Some(Utc::now() + chrono::Duration::minutes(10)),
            true,
            "http://localhost/admin/options.php?page=glyphguard",
            "http://localhost/glyphguard/v1",
        )
        .unwrap();
        let transport = Arc::new(FakeTransport::default());
        let mut handle = ScanDriver::start(&snapshot, transport);
        assert_eq!(handle.current().status, ScanStatus::Running);

        let started = Instant::now();
        handle.wait_for(|s| *s == ScanStatus::Expired).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(9 * 60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_without_deadline_never_expires() {
        let snapshot = ClientSnapshot::new(
            UnregisteredClients::new(),
            None,
            false,
            "http://localhost/admin/options.php?page=glyphguard",
            "http://localhost/glyphguard/v1",
        )
        .unwrap();
        let handle = ScanDriver::start(&snapshot, Arc::new(FakeTransport::default()));

        tokio::time::sleep(ScannerConfig::DEFAULT_DURATION * 2).await;
        assert_eq!(handle.current().status, ScanStatus::Running);
    }

    #[tokio::test]
    async fn test_commands_after_shutdown_fail() {
        let transport = Arc::new(FakeTransport::default());
        let handle = ScanDriver::spawn(ScanSession::default(), transport, None);
        let view = handle.subscribe();
        handle.shutdown().await.unwrap();
        assert!(view.has_changed().is_err());
    }
}
