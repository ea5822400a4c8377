use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const TICK: Duration = Duration::from_millis(500);
pub const STEP: u8 = 10;
pub const CEILING: u8 = 90;

/// Cosmetic progress indicator for an in-flight submission.
///
/// Climbs by [`STEP`] every [`TICK`] until [`CEILING`], snaps to 100 on
/// success and drops back to 0 on failure. It says nothing about how far the
/// backend actually got.
pub struct ProgressTracker {
    tx: watch::Sender<u8>,
    ticker: Option<JoinHandle<()>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx, ticker: None }
    }

    pub fn subscribe(&self) -> watch::Receiver<u8> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> u8 {
        *self.tx.borrow()
    }

    pub fn start(&mut self) {
        self.stop();
        self.tx.send_replace(0);

        let tx = self.tx.clone();
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK);
            interval.tick().await;
            loop {
                interval.tick().await;
                let mut reached = false;
                tx.send_modify(|p| {
                    *p = p.saturating_add(STEP).min(CEILING);
                    reached = *p >= CEILING;
                });
                if reached {
                    break;
                }
            }
        }));
    }

    pub fn complete(&mut self) {
        self.stop();
        self.tx.send_replace(100);
    }

    pub fn fail(&mut self) {
        self.stop();
        self.tx.send_replace(0);
    }

    fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.stop();
    }
}
