//! Background work that must not block the study screen.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error};

use crate::clock::Clock;
use crate::history;
use crate::runtime::Ticker;
use crate::stats::{DateWindow, StatisticsSnapshot};
use crate::store::WordStore;

/// Computes one [`StatisticsSnapshot`] on its own thread.
///
/// Cancellation is checked between the read and compute phases. A cancelled
/// run publishes nothing.
pub struct StatisticsWorker {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    rx: Receiver<StatisticsSnapshot>,
}

impl StatisticsWorker {
    pub fn spawn<S>(store: Arc<S>, clock: Arc<dyn Clock>, window_days: u32) -> Self
    where
        S: WordStore + ?Sized + 'static,
    {
        Self::spawn_with_cancel(store, clock, window_days, Arc::new(AtomicBool::new(false)))
    }

    pub fn spawn_with_cancel<S>(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        window_days: u32,
        cancel: Arc<AtomicBool>,
    ) -> Self
    where
        S: WordStore + ?Sized + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let flag = cancel.clone();

        let handle = thread::spawn(move || {
            let cancelled = || flag.load(Ordering::Relaxed);
            if cancelled() {
                return;
            }

            let words = match store.all_words() {
                Ok(words) => words,
                Err(err) => {
                    error!("statistics: failed to read words: {err}");
                    return;
                }
            };
            if cancelled() {
                return;
            }

            let events = match store.all_events() {
                Ok(events) => events,
                Err(err) => {
                    error!("statistics: failed to read status events: {err}");
                    return;
                }
            };
            if cancelled() {
                return;
            }

            let today = clock.today();
            let snapshot = StatisticsSnapshot::build(
                &words,
                &history::activity_days(&events),
                DateWindow::trailing(window_days, today),
                today,
            );
            if cancelled() {
                debug!("statistics: run cancelled before publishing");
                return;
            }
            let _ = tx.send(snapshot);
        });

        Self {
            cancel,
            handle: Some(handle),
            rx,
        }
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// The finished snapshot, if it is ready
    pub fn try_recv(&self) -> Option<StatisticsSnapshot> {
        self.rx.try_recv().ok()
    }

    /// `None` on timeout, on failure, or when the run was cancelled
    pub fn recv_timeout(&self, timeout: Duration) -> Option<StatisticsSnapshot> {
        match self.rx.recv_timeout(timeout) {
            Ok(snapshot) => Some(snapshot),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Periodically counts words due for review and publishes the count.
///
/// Failed polls are logged and skipped until the next tick.
pub struct ReviewPoller {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    rx: Receiver<usize>,
}

impl ReviewPoller {
    pub fn spawn<S, T>(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        review_interval: chrono::Duration,
        ticker: T,
    ) -> Self
    where
        S: WordStore + ?Sized + 'static,
        T: Ticker,
    {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();

        let handle = thread::spawn(move || {
            while !flag.load(Ordering::Relaxed) {
                match store.find_words_due_for_review(clock.now(), review_interval, usize::MAX) {
                    Ok(due) => {
                        if tx.send(due.len()).is_err() {
                            break;
                        }
                    }
                    Err(err) => error!("review poll failed: {err}"),
                }
                thread::park_timeout(ticker.interval());
            }
        });

        Self {
            stop,
            handle: Some(handle),
            rx,
        }
    }

    /// Most recent due count published since the last call
    pub fn latest(&self) -> Option<usize> {
        self.rx.try_iter().last()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<usize> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

impl Drop for ReviewPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::runtime::FixedTicker;
    use crate::store::SqliteStore;
    use crate::word::{Word, WordStatus};
    use chrono::{DateTime, Local, TimeZone};

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap()
    }

    fn store_with_known_word() -> Arc<SqliteStore> {
        let store = SqliteStore::in_memory().unwrap();
        let mut word = Word::new("hallo", "hello", now());
        word.id = store.insert_word(&word).unwrap();
        word.status = WordStatus::Memorized;
        word.repetition_count = 1;
        word.status_changed_at = Some(now() - chrono::Duration::days(2));
        store.update_word(&word).unwrap();
        Arc::new(store)
    }

    #[test]
    fn test_statistics_worker_publishes_snapshot() {
        let store = store_with_known_word();
        let worker = StatisticsWorker::spawn(store, Arc::new(FixedClock::new(now())), 7);

        let snapshot = worker
            .recv_timeout(Duration::from_secs(5))
            .expect("snapshot");
        assert_eq!(snapshot.daily.len(), 7);
        assert_eq!(snapshot.summary[&WordStatus::Memorized], 1);
        worker.join();
    }

    #[test]
    fn test_cancelled_worker_publishes_nothing() {
        let store = store_with_known_word();
        let cancel = Arc::new(AtomicBool::new(true));
        let worker =
            StatisticsWorker::spawn_with_cancel(store, Arc::new(FixedClock::new(now())), 7, cancel);

        assert!(worker.is_cancelled());
        assert!(worker.recv_timeout(Duration::from_millis(200)).is_none());
        worker.join();
    }

    #[test]
    fn test_review_poller_counts_due_words() {
        let store = store_with_known_word();
        let mut poller = ReviewPoller::spawn(
            store,
            Arc::new(FixedClock::new(now())),
            chrono::Duration::hours(24),
            FixedTicker::new(Duration::from_millis(10)),
        );

        assert_eq!(poller.recv_timeout(Duration::from_secs(5)), Some(1));
        poller.stop();
    }
}
