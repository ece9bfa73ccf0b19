//! Periodic deck state reporter for waveform and UI refresh.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::JoinHandle,
    time::Duration,
};

use crate::playback::DeckMonitor;

/// Snapshot of deck state sent to UI consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckReport {
    pub position: f64,
    /// `position / length`, `None` when nothing is loaded.
    pub relative_position: Option<f64>,
    pub length: f64,
    pub playing: bool,
    pub looping: bool,
}

impl DeckReport {
    pub fn capture(monitor: &DeckMonitor) -> Self {
        let position = monitor.position();
        let length = monitor.length();
        let relative_position = (length > 0.0).then(|| (position / length).clamp(0.0, 1.0));
        Self {
            position,
            relative_position,
            length,
            playing: monitor.is_playing(),
            looping: monitor.is_looping(),
        }
    }
}

type ReportCallback = Arc<Mutex<dyn FnMut(DeckReport) + Send>>;

/// Background thread that polls a deck and reports changes.
#[derive(Clone)]
pub struct Reporter {
    monitor: DeckMonitor,
    report: ReportCallback,
    interval: Duration,
    finish: Arc<AtomicBool>,
    thread_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Reporter {
    /// The callback runs on the reporter thread, once per change.
    pub fn new<F>(monitor: DeckMonitor, interval: Duration, report: F) -> Self
    where
        F: FnMut(DeckReport) + Send + 'static,
    {
        Self {
            monitor,
            report: Arc::new(Mutex::new(report)),
            interval,
            finish: Arc::new(AtomicBool::new(false)),
            thread_handle: Arc::new(Mutex::new(None)),
        }
    }

    fn run(&self) {
        let mut last_report: Option<DeckReport> = None;

        loop {
            let report = DeckReport::capture(&self.monitor);

            if last_report.as_ref() != Some(&report) {
                (*locked(&self.report))(report.clone());
                last_report = Some(report);
            }

            if self.finish.load(Ordering::Relaxed) {
                break;
            }

            std::thread::sleep(self.interval);
        }
    }

    /// Start polling on a new thread, replacing any running one.
    ///
    /// After [`Reporter::stop`] the thread takes one last snapshot, so the
    /// final state is still reported if it changed.
    pub fn start(&self) {
        self.stop();
        self.finish.store(false, Ordering::Relaxed);
        let this = self.clone();
        *locked(&self.thread_handle) = Some(std::thread::spawn(move || this.run()));
    }

    /// Stop polling and wait for the thread to exit.
    pub fn stop(&self) {
        self.finish.store(true, Ordering::Relaxed);
        let Some(handle) = locked(&self.thread_handle).take() else {
            return;
        };
        if handle.thread().id() == std::thread::current().id() {
            log::warn!("reporter stopped from its own callback; not joining");
        } else if handle.join().is_err() {
            log::warn!("reporter callback panicked");
        }
    }

    pub fn is_running(&self) -> bool {
        locked(&self.thread_handle).is_some()
    }
}

fn locked<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
