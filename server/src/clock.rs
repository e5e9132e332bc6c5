use log::debug;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// One countdown per lobby. Expiry fires `on_expire` once, unless stopped first.
#[derive(Debug)]
pub struct GameClock {
    duration: Duration,
    started_at: Option<Instant>,
    stopped_at: Option<Instant>,
    timer: Option<JoinHandle<()>>,
}

impl GameClock {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            started_at: None,
            stopped_at: None,
            timer: None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some() && self.stopped_at.is_none()
    }

    /// Starts counting and schedules `on_expire`. A second call is ignored.
    /// Must be called from within a tokio runtime.
    pub fn start<F>(&mut self, on_expire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.started_at.is_some() {
            return;
        }

        let duration = self.duration;
        self.started_at = Some(Instant::now());
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            debug!("Game clock expired after {:?}", duration);
            on_expire();
        }));
    }

    /// Freezes the elapsed time and cancels a pending expiry.
    pub fn stop(&mut self) {
        if self.started_at.is_none() || self.stopped_at.is_some() {
            return;
        }
        self.stopped_at = Some(Instant::now());
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Seconds since start; 0 before start, frozen once stopped.
    pub fn elapsed(&self) -> f64 {
        match (self.started_at, self.stopped_at) {
            (None, _) => 0.0,
            (Some(start), Some(stop)) => stop.duration_since(start).as_secs_f64(),
            (Some(start), None) => start.elapsed().as_secs_f64(),
        }
    }
}

impl Drop for GameClock {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
