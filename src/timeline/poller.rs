use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::timeline::engine::TimelineEvent;

/// Repeating timer that posts `TimelineEvent::Poll` into the timeline loop.
///
/// At most one timer runs per controller. Manual refreshes never touch it.
pub struct PollTimer {
    period: Duration,
    tx: mpsc::WeakSender<TimelineEvent>,
    task: Option<JoinHandle<()>>,
}

impl PollTimer {
    pub fn new(period: Duration, tx: mpsc::WeakSender<TimelineEvent>) -> Self {
        Self {
            period,
            tx,
            task: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    /// Starts the timer; the first tick comes one full period from now.
    pub fn activate(&mut self) {
        if self.task.is_some() {
            return;
        }
        let period = self.period;
        let tx = self.tx.clone();
        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(tx) = tx.upgrade() else { break };
                if tx.send(TimelineEvent::Poll).await.is_err() {
                    break;
                }
                tracing::debug!("poll tick");
            }
        }));
        tracing::info!(period_secs = period.as_secs(), "polling activated");
    }

    pub fn deactivate(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::info!("polling deactivated");
        }
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_period() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timer = PollTimer::new(Duration::from_secs(60), tx.downgrade());
        timer.activate();

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(matches!(rx.try_recv(), Ok(TimelineEvent::Poll)));
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(matches!(rx.try_recv(), Ok(TimelineEvent::Poll)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_activate_is_idempotent() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timer = PollTimer::new(Duration::from_secs(60), tx.downgrade());
        timer.activate();
        timer.activate();

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(matches!(rx.try_recv(), Ok(TimelineEvent::Poll)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deactivate_stops_ticks() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timer = PollTimer::new(Duration::from_secs(60), tx.downgrade());
        timer.activate();
        timer.deactivate();
        assert!(!timer.is_active());

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timer() {
        let (tx, mut rx) = mpsc::channel(8);
        {
            let mut timer = PollTimer::new(Duration::from_secs(60), tx.downgrade());
            timer.activate();
        }
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert!(rx.try_recv().is_err());
    }
}
