//! Periodic playback ticker.
//!
//! A background task emits "advance" events at a fixed rate through a
//! `watch` channel. The channel keeps only the newest value, so a slow
//! consumer sees one pending advance no matter how many ticks elapsed.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

pub struct Ticker {
    rx: watch::Receiver<u64>,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Spawn the ticker on the current runtime. The first advance arrives
    /// one `period` after start.
    pub fn start(period: Duration) -> Self {
        let (tx, rx) = watch::channel(0u64);
        let handle = tokio::spawn(async move {
            let mut clock = interval(period);
            clock.set_missed_tick_behavior(MissedTickBehavior::Skip);
            clock.tick().await;
            let mut count = 0u64;
            loop {
                clock.tick().await;
                count += 1;
                if tx.send(count).is_err() {
                    break;
                }
            }
        });
        log::debug!("[WQE] ticker: started with period {:?}", period);
        Self { rx, handle }
    }

    /// Wait for the next advance. Returns `false` once the ticker is gone.
    pub async fn advanced(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Total advances emitted so far.
    pub fn count(&self) -> u64 {
        *self.rx.borrow()
    }

    pub async fn stop(self) {
        self.handle.abort();
        let _ = self.handle.await;
        log::debug!("[WQE] ticker: stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{PlaybackController, PlaybackEvent, PlaybackMode, TimeAxis};

    fn playing_controller() -> PlaybackController {
        let axis = TimeAxis::new((2018..2022).collect(), vec![1]);
        let mut controller = PlaybackController::new(axis, PlaybackMode::Year);
        controller.apply(PlaybackEvent::TogglePlay);
        controller
    }

    #[tokio::test]
    async fn drives_controller_forward() {
        let mut controller = playing_controller();
        let mut ticker = Ticker::start(Duration::from_millis(5));
        let mut frames = Vec::new();
        while frames.len() < 5 && ticker.advanced().await {
            frames.push(controller.apply(PlaybackEvent::Tick).index);
        }
        assert_eq!(frames, vec![1, 2, 3, 0, 1]);
        ticker.stop().await;
    }

    #[tokio::test]
    async fn missed_ticks_do_not_queue() {
        let mut controller = playing_controller();
        let mut ticker = Ticker::start(Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(ticker.advanced().await);
        assert!(ticker.count() > 1, "several ticks elapsed");
        let state = controller.apply(PlaybackEvent::Tick);
        assert_eq!(state.index, 1, "one pending advance, not a backlog");
        ticker.stop().await;
    }
}
