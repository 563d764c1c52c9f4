//! Timed playback of map frames.

use log::info;
use std::sync::Arc;
use std::time::Duration;
use wqe_data::ticker::Ticker;
use wqe_data::{PlaybackEvent, PlaybackMode, View};
use wqe_store::SampleStore;

use crate::query::{apply_filters, new_session};
use crate::{FilterArgs, Settings};

/// Start the cursor, then emit the current frame plus one frame per tick.
///
/// Frames the consumer is too slow for are dropped rather than queued.
pub async fn run_play(
    store: Arc<SampleStore>,
    settings: &Settings,
    metric: &str,
    mode: PlaybackMode,
    frames: usize,
    interval_ms: u64,
    filter: &FilterArgs,
) -> anyhow::Result<String> {
    let mut session = new_session(store, settings);
    apply_filters(&mut session, filter)?;
    session.playback.apply(PlaybackEvent::SwitchMode(mode));
    session.playback.apply(PlaybackEvent::TogglePlay);

    let mut output = Vec::with_capacity(frames);
    if frames > 0 {
        output.push(frame_json(&session, metric));
    }

    let mut clock = Ticker::start(Duration::from_millis(interval_ms.max(1)));
    while output.len() < frames && clock.advanced().await {
        session.playback.apply(PlaybackEvent::Tick);
        output.push(frame_json(&session, metric));
    }
    let ticks = clock.count();
    clock.stop().await;
    info!("[WQE] play: emitted {} frames over {} ticks", output.len(), ticks);
    Ok(serde_json::to_string_pretty(&output)?)
}

fn frame_json(session: &wqe_data::Session, metric: &str) -> serde_json::Value {
    let label = session.playback.label();
    let frame = session.map_frame(metric);
    let markers = match &frame {
        View::Data(f) => f.markers.len(),
        _ => 0,
    };
    serde_json::json!({
        "index": session.playback.state().index,
        "label": label,
        "markers": markers,
        "frame": frame,
    })
}
