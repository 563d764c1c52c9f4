//! One-shot query handlers.

use log::info;
use serde::Serialize;
use std::sync::Arc;
use wqe_data::smooth::smooth_points;
use wqe_data::{
    aggregate, color_scale, AnomalyPolicy, DateRange, Granularity, Layers, MapFrame, PlaybackEvent,
    PlaybackMode, SeriesPoint, Session, View,
};
use wqe_store::{Location, SampleStore, TestTypeFilter};
use wqe_utils::{dates, links};

use crate::{Command, FilterArgs, Settings};

#[derive(Serialize)]
struct LocationRow<'a> {
    #[serde(flatten)]
    location: &'a Location,
    link: String,
}

#[derive(Serialize)]
struct AggregateOutput {
    metric: String,
    granularity: Granularity,
    selected_rows: usize,
    anomalous_rows: usize,
    series: Vec<SeriesPoint>,
    smoothed: Vec<SeriesPoint>,
}

#[derive(Serialize)]
struct MapOutput {
    frame: MapFrame,
    /// Slider positions with their labels.
    marks: Vec<(usize, String)>,
}

fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub(crate) fn new_session(store: Arc<SampleStore>, settings: &Settings) -> Session {
    let mut session = Session::new(store).with_smoothing_frac(settings.smoothing_frac);
    session.nearest_k = settings.nearest_k;
    session.color_ticks = settings.color_ticks;
    session
}

fn date_range(start: Option<&str>, end: Option<&str>) -> anyhow::Result<DateRange> {
    let start = start.map(dates::parse_date).transpose()?;
    let end = end.map(dates::parse_date).transpose()?;
    Ok(DateRange::new(start, end))
}

/// Copy command-line filters into the session.
pub(crate) fn apply_filters(session: &mut Session, filter: &FilterArgs) -> anyhow::Result<()> {
    session.filter.test_types = TestTypeFilter::new(&filter.test_types);
    session.filter.min_sample_count = filter.min_samples;
    session.filter.date_range = date_range(filter.start.as_deref(), filter.end.as_deref())?;
    session.filter.anomaly_policy = if filter.exclude_anomalies {
        AnomalyPolicy::Exclude
    } else {
        AnomalyPolicy::Include
    };
    Ok(())
}

/// Point the session's cursor at `index` on the `mode` axis.
pub(crate) fn position_cursor(session: &mut Session, mode: PlaybackMode, index: usize) {
    session.playback.apply(PlaybackEvent::SwitchMode(mode));
    session.playback.apply(PlaybackEvent::Scrub(index));
}

pub fn run_query(
    store: Arc<SampleStore>,
    settings: &Settings,
    command: Command,
) -> anyhow::Result<String> {
    let mut session = new_session(store, settings);

    match command {
        Command::Locations { filter } => {
            apply_filters(&mut session, &filter)?;
            let location_filter = session.filter.location_filter();
            let store = session.store();
            let rows: Vec<LocationRow> = store
                .locations()
                .iter()
                .filter(|l| location_filter.admits(store, l))
                .map(|location| LocationRow {
                    location,
                    link: links::location_link(&location.id),
                })
                .collect();
            info!("[WQE] locations: {} records", rows.len());
            to_json(&View::from_items(rows))
        }

        Command::Aggregate {
            metric,
            granularity,
            filter,
        } => {
            apply_filters(&mut session, &filter)?;
            let metric_id = match session.select_metric(&metric) {
                Ok(id) => id,
                Err(e) => return to_json(&View::<AggregateOutput>::from(e)),
            };
            let granularity: Granularity = granularity.into();
            let view = session.selection().map(|selection| {
                let series = aggregate(selection.samples(), metric_id, granularity);
                let smoothed = smooth_points(series.points(), settings.smoothing_frac);
                AggregateOutput {
                    metric: metric.clone(),
                    granularity,
                    selected_rows: selection.len(),
                    anomalous_rows: selection.anomalies().count(),
                    series: series.into_points(),
                    smoothed,
                }
            });
            to_json(&view)
        }

        Command::Compare {
            location,
            others,
            metric,
            granularity,
            exclude_anomalies,
            no_raw,
            no_smoothed,
            start,
            end,
        } => {
            if exclude_anomalies {
                session.filter.anomaly_policy = AnomalyPolicy::Exclude;
            }
            session.filter.date_range = date_range(start.as_deref(), end.as_deref())?;
            let layers = Layers {
                raw: !no_raw,
                smoothed: !no_smoothed,
            };
            let view = session
                .comparison(&location, &others, &metric, granularity.into())
                .map(|c| c.visible(layers));
            to_json(&view)
        }

        Command::Nearest { location, k, filter } => {
            apply_filters(&mut session, &filter)?;
            if let Some(k) = k {
                session.nearest_k = k;
            }
            let view = session.nearest(&location);
            info!(
                "[WQE] nearest: {} records",
                view.as_ref().data().map_or(0, |v| v.len())
            );
            to_json(&view)
        }

        Command::Domain { metric, filter } => {
            apply_filters(&mut session, &filter)?;
            let view = match session.resolve_metric(&metric) {
                Ok(id) => color_scale::domain_with_quantiles(
                    session.store(),
                    id,
                    session.filter.anomaly_policy,
                    &session.filter.test_types,
                    settings.color_low_quantile,
                    settings.color_high_quantile,
                )
                .map(|d| {
                    let ticks = d.ticks(settings.color_ticks);
                    serde_json::json!({ "domain": d, "ticks": ticks })
                }),
                Err(e) => e.into(),
            };
            to_json(&view)
        }

        Command::Map {
            metric,
            mode,
            index,
            filter,
        } => {
            apply_filters(&mut session, &filter)?;
            position_cursor(&mut session, mode.into(), index);
            let marks = session.playback.marks();
            to_json(&session.map_frame(&metric).map(|frame| MapOutput { frame, marks }))
        }

        Command::Snapshot {
            location,
            metric,
            mode,
            index,
        } => {
            position_cursor(&mut session, mode.into(), index);
            to_json(&session.location_snapshot(&location, &metric))
        }

        Command::Summary { location } => to_json(&session.metric_summary(&location)),

        Command::Detail { location } => to_json(&session.location_detail(&location)),

        Command::TestTypes => {
            let vocabulary = session.store().test_type_vocabulary().to_vec();
            info!("[WQE] test-types: {} records", vocabulary.len());
            to_json(&View::from_items(vocabulary))
        }

        Command::Shape { location, metric, kind } => {
            let view = session.shape_status(&location, &metric, kind.into()).map(|status| {
                serde_json::json!({ "status": status, "description": status.describe() })
            });
            to_json(&view)
        }

        Command::Clusters { location, metric, kind } => {
            to_json(&session.cluster_distribution(&location, &metric, kind.into()))
        }

        Command::Open { link } => to_json(&session.open_link(&link)),

        Command::Play { .. } => {
            anyhow::bail!("play runs through the async ticker, not as a one-shot query")
        }
    }
}
