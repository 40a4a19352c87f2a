//! Run-loop helpers shared by the subcommands.

use climawatch_core::{ChannelRegistry, ChannelView, EpochMillis};
use serde_json::json;

use crate::pipeline::{IngestOutcome, Pipeline, PipelineStats};
use crate::source::MessageSource;

/// Ingest every message the source has waiting.
///
/// `on_outcome` sees each outcome, e.g. to feed the history logger.
/// Returns the number of messages taken from the source.
pub fn drain(
    source: &mut dyn MessageSource,
    pipeline: &Pipeline,
    mut on_outcome: impl FnMut(&IngestOutcome),
) -> usize {
    let mut count = 0;
    while let Some(message) = source.poll() {
        let outcome = pipeline.ingest(&message);
        on_outcome(&outcome);
        count += 1;
    }
    count
}

/// One status line per channel, then the totals.
pub fn status_lines(registry: &ChannelRegistry, stats: PipelineStats) -> Vec<String> {
    let mut lines: Vec<String> = registry
        .views()
        .iter()
        .map(|view| {
            let latest = view
                .latest()
                .map(|s| view.channel.format_value(s.value))
                .unwrap_or_else(|| "--".to_string());
            format!(
                "{:<16} {:>14}  ({} pts)",
                view.channel.label,
                latest,
                view.samples.len()
            )
        })
        .collect();

    lines.push(format!(
        "routed: {}  dropped: {}  alerts: {}",
        stats.routed, stats.dropped, stats.alerts
    ));
    lines
}

fn view_json(view: &ChannelView) -> serde_json::Value {
    json!({
        "id": view.channel.id,
        "label": view.channel.label,
        "unit": view.channel.unit,
        "topic": view.channel.topic,
        "display": { "min": view.channel.display_min, "max": view.channel.display_max },
        "range": view.range.map(|r| json!({ "start": r.start, "end": r.end })),
        "latest": view.latest(),
        "samples": view.samples,
    })
}

/// Build the export document for every channel in `registry`.
pub fn export_json(registry: &ChannelRegistry, exported_at: EpochMillis) -> serde_json::Value {
    let views = registry.views();
    let total: usize = views.iter().map(|v| v.samples.len()).sum();

    json!({
        "summary": {
            "exported_at": exported_at,
            "channels": views.len(),
            "samples": total,
        },
        "channels": views.iter().map(view_json).collect::<Vec<_>>(),
    })
}
