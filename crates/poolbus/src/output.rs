use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use poolbus_device::{ChannelSpec, DeviceAddress, DeviceFamily, LivenessStatus, SinkEvent};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeviceSummary {
    pub device: DeviceAddress,
    pub status: LivenessStatus,
}

/// Totals printed when a decode run ends.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DecodeSummary {
    pub frames: u64,
    pub discarded_bytes: u64,
    pub checksum_failures: u64,
    pub implausible: u64,
    pub handled: u64,
    pub unaddressed: u64,
    pub unknown: u64,
    pub dropped: u64,
    pub devices: Vec<DeviceSummary>,
}

#[derive(Serialize)]
struct Tagged<'a, T: Serialize> {
    event: &'static str,
    #[serde(flatten)]
    body: &'a T,
}

/// Streamed formats print immediately; table output is buffered until the end.
pub fn print_events(events: &[SinkEvent], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for event in events {
                println!(
                    "{}",
                    serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Pretty => {
            for event in events {
                println!("{}", describe(event));
            }
        }
        OutputFormat::Table => {
            if events.is_empty() {
                return;
            }
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEVICE", "CHANNEL", "VALUE"]);
            for event in events {
                let row = match event {
                    SinkEvent::Channel { device, value } => vec![
                        device.to_string(),
                        value.channel_id.clone(),
                        value.value.to_string(),
                    ],
                    SinkEvent::Liveness { device, transition } => vec![
                        device.to_string(),
                        "(liveness)".to_string(),
                        format!("{} -> {}", transition.from, transition.to),
                    ],
                };
                table.add_row(row);
            }
            println!("{table}");
        }
    }
}

pub fn print_summary(summary: &DecodeSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = Tagged {
                event: "summary",
                body: summary,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["METRIC", "VALUE"]);
            for (metric, value) in counters(summary) {
                table.add_row(vec![metric.to_string(), value.to_string()]);
            }
            for device in &summary.devices {
                table.add_row(vec![device.device.to_string(), device.status.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let counters: Vec<String> = counters(summary)
                .iter()
                .map(|(metric, value)| format!("{metric}={value}"))
                .collect();
            println!("summary {}", counters.join(" "));
            for device in &summary.devices {
                println!("  {} {}", device.device, device.status);
            }
        }
    }
}

pub fn print_schema(family: DeviceFamily, schema: &[ChannelSpec], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct SchemaOutput<'a> {
                family: DeviceFamily,
                channels: &'a [ChannelSpec],
            }
            let out = SchemaOutput {
                family,
                channels: schema,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHANNEL", "KIND"]);
            for spec in schema {
                table.add_row(vec![spec.channel_id.clone(), spec.kind.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for spec in schema {
                println!("{family} {} ({})", spec.channel_id, spec.kind);
            }
        }
    }
}

fn counters(summary: &DecodeSummary) -> [(&'static str, u64); 8] {
    [
        ("frames", summary.frames),
        ("discarded_bytes", summary.discarded_bytes),
        ("checksum_failures", summary.checksum_failures),
        ("implausible", summary.implausible),
        ("handled", summary.handled),
        ("unaddressed", summary.unaddressed),
        ("unknown", summary.unknown),
        ("dropped", summary.dropped),
    ]
}

fn describe(event: &SinkEvent) -> String {
    match event {
        SinkEvent::Channel { device, value } => {
            format!("{device} {} = {}", value.channel_id, value.value)
        }
        SinkEvent::Liveness { device, transition } => {
            format!("{device} liveness {} -> {}", transition.from, transition.to)
        }
    }
}
