use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use poolbus_device::{
    CollectingSink, DeviceAddress, DeviceRouter, RouterConfig, RoutingOutcome, SinkEvent,
};
use poolbus_frame::{BusReader, FrameError, ResyncConfig};
use serde::Deserialize;
use tracing::{debug, info};

use crate::capture::open_capture;
use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, router_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_events, print_summary, DecodeSummary, DeviceSummary, OutputFormat};

/// Device configuration file.
///
/// ```json
/// { "strict_registration": false,
///   "devices": [ { "family": "pump", "address": 96 } ] }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeviceFile {
    #[serde(default)]
    strict_registration: bool,
    #[serde(default)]
    devices: Vec<DeviceAddress>,
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let file = match &args.config {
        Some(path) => load_device_file(path)?,
        None => DeviceFile::default(),
    };
    let mut devices = file.devices;
    devices.extend(args.devices.iter().copied());
    if devices.is_empty() {
        return Err(CliError::new(
            USAGE,
            "no devices configured: pass --device FAMILY@ADDR or --config FILE",
        ));
    }

    let offline_after = args
        .offline_after
        .as_deref()
        .map(parse_duration)
        .transpose()?;

    let sink = Arc::new(CollectingSink::new());
    let router = DeviceRouter::with_config(
        sink.clone(),
        RouterConfig {
            strict_registration: args.strict || file.strict_registration,
        },
    );
    for address in &devices {
        router
            .register_family(*address)
            .map_err(|err| router_error("register failed", err))?;
    }

    let input = open_capture(&args.input, args.hex)?;
    let mut reader = BusReader::with_config(
        input,
        ResyncConfig {
            max_standard_payload: args.max_payload,
            ..ResyncConfig::default()
        },
    );

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut summary = DecodeSummary::default();
    let mut table_rows: Vec<SinkEvent> = Vec::new();

    while running.load(Ordering::SeqCst) {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(frame_error("read failed", err)),
        };

        match router.dispatch(&frame) {
            RoutingOutcome::Handled(_) => summary.handled += 1,
            RoutingOutcome::Unaddressed => summary.unaddressed += 1,
            RoutingOutcome::Unknown(_) => summary.unknown += 1,
            RoutingOutcome::Dropped(_) => summary.dropped += 1,
        }

        if let Some(timeout) = offline_after {
            let expired = router.expire_stale(Instant::now(), timeout);
            if !expired.is_empty() {
                debug!(count = expired.len(), "devices timed out");
            }
        }
        emit(&sink, format, &mut table_rows);
    }

    if !running.load(Ordering::SeqCst) {
        info!("interrupted, stopping decode");
    }
    emit(&sink, format, &mut table_rows);
    if format == OutputFormat::Table {
        print_events(&table_rows, format);
    }

    let stats = reader.stats();
    summary.frames = stats.frames;
    summary.discarded_bytes = stats.discarded_bytes;
    summary.checksum_failures = stats.checksum_failures;
    summary.implausible = stats.implausible;
    summary.devices = router
        .addresses()
        .into_iter()
        .filter_map(|device| {
            router.liveness(device).map(|liveness| DeviceSummary {
                device,
                status: liveness.status(),
            })
        })
        .collect();
    print_summary(&summary, format);

    Ok(SUCCESS)
}

fn emit(sink: &CollectingSink, format: OutputFormat, table_rows: &mut Vec<SinkEvent>) {
    let events = sink.drain();
    if format == OutputFormat::Table {
        table_rows.extend(events);
    } else {
        print_events(&events, format);
    }
}

fn load_device_file(path: &Path) -> CliResult<DeviceFile> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| io_error(&format!("cannot read {}", path.display()), err))?;
    serde_json::from_str(&text).map_err(|err| {
        CliError::new(
            DATA_INVALID,
            format!("invalid device config {}: {err}", path.display()),
        )
    })
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else if let Some(num) = input.strip_suffix('m') {
        (num, "m")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "m" => Ok(Duration::from_secs(value.saturating_mul(60))),
        _ => Ok(Duration::from_secs(value)),
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
