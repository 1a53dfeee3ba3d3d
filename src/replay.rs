//! Simulated platform for running the scanners against recorded data.
//!
//! Location comes from a GPS track in CSV form, telephony from a fixed JSON
//! snapshot. The replay client behaves like the platform service: connection
//! results and updates arrive as queued [`ClientEvent`]s and updates closer
//! together than the requested fastest interval are throttled.

use std::{fs, path::Path, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info};

use crate::{
    cell_scanner::CellScanner,
    config::Config,
    emitter::{Emitter, EventChannel},
    location::{LocationRequest, LocationSample},
    platform::{
        CellLocation, ClientEvent, LocationClient, NeighboringCell, ServiceStatus, SignalStrength,
        Telephony, UNKNOWN_RSSI,
    },
    scanner::LocationScanner,
};

#[derive(Debug, Deserialize)]
pub struct GpsRecord {
    pub timestamp_ms: u64,
    pub lat: f64,
    pub lon: f64,
    pub accuracy: f64,
    #[serde(default)]
    pub speed: f64,
}

impl From<&GpsRecord> for LocationSample {
    fn from(record: &GpsRecord) -> Self {
        Self {
            latitude: record.lat,
            longitude: record.lon,
            accuracy: record.accuracy as f32,
            timestamp_millis: record.timestamp_ms as i64,
        }
    }
}

pub fn load_track(path: &Path) -> Result<Vec<GpsRecord>> {
    let mut output = Vec::new();
    let mut reader = csv::Reader::from_path(path)?;
    for result in reader.deserialize() {
        let record: GpsRecord = result?;
        output.push(record);
    }

    Ok(output)
}

pub struct ReplayClient {
    events: UnboundedSender<ClientEvent>,
    connected: bool,
    request: Option<LocationRequest>,
    last: Option<LocationSample>,
}

impl ReplayClient {
    pub fn new(events: UnboundedSender<ClientEvent>) -> Self {
        Self {
            events,
            connected: false,
            request: None,
            last: None,
        }
    }

    /// Seeds the location the service already knows about before connecting.
    pub fn with_last_location(mut self, sample: LocationSample) -> Self {
        self.last = Some(sample);
        self
    }

    /// Feeds a new fix, returning whether it was passed on as an update.
    pub fn deliver(&mut self, sample: LocationSample) -> bool {
        let Some(request) = self.request.filter(|_| self.connected) else {
            return false;
        };

        if let Some(last) = self.last {
            let elapsed = sample.timestamp_millis - last.timestamp_millis;
            if elapsed < request.fastest_interval.as_millis() as i64 {
                debug!(elapsed, "throttling location update");
                return false;
            }
        }

        self.last = Some(sample);
        self.send(ClientEvent::LocationChanged(sample));
        true
    }

    fn send(&self, event: ClientEvent) {
        // the receiving scanner may already be gone, like a dead listener
        let _ = self.events.send(event);
    }
}

impl LocationClient for ReplayClient {
    fn connect(&mut self) {
        self.connected = true;
        self.send(ClientEvent::Connected);
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.request = None;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn last_location(&self) -> Option<LocationSample> {
        self.last
    }

    fn request_location_updates(&mut self, request: &LocationRequest) -> Result<(), String> {
        if !self.connected {
            return Err("not connected".to_owned());
        }
        self.request = Some(*request);
        Ok(())
    }

    fn remove_location_updates(&mut self) {
        self.request = None;
    }

    fn availability(&self) -> ServiceStatus {
        ServiceStatus::Success
    }
}

/// Serde representation of a telephony snapshot file
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    phone_type: i32,
    network_type: i32,
    network_operator: Option<String>,
    cell_location: Option<CellLocationRecord>,
    #[serde(default)]
    neighbors: Vec<NeighborRecord>,
    #[serde(default)]
    signal_strength: SignalRecord,
}

/// Serde representation of a serving cell, `kind` selects which ids apply
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CellLocationRecord {
    kind: String,
    lac: Option<i32>,
    cid: Option<i32>,
    psc: Option<i32>,
    ta: Option<i32>,
    system_id: Option<i32>,
    network_id: Option<i32>,
    base_station_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NeighborRecord {
    network_type: i32,
    lac: Option<i32>,
    cid: Option<i32>,
    psc: Option<i32>,
    rssi: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignalRecord {
    gsm: Option<i32>,
    cdma_rssi: Option<i32>,
}

impl From<CellLocationRecord> for CellLocation {
    fn from(r: CellLocationRecord) -> Self {
        let unknown = |x: Option<i32>| x.unwrap_or(-1);
        match r.kind.as_str() {
            "gsm" => CellLocation::Gsm {
                lac: unknown(r.lac),
                cid: unknown(r.cid),
                psc: unknown(r.psc),
                ta: unknown(r.ta),
            },
            "cdma" => CellLocation::Cdma {
                system_id: unknown(r.system_id),
                network_id: unknown(r.network_id),
                base_station_id: unknown(r.base_station_id),
            },
            other => CellLocation::Other(other.to_owned()),
        }
    }
}

impl From<NeighborRecord> for NeighboringCell {
    fn from(r: NeighborRecord) -> Self {
        Self {
            network_type: r.network_type,
            lac: r.lac.unwrap_or(-1),
            cid: r.cid.unwrap_or(-1),
            psc: r.psc.unwrap_or(-1),
            rssi: r.rssi.unwrap_or(UNKNOWN_RSSI),
        }
    }
}

/// Telephony that reports the same snapshot on every poll.
#[derive(Debug, Clone)]
pub struct StaticTelephony {
    phone_type: i32,
    network_type: i32,
    network_operator: Option<String>,
    cell_location: Option<CellLocation>,
    neighbors: Vec<NeighboringCell>,
    signal: SignalStrength,
}

impl StaticTelephony {
    pub fn parse(data: &str) -> Result<Self> {
        let snapshot: Snapshot =
            serde_json::from_str(data).context("Failed to parse telephony snapshot")?;
        Ok(Self {
            phone_type: snapshot.phone_type,
            network_type: snapshot.network_type,
            network_operator: snapshot.network_operator,
            cell_location: snapshot.cell_location.map(Into::into),
            neighbors: snapshot.neighbors.into_iter().map(Into::into).collect(),
            signal: SignalStrength {
                gsm: snapshot.signal_strength.gsm,
                cdma_rssi: snapshot.signal_strength.cdma_rssi,
            },
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).context("Failed to read telephony snapshot")?;
        Self::parse(&data)
    }
}

impl Telephony for StaticTelephony {
    fn is_available(&self) -> bool {
        true
    }

    fn phone_type(&self) -> i32 {
        self.phone_type
    }

    fn network_type(&self) -> i32 {
        self.network_type
    }

    fn network_operator(&self) -> Option<String> {
        self.network_operator.clone()
    }

    fn cell_location(&self) -> Option<CellLocation> {
        self.cell_location.clone()
    }

    fn neighboring_cells(&self) -> Vec<NeighboringCell> {
        self.neighbors.clone()
    }

    fn signal_strength(&self) -> SignalStrength {
        self.signal
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub fixes: usize,
    pub locations: u64,
    pub cell_events: usize,
}

/// Replays `track` through a location scanner and, if telephony is given, a
/// cell scanner polled on the configured interval of track time.
///
/// With `realtime` set the gaps between fixes are slept out.
pub async fn run(
    config: &Config,
    track: &[GpsRecord],
    telephony: Option<StaticTelephony>,
    channel: Arc<dyn EventChannel + Send + Sync>,
    realtime: bool,
) -> Result<Summary> {
    let emitter = Emitter::new(config.topic.clone(), channel);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut client = ReplayClient::new(tx);
    let mut fixes = track.iter();
    // the first fix plays the location the service has cached
    if let Some(first) = fixes.next() {
        client = client.with_last_location(first.into());
    }

    let mut scanner = LocationScanner::new(client, emitter.clone());
    scanner.configure(&config.location.sampling())?;
    scanner.start()?;
    scanner.pump(&mut rx);

    let cells = telephony
        .filter(|_| config.cells.scan_interval_ms > 0)
        .map(|t| CellScanner::new(t, emitter, config.capabilities));

    let mut summary = Summary::default();
    let mut previous = track.first().map(|x| x.timestamp_ms);
    let mut next_cell_scan = previous.unwrap_or_default();

    if let Some(cells) = &cells {
        if cells.scan()? {
            summary.cell_events += 1;
        }
        next_cell_scan += config.cells.scan_interval_ms;
    }

    for record in fixes {
        if realtime {
            if let Some(prev) = previous {
                let gap = record.timestamp_ms.saturating_sub(prev);
                tokio::time::sleep(Duration::from_millis(gap)).await;
            }
        }
        previous = Some(record.timestamp_ms);

        scanner.client_mut().deliver(record.into());
        scanner.pump(&mut rx);

        if let Some(cells) = &cells {
            if record.timestamp_ms >= next_cell_scan {
                if cells.scan()? {
                    summary.cell_events += 1;
                }
                next_cell_scan = record.timestamp_ms + config.cells.scan_interval_ms;
            }
        }
    }

    scanner.stop();
    summary.fixes = track.len();
    summary.locations = scanner.location_count();
    info!(
        fixes = summary.fixes,
        locations = summary.locations,
        cell_events = summary.cell_events,
        "replay finished"
    );
    Ok(summary)
}
