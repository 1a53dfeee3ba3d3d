//! Capabilities the scanners depend on.
//!
//! The location and telephony services belong to the host platform. They are
//! modelled as traits so the scanners can be driven by a real binding, the
//! replay harness or a test double.

use serde::Deserialize;

use crate::location::{LocationRequest, LocationSample};

/// Result of probing whether the location service can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Success,
    Missing,
    Updating,
    Disabled,
    Invalid,
}

/// Events the location client delivers asynchronously.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Connected,
    ConnectionFailed(String),
    Disconnected,
    LocationChanged(LocationSample),
}

/// Platform location service.
///
/// `connect` and `disconnect` return immediately, their outcome arrives later
/// as a [`ClientEvent`].
pub trait LocationClient {
    fn connect(&mut self);
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    fn last_location(&self) -> Option<LocationSample>;
    fn request_location_updates(&mut self, request: &LocationRequest) -> Result<(), String>;
    fn remove_location_updates(&mut self);
    fn availability(&self) -> ServiceStatus;
}

/// Platform telephony service. Every call is a synchronous read.
pub trait Telephony {
    fn is_available(&self) -> bool;
    fn phone_type(&self) -> i32;
    fn network_type(&self) -> i32;
    fn network_operator(&self) -> Option<String>;
    fn cell_location(&self) -> Option<CellLocation>;
    fn neighboring_cells(&self) -> Vec<NeighboringCell>;
    fn signal_strength(&self) -> SignalStrength;
}

/// Features that only some platform versions support, decided once by
/// whoever constructs the scanners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub primary_scrambling_code: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            primary_scrambling_code: true,
        }
    }
}

/// Serving cell as reported by the platform. Negative identifiers are unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellLocation {
    Gsm {
        lac: i32,
        cid: i32,
        psc: i32,
        ta: i32,
    },
    Cdma {
        system_id: i32,
        network_id: i32,
        base_station_id: i32,
    },
    /// A location record of a kind this crate does not understand.
    Other(String),
}

/// Neighbor rssi value meaning "not measured".
pub const UNKNOWN_RSSI: i32 = 99;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighboringCell {
    pub network_type: i32,
    pub lac: i32,
    pub cid: i32,
    pub psc: i32,
    pub rssi: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalStrength {
    pub gsm: Option<i32>,
    pub cdma_rssi: Option<i32>,
}
