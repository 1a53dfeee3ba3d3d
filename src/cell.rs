//! Normalization of platform cell readings.

use serde::Serialize;

use crate::{
    error::{Result, ScanError},
    platform::{Capabilities, CellLocation, NeighboringCell, SignalStrength, UNKNOWN_RSSI},
    radio::{classify_network_type, CellRadio, NetworkOperator},
};

/// One cell tower reading in the shape every consumer expects.
///
/// Fields the platform did not report are `None` and left out when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellInfo {
    pub radio: CellRadio,
    pub mcc: u16,
    pub mnc: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lac: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asu: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ta: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psc: Option<i32>,
}

impl CellInfo {
    pub fn new(radio: CellRadio, operator: NetworkOperator) -> Self {
        Self {
            radio,
            mcc: operator.mcc,
            mnc: operator.mnc,
            lac: None,
            cid: None,
            signal: None,
            asu: None,
            ta: None,
            psc: None,
        }
    }

    /// Builds the reading for the cell the device is camped on.
    pub fn from_cell_location(
        location: &CellLocation,
        network_type: i32,
        network_operator: Option<&str>,
        signal: SignalStrength,
        capabilities: Capabilities,
    ) -> Result<Self> {
        match *location {
            CellLocation::Gsm { lac, cid, psc, ta } => {
                let radio = classify_network_type(network_type)?;
                let operator = NetworkOperator::parse(network_operator)?;

                let mut cell = Self::new(radio, operator);
                cell.lac = known(lac);
                cell.cid = known(cid);
                cell.ta = known(ta);
                if capabilities.primary_scrambling_code {
                    cell.psc = known(psc);
                }
                cell.asu = signal.gsm;
                Ok(cell)
            }
            CellLocation::Cdma {
                system_id,
                network_id,
                base_station_id,
            } => {
                let radio = classify_network_type(network_type)?;
                let operator = NetworkOperator::parse(network_operator)?;

                let mut cell = Self::new(radio, operator);
                // cdma networks are identified by their system id instead
                if let Ok(sid) = u32::try_from(system_id) {
                    cell.mnc = sid;
                }
                cell.lac = known(network_id);
                cell.cid = known(base_station_id);
                cell.signal = signal.cdma_rssi;
                Ok(cell)
            }
            CellLocation::Other(ref kind) => Err(ScanError::UnsupportedLocationType(kind.clone())),
        }
    }

    /// Builds the reading for a cell that is visible but not serving.
    pub fn from_neighbor(neighbor: &NeighboringCell, network_operator: Option<&str>) -> Result<Self> {
        let radio = classify_network_type(neighbor.network_type)?;
        let operator = NetworkOperator::parse(network_operator)?;

        let mut cell = Self::new(radio, operator);
        cell.lac = known(neighbor.lac);
        cell.cid = known(neighbor.cid);
        cell.psc = known(neighbor.psc);
        if neighbor.rssi != UNKNOWN_RSSI {
            cell.asu = Some(neighbor.rssi);
        }
        Ok(cell)
    }
}

fn known(value: i32) -> Option<i32> {
    (value >= 0).then_some(value)
}
