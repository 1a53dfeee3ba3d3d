use serde::Serialize;

use crate::{
    cell::CellInfo,
    error::Result,
    platform::{Capabilities, CellLocation, NeighboringCell, SignalStrength},
    radio::{radio_family, RadioFamily},
};

/// All cells seen during one telephony pass, in the order they were added.
#[derive(Debug, Clone)]
pub struct CellsRecord {
    radio: RadioFamily,
    capabilities: Capabilities,
    cells: Vec<CellInfo>,
}

/// Payload of a cell telemetry event.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellsExport<'a> {
    pub radio_family: RadioFamily,
    pub cells: &'a [CellInfo],
}

impl CellsRecord {
    pub fn new(phone_type: i32, capabilities: Capabilities) -> Result<Self> {
        Ok(Self {
            radio: radio_family(phone_type)?,
            capabilities,
            cells: Vec::new(),
        })
    }

    pub fn radio_family(&self) -> RadioFamily {
        self.radio
    }

    pub fn cells(&self) -> &[CellInfo] {
        &self.cells
    }

    pub fn has_cells(&self) -> bool {
        !self.cells.is_empty()
    }

    pub fn put_cell_location(
        &mut self,
        location: &CellLocation,
        network_type: i32,
        network_operator: Option<&str>,
        signal: SignalStrength,
    ) -> Result<()> {
        let cell = CellInfo::from_cell_location(
            location,
            network_type,
            network_operator,
            signal,
            self.capabilities,
        )?;
        self.cells.push(cell);
        Ok(())
    }

    pub fn put_neighboring_cell(
        &mut self,
        neighbor: &NeighboringCell,
        network_operator: Option<&str>,
    ) -> Result<()> {
        let cell = CellInfo::from_neighbor(neighbor, network_operator)?;
        self.cells.push(cell);
        Ok(())
    }

    pub fn export(&self) -> CellsExport<'_> {
        CellsExport {
            radio_family: self.radio,
            cells: &self.cells,
        }
    }
}
