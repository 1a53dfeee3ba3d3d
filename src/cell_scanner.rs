use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    emitter::{Emitter, EventKind},
    error::{Result, ScanError},
    platform::{Capabilities, Telephony},
    record::CellsRecord,
};

/// Polls telephony once per pass and publishes what it finds.
pub struct CellScanner<T> {
    telephony: T,
    emitter: Emitter,
    capabilities: Capabilities,
}

impl<T: Telephony> CellScanner<T> {
    pub fn new(telephony: T, emitter: Emitter, capabilities: Capabilities) -> Self {
        Self {
            telephony,
            emitter,
            capabilities,
        }
    }

    /// Collects the serving cell and its neighbors.
    ///
    /// A reading that fails to normalize is skipped, the rest of the pass
    /// continues.
    pub fn snapshot(&self) -> Result<CellsRecord> {
        if !self.telephony.is_available() {
            return Err(ScanError::ServiceUnavailable("telephony"));
        }

        let mut record = CellsRecord::new(self.telephony.phone_type(), self.capabilities)?;
        let operator = self.telephony.network_operator();

        if let Some(location) = self.telephony.cell_location() {
            let result = record.put_cell_location(
                &location,
                self.telephony.network_type(),
                operator.as_deref(),
                self.telephony.signal_strength(),
            );
            if let Err(e) = result {
                warn!("skipping serving cell: {e}");
            }
        }

        for neighbor in self.telephony.neighboring_cells() {
            if let Err(e) = record.put_neighboring_cell(&neighbor, operator.as_deref()) {
                warn!(cid = neighbor.cid, "skipping neighboring cell: {e}");
            }
        }

        Ok(record)
    }

    /// Runs one pass, returning whether an event was published.
    pub fn scan(&self) -> Result<bool> {
        let record = match self.snapshot() {
            Ok(x) => x,
            Err(e @ ScanError::ServiceUnavailable(_)) => {
                debug!("no cell data: {e}");
                return Ok(false);
            }
            Err(e) => {
                warn!("no cell data: {e}");
                return Ok(false);
            }
        };

        if !record.has_cells() {
            debug!("no cells seen");
            return Ok(false);
        }

        let now = Utc::now().timestamp_millis();
        self.emitter
            .publish(EventKind::CellTelemetry, &record.export(), now)?;
        Ok(true)
    }

    pub fn telephony(&self) -> &T {
        &self.telephony
    }
}
