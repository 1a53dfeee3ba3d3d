//! Location sampling lifecycle.
//!
//! The scanner never blocks: `start` and `stop` return immediately and the
//! platform reports back through [`LocationScanner::handle_event`]. One owner
//! drives both, so the callback slot is only ever touched through `&mut self`.

use chrono::Utc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::{
    emitter::{Emitter, EventKind},
    error::{Result, ScanError},
    location::{LocationRequest, LocationSample, SamplingConfiguration},
    platform::{ClientEvent, LocationClient, ServiceStatus},
};

pub type LocationCallback = Box<dyn FnMut(&LocationSample) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerState {
    Uninitialized,
    Connecting,
    Connected,
    SamplingActive,
    Disconnected,
}

pub struct LocationScanner<C> {
    client: C,
    emitter: Emitter,
    request: Option<LocationRequest>,
    state: ScannerState,
    callback: Option<LocationCallback>,
    location_count: u64,
}

impl<C: LocationClient> LocationScanner<C> {
    pub fn new(client: C, emitter: Emitter) -> Self {
        Self {
            client,
            emitter,
            request: None,
            state: ScannerState::Uninitialized,
            callback: None,
            location_count: 0,
        }
    }

    pub fn configure(&mut self, config: &SamplingConfiguration) -> Result<()> {
        if self.state != ScannerState::Uninitialized {
            return Err(ScanError::AlreadyConfigured);
        }

        let request = LocationRequest::from(config);
        debug!(?request, "location scanner configured");
        self.request = Some(request);
        self.state = ScannerState::Disconnected;
        Ok(())
    }

    /// Begins connecting to the location service.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            ScannerState::Uninitialized => Err(ScanError::NotConfigured),
            ScannerState::Disconnected => {
                self.state = ScannerState::Connecting;
                self.client.connect();
                Ok(())
            }
            ScannerState::Connecting | ScannerState::Connected | ScannerState::SamplingActive => {
                Ok(())
            }
        }
    }

    pub fn stop(&mut self) {
        if matches!(
            self.state,
            ScannerState::Uninitialized | ScannerState::Disconnected
        ) {
            return;
        }

        if self.client.is_connected() {
            self.client.remove_location_updates();
        }
        self.client.disconnect();
        self.state = ScannerState::Disconnected;
        info!(count = self.location_count, "location scanner stopped");
    }

    /// Last known location, or `None` while the service is unusable.
    pub fn current_location(&self) -> Option<LocationSample> {
        // availability can change at any time, so it is probed on every call
        let status = self.client.availability();
        if status != ServiceStatus::Success {
            debug!(?status, "location service unavailable");
            return None;
        }
        if !self.client.is_connected() {
            return None;
        }
        self.client.last_location()
    }

    /// Registers the consumer of new samples, replacing any previous one.
    pub fn set_callback(&mut self, callback: impl FnMut(&LocationSample) + Send + 'static) {
        self.callback = Some(Box::new(callback));
    }

    pub fn clear_callback(&mut self) {
        self.callback = None;
    }

    pub fn handle_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Connected => self.on_connected(),
            ClientEvent::ConnectionFailed(reason) => {
                // no retry: the scanner stays in Connecting until stopped
                warn!(state = ?self.state, "location service connection failed: {reason}");
            }
            ClientEvent::Disconnected => {
                if self.state != ScannerState::Disconnected {
                    info!(state = ?self.state, "location service disconnected");
                    self.state = ScannerState::Disconnected;
                }
            }
            ClientEvent::LocationChanged(sample) => match self.state {
                ScannerState::Connected | ScannerState::SamplingActive => {
                    self.report(&sample);
                    if let Some(callback) = self.callback.as_mut() {
                        callback(&sample);
                    }
                }
                state => debug!(?state, "dropping late location update"),
            },
        }
    }

    /// Handles every event already queued on `events` without waiting.
    pub fn pump(&mut self, events: &mut UnboundedReceiver<ClientEvent>) -> usize {
        let mut handled = 0;
        while let Ok(event) = events.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    pub fn state(&self) -> ScannerState {
        self.state
    }

    pub fn request(&self) -> Option<&LocationRequest> {
        self.request.as_ref()
    }

    /// Number of location events published so far.
    pub fn location_count(&self) -> u64 {
        self.location_count
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    fn on_connected(&mut self) {
        if self.state != ScannerState::Connecting {
            debug!(state = ?self.state, "ignoring connection after stop");
            return;
        }
        self.state = ScannerState::Connected;
        info!("location service connected");

        if let Some(last) = self.client.last_location() {
            self.report(&last);
        }

        let Some(request) = self.request else {
            return;
        };
        match self.client.request_location_updates(&request) {
            Ok(()) => self.state = ScannerState::SamplingActive,
            Err(e) => warn!("{}", ScanError::Request(e)),
        }
    }

    fn report(&mut self, sample: &LocationSample) {
        let now = Utc::now().timestamp_millis();
        match self.emitter.publish(EventKind::Location, sample, now) {
            Ok(()) => self.location_count += 1,
            Err(e) => warn!("dropping location sample: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use serde_json::json;
    use tokio::sync::{broadcast, mpsc};

    use super::*;
    use crate::{
        emitter::{BroadcastChannel, Message},
        location::Priority,
    };

    #[derive(Default)]
    struct FakeClient {
        connected: bool,
        status: Option<ServiceStatus>,
        last: Option<LocationSample>,
        requested: Option<LocationRequest>,
        reject_requests: bool,
        calls: Vec<&'static str>,
    }

    impl LocationClient for FakeClient {
        fn connect(&mut self) {
            self.calls.push("connect");
        }

        fn disconnect(&mut self) {
            self.calls.push("disconnect");
            self.connected = false;
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn last_location(&self) -> Option<LocationSample> {
            self.last
        }

        fn request_location_updates(
            &mut self,
            request: &LocationRequest,
        ) -> std::result::Result<(), String> {
            self.calls.push("request");
            if self.reject_requests {
                return Err("rejected".to_owned());
            }
            self.requested = Some(*request);
            Ok(())
        }

        fn remove_location_updates(&mut self) {
            self.calls.push("remove");
        }

        fn availability(&self) -> ServiceStatus {
            self.status.unwrap_or(ServiceStatus::Success)
        }
    }

    fn config() -> SamplingConfiguration {
        SamplingConfiguration {
            update_interval: Duration::from_millis(30_000),
            fastest_interval: Duration::from_millis(5_000),
            priority: Priority::HighAccuracy,
        }
    }

    fn sample(latitude: f64, longitude: f64, accuracy: f32, timestamp_millis: i64) -> LocationSample {
        LocationSample {
            latitude,
            longitude,
            accuracy,
            timestamp_millis,
        }
    }

    fn scanner(client: FakeClient) -> (LocationScanner<FakeClient>, broadcast::Receiver<Message>) {
        let channel = Arc::new(BroadcastChannel::new(16));
        let rx = channel.subscribe();
        (LocationScanner::new(client, Emitter::new("topic", channel)), rx)
    }

    fn connect(scanner: &mut LocationScanner<FakeClient>) {
        scanner.configure(&config()).unwrap();
        scanner.start().unwrap();
        scanner.client_mut().connected = true;
        scanner.handle_event(ClientEvent::Connected);
    }

    #[test]
    fn cached_then_update() {
        let (mut scanner, mut rx) = scanner(FakeClient {
            last: Some(sample(32.08, 34.78, 10.0, 1000)),
            ..Default::default()
        });
        connect(&mut scanner);

        assert_eq!(scanner.state(), ScannerState::SamplingActive);
        assert_eq!(
            scanner.client().requested,
            Some(LocationRequest {
                interval: Duration::from_secs(30),
                fastest_interval: Duration::from_secs(5),
                priority: Priority::HighAccuracy,
            })
        );

        let first = rx.try_recv().unwrap();
        assert_eq!(first.subject, "LocationScanner");
        assert_eq!(
            first.payload,
            json!({ "latitude": 32.08, "longitude": 34.78, "accuracy": 10.0, "timestampMillis": 1000 })
        );
        assert!(rx.try_recv().is_err());

        scanner.handle_event(ClientEvent::LocationChanged(sample(32.09, 34.79, 8.0, 31000)));
        let second = rx.try_recv().unwrap();
        assert_eq!(
            second.payload,
            json!({ "latitude": 32.09, "longitude": 34.79, "accuracy": 8.0, "timestampMillis": 31000 })
        );
        assert!(rx.try_recv().is_err());
        assert_eq!(scanner.location_count(), 2);
    }

    #[test]
    fn stop_before_start() {
        let (mut scanner, mut rx) = scanner(FakeClient::default());
        scanner.stop();
        assert_eq!(scanner.state(), ScannerState::Uninitialized);

        scanner.configure(&config()).unwrap();
        scanner.stop();
        scanner.stop();
        assert_eq!(scanner.state(), ScannerState::Disconnected);
        assert!(scanner.client().calls.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn stop_removes_updates() {
        let (mut scanner, _rx) = scanner(FakeClient::default());
        connect(&mut scanner);
        scanner.stop();
        scanner.stop();

        assert_eq!(scanner.state(), ScannerState::Disconnected);
        assert_eq!(
            scanner.client().calls,
            ["connect", "request", "remove", "disconnect"]
        );
    }

    #[test]
    fn stop_while_connecting() {
        let (mut scanner, _rx) = scanner(FakeClient::default());
        scanner.configure(&config()).unwrap();
        scanner.start().unwrap();
        scanner.stop();
        assert_eq!(scanner.client().calls, ["connect", "disconnect"]);

        // the connection completing afterwards is ignored
        scanner.handle_event(ClientEvent::Connected);
        assert_eq!(scanner.state(), ScannerState::Disconnected);
    }

    #[test]
    fn late_update_dropped() {
        let (mut scanner, mut rx) = scanner(FakeClient::default());
        connect(&mut scanner);
        scanner.stop();

        scanner.handle_event(ClientEvent::LocationChanged(sample(1.0, 2.0, 3.0, 4)));
        assert!(rx.try_recv().is_err());
        assert_eq!(scanner.location_count(), 0);
    }

    #[test]
    fn connection_failure_stalls() {
        let (mut scanner, mut rx) = scanner(FakeClient::default());
        scanner.configure(&config()).unwrap();
        scanner.start().unwrap();
        scanner.handle_event(ClientEvent::ConnectionFailed("service missing".to_owned()));

        assert_eq!(scanner.state(), ScannerState::Connecting);
        assert_eq!(scanner.client().calls, ["connect"]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn rejected_request() {
        let (mut scanner, _rx) = scanner(FakeClient {
            reject_requests: true,
            ..Default::default()
        });
        connect(&mut scanner);
        assert_eq!(scanner.state(), ScannerState::Connected);

        // updates still flow if the platform delivers them
        scanner.handle_event(ClientEvent::LocationChanged(sample(1.0, 2.0, 3.0, 4)));
        assert_eq!(scanner.location_count(), 1);
    }

    #[test]
    fn platform_disconnect() {
        let (mut scanner, _rx) = scanner(FakeClient::default());
        connect(&mut scanner);
        scanner.handle_event(ClientEvent::Disconnected);
        assert_eq!(scanner.state(), ScannerState::Disconnected);

        // can be started again
        scanner.start().unwrap();
        assert_eq!(scanner.state(), ScannerState::Connecting);
    }

    #[test]
    fn configure_once() {
        let (mut scanner, _rx) = scanner(FakeClient::default());
        assert!(matches!(scanner.start(), Err(ScanError::NotConfigured)));
        scanner.configure(&config()).unwrap();
        assert!(matches!(
            scanner.configure(&config()),
            Err(ScanError::AlreadyConfigured)
        ));
    }

    #[test]
    fn callback_replaced() {
        let (mut scanner, _rx) = scanner(FakeClient::default());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = seen.clone();
        scanner.set_callback(move |s| first.lock().unwrap().push(("first", s.timestamp_millis)));
        connect(&mut scanner);
        scanner.handle_event(ClientEvent::LocationChanged(sample(1.0, 1.0, 1.0, 1)));

        let second = seen.clone();
        scanner.set_callback(move |s| second.lock().unwrap().push(("second", s.timestamp_millis)));
        scanner.handle_event(ClientEvent::LocationChanged(sample(1.0, 1.0, 1.0, 2)));

        scanner.clear_callback();
        scanner.handle_event(ClientEvent::LocationChanged(sample(1.0, 1.0, 1.0, 3)));

        assert_eq!(*seen.lock().unwrap(), [("first", 1), ("second", 2)]);
        assert_eq!(scanner.location_count(), 3);
    }

    #[test]
    fn current_location() {
        let last = sample(32.08, 34.78, 10.0, 1000);
        let (mut scanner, _rx) = scanner(FakeClient {
            last: Some(last),
            ..Default::default()
        });
        assert_eq!(scanner.current_location(), None);

        connect(&mut scanner);
        assert_eq!(scanner.current_location(), Some(last));

        scanner.client_mut().status = Some(ServiceStatus::Updating);
        assert_eq!(scanner.current_location(), None);
        scanner.client_mut().status = None;
        assert_eq!(scanner.current_location(), Some(last));
    }

    #[test]
    fn pump_events() {
        let (mut scanner, mut rx) = scanner(FakeClient::default());
        scanner.configure(&config()).unwrap();
        scanner.start().unwrap();

        let (tx, mut events) = mpsc::unbounded_channel();
        tx.send(ClientEvent::Connected).unwrap();
        tx.send(ClientEvent::LocationChanged(sample(1.0, 2.0, 3.0, 10))).unwrap();
        tx.send(ClientEvent::LocationChanged(sample(1.0, 2.0, 3.0, 20))).unwrap();

        assert_eq!(scanner.pump(&mut events), 3);
        assert_eq!(rx.try_recv().unwrap().payload["timestampMillis"], 10);
        assert_eq!(rx.try_recv().unwrap().payload["timestampMillis"], 20);
    }
}
