use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock as SessionLock;

use crate::{
    DeviceError, DeviceState, FixedDelay, MiioTransport, Property, PropertyReading,
    PropertyRegistry, PropertyWrite, RetryPolicy,
};

/// Model string of the only supported appliance.
pub const MODEL: &str = "zhimi.airpurifier.mb4";

/// Firmware placeholder until the first successful `miIO.info` call.
pub const FIRMWARE_UNKNOWN: &str = "UNKNOWN";

/// Connection parameters for one purifier. Fixed for the lifetime of the
/// device instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub did: String,
    pub token: String,
    pub address: String,
}

impl DeviceConfig {
    pub fn new(
        did: impl Into<String>,
        token: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            did: did.into(),
            token: token.into(),
            address: address.into(),
        }
    }
}

/// Model and firmware identity reported by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub model: String,
    pub firmware: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            model: MODEL.to_owned(),
            firmware: FIRMWARE_UNKNOWN.to_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MiioInfo {
    fw_ver: String,
}

type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Synchronization engine for one air purifier.
///
/// Owns the miIO session, the property snapshot and the change callback.
/// Remote failures never escape the public operations: connection failures
/// are retried forever on the configured [`RetryPolicy`], poll and command
/// failures are logged and leave the snapshot at its last known values.
pub struct AirPurifierDevice<T: MiioTransport> {
    config: DeviceConfig,
    transport: T,
    registry: PropertyRegistry,
    retry: Box<dyn RetryPolicy>,
    session: SessionLock<Option<T::Session>>,
    info: RwLock<DeviceInfo>,
    state: RwLock<DeviceState>,
    on_change: Mutex<Option<ChangeCallback>>,
    poll_in_flight: AtomicBool,
}

impl<T: MiioTransport> AirPurifierDevice<T> {
    pub fn new(config: DeviceConfig, transport: T) -> Self {
        Self::with_retry_policy(config, transport, Box::new(FixedDelay::default()))
    }

    pub fn with_retry_policy(
        config: DeviceConfig,
        transport: T,
        retry: Box<dyn RetryPolicy>,
    ) -> Self {
        Self {
            config,
            transport,
            registry: PropertyRegistry::default(),
            retry,
            session: SessionLock::new(None),
            info: RwLock::new(DeviceInfo::default()),
            state: RwLock::new(DeviceState::default()),
            on_change: Mutex::new(None),
            poll_in_flight: AtomicBool::new(false),
        }
    }

    /// Creates the device and immediately starts connecting in a background
    /// task, the way a bridge adapter consumes it.
    pub fn spawn(config: DeviceConfig, transport: T) -> Arc<Self>
    where
        T: 'static,
    {
        let device = Arc::new(Self::new(config, transport));
        let connector = Arc::clone(&device);
        tokio::spawn(async move { connector.connect().await });
        device
    }

    /// Registers the change callback. Single subscriber: the most recent
    /// registration wins. The callback takes no arguments and is expected to
    /// re-read [`device_state`](Self::device_state).
    pub fn on_change(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self
            .on_change
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    /// Current snapshot. While disconnected or mid-retry this returns the
    /// last successfully observed values, never an error.
    pub fn device_state(&self) -> DeviceState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn device_info(&self) -> DeviceInfo {
        self.info
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn firmware_version(&self) -> String {
        self.device_info().firmware
    }

    pub async fn is_connected(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Connects to the device, retrying forever until a session is
    /// established. Each success fetches the device identity and runs the
    /// initial poll.
    pub async fn connect(&self) {
        let mut attempt: u32 = 0;
        loop {
            match self.try_connect().await {
                Ok(()) => return,
                Err(err) => {
                    attempt += 1;
                    let delay = self.retry.next_delay(attempt);
                    log::error!(
                        "[{}] device connection failure: {} (retry {} in {:?})",
                        self.config.did,
                        err,
                        attempt,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// One connect attempt. The session slot is only written once the
    /// identity call has succeeded, so a stored session always belongs to a
    /// fully established connection.
    async fn try_connect(&self) -> Result<(), DeviceError> {
        let session = self
            .transport
            .connect(&self.config.address, &self.config.token)
            .await?;
        let raw = self.transport.call(&session, "miIO.info", Value::Null).await?;
        let MiioInfo { fw_ver } = serde_json::from_value(raw)?;

        *self.session.write().await = Some(session);
        self.info
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .firmware = fw_ver;

        log::debug!(
            "[{}] connected to {} (firmware {})",
            self.config.did,
            self.config.address,
            self.firmware_version()
        );

        // Initial poll; failure here is recoverable via the next poll cycle.
        self.update_properties().await;
        Ok(())
    }

    /// Polls the device and applies the response to the snapshot. Failures
    /// are logged and leave the snapshot untouched; the next externally
    /// scheduled poll cycle recovers.
    pub async fn update_properties(&self) {
        if let Err(err) = self.try_update_properties().await {
            log::error!("[{}] device failure: {}", self.config.did, err);
        }
    }

    /// Fallible poll. Skips silently when another poll is still in flight so
    /// overlapping cycles never race on the snapshot.
    pub async fn try_update_properties(&self) -> Result<(), DeviceError> {
        if self
            .poll_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("[{}] poll already in flight, skipping", self.config.did);
            return Ok(());
        }
        let result = self.poll_once().await;
        self.poll_in_flight.store(false, Ordering::Release);
        result
    }

    async fn poll_once(&self) -> Result<(), DeviceError> {
        let params = serde_json::to_value(self.registry.requests(&self.config.did))?;
        let response = self.call("get_properties", params).await?;
        let readings: Vec<PropertyReading> = serde_json::from_value(response)?;

        let update = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.apply(&self.registry, &readings)
        };
        log::trace!("[{}] poll applied, changed: {:?}", self.config.did, update.changed());

        // Fire at most once per poll, only after the full snapshot update.
        if update.is_significant() {
            self.notify_change();
        }
        Ok(())
    }

    /// Switches the purifier on or off. After a successful write the snapshot
    /// is resynchronized with a read-back poll instead of being assumed.
    pub async fn power_switch(&self, on: bool) {
        if let Err(err) = self.try_power_switch(on).await {
            log::error!("[{}] device failure: {}", self.config.did, err);
        }
    }

    pub async fn try_power_switch(&self, on: bool) -> Result<(), DeviceError> {
        let Some(descriptor) = self.registry.descriptor(Property::Power) else {
            return Err(DeviceError::UnsupportedProperty(Property::Power));
        };
        let params = serde_json::to_value(vec![PropertyWrite {
            did: self.config.did.clone(),
            siid: descriptor.siid,
            piid: descriptor.piid,
            value: Value::Bool(on),
        }])?;
        self.call("set_properties", params).await?;
        log::debug!("[{}] power set to {}", self.config.did, on);

        // Read back the confirmed state; a poll failure here is its own
        // recoverable event and does not fail the command.
        self.update_properties().await;
        Ok(())
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, DeviceError> {
        let session = self.session.read().await;
        let Some(session) = session.as_ref() else {
            return Err(DeviceError::NotConnected);
        };
        Ok(self.transport.call(session, method, params).await?)
    }

    fn notify_change(&self) {
        let callback = self
            .on_change
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}
