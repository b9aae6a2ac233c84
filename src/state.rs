use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Property, PropertyReading, PropertyRegistry};

/// Snapshot fields whose change triggers the registered change callback.
/// Everything else updates silently and becomes visible on the next read.
pub const SIGNIFICANT_PROPERTIES: &[Property] = &[Property::Power, Property::Aqi];

/// Last known property values of the purifier. Fields start at their
/// zero-value and only ever change when a poll response carries a usable
/// reading for them; a property absent from a response keeps its prior value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub power: bool,
    pub mode: u8,
    pub aqi: i32,
    pub filter_life_remaining: u8,
    pub filter_hours_used: u32,
    pub buzzer: bool,
    pub led_brightness: u8,
    pub child_lock: bool,
    pub motor_speed: u32,
    pub favorite_rpm: u32,
    /// When the snapshot was last refreshed from a successful poll.
    pub last_refreshed: Option<DateTime<Utc>>,
}

impl DeviceState {
    /// Applies one poll response to the snapshot. Readings are matched to
    /// tracked descriptors by their `(siid, piid)` pair; unmatched, errored
    /// or mistyped readings leave the corresponding field untouched.
    pub fn apply(
        &mut self,
        registry: &PropertyRegistry,
        readings: &[PropertyReading],
    ) -> SnapshotUpdate {
        let mut changed = Vec::new();
        for descriptor in registry.iter() {
            let Some(reading) = readings
                .iter()
                .find(|r| descriptor.matches(r.siid, r.piid) && r.is_usable())
            else {
                continue;
            };
            match self.apply_value(descriptor.property, &reading.value) {
                Some(true) => changed.push(descriptor.property),
                Some(false) => {}
                None => log::warn!(
                    "ignoring mistyped value for {:?} ({}/{}): {}",
                    descriptor.property,
                    descriptor.siid,
                    descriptor.piid,
                    reading.value
                ),
            }
        }
        self.last_refreshed = Some(Utc::now());
        SnapshotUpdate { changed }
    }

    /// Writes one coerced value into its field. `Some(true)` means the field
    /// changed, `None` means the value did not coerce to the field's type.
    fn apply_value(&mut self, property: Property, value: &Value) -> Option<bool> {
        match property {
            Property::Power => assign(&mut self.power, value.as_bool()),
            Property::Mode => assign(&mut self.mode, as_int(value)),
            Property::Aqi => assign(&mut self.aqi, as_int(value)),
            Property::FilterLifeRemaining => assign(&mut self.filter_life_remaining, as_int(value)),
            Property::FilterHoursUsed => assign(&mut self.filter_hours_used, as_int(value)),
            Property::Buzzer => assign(&mut self.buzzer, value.as_bool()),
            Property::LedBrightness => assign(&mut self.led_brightness, as_int(value)),
            Property::ChildLock => assign(&mut self.child_lock, value.as_bool()),
            Property::MotorSpeed => assign(&mut self.motor_speed, as_int(value)),
            Property::FavoriteRpm => assign(&mut self.favorite_rpm, as_int(value)),
        }
    }
}

fn assign<T: PartialEq>(slot: &mut T, value: Option<T>) -> Option<bool> {
    let value = value?;
    if *slot != value {
        *slot = value;
        Some(true)
    } else {
        Some(false)
    }
}

fn as_int<T: TryFrom<i64>>(value: &Value) -> Option<T> {
    value.as_i64().and_then(|v| T::try_from(v).ok())
}

/// Which properties one poll changed in the snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotUpdate {
    changed: Vec<Property>,
}

impl SnapshotUpdate {
    pub fn changed(&self) -> &[Property] {
        &self.changed
    }

    pub fn has_changed(&self, property: Property) -> bool {
        self.changed.contains(&property)
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    /// True when a change-callback-worthy field (power, aqi) changed.
    pub fn is_significant(&self) -> bool {
        SIGNIFICANT_PROPERTIES.iter().any(|p| self.changed.contains(p))
    }
}
