use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::Deref;

/// All purifier properties the engine keeps in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Power,
    Mode,
    Aqi,
    FilterLifeRemaining,
    FilterHoursUsed,
    Buzzer,
    LedBrightness,
    ChildLock,
    MotorSpeed,
    FavoriteRpm,
}

/// Identifies one remote property by its MIoT service/property id pair.
/// Identity for response matching is `(siid, piid)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub property: Property,
    pub siid: u8,
    pub piid: u8,
}

impl PropertyDescriptor {
    pub const fn new(property: Property, siid: u8, piid: u8) -> Self {
        Self {
            property,
            siid,
            piid,
        }
    }

    pub fn matches(&self, siid: u8, piid: u8) -> bool {
        self.siid == siid && self.piid == piid
    }
}

/// The fixed, ordered list of properties requested from the device in one
/// batched `get_properties` call. Built once per device and never modified
/// afterwards.
#[derive(Debug, Clone)]
pub struct PropertyRegistry(Vec<PropertyDescriptor>);

impl Deref for PropertyRegistry {
    type Target = [PropertyDescriptor];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Default for PropertyRegistry {
    fn default() -> Self {
        Self::air_purifier_mb4()
    }
}

impl PropertyRegistry {
    /// Registry for the zhimi.airpurifier.mb4 MIoT spec.
    pub fn air_purifier_mb4() -> Self {
        Self(vec![
            PropertyDescriptor::new(Property::Power, 2, 1),
            PropertyDescriptor::new(Property::Mode, 2, 4),
            PropertyDescriptor::new(Property::Aqi, 3, 4),
            PropertyDescriptor::new(Property::FilterLifeRemaining, 4, 1),
            PropertyDescriptor::new(Property::FilterHoursUsed, 4, 3),
            PropertyDescriptor::new(Property::Buzzer, 6, 1),
            PropertyDescriptor::new(Property::ChildLock, 7, 1),
            PropertyDescriptor::new(Property::LedBrightness, 8, 1),
            PropertyDescriptor::new(Property::MotorSpeed, 9, 1),
            PropertyDescriptor::new(Property::FavoriteRpm, 9, 3),
        ])
    }

    pub fn find(&self, siid: u8, piid: u8) -> Option<&PropertyDescriptor> {
        self.0.iter().find(|d| d.matches(siid, piid))
    }

    pub fn descriptor(&self, property: Property) -> Option<&PropertyDescriptor> {
        self.0.iter().find(|d| d.property == property)
    }

    /// Request records for a batched `get_properties` call, in registry order.
    pub fn requests(&self, did: &str) -> Vec<PropertyRequest> {
        self.0
            .iter()
            .map(|d| PropertyRequest {
                did: did.to_owned(),
                siid: d.siid,
                piid: d.piid,
            })
            .collect()
    }
}

/// One entry of the `get_properties` request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyRequest {
    pub did: String,
    pub siid: u8,
    pub piid: u8,
}

/// One entry of a `get_properties` result. The device may answer with a
/// subset of the request, in any order; individual entries can carry a
/// non-zero miIO status code or a null value.
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyReading {
    #[serde(default)]
    pub did: Option<String>,
    pub siid: u8,
    pub piid: u8,
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub value: Value,
}

impl PropertyReading {
    /// Whether this entry carries a usable value for this poll cycle.
    pub fn is_usable(&self) -> bool {
        self.code == 0 && !self.value.is_null()
    }
}

/// One entry of the `set_properties` request payload.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyWrite {
    pub did: String,
    pub siid: u8,
    pub piid: u8,
    pub value: Value,
}
