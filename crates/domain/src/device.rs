//! Device — a typed IoT device owning an ordered list of sensor readings.
//!
//! [`Device`] is the validated, persisted shape. [`DevicePayload`] is the
//! loosely-shaped input accepted from clients; it only becomes a device after
//! passing [`validate`](crate::validation::validate).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::id::DeviceId;
use crate::time::Timestamp;

/// Closed set of supported device kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceType {
    Car,
    Fridge,
    Thermostat,
    #[serde(alias = "industrial machine")]
    IndustrialMachine,
}

impl DeviceType {
    /// Every member of the enumeration, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::Car,
        Self::Fridge,
        Self::Thermostat,
        Self::IndustrialMachine,
    ];

    /// Canonical wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Fridge => "fridge",
            Self::Thermostat => "thermostat",
            Self::IndustrialMachine => "industrial-machine",
        }
    }

    /// Sensor kinds a device of this type reports, in display order.
    #[must_use]
    pub fn sensor_kinds(self) -> &'static [&'static str] {
        match self {
            Self::Car => &[
                "Battery Level",
                "Fluid Levels",
                "Engine Temperature",
                "Tire Pressure",
            ],
            Self::Fridge => &[
                "Defrost Alarm",
                "Ice Level",
                "Water Leak",
                "Current Temperature",
            ],
            Self::Thermostat => &["Temperature", "Resistance", "Voltage"],
            Self::IndustrialMachine => &["Humidity Level", "Pressure Level", "Temperature"],
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no [`DeviceType`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown device type: {0}")]
pub struct UnknownDeviceType(pub String);

impl FromStr for DeviceType {
    type Err = UnknownDeviceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "car" => Ok(Self::Car),
            "fridge" => Ok(Self::Fridge),
            "thermostat" => Ok(Self::Thermostat),
            "industrial-machine" | "industrial machine" => Ok(Self::IndustrialMachine),
            other => Err(UnknownDeviceType(other.to_string())),
        }
    }
}

/// Current reading of a sensor: a number or a free-form string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<SensorValue> for Value {
    fn from(value: SensorValue) -> Self {
        match value {
            SensorValue::Int(v) => Value::from(v),
            SensorValue::Float(v) => Value::from(v),
            SensorValue::Text(v) => Value::String(v),
        }
    }
}

/// A named reading owned by exactly one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub name: String,
    pub value: SensorValue,
}

impl Sensor {
    #[must_use]
    pub fn new(name: impl Into<String>, value: SensorValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A live device as persisted by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: DeviceId,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub name: String,
    pub sensors: Vec<Sensor>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Loosely-shaped device input.
///
/// Every field is optional so the same type serves full creates and partial
/// updates. Fields that are present but of the wrong JSON type are kept as
/// values that fail validation rather than rejected during deserialization,
/// so callers always get the specific rule that was broken.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct DevicePayload {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensors: Option<Vec<SensorPayload>>,
}

/// Loosely-shaped sensor input.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SensorPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Returned when a payload is not a JSON object at all.
#[derive(Debug, Clone, thiserror::Error)]
#[error("device payload must be a JSON object")]
pub struct PayloadShapeError;

impl DevicePayload {
    /// Full payload describing a device of `device_type`.
    #[must_use]
    pub fn new(device_type: DeviceType, name: impl Into<String>, sensors: Vec<Sensor>) -> Self {
        Self {
            device_type: Some(device_type.as_str().to_string()),
            name: Some(name.into()),
            sensors: Some(sensors.into_iter().map(SensorPayload::from).collect()),
        }
    }

    /// Fill every absent field from `existing`, keeping present fields as-is.
    #[must_use]
    pub fn overlay(self, existing: &Device) -> Self {
        Self {
            device_type: self
                .device_type
                .or_else(|| Some(existing.device_type.as_str().to_string())),
            name: self.name.or_else(|| Some(existing.name.clone())),
            sensors: self.sensors.or_else(|| {
                Some(
                    existing
                        .sensors
                        .iter()
                        .cloned()
                        .map(SensorPayload::from)
                        .collect(),
                )
            }),
        }
    }
}

impl TryFrom<Value> for DevicePayload {
    type Error = PayloadShapeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut map) = value else {
            return Err(PayloadShapeError);
        };
        Ok(Self {
            device_type: take_text(&mut map, "type"),
            name: take_text(&mut map, "name"),
            sensors: map.remove("sensors").map(|sensors| match sensors {
                Value::Array(items) => items.into_iter().map(SensorPayload::from).collect(),
                _ => Vec::new(),
            }),
        })
    }
}

impl From<Value> for SensorPayload {
    fn from(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::default();
        };
        Self {
            name: take_text(&mut map, "name"),
            value: map.remove("value"),
        }
    }
}

impl From<Sensor> for SensorPayload {
    fn from(sensor: Sensor) -> Self {
        Self {
            name: Some(sensor.name),
            value: Some(sensor.value.into()),
        }
    }
}

impl<'de> Deserialize<'de> for SensorPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Self::from)
    }
}

/// A present key always yields `Some`. Anything but a JSON string becomes an
/// empty string, which fails every name and type rule.
fn take_text(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    map.remove(key).map(|value| match value {
        Value::String(s) => s,
        _ => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now;
    use serde_json::json;

    fn sample_device() -> Device {
        let ts = now();
        Device {
            id: DeviceId::new(),
            device_type: DeviceType::Thermostat,
            name: "Hall Thermostat".to_string(),
            sensors: vec![Sensor::new("Temperature", SensorValue::Int(21))],
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn should_parse_both_industrial_machine_spellings() {
        assert_eq!(
            "industrial-machine".parse::<DeviceType>().unwrap(),
            DeviceType::IndustrialMachine
        );
        assert_eq!(
            "industrial machine".parse::<DeviceType>().unwrap(),
            DeviceType::IndustrialMachine
        );
    }

    #[test]
    fn should_reject_unknown_device_type() {
        let err = "spaceship".parse::<DeviceType>().unwrap_err();
        assert_eq!(err, UnknownDeviceType("spaceship".to_string()));
    }

    #[test]
    fn should_list_sensor_kinds_for_every_type() {
        for device_type in DeviceType::ALL {
            assert!(!device_type.sensor_kinds().is_empty());
        }
        assert_eq!(DeviceType::Thermostat.sensor_kinds().len(), 3);
        assert_eq!(DeviceType::Car.sensor_kinds()[0], "Battery Level");
    }

    #[test]
    fn should_serialize_device_with_type_key_and_camel_case_timestamps() {
        let device = sample_device();
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["type"], "thermostat");
        assert_eq!(json["name"], "Hall Thermostat");
        assert_eq!(json["sensors"][0]["value"], 21);
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
    }

    #[test]
    fn should_deserialize_sensor_value_as_text_or_number() {
        let text: SensorValue = serde_json::from_value(json!("90%")).unwrap();
        let int: SensorValue = serde_json::from_value(json!(42)).unwrap();
        let float: SensorValue = serde_json::from_value(json!(3.5)).unwrap();
        assert_eq!(text, SensorValue::Text("90%".to_string()));
        assert_eq!(int, SensorValue::Int(42));
        assert_eq!(float, SensorValue::Float(3.5));
    }

    #[test]
    fn should_keep_wrongly_typed_fields_when_deserializing_payload() {
        let payload: DevicePayload = serde_json::from_value(json!({
            "type": 7,
            "name": null,
            "sensors": "none"
        }))
        .unwrap();
        assert_eq!(payload.device_type.as_deref(), Some("7"));
        assert_eq!(payload.name.as_deref(), Some(""));
        assert_eq!(payload.sensors, Some(Vec::new()));
    }

    #[test]
    fn should_leave_absent_fields_empty_when_deserializing_payload() {
        let payload: DevicePayload = serde_json::from_value(json!({ "name": "Only Name" })).unwrap();
        assert!(payload.device_type.is_none());
        assert!(payload.sensors.is_none());
    }

    #[test]
    fn should_reject_non_object_payload() {
        let result: Result<DevicePayload, _> = serde_json::from_value(json!([1, 2, 3]));
        assert!(result.is_err());
    }

    #[test]
    fn should_overlay_missing_fields_from_existing_device() {
        let device = sample_device();
        let payload = DevicePayload {
            name: Some("Renamed".to_string()),
            ..DevicePayload::default()
        };

        let merged = payload.overlay(&device);
        assert_eq!(merged.device_type.as_deref(), Some("thermostat"));
        assert_eq!(merged.name.as_deref(), Some("Renamed"));
        let sensors = merged.sensors.unwrap();
        assert_eq!(sensors.len(), 1);
        assert_eq!(sensors[0].name.as_deref(), Some("Temperature"));
        assert_eq!(sensors[0].value, Some(json!(21)));
    }
}
