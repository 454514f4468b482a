//! Validation rules applied to every device payload before it reaches storage.
//!
//! Rules are evaluated in a fixed order and the first violation wins:
//! type, name, sensors presence, then each sensor in sequence (name, value).

use serde_json::Value;

use crate::device::{DevicePayload, DeviceType, Sensor, SensorPayload, SensorValue};
use crate::error::ValidationError;

/// Minimum length of device and sensor names, counted after trimming.
pub const MIN_NAME_LEN: usize = 3;

/// A payload that passed every rule, with names trimmed and values typed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDevice {
    pub device_type: DeviceType,
    pub name: String,
    pub sensors: Vec<Sensor>,
}

/// Check `payload` against the device invariants.
///
/// # Errors
///
/// Returns the first [`ValidationError`] in evaluation order.
pub fn validate(payload: &DevicePayload) -> Result<ValidDevice, ValidationError> {
    let device_type = payload
        .device_type
        .as_deref()
        .and_then(|raw| raw.parse::<DeviceType>().ok())
        .ok_or(ValidationError::InvalidType)?;

    let name = payload
        .name
        .as_deref()
        .and_then(valid_name)
        .ok_or(ValidationError::InvalidName)?;

    let sensors = match payload.sensors.as_deref() {
        Some(sensors) if !sensors.is_empty() => sensors,
        _ => return Err(ValidationError::MissingSensors),
    };

    let sensors = sensors
        .iter()
        .enumerate()
        .map(|(index, sensor)| validate_sensor(index, sensor))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ValidDevice {
        device_type,
        name,
        sensors,
    })
}

fn validate_sensor(index: usize, sensor: &SensorPayload) -> Result<Sensor, ValidationError> {
    let name = sensor
        .name
        .as_deref()
        .and_then(valid_name)
        .ok_or(ValidationError::InvalidSensorName { index })?;

    let value = match &sensor.value {
        None | Some(Value::Null) => return Err(ValidationError::MissingSensorValue { index }),
        Some(Value::String(text)) => SensorValue::Text(text.clone()),
        Some(Value::Number(number)) => match number.as_i64() {
            Some(int) => SensorValue::Int(int),
            None => SensorValue::Float(
                number
                    .as_f64()
                    .ok_or(ValidationError::InvalidSensorValue { index })?,
            ),
        },
        Some(_) => return Err(ValidationError::InvalidSensorValue { index }),
    };

    Ok(Sensor { name, value })
}

fn valid_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (trimmed.chars().count() >= MIN_NAME_LEN).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> DevicePayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn should_accept_valid_payload() {
        let valid = validate(&payload(json!({
            "type": "car",
            "name": "Valid Car",
            "sensors": [
                { "name": "Battery Level", "value": "90%" },
                { "name": "Engine Temperature", "value": 75 }
            ]
        })))
        .unwrap();

        assert_eq!(valid.device_type, DeviceType::Car);
        assert_eq!(valid.name, "Valid Car");
        assert_eq!(valid.sensors.len(), 2);
        assert_eq!(valid.sensors[1].value, SensorValue::Int(75));
    }

    #[test]
    fn should_trim_device_and_sensor_names() {
        let valid = validate(&payload(json!({
            "type": "fridge",
            "name": "  Kitchen Fridge  ",
            "sensors": [{ "name": " Ice Level ", "value": 3.5 }]
        })))
        .unwrap();

        assert_eq!(valid.name, "Kitchen Fridge");
        assert_eq!(valid.sensors[0].name, "Ice Level");
        assert_eq!(valid.sensors[0].value, SensorValue::Float(3.5));
    }

    #[test]
    fn should_reject_missing_type() {
        let result = validate(&payload(json!({
            "name": "Valid Car",
            "sensors": [{ "name": "Battery Level", "value": "90%" }]
        })));
        assert_eq!(result, Err(ValidationError::InvalidType));
    }

    #[test]
    fn should_report_type_before_anything_else_when_everything_is_invalid() {
        let result = validate(&payload(json!({
            "type": "spaceship",
            "name": "x",
            "sensors": []
        })));
        assert_eq!(result, Err(ValidationError::InvalidType));
    }

    #[test]
    fn should_reject_missing_name() {
        let result = validate(&payload(json!({
            "type": "car",
            "sensors": [{ "name": "Battery Level", "value": "90%" }]
        })));
        assert_eq!(result, Err(ValidationError::InvalidName));
    }

    #[test]
    fn should_reject_name_shorter_than_three_characters_after_trim() {
        let result = validate(&payload(json!({
            "type": "car",
            "name": "  AB  ",
            "sensors": []
        })));
        assert_eq!(result, Err(ValidationError::InvalidName));
    }

    #[test]
    fn should_reject_non_string_device_name() {
        for name in [json!(12345), json!(true), json!(["Valid Car"]), Value::Null] {
            let result = validate(&payload(json!({
                "type": "car",
                "name": name,
                "sensors": [{ "name": "Battery Level", "value": 1 }]
            })));
            assert_eq!(result, Err(ValidationError::InvalidName));
        }
    }

    #[test]
    fn should_reject_non_string_sensor_name() {
        for name in [json!(12345), json!(true), json!({ "text": "Battery" })] {
            let result = validate(&payload(json!({
                "type": "car",
                "name": "Valid Car",
                "sensors": [{ "name": name, "value": 1 }]
            })));
            assert_eq!(result, Err(ValidationError::InvalidSensorName { index: 0 }));
        }
    }

    #[test]
    fn should_reject_non_string_type() {
        let result = validate(&payload(json!({
            "type": 1,
            "name": "Valid Car",
            "sensors": [{ "name": "Battery Level", "value": 1 }]
        })));
        assert_eq!(result, Err(ValidationError::InvalidType));
    }

    #[test]
    fn should_reject_missing_sensors() {
        let result = validate(&payload(json!({ "type": "car", "name": "Valid Car" })));
        assert_eq!(result, Err(ValidationError::MissingSensors));
    }

    #[test]
    fn should_reject_empty_sensors() {
        let result = validate(&payload(json!({
            "type": "car",
            "name": "Valid Car",
            "sensors": []
        })));
        assert_eq!(result, Err(ValidationError::MissingSensors));
    }

    #[test]
    fn should_reject_sensors_that_are_not_a_sequence() {
        let result = validate(&payload(json!({
            "type": "car",
            "name": "Valid Car",
            "sensors": { "name": "Battery Level", "value": 1 }
        })));
        assert_eq!(result, Err(ValidationError::MissingSensors));
    }

    #[test]
    fn should_reject_short_sensor_name() {
        let result = validate(&payload(json!({
            "type": "car",
            "name": "Valid Car",
            "sensors": [{ "name": "BL", "value": "90%" }]
        })));
        assert_eq!(result, Err(ValidationError::InvalidSensorName { index: 0 }));
    }

    #[test]
    fn should_reject_null_sensor_value() {
        let result = validate(&payload(json!({
            "type": "car",
            "name": "Valid Car",
            "sensors": [{ "name": "Battery Level", "value": null }]
        })));
        assert_eq!(result, Err(ValidationError::MissingSensorValue { index: 0 }));
    }

    #[test]
    fn should_reject_absent_sensor_value() {
        let result = validate(&payload(json!({
            "type": "car",
            "name": "Valid Car",
            "sensors": [{ "name": "Battery Level" }]
        })));
        assert_eq!(result, Err(ValidationError::MissingSensorValue { index: 0 }));
    }

    #[test]
    fn should_reject_boolean_sensor_value() {
        let result = validate(&payload(json!({
            "type": "car",
            "name": "Valid Car",
            "sensors": [{ "name": "Battery Level", "value": true }]
        })));
        assert_eq!(result, Err(ValidationError::InvalidSensorValue { index: 0 }));
    }

    #[test]
    fn should_check_sensor_name_before_value_and_stop_at_first_bad_sensor() {
        let result = validate(&payload(json!({
            "type": "car",
            "name": "Valid Car",
            "sensors": [
                { "name": "Battery Level", "value": 1 },
                { "name": "x", "value": null },
                { "name": "Tire Pressure" }
            ]
        })));
        assert_eq!(result, Err(ValidationError::InvalidSensorName { index: 1 }));
    }

    #[test]
    fn should_report_value_of_later_sensor_when_earlier_ones_are_valid() {
        let result = validate(&payload(json!({
            "type": "car",
            "name": "Valid Car",
            "sensors": [
                { "name": "Battery Level", "value": 1 },
                { "name": "Tire Pressure" }
            ]
        })));
        assert_eq!(result, Err(ValidationError::MissingSensorValue { index: 1 }));
    }
}
