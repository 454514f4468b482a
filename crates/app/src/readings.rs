//! Synthetic sensor readings shared by the simulator and the broadcaster.

use std::ops::RangeInclusive;

use rand::Rng;

use fleetsync_domain::device::{Sensor, SensorValue};

/// Inclusive range of every synthetic reading.
pub const READING_RANGE: RangeInclusive<i64> = 0..=100;

/// Draw one reading from [`READING_RANGE`].
pub fn random_reading<R: Rng>(rng: &mut R) -> SensorValue {
    SensorValue::Int(rng.random_range(READING_RANGE))
}

/// Copy `sensors`, giving each a fresh reading and keeping names and order.
pub fn randomize<R: Rng>(sensors: &[Sensor], rng: &mut R) -> Vec<Sensor> {
    sensors
        .iter()
        .map(|sensor| Sensor::new(sensor.name.clone(), random_reading(rng)))
        .collect()
}
