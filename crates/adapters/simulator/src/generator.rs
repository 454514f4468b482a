//! Random device synthesis.

use rand::Rng;
use rand::distr::Alphanumeric;

use fleetsync_app::readings::random_reading;
use fleetsync_domain::device::{DevicePayload, DeviceType, Sensor};

/// Prefix of every generated device name.
pub const NAME_PREFIX: &str = "Device-";
const NAME_SUFFIX_LEN: usize = 6;

/// Pick one of the known device types uniformly.
pub fn random_device_type<R: Rng>(rng: &mut R) -> DeviceType {
    DeviceType::ALL[rng.random_range(0..DeviceType::ALL.len())]
}

/// `Device-` followed by six random alphanumeric characters.
pub fn random_name<R: Rng>(rng: &mut R) -> String {
    let suffix: String = (0..NAME_SUFFIX_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect();
    format!("{NAME_PREFIX}{suffix}")
}

/// A full create payload: random type, generated name, and one sensor per
/// kind of that type, each with a fresh reading.
pub fn random_payload<R: Rng>(rng: &mut R) -> DevicePayload {
    let device_type = random_device_type(rng);
    let name = random_name(rng);
    let sensors = device_type
        .sensor_kinds()
        .iter()
        .map(|kind| Sensor::new(*kind, random_reading(rng)))
        .collect();
    DevicePayload::new(device_type, name, sensors)
}
