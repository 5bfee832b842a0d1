pub mod channel;
pub mod clock;

pub use channel::{CHANNEL_COUNT, Channel};
pub use clock::{Clock, MonotonicClock};

/// Raw weight provider for the load cells, one reading per channel per tick.
///
/// Implementations return calibrated kilograms; calibration itself (scale
/// factor and offset) is the provider's concern.
pub trait WeightSource {
    fn read_kg(
        &mut self,
        channel: Channel,
        timeout: std::time::Duration,
    ) -> Result<f32, Box<dyn std::error::Error + Send + Sync>>;

    /// Whether a sensor is attached on `channel`. Unattached channels are skipped.
    fn is_connected(&self, _channel: Channel) -> bool {
        true
    }
}

impl<T: WeightSource + ?Sized> WeightSource for Box<T> {
    fn read_kg(
        &mut self,
        channel: Channel,
        timeout: std::time::Duration,
    ) -> Result<f32, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_kg(channel, timeout)
    }

    fn is_connected(&self, channel: Channel) -> bool {
        (**self).is_connected(channel)
    }
}
