//! Mock construction helpers

use std::thread::JoinHandle;
use utm_rs::backend::{FrontendReceiver, MockDeviceHandle, MockUtmDevice, UtmBackend};
use utm_rs::config::AppConfig;
use utm_rs::controller::{PresentationAdapter, UtmController};
use utm_rs::{Sample, SampleGeometry};

/// Adapter that records every notification
#[derive(Debug, Default)]
pub struct RecordingAdapter {
    pub appended: Vec<Sample>,
    pub resets: usize,
    pub geometries: Vec<SampleGeometry>,
}

impl PresentationAdapter for RecordingAdapter {
    fn on_sample_appended(&mut self, sample: &Sample) {
        self.appended.push(*sample);
    }

    fn on_reset(&mut self) {
        self.resets += 1;
    }

    fn on_geometry_changed(&mut self, geometry: &SampleGeometry, _samples: &[Sample]) {
        self.geometries.push(*geometry);
    }
}

/// Configuration with a short idle sleep for fast tests
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.acquisition.idle_sleep_ms = 1;
    config
}

/// Spawn a backend thread around the given device
pub fn spawn_backend(device: MockUtmDevice) -> (JoinHandle<()>, FrontendReceiver) {
    let (backend, frontend) = UtmBackend::with_link(test_config(), Box::new(device));
    let handle = std::thread::spawn(move || backend.run());
    (handle, frontend)
}

/// Spawn a backend over a scripted mock device and wrap it in a controller
pub fn spawn_controller() -> (
    JoinHandle<()>,
    UtmController<RecordingAdapter>,
    MockDeviceHandle,
) {
    let device = MockUtmDevice::new();
    let device_handle = device.handle();
    let (handle, frontend) = spawn_backend(device);
    let controller = UtmController::new(frontend, RecordingAdapter::default(), &test_config());
    (handle, controller, device_handle)
}
