pub mod capture;
pub mod event_detector;
pub mod frame_alerts;
