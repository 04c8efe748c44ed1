pub mod file_capture_sink;
