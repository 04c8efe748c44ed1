pub mod domain;
pub mod infrastructure;
pub mod monitor_session;
pub mod monitor_stream_use_case;
pub mod pipeline_logger;
