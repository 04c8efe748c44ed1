/// Name reported for faces that match no reference identity.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Minimum seconds between two notifications of the same alert kind.
pub const DEFAULT_ALERT_COOLDOWN_SECS: f64 = 15.0;

/// Euclidean embedding distance below which a face counts as recognized.
pub const DEFAULT_IDENTITY_MATCH_THRESHOLD: f64 = 0.8;

pub const DEFAULT_LOITERING_THRESHOLD_SECS: f64 = 10.0;
pub const DEFAULT_CROWD_THRESHOLD: usize = 60;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.15;
pub const DEFAULT_TRESPASSING_ZONE: [f64; 4] = [200.0, 300.0, 300.0, 350.0];

/// Per-track history samples kept before the oldest are dropped.
pub const DEFAULT_MAX_SAMPLES_PER_TRACK: usize = 300;

/// Stream seconds a track may go unseen before its history is evicted.
pub const DEFAULT_IDLE_EVICTION_SECS: f64 = 60.0;

/// Max frames a track can be lost before removal (~1 second at 30 fps).
pub const TRACKER_MAX_AGE: usize = 30;

/// Consecutive hits before a new track is reported as confirmed.
pub const TRACKER_N_INIT: usize = 1;

/// Frame rate assumed when a recorded stream carries no timestamps.
pub const DEFAULT_FPS: f64 = 30.0;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const TELEGRAM_CHAT_ENV: &str = "TELEGRAM_CHAT_ID";
pub const NOTIFY_TIMEOUT_SECS: u64 = 5;
