use phf::phf_map;
use std::time::Duration;

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const EVENTS_WS_PATH: &str = "/api/ws/events/v1/";
pub const REST_API_PATH: &str = "/api/rest/v1";
pub const TOKEN_PATH: &str = "/API/IDP/connect/token";
pub const TOKEN_CLIENT_ID: &str = "GrantValidatorClient";

pub const STATUS_SESSION_RESUMED: u16 = 200;
pub const STATUS_SESSION_CREATED: u16 = 201;

/// Server-side window after a disconnect in which a session can still be resumed.
pub const RESUMPTION_WINDOW: Duration = Duration::from_secs(30);
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub const WILDCARD: &str = "*";
pub const UNKNOWN_NAME: &str = "Unknown";

pub const MOTION_STARTED: &str = "6eb95dd6-7ccc-4bce-99f8-af0d0b582d77";
pub const MOTION_STOPPED: &str = "6f55a7a7-d21c-4629-ac18-af1975e395a2";
pub const RECORDING_STARTED: &str = "4577f552-765a-438c-bc7d-e5ff1f754bc3";
pub const RECORDING_STOPPED: &str = "79a94f89-92de-4fca-8a43-5561d407423d";
pub const LIVE_FEED_TERMINATED: &str = "eeda47ff-4f3d-459e-8143-69896c7c74ad";
pub const COMMUNICATION_STARTED: &str = "dd3e6464-7dc0-405a-a92f-6150587563e8";
pub const COMMUNICATION_STOPPED: &str = "0ee90664-2924-42a0-a816-4129d0ecabdc";
pub const COMMUNICATION_ERROR: &str = "a334af1c-4b4b-4957-9e5f-ab8ca07feab6";
pub const COMMUNICATION_HW_STARTED: &str = "0553c396-5e16-4c22-b3d1-f548e42dfbb4";
pub const COMMUNICATION_HW_STOPPED: &str = "63ea1f06-5a83-4f39-9fab-49959fde7b66";
pub const COMMUNICATION_HW_ERROR: &str = "6baad64b-c395-4f52-b6a3-dd1b64aa2f0f";
pub const OUTPUT_ACTIVATED: &str = "7a78f5bb-d8c3-4997-89b7-cae72713b7db";
pub const OUTPUT_DEACTIVATED: &str = "35742498-bcc5-4f0a-9800-827c9388d1cd";

// Subset of the event types exposed by `GET /api/rest/v1/eventTypes/`.
pub static EVENT_TYPES: phf::Map<&'static str, &'static str> = phf_map! {
    "motion_started" => MOTION_STARTED,
    "motion_stopped" => MOTION_STOPPED,
    "recording_started" => RECORDING_STARTED,
    "recording_stopped" => RECORDING_STOPPED,
    "live_feed_terminated" => LIVE_FEED_TERMINATED,
    "communication_started" => COMMUNICATION_STARTED,
    "communication_stopped" => COMMUNICATION_STOPPED,
    "communication_error" => COMMUNICATION_ERROR,
    "communication_hw_started" => COMMUNICATION_HW_STARTED,
    "communication_hw_stopped" => COMMUNICATION_HW_STOPPED,
    "communication_hw_error" => COMMUNICATION_HW_ERROR,
    "output_activated" => OUTPUT_ACTIVATED,
    "output_deactivated" => OUTPUT_DEACTIVATED,
};

/// Event type id for one of the well-known names above, e.g. `motion_started`.
pub fn event_type_id(name: &str) -> Option<&'static str> {
    EVENT_TYPES.get(name).copied()
}
