//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements          | Connects to                   |
//! |-------------|---------------------|-------------------------------|
//! | `hardware`  | SensorPort          | HC-SR04, PIR, hall switch     |
//! |             | ActuatorPort        | Lock servo (LEDC), LEDs       |
//! | `channel`   | NotificationSink    | Outbound queue to transport   |
//! |             | CommandSource       | Rate-limited inbound queue    |
//! | `chat`      | (none)              | Bot update parsing, rendering |
//! | `log_sink`  | NotificationSink    | Serial log output             |
//! | `nvs`       | ConfigPort          | NVS / in-memory store         |
//! | `time`      | (none)              | ESP32 system timer            |

pub mod channel;
pub mod chat;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
