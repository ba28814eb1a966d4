//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements          | Connects to                   |
//! |-------------|---------------------|-------------------------------|
//! | `hardware`  | SensorPort          | HC-SR04, HX711, PIR           |
//! |             | ActuatorPort        | Servo (LEDC)                  |
//! |             | IndicatorPort       | RGB LED, buzzer               |
//! | `display`   | DisplayPort         | HD44780 over PCF8574 I²C      |
//! | `log_sink`  | EventSink           | Serial log output             |
//! | `time`      | ClockPort           | System time (SNTP-set)        |
//! | `mqtt`      | MessagePublisher    | ESP-IDF WiFi STA + MQTT       |

pub mod display;
pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod time;
