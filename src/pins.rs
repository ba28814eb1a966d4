//! GPIO / peripheral pin assignments for the feeder main board (ESP32).
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Power indicator
// ---------------------------------------------------------------------------

/// On-board LED, lit once init completes.
pub const POWER_LED_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// Front-panel buttons (active-low, internal pull-up)
// ---------------------------------------------------------------------------

/// Button 1: toggle refill mode.
pub const BUTTON_REFILL_GPIO: i32 = 14;
/// Button 2: manual dispense.
pub const BUTTON_FEED_GPIO: i32 = 27;

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// HC-SR04 trigger (output).
pub const ULTRASONIC_TRIG_GPIO: i32 = 5;
/// HC-SR04 echo (input, 5 V tolerant via divider).
pub const ULTRASONIC_ECHO_GPIO: i32 = 18;

/// HC-SR501 PIR output.  HIGH = motion.
pub const PIR_GPIO: i32 = 19;

/// HX711 data out.
pub const HX711_DOUT_GPIO: i32 = 16;
/// HX711 serial clock.
pub const HX711_SCK_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Indicators (digital on/off)
// ---------------------------------------------------------------------------

pub const LED_R_GPIO: i32 = 25;
pub const LED_G_GPIO: i32 = 26;
pub const LED_B_GPIO: i32 = 33;

/// Active buzzer, HIGH = sounding.
pub const BUZZER_GPIO: i32 = 32;

// ---------------------------------------------------------------------------
// Servo
// ---------------------------------------------------------------------------

/// SG90 signal line, LEDC channel 0.
pub const SERVO_GPIO: i32 = 13;
/// Standard hobby-servo frame rate.
pub const SERVO_PWM_FREQ_HZ: u32 = 50;
/// LEDC timer resolution for the servo.  14 bits gives ~1.2 µs steps at 50 Hz.
pub const SERVO_RESOLUTION_BITS: u32 = 14;

// ---------------------------------------------------------------------------
// I²C bus (16x2 LCD behind a PCF8574 backpack)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;
pub const I2C_FREQ_HZ: u32 = 100_000;
pub const LCD_I2C_ADDR: u8 = 0x27;
