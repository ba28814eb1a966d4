//! Character LCD adapter.
//!
//! Implements [`DisplayPort`] over `hd44780-driver` on a PCF8574 I²C
//! backpack.  Bus errors are logged once per failure streak and otherwise
//! ignored: the panel is informational only.

use embedded_hal_0_2::blocking::delay::{DelayMs, DelayUs};
use embedded_hal_0_2::blocking::i2c::Write;
use hd44780_driver::bus::I2CBus;
use hd44780_driver::{Cursor, CursorBlink, Display, DisplayMode, HD44780};
use heapless::String;
use log::{info, warn};

use crate::app::ports::DisplayPort;
use crate::display::{DisplayFrame, COLS};

/// DDRAM address of the first column of each row.
const ROW_ADDR: [u8; 2] = [0x00, 0x40];

pub struct LcdDisplay<I: Write, D> {
    lcd: Option<HD44780<I2CBus<I>>>,
    delay: D,
    last: Option<DisplayFrame>,
    failing: bool,
}

impl<I, D> LcdDisplay<I, D>
where
    I: Write,
    D: DelayUs<u16> + DelayMs<u8>,
{
    pub fn new(i2c: I, addr: u8, mut delay: D) -> Self {
        let lcd = HD44780::new_i2c(i2c, addr, &mut delay).and_then(|mut lcd| {
            lcd.set_display_mode(
                DisplayMode {
                    display: Display::On,
                    cursor_visibility: Cursor::Invisible,
                    cursor_blink: CursorBlink::Off,
                },
                &mut delay,
            )?;
            lcd.clear(&mut delay)?;
            Ok(lcd)
        });
        let lcd = match lcd {
            Ok(lcd) => {
                info!("Display: ready at 0x{:02X}", addr);
                Some(lcd)
            }
            Err(e) => {
                warn!("Display: LCD did not answer at init ({:?})", e);
                None
            }
        };
        Self {
            lcd,
            delay,
            last: None,
            failing: false,
        }
    }
}

impl<I, D> DisplayPort for LcdDisplay<I, D>
where
    I: Write,
    D: DelayUs<u16> + DelayMs<u8>,
{
    fn show(&mut self, frame: &DisplayFrame) {
        let Some(lcd) = self.lcd.as_mut() else {
            return;
        };
        if self.last.as_ref() == Some(frame) {
            return;
        }

        let result = write_frame(lcd, &mut self.delay, frame);
        match result {
            Ok(()) => {
                if self.failing {
                    info!("Display: bus recovered");
                }
                self.failing = false;
                self.last = Some(frame.clone());
            }
            Err(e) => {
                if !self.failing {
                    warn!("Display: write failed ({:?})", e);
                }
                self.failing = true;
                self.last = None;
            }
        }
    }
}

/// Frames are pre-padded, so rows are overwritten without a clear.
fn write_frame<I, D>(lcd: &mut HD44780<I2CBus<I>>, delay: &mut D, frame: &DisplayFrame) -> hd44780_driver::error::Result<()>
where
    I: Write,
    D: DelayUs<u16> + DelayMs<u8>,
{
    for (row, line) in frame.lines().iter().enumerate() {
        lcd.set_cursor_pos(ROW_ADDR[row], delay)?;
        lcd.write_str(&printable(line), delay)?;
    }
    Ok(())
}

/// Characters outside printable ASCII diverge in the HD44780 ROM; show '?'.
fn printable(line: &str) -> String<COLS> {
    line.chars()
        .take(COLS)
        .map(|c| if (' '..='~').contains(&c) { c } else { '?' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct BusLog {
        writes: Vec<(u8, Vec<u8>)>,
        failing: bool,
    }

    #[derive(Clone, Default)]
    struct Bus(Rc<RefCell<BusLog>>);

    impl Bus {
        fn writes(&self) -> usize {
            self.0.borrow().writes.len()
        }

        fn set_failing(&self, failing: bool) {
            self.0.borrow_mut().failing = failing;
        }
    }

    impl Write for Bus {
        type Error = ();

        fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), ()> {
            let mut log = self.0.borrow_mut();
            if log.failing {
                return Err(());
            }
            log.writes.push((address, bytes.to_vec()));
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayUs<u16> for NoDelay {
        fn delay_us(&mut self, _us: u16) {}
    }

    impl DelayMs<u8> for NoDelay {
        fn delay_ms(&mut self, _ms: u8) {}
    }

    fn frame(a: &str, b: &str) -> DisplayFrame {
        let mut f = DisplayFrame::default();
        f.line1.push_str(a).unwrap();
        f.line2.push_str(b).unwrap();
        f
    }

    #[test]
    fn init_talks_to_configured_address() {
        let bus = Bus::default();
        let _lcd = LcdDisplay::new(bus.clone(), 0x27, NoDelay);
        let log = bus.0.borrow();
        assert!(!log.writes.is_empty());
        assert!(log.writes.iter().all(|(addr, _)| *addr == 0x27));
    }

    #[test]
    fn unchanged_frame_is_not_rewritten() {
        let bus = Bus::default();
        let mut lcd = LcdDisplay::new(bus.clone(), 0x27, NoDelay);
        let after_init = bus.writes();

        let f = frame("Pet Feeder Ready", "Bowl: 5.0g      ");
        lcd.show(&f);
        let after_first = bus.writes();
        assert!(after_first > after_init);

        lcd.show(&f);
        assert_eq!(bus.writes(), after_first);

        lcd.show(&frame("Pet Feeder Ready", "Bowl: 6.0g      "));
        assert!(bus.writes() > after_first);
    }

    #[test]
    fn dead_bus_never_panics() {
        let bus = Bus::default();
        bus.set_failing(true);
        let mut lcd = LcdDisplay::new(bus.clone(), 0x27, NoDelay);
        lcd.show(&frame("Pet Feeder Ready", "Bowl: 5.0g      "));
        assert_eq!(bus.writes(), 0);
    }

    #[test]
    fn recovers_after_bus_glitch() {
        let bus = Bus::default();
        let mut lcd = LcdDisplay::new(bus.clone(), 0x27, NoDelay);
        bus.set_failing(true);
        lcd.show(&frame("Pet Feeder Ready", "Bowl: 5.0g      "));
        bus.set_failing(false);
        let before = bus.writes();
        lcd.show(&frame("Pet Feeder Ready", "Bowl: 7.0g      "));
        assert!(bus.writes() > before);
    }

    #[test]
    fn non_ascii_replaced() {
        assert_eq!(printable("5°C").as_str(), "5?C");
        assert_eq!(printable("0123456789abcdefXYZ").as_str(), "0123456789abcdef");
    }
}
