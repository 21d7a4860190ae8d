//! Push buttons read through the sysfs GPIO interface.
//!
//! Both buttons are wired active-low: the pin reads `0` while pressed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A digital input.
pub trait Pin {
    /// `true` while the pin is driven low.
    fn is_low(&mut self) -> io::Result<bool>;
}

impl<P: Pin + ?Sized> Pin for Box<P> {
    fn is_low(&mut self) -> io::Result<bool> {
        (**self).is_low()
    }
}

/// A button that could not be opened. Never pressed.
pub struct Unwired;

impl Pin for Unwired {
    fn is_low(&mut self) -> io::Result<bool> {
        Ok(false)
    }
}

/// Opens a sysfs pin, falling back to [`Unwired`] when GPIO is unavailable.
pub fn open_pin(root: &Path, number: u32, name: &str) -> Box<dyn Pin> {
    match SysfsPin::open(root, number) {
        Ok(pin) => Box::new(pin),
        Err(e) => {
            warn!(
                "GPIO {} ({} button) unavailable under {}: {}",
                number,
                name,
                root.display(),
                e
            );
            Box::new(Unwired)
        }
    }
}

/// `/sys/class/gpio/gpioN/value`.
pub struct SysfsPin {
    value_path: PathBuf,
}

impl SysfsPin {
    /// Exports `number` under `root` if needed and configures it as an input.
    pub fn open(root: &Path, number: u32) -> io::Result<Self> {
        let pin_dir = root.join(format!("gpio{number}"));

        if !pin_dir.exists() {
            fs::write(root.join("export"), number.to_string())?;
        }

        let direction = pin_dir.join("direction");
        if let Err(e) = fs::write(&direction, "in") {
            // Some kernels export pins already configured and read-only
            debug!("Could not set {} to input: {}", direction.display(), e);
        }

        Ok(Self {
            value_path: pin_dir.join("value"),
        })
    }
}

impl Pin for SysfsPin {
    fn is_low(&mut self) -> io::Result<bool> {
        let raw = fs::read_to_string(&self.value_path)?;
        Ok(raw.trim() == "0")
    }
}

/// Fires once per press, on the released-to-pressed transition.
pub struct Button<P: Pin> {
    name: &'static str,
    pin: P,
    was_pressed: bool,
    read_failed: bool,
}

impl<P: Pin> Button<P> {
    pub fn new(name: &'static str, pin: P) -> Self {
        Self {
            name,
            pin,
            was_pressed: false,
            read_failed: false,
        }
    }

    /// Returns `true` if the button went down since the last poll.
    /// A pin that cannot be read counts as released.
    pub fn poll(&mut self) -> bool {
        let pressed = match self.pin.is_low() {
            Ok(low) => {
                self.read_failed = false;
                low
            }
            Err(e) => {
                if !self.read_failed {
                    warn!("Failed to read {} button: {}", self.name, e);
                    self.read_failed = true;
                }
                false
            }
        };

        let fired = pressed && !self.was_pressed;
        self.was_pressed = pressed;
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Scripted(VecDeque<io::Result<bool>>);

    impl Pin for Scripted {
        fn is_low(&mut self) -> io::Result<bool> {
            self.0.pop_front().unwrap_or(Ok(false))
        }
    }

    fn script(levels: &[bool]) -> Scripted {
        Scripted(levels.iter().map(|l| Ok(*l)).collect())
    }

    #[test]
    fn test_held_button_fires_once() {
        let mut button = Button::new("left", script(&[false, true, true, true, false, true]));
        let fired: Vec<bool> = (0..6).map(|_| button.poll()).collect();
        assert_eq!(fired, vec![false, true, false, false, false, true]);
    }

    #[test]
    fn test_read_error_counts_as_released() {
        let pin = Scripted(VecDeque::from(vec![
            Ok(true),
            Err(io::Error::other("gone")),
            Ok(true),
        ]));
        let mut button = Button::new("right", pin);
        assert!(button.poll());
        assert!(!button.poll());
        assert!(button.poll());
    }

    #[test]
    fn test_sysfs_pin_reads_active_low() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("gpio11");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("value"), "1\n").unwrap();

        let mut pin = SysfsPin::open(root.path(), 11).unwrap();
        assert!(!pin.is_low().unwrap());

        fs::write(dir.join("value"), "0\n").unwrap();
        assert!(pin.is_low().unwrap());
        assert_eq!(fs::read_to_string(dir.join("direction")).unwrap(), "in");
    }

    #[test]
    fn test_open_pin_falls_back_to_unwired() {
        let mut pin = open_pin(Path::new("/nonexistent/gpio"), 0, "left");
        assert!(!pin.is_low().unwrap());
    }

    #[test]
    fn test_sysfs_pin_exports_missing_pin() {
        let root = tempfile::tempdir().unwrap();
        // No kernel behind this directory, so the export only leaves a trace
        let result = SysfsPin::open(root.path(), 4);
        assert!(result.is_ok());
        assert_eq!(fs::read_to_string(root.path().join("export")).unwrap(), "4");
    }
}
