// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::platform::BoardPaths;
use log::{debug, warn};
use std::{
    fmt, fs, io,
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

/// Line direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::In => write!(f, "in"),
            Direction::Out => write!(f, "out"),
        }
    }
}

/// Electrical level that powers the sensor on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    High,
    Low,
}

impl Level {
    pub fn value(self) -> bool {
        self == Level::High
    }

    pub fn inverse(self) -> Level {
        match self {
            Level::High => Level::Low,
            Level::Low => Level::High,
        }
    }
}

/// Access to GPIO lines by number.
pub trait GpioBackend {
    fn export(&self, line: u32) -> io::Result<()>;
    fn unexport(&self, line: u32) -> io::Result<()>;
    /// The export side effect (the per-line directory) is visible.
    fn is_exported(&self, line: u32) -> bool;
    fn set_direction(&self, line: u32, direction: Direction) -> io::Result<()>;
    fn set_value(&self, line: u32, value: bool) -> io::Result<()>;
}

/// GPIO through the legacy `/sys/class/gpio` interface.
#[derive(Debug, Clone)]
pub struct SysfsGpio {
    root: PathBuf,
    /// udev may still be fixing permissions on a freshly exported line, so
    /// opening `direction` is retried for this long.
    direction_timeout: Duration,
}

impl SysfsGpio {
    pub fn new(paths: &BoardPaths) -> Self {
        SysfsGpio {
            root: paths.gpio.clone(),
            direction_timeout: Duration::from_millis(100),
        }
    }

    fn line_dir(&self, line: u32) -> PathBuf {
        self.root.join(format!("gpio{}", line))
    }
}

impl Default for SysfsGpio {
    fn default() -> Self {
        SysfsGpio::new(&BoardPaths::default())
    }
}

impl GpioBackend for SysfsGpio {
    fn export(&self, line: u32) -> io::Result<()> {
        fs::write(self.root.join("export"), line.to_string())
    }

    fn unexport(&self, line: u32) -> io::Result<()> {
        fs::write(self.root.join("unexport"), line.to_string())
    }

    fn is_exported(&self, line: u32) -> bool {
        self.line_dir(line).exists()
    }

    fn set_direction(&self, line: u32, direction: Direction) -> io::Result<()> {
        let path = self.line_dir(line).join("direction");
        let start = Instant::now();
        loop {
            match fs::write(&path, direction.to_string()) {
                Ok(()) => return Ok(()),
                Err(err) if start.elapsed() >= self.direction_timeout => return Err(err),
                Err(_) => thread::sleep(Duration::from_millis(1)),
            }
        }
    }

    fn set_value(&self, line: u32, value: bool) -> io::Result<()> {
        let value = if value { "1" } else { "0" };
        fs::write(self.line_dir(line).join("value"), value)
    }
}

/// Delays of the power sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerTiming {
    /// Delay after setting the direction and after every level change.
    pub settle: Duration,
    /// Longest wait for the export to show up.
    pub export_timeout: Duration,
    /// Interval between export checks.
    pub export_poll: Duration,
}

impl Default for PowerTiming {
    fn default() -> Self {
        PowerTiming {
            settle: Duration::from_millis(30),
            export_timeout: Duration::from_millis(100),
            export_poll: Duration::from_millis(10),
        }
    }
}

impl PowerTiming {
    /// No delays, for backends that need no settling.
    pub fn immediate() -> Self {
        PowerTiming {
            settle: Duration::ZERO,
            export_timeout: Duration::ZERO,
            export_poll: Duration::ZERO,
        }
    }
}

/// Power-cycles a sensor through one GPIO line.
///
/// The sequence mirrors the sensor driver's own power-on: export, wait for
/// the export, direction out, then active, inactive, active with a settle
/// delay after each step, then unexport. Asking for the same line twice in
/// a row is a no-op.
#[derive(Debug)]
pub struct PowerSequencer<G> {
    backend: G,
    timing: PowerTiming,
    last_line: Option<u32>,
}

impl<G: GpioBackend> PowerSequencer<G> {
    pub fn new(backend: G, timing: PowerTiming) -> Self {
        PowerSequencer {
            backend,
            timing,
            last_line: None,
        }
    }

    pub fn backend(&self) -> &G {
        &self.backend
    }

    /// Line sequenced by the last successful [`PowerSequencer::apply`].
    pub fn last_line(&self) -> Option<u32> {
        self.last_line
    }

    /// Forget the last line so the next request always runs.
    pub fn reset(&mut self) {
        self.last_line = None;
    }

    /// Run the power sequence on `line` with `active` as the on level.
    pub fn apply(&mut self, line: u32, active: Level) -> io::Result<()> {
        if self.last_line == Some(line) {
            debug!("gpio {} already sequenced", line);
            return Ok(());
        }

        self.backend.export(line)?;

        if let Err(err) = self.drive(line, active) {
            if let Err(unexport_err) = self.backend.unexport(line) {
                warn!("failed to unexport gpio {}: {}", line, unexport_err);
            }
            return Err(err);
        }

        self.backend.unexport(line)?;
        self.last_line = Some(line);
        debug!("gpio {} power sequenced active {:?}", line, active);
        Ok(())
    }

    fn drive(&self, line: u32, active: Level) -> io::Result<()> {
        self.wait_for_export(line)?;

        self.backend.set_direction(line, Direction::Out)?;
        thread::sleep(self.timing.settle);

        for level in [active, active.inverse(), active] {
            self.backend.set_value(line, level.value())?;
            thread::sleep(self.timing.settle);
        }

        Ok(())
    }

    fn wait_for_export(&self, line: u32) -> io::Result<()> {
        let start = Instant::now();
        loop {
            if self.backend.is_exported(line) {
                return Ok(());
            }
            if start.elapsed() >= self.timing.export_timeout {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("gpio {} not exported after {:?}", line, self.timing.export_timeout),
                ));
            }
            thread::sleep(self.timing.export_poll);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::{cell::RefCell, collections::HashSet};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum GpioOp {
        Export(u32),
        Unexport(u32),
        Direction(u32, Direction),
        Value(u32, bool),
    }

    /// Backend recording every operation in order.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingGpio {
        pub(crate) ops: RefCell<Vec<GpioOp>>,
        pub(crate) exported: RefCell<HashSet<u32>>,
        /// Lines whose export never appears.
        pub(crate) stuck: HashSet<u32>,
        /// Lines whose value writes fail.
        pub(crate) broken: HashSet<u32>,
    }

    impl RecordingGpio {
        pub(crate) fn values(&self, line: u32) -> Vec<bool> {
            self.ops
                .borrow()
                .iter()
                .filter_map(|op| match op {
                    GpioOp::Value(l, v) if *l == line => Some(*v),
                    _ => None,
                })
                .collect()
        }
    }

    impl GpioBackend for RecordingGpio {
        fn export(&self, line: u32) -> io::Result<()> {
            self.ops.borrow_mut().push(GpioOp::Export(line));
            if !self.stuck.contains(&line) {
                self.exported.borrow_mut().insert(line);
            }
            Ok(())
        }

        fn unexport(&self, line: u32) -> io::Result<()> {
            self.ops.borrow_mut().push(GpioOp::Unexport(line));
            self.exported.borrow_mut().remove(&line);
            Ok(())
        }

        fn is_exported(&self, line: u32) -> bool {
            self.exported.borrow().contains(&line)
        }

        fn set_direction(&self, line: u32, direction: Direction) -> io::Result<()> {
            self.ops.borrow_mut().push(GpioOp::Direction(line, direction));
            Ok(())
        }

        fn set_value(&self, line: u32, value: bool) -> io::Result<()> {
            if self.broken.contains(&line) {
                return Err(io::Error::from_raw_os_error(libc::EIO));
            }
            self.ops.borrow_mut().push(GpioOp::Value(line, value));
            Ok(())
        }
    }

    #[test]
    fn test_sequence_order_active_high() {
        let mut seq = PowerSequencer::new(RecordingGpio::default(), PowerTiming::immediate());
        seq.apply(381, Level::High).unwrap();

        assert_eq!(
            *seq.backend().ops.borrow(),
            vec![
                GpioOp::Export(381),
                GpioOp::Direction(381, Direction::Out),
                GpioOp::Value(381, true),
                GpioOp::Value(381, false),
                GpioOp::Value(381, true),
                GpioOp::Unexport(381),
            ]
        );
        assert_eq!(seq.last_line(), Some(381));
    }

    #[test]
    fn test_sequence_order_active_low() {
        let mut seq = PowerSequencer::new(RecordingGpio::default(), PowerTiming::immediate());
        seq.apply(12, Level::Low).unwrap();
        assert_eq!(seq.backend().values(12), vec![false, true, false]);
    }

    #[test]
    fn test_repeat_line_is_noop() {
        let mut seq = PowerSequencer::new(RecordingGpio::default(), PowerTiming::immediate());
        seq.apply(5, Level::High).unwrap();
        seq.apply(5, Level::High).unwrap();
        assert_eq!(seq.backend().values(5).len(), 3);

        seq.apply(6, Level::High).unwrap();
        seq.apply(5, Level::High).unwrap();
        assert_eq!(seq.backend().values(5).len(), 6);
    }

    #[test]
    fn test_export_timeout_unexports() {
        let backend = RecordingGpio {
            stuck: [7].into_iter().collect(),
            ..Default::default()
        };
        let mut seq = PowerSequencer::new(backend, PowerTiming::immediate());
        let err = seq.apply(7, Level::High).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert_eq!(
            seq.backend().ops.borrow().last(),
            Some(&GpioOp::Unexport(7))
        );
        assert_eq!(seq.last_line(), None);
    }

    #[test]
    fn test_value_failure_unexports() {
        let backend = RecordingGpio {
            broken: [9].into_iter().collect(),
            ..Default::default()
        };
        let mut seq = PowerSequencer::new(backend, PowerTiming::immediate());
        assert!(seq.apply(9, Level::High).is_err());
        assert_eq!(
            seq.backend().ops.borrow().last(),
            Some(&GpioOp::Unexport(9))
        );
        assert!(!seq.backend().is_exported(9));
        assert_eq!(seq.last_line(), None);
    }

    #[test]
    fn test_sysfs_backend() {
        let dir = TempDir::new().unwrap();
        let paths = BoardPaths::with_root(dir.path());
        let line_dir = paths.gpio.join("gpio42");
        fs::create_dir_all(&line_dir).unwrap();

        let gpio = SysfsGpio::new(&paths);
        gpio.export(42).unwrap();
        assert_eq!(fs::read_to_string(paths.gpio.join("export")).unwrap(), "42");
        assert!(gpio.is_exported(42));
        assert!(!gpio.is_exported(43));

        gpio.set_direction(42, Direction::Out).unwrap();
        gpio.set_value(42, true).unwrap();
        assert_eq!(fs::read_to_string(line_dir.join("direction")).unwrap(), "out");
        assert_eq!(fs::read_to_string(line_dir.join("value")).unwrap(), "1");

        gpio.unexport(42).unwrap();
        assert_eq!(fs::read_to_string(paths.gpio.join("unexport")).unwrap(), "42");
    }
}
