//! Integration tests: exercise the full flow against a simulated mouse.
//!
//! These tests drive a complete simulated Ragnok 2 — settings flash,
//! battery, firmware ack rules — through the public session API, checking
//! both what the driver reports and what actually landed in the device.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::thread;

    use crate::error::Error;
    use crate::macros::{self, MacroDefinition};
    use crate::monitor::StatusMonitor;
    use crate::protocol::regs;
    use crate::session::{Session, SessionState};
    use crate::settings::{BatteryLevel, PollingRate, Rgb, SleepState, Toggle};
    use crate::transport::mock::{Fault, MockDevice};

    /// Open a session over a simulated mouse and drop connect-time traffic
    /// from its write log.
    fn connect(dev: &MockDevice) -> Session {
        let session = Session::with_transport(Box::new(dev.clone())).unwrap();
        dev.clear_writes();
        session
    }

    /// Full DPI cycle: read factory value, write, re-read from the device.
    #[test]
    fn full_dpi_cycle() {
        let dev = MockDevice::new();
        let mut session = connect(&dev);

        assert_eq!(session.read_dpi().unwrap(), 800);
        session.set_dpi(1600).unwrap();
        assert_eq!(session.read_dpi().unwrap(), 1600);
        assert_eq!(dev.flash_at(regs::DPI_LEVEL_BASE, 3), vec![16, 16, 0]);

        // Switching levels changes the active DPI without losing slot 0.
        assert_eq!(session.set_dpi_level(2).unwrap(), 1600);
        session.set_dpi(3200).unwrap();
        assert_eq!(session.read_dpi().unwrap(), 3200);
        assert_eq!(session.set_dpi_level(0).unwrap(), 1600);
    }

    /// A step violation fails end to end: no frame reaches the device and
    /// both cache and flash keep the previous value.
    #[test]
    fn dpi_step_violation_changes_nothing() {
        let dev = MockDevice::new();
        let mut session = connect(&dev);

        session.set_dpi(800).unwrap();
        dev.clear_writes();

        assert!(matches!(
            session.set_dpi(825),
            Err(Error::Misaligned { value: 825, .. })
        ));
        assert_eq!(dev.write_count(), 0);
        assert_eq!(dev.flash_at(regs::DPI_LEVEL_BASE, 1), vec![8]);
        assert_eq!(session.settings().dpi, Some(800));
        assert_eq!(session.read_dpi().unwrap(), 800);
    }

    /// Applying the same LED mode twice is idempotent: same flash state,
    /// same snapshot, and the device never rejects the repeat.
    #[test]
    fn led_mode_reapplication_is_idempotent() {
        let dev = MockDevice::new();
        let mut session = connect(&dev);

        session.set_led_mode(3, None).unwrap();
        let first_flash = dev.flash_at(regs::LED_CONFIG, 6);
        let first_snapshot = session.settings().led;

        session.set_led_mode(3, None).unwrap();
        assert_eq!(dev.flash_at(regs::LED_CONFIG, 6), first_flash);
        assert_eq!(session.settings().led, first_snapshot);
        assert_eq!(first_snapshot.map(|l| l.mode.get()), Some(3));
    }

    /// Program a typing macro, read it back, and check the stored image
    /// byte for byte.
    #[test]
    fn macro_program_and_readback() {
        let dev = MockDevice::new();
        let mut session = connect(&dev);

        let def = MacroDefinition::from_text("gg", 20, 30).unwrap();
        session.set_button4_macro(&def).unwrap();

        let expected = macros::encode_slot(macros::BUTTON4_SLOT_NAME, &def).unwrap();
        assert_eq!(
            dev.flash_at(regs::MACRO_BUTTON4, expected.len()),
            expected
        );
        assert_eq!(dev.flash_at(regs::BUTTON4_BINDING, 1), vec![1]);

        let info = session.button4_macro_info().unwrap();
        assert_eq!(info.name, "BTN4");
        assert_eq!(info.events, 4);
        assert!(info.checksum_ok);

        let stored = dev.flash_at(
            regs::MACRO_BUTTON4 + macros::HEADER_LEN as u16,
            def.len() * macros::EVENT_LEN,
        );
        assert_eq!(macros::decode_events(&stored), def.events);
    }

    /// A transfer that dies mid-events leaves the old header in place, so
    /// the stored checksum no longer matches and the slot reads back
    /// disarmed instead of half-programmed.
    #[test]
    fn interrupted_macro_write_leaves_slot_disarmed() {
        let dev = MockDevice::new();
        let mut session = connect(&dev);

        let old = MacroDefinition::from_text("aaaa", 20, 30).unwrap();
        session.set_button4_macro(&old).unwrap();
        assert!(session.button4_macro_info().unwrap().checksum_ok);

        // New transfer: let two event frames land, then starve frame three
        // through all of its retries.
        let new = MacroDefinition::from_text("zzzz", 20, 30).unwrap();
        dev.fail_next_n(Fault::Pass, 2);
        dev.fail_next_n(Fault::Timeout, 3);
        assert!(matches!(
            session.set_button4_macro(&new),
            Err(Error::DeviceUnresponsive { .. })
        ));

        // Link survived, binding untouched, and the mixed slot contents no
        // longer pass the stored checksum.
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(dev.flash_at(regs::BUTTON4_BINDING, 1), vec![1]);
        let info = session.button4_macro_info().unwrap();
        assert_eq!(info.name, "BTN4");
        assert!(!info.checksum_ok);
    }

    /// Configure everything, then reconnect from scratch: a fresh session
    /// must read the same state back out of the flash.
    #[test]
    fn settings_survive_reconnect() {
        let dev = MockDevice::new();
        let mut session = connect(&dev);

        session.set_dpi(1600).unwrap();
        session.set_polling_rate(250).unwrap();
        session.set_toggle(Toggle::RippleControl, true).unwrap();
        session.set_toggle(Toggle::MotionSync, true).unwrap();
        session
            .set_led_mode(2, Some(Rgb::new(0x00, 0xCC, 0x44)))
            .unwrap();
        session.set_led_levels(Some(7), Some(2)).unwrap();
        let def = MacroDefinition::from_text("hi", 20, 30).unwrap();
        session.set_button4_macro(&def).unwrap();
        session
            .set_keyboard_macro(0x3A, &MacroDefinition::from_text("ok", 20, 30).unwrap())
            .unwrap();
        session.disconnect();

        let fresh = connect(&dev);
        let s = fresh.settings();
        assert_eq!(s.dpi, Some(1600));
        assert_eq!(s.polling_rate, Some(PollingRate::Hz250));
        assert_eq!(s.ripple_control, Some(true));
        assert_eq!(s.angle_snap, Some(false));
        assert_eq!(s.motion_sync, Some(true));
        let led = s.led.unwrap();
        assert_eq!(led.mode.get(), 2);
        assert_eq!(led.color, Rgb::new(0x00, 0xCC, 0x44));
        assert_eq!(led.brightness, 7);
        assert_eq!(led.speed, 2);
        assert_eq!(s.button4_macro, Some(true));
        assert_eq!(s.macro_triggers, Some([0x3A, 0, 0, 0]));
    }

    /// Every supported polling rate round-trips through its divider byte.
    #[test]
    fn all_polling_rates_apply() {
        let dev = MockDevice::new();
        let mut session = connect(&dev);

        for rate in PollingRate::ALL {
            session.set_polling_rate(rate.as_hz()).unwrap();
            assert_eq!(
                dev.flash_at(regs::POLLING_DIVIDER, 1),
                vec![rate.divider()]
            );
            assert_eq!(session.settings().polling_rate, Some(rate));
        }
        assert!(session.set_polling_rate(750).is_err());
    }

    /// Battery monitoring across the sleep cycle, including an I/O loss.
    #[test]
    fn battery_monitoring_lifecycle() {
        let dev = MockDevice::new();
        dev.set_battery(64, false);
        let mut session = connect(&dev);
        let mut monitor = StatusMonitor::new();

        let status = monitor.poll(&mut session);
        assert_eq!(status.level, BatteryLevel::Percent(64));
        assert_eq!(status.sleep, SleepState::Awake);

        // Radio idles out: every retry times out, read as asleep.
        dev.fail_next_n(Fault::Timeout, 3);
        let status = monitor.poll(&mut session);
        assert_eq!(status.level, BatteryLevel::Unknown);
        assert_eq!(status.sleep, SleepState::Asleep);

        // Cable yanked: I/O error degrades to fully unknown.
        dev.fail_next(Fault::Io);
        let status = monitor.poll(&mut session);
        assert_eq!(status.level, BatteryLevel::Unknown);
        assert_eq!(status.sleep, SleepState::Unknown);
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    /// A shared session stays coherent under concurrent use.
    #[test]
    fn concurrent_session_access() {
        let dev = MockDevice::new();
        let session = Arc::new(Mutex::new(connect(&dev)));

        let mut handles = vec![];
        for _ in 0..4 {
            let session = Arc::clone(&session);
            handles.push(thread::spawn(move || {
                let report = session.lock().unwrap().read_battery().unwrap();
                assert_eq!(report.percent, 90);
            }));
        }
        for h in handles {
            h.join().expect("thread panicked");
        }
    }

    /// Concurrent configuration and monitoring don't corrupt each other.
    #[test]
    fn concurrent_config_and_monitoring() {
        let dev = MockDevice::new();
        let session = Arc::new(Mutex::new(connect(&dev)));

        let writer = {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                for dpi in [400, 800, 1600] {
                    session.lock().unwrap().set_dpi(dpi).unwrap();
                }
            })
        };
        let poller = {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                let mut monitor = StatusMonitor::with_interval(std::time::Duration::ZERO);
                for _ in 0..5 {
                    let status = monitor.poll(&mut session.lock().unwrap());
                    assert_eq!(status.sleep, SleepState::Awake);
                }
            })
        };

        writer.join().expect("writer panicked");
        poller.join().expect("poller panicked");
        assert_eq!(session.lock().unwrap().read_dpi().unwrap(), 1600);
    }
}
