use crate::config::Config;
use crate::display::{Display, Framebuffer};
use crate::error::Chip8Error;
use crate::input::Keypad;
use crate::interpreter::Chip8Interpreter;
use crate::scheduler::{Clock, Scheduler, StopSignal};
use crate::sound::Sound;
use std::io;
use std::sync::Arc;

/// Load `rom` and run it until `stop` is raised, the configured run time
/// passes, or the program faults. Hands back the final frame.
///
/// The tone and the display are shut down on every way out, including a
/// program that never loads. A fault in the program is reported ahead of any
/// failure to shut down.
pub fn run<C: Clock>(
    config: &Config,
    rom: &mut impl io::Read,
    display: &mut dyn Display,
    keypad: Arc<Keypad>,
    sound: &mut dyn Sound,
    clock: C,
    stop: &StopSignal,
) -> Result<Framebuffer, Chip8Error> {
    let mut interpreter = Chip8Interpreter::new(display, keypad, sound);
    interpreter.configure(config);

    let outcome = load_and_run(&mut interpreter, config, rom, clock, stop);
    let closed = interpreter.shutdown();
    outcome?;
    closed?;
    Ok(interpreter.framebuffer().clone())
}

fn load_and_run<C: Clock>(
    interpreter: &mut Chip8Interpreter,
    config: &Config,
    rom: &mut impl io::Read,
    clock: C,
    stop: &StopSignal,
) -> Result<(), Chip8Error> {
    interpreter.load_program(rom)?;
    Scheduler::new(clock, config.instruction_hz)
        .with_limit(config.run_for)
        .run(interpreter, stop)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DummyDisplay;
    use crate::scheduler::{ManualClock, SystemClock};
    use crate::sound::Mute;
    use std::thread;
    use std::time::Duration;

    const DIGIT_ZERO_TEXT: &str = "oooo\no  o\no  o\no  o\noooo\n";

    fn program(words: &[u16]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_be_bytes()).collect()
    }

    /// clear, draw the 0 glyph, then spin on a jump to self
    fn draw_zero_forever() -> Vec<u8> {
        program(&[0x00e0, 0xa050, 0xd015, 0x1206])
    }

    /// virtual clock that raises `stop` once time passes `at`
    struct StopAt {
        inner: ManualClock,
        at: Duration,
        stop: StopSignal,
    }

    impl Clock for StopAt {
        fn now(&self) -> Duration {
            self.inner.now()
        }

        fn sleep_until(&self, deadline: Duration) {
            self.inner.sleep_until(deadline);
            if self.inner.now() >= self.at {
                self.stop.stop();
            }
        }
    }

    /// display whose shutdown always fails
    struct StuckDisplay;

    impl Display for StuckDisplay {
        fn clear(&mut self) -> Result<(), io::Error> {
            Ok(())
        }

        fn set_pixel(&mut self, _x: usize, _y: usize) -> Result<(), io::Error> {
            Ok(())
        }

        fn draw(&mut self) -> Result<(), io::Error> {
            Ok(())
        }

        fn stop(&mut self) -> Result<(), io::Error> {
            Err(io::Error::new(io::ErrorKind::Other, "terminal went away"))
        }
    }

    #[test]
    fn test_stop_shuts_down_and_keeps_last_frame() {
        let stop = StopSignal::new();
        let clock = StopAt {
            inner: ManualClock::new(),
            at: Duration::from_millis(100),
            stop: stop.clone(),
        };
        let mut display = DummyDisplay::new();
        let mut sound = Mute::new();
        let frame = run(
            &Config::default(),
            &mut draw_zero_forever().as_slice(),
            &mut display,
            Arc::new(Keypad::new()),
            &mut sound,
            clock,
            &stop,
        )
        .unwrap();
        assert!(display.stopped);
        assert_eq!(frame.lit_pixels().count(), 14);
        assert!(frame.to_string().starts_with(DIGIT_ZERO_TEXT));
    }

    #[test]
    fn test_stop_from_another_thread() {
        // the same path a Ctrl-C or SIGTERM handler takes
        let stop = StopSignal::new();
        let raiser = {
            let stop = stop.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                stop.stop();
            })
        };
        let mut display = DummyDisplay::new();
        let mut sound = Mute::new();
        let frame = run(
            &Config::default(),
            &mut draw_zero_forever().as_slice(),
            &mut display,
            Arc::new(Keypad::new()),
            &mut sound,
            SystemClock::new(),
            &stop,
        )
        .unwrap();
        raiser.join().unwrap();
        assert!(display.stopped);
        assert!(frame.to_string().starts_with(DIGIT_ZERO_TEXT));
    }

    #[test]
    fn test_display_released_when_program_wont_load() {
        let stop = StopSignal::new();
        let mut display = DummyDisplay::new();
        let mut sound = Mute::new();
        let too_big = vec![0u8; 0xe01];
        let result = run(
            &Config::default(),
            &mut too_big.as_slice(),
            &mut display,
            Arc::new(Keypad::new()),
            &mut sound,
            ManualClock::new(),
            &stop,
        );
        assert!(matches!(result, Err(Chip8Error::RomTooLarge { .. })));
        assert!(display.stopped);
    }

    #[test]
    fn test_program_fault_reported_before_shutdown_failure() {
        let stop = StopSignal::new();
        let mut display = StuckDisplay;
        let mut sound = Mute::new();
        let result = run(
            &Config::default(),
            &mut program(&[0xffff]).as_slice(),
            &mut display,
            Arc::new(Keypad::new()),
            &mut sound,
            ManualClock::new(),
            &stop,
        );
        match result {
            Err(Chip8Error::UnknownOpcode { opcode, addr }) => {
                assert_eq!(opcode, 0xffff);
                assert_eq!(addr, 0x200);
            }
            other => panic!("expected UnknownOpcode, got {:?}", other),
        }
    }
}
