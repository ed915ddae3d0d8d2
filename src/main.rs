use clap::Parser;
use std::error::Error;
use std::fs::File;
use std::sync::Arc;
use std::thread;

use chip8::config::Config;
use chip8::display::{
    Display, DummyDisplay, MonoTermDisplay, CHIP8_DISPLAY_HEIGHT, CHIP8_DISPLAY_WIDTH,
};
use chip8::input::{Keypad, TermInput};
use chip8::scheduler::{StopSignal, SystemClock};
use chip8::session;
use chip8::sound::{Mute, SimpleBeep, Sound};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = Config::parse();
    let mut rom = File::open(&config.rom)?;
    let keypad = Arc::new(Keypad::new());
    let stop = StopSignal::new();

    // Ctrl-C and SIGTERM stop the run the same way Esc does
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || {
            log::info!("stop requested by signal");
            stop.stop();
        })?;
    }

    let mut sound: Box<dyn Sound> = if config.mute {
        Box::new(Mute::new())
    } else {
        Box::new(SimpleBeep::new())
    };
    let mut display: Box<dyn Display> = if config.headless {
        Box::new(DummyDisplay::new())
    } else {
        Box::new(MonoTermDisplay::new(
            CHIP8_DISPLAY_WIDTH,
            CHIP8_DISPLAY_HEIGHT,
        )?)
    };

    // the keyboard gets its own thread so key events never wait on the
    // interpreter
    let feed = if config.headless {
        None
    } else {
        let input = TermInput::new(Arc::clone(&keypad), config.keymap)?;
        let stop = stop.clone();
        Some(thread::spawn(move || input.run(stop)))
    };

    let result = session::run(
        &config,
        &mut rom,
        &mut *display,
        keypad,
        &mut *sound,
        SystemClock::new(),
        &stop,
    );

    stop.stop();
    if let Some(feed) = feed {
        match feed.join() {
            Ok(r) => r?,
            Err(_) => log::error!("input thread panicked"),
        }
    }

    let frame = result?;
    if config.headless {
        print!("{}", frame);
    }
    Ok(())
}
