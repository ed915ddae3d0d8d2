use crate::display::SpriteWrap;
use crate::input::KeymapKind;
use crate::scheduler::DEFAULT_INSTRUCTION_HZ;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Run-time settings for one emulation session.
#[derive(Debug, Clone, PartialEq, Parser)]
#[command(name = "chip8")]
#[command(about = "A CHIP-8 interpreter for the terminal")]
pub struct Config {
    /// program image, loaded at 0x200
    pub rom: PathBuf,

    #[arg(long, default_value_t = DEFAULT_INSTRUCTION_HZ, help = "Instructions per second")]
    pub instruction_hz: u32,

    #[arg(long, value_enum, default_value_t = SpriteWrap::Inherited, help = "How sprite origins wrap")]
    pub sprite_wrap: SpriteWrap,

    #[arg(long, value_enum, default_value_t = KeymapKind::Conventional, help = "Keyboard layout")]
    pub keymap: KeymapKind,

    #[arg(long, help = "Don't beep")]
    pub mute: bool,

    #[arg(long, help = "Don't draw to the terminal; print the last frame on exit")]
    pub headless: bool,

    #[arg(long, value_parser = parse_seconds, help = "Stop after this many seconds")]
    pub run_for: Option<Duration>,

    #[arg(long, help = "Seed for the random number instruction")]
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rom: PathBuf::new(),
            instruction_hz: DEFAULT_INSTRUCTION_HZ,
            sprite_wrap: SpriteWrap::default(),
            keymap: KeymapKind::default(),
            mute: false,
            headless: false,
            run_for: None,
            seed: None,
        }
    }
}

fn parse_seconds(arg: &str) -> Result<Duration, String> {
    let secs: f64 = arg.parse().map_err(|e| format!("{}", e))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("{}", e))
}
