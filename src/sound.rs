use crate::error::Chip8Error;
use beep::beep;

/// Makes (or doesn't make) the tone that plays while the sound timer runs.
pub trait Sound {
    fn beep(&mut self) -> Result<(), Chip8Error>;
    fn stop(&mut self) -> Result<(), Chip8Error>;
}

const SIMPLEBEEP_PITCH: u16 = 2093; // C

/// PC speaker tone via the `beep` crate
pub struct SimpleBeep {
    is_beeping: bool,
}

impl SimpleBeep {
    pub fn new() -> Self {
        SimpleBeep { is_beeping: false }
    }
}

impl Default for SimpleBeep {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for SimpleBeep {
    fn beep(&mut self) -> Result<(), Chip8Error> {
        beep(SIMPLEBEEP_PITCH).map_err(|e| Chip8Error::Sound(e.to_string()))?;
        self.is_beeping = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Chip8Error> {
        if self.is_beeping {
            beep(0).map_err(|e| Chip8Error::Sound(e.to_string()))?;
            self.is_beeping = false;
        }
        Ok(())
    }
}

impl Drop for SimpleBeep {
    fn drop(&mut self) {
        // don't leave the speaker droning after we've gone
        if let Err(e) = Sound::stop(self) {
            log::error!("{}", e);
        }
    }
}

pub struct Mute {}

impl Mute {
    pub fn new() -> Self {
        Mute {}
    }
}

impl Default for Mute {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for Mute {
    fn beep(&mut self) -> Result<(), Chip8Error> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Chip8Error> {
        Ok(())
    }
}
