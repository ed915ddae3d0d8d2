use crate::scheduler::StopSignal;
use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use crossterm::terminal;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// how many keys the COSMAC VIP hex keypad has
pub const CHIP8_KEY_COUNT: usize = 16;

/// how often a blocked `wait_for_next_press` looks at the stop signal
const WAIT_POLL: Duration = Duration::from_millis(10);

/// terminals only report presses, so a key counts as held this long after the
/// last press (or auto-repeat) for it
const TERM_KEY_HOLD: Duration = Duration::from_millis(150);

/// stray keystrokes are routine; keep them off the terminal frame under the
/// default filter
const UNMAPPED_KEY_LEVEL: log::Level = log::Level::Debug;

/// map of chars read from the keyboard to what the chip8 might expect
/// where '1' => 0x01 and 'a' => 0x0a
const CHIP8_LITERAL_KEYMAP: [(char, u8); 16] = [
    ('0', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('4', 0x04),
    ('5', 0x05),
    ('6', 0x06),
    ('7', 0x07),
    ('8', 0x08),
    ('9', 0x09),
    ('a', 0x0a),
    ('b', 0x0b),
    ('c', 0x0c),
    ('d', 0x0d),
    ('e', 0x0e),
    ('f', 0x0f),
];

/// ditto using left-hand side of qwerty keyboard
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// which physical layout feeds the hex keypad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum KeymapKind {
    /// 1234 / qwer / asdf / zxcv
    #[default]
    Conventional,
    /// 0-9 and a-f
    Literal,
}

impl KeymapKind {
    pub fn keymap(self) -> HashMap<char, u8> {
        match self {
            KeymapKind::Conventional => HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            KeymapKind::Literal => HashMap::from(CHIP8_LITERAL_KEYMAP),
        }
    }
}

/// a key went up or down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: u8,
    pub pressed: bool,
}

impl KeyEvent {
    pub fn pressed(key: u8) -> Self {
        KeyEvent { key, pressed: true }
    }

    pub fn released(key: u8) -> Self {
        KeyEvent {
            key,
            pressed: false,
        }
    }
}

/// Shared key state between whatever produces key events and the interpreter.
///
/// The held/not-held table is lock free. The "last key pressed" slot sits
/// behind a mutex so that a waiting reader can sleep on a condvar.
pub struct Keypad {
    keys: [AtomicBool; CHIP8_KEY_COUNT],
    last_press: Mutex<Option<u8>>,
    press_arrived: Condvar,
}

impl Keypad {
    pub fn new() -> Self {
        Keypad {
            keys: Default::default(),
            last_press: Mutex::new(None),
            press_arrived: Condvar::new(),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<u8>> {
        // the slot is a plain Option; a panicking holder can't leave it torn
        self.last_press
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// ingest a key transition; safe to call from any thread
    pub fn accept(&self, event: KeyEvent) {
        let Some(state) = self.keys.get(event.key as usize) else {
            log::warn!("ignoring event for key {:#04x}", event.key);
            return;
        };
        state.store(event.pressed, Ordering::SeqCst);
        if event.pressed {
            *self.slot() = Some(event.key);
            self.press_arrived.notify_all();
        }
    }

    /// is the key held right now; only the low nibble of `key` is used
    pub fn is_pressed(&self, key: u8) -> bool {
        self.keys[(key & 0x0f) as usize].load(Ordering::SeqCst)
    }

    /// forget any press seen so far, so the next `take_press` only reports
    /// presses that arrive from now on
    pub fn arm(&self) {
        *self.slot() = None;
    }

    /// non-blocking: the most recent press since the last `arm`/`take_press`
    pub fn take_press(&self) -> Option<u8> {
        self.slot().take()
    }

    /// block until a key is pressed, or `stop` is raised (returns None)
    pub fn wait_for_next_press(&self, stop: &StopSignal) -> Option<u8> {
        let mut slot = self.slot();
        loop {
            if let Some(key) = slot.take() {
                return Some(key);
            }
            if stop.is_stopped() {
                return None;
            }
            slot = self
                .press_arrived
                .wait_timeout(slot, WAIT_POLL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

impl Default for Keypad {
    fn default() -> Self {
        Self::new()
    }
}

/// what the terminal feed saw on its last poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    Continue,
    Quit,
}

/// Reads the terminal keyboard via crossterm and feeds a Keypad.
pub struct TermInput {
    keypad: Arc<Keypad>,
    keymap: HashMap<char, u8>,
    held: HashMap<u8, Instant>,
}

impl TermInput {
    pub fn new(keypad: Arc<Keypad>, keymap: KeymapKind) -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(TermInput {
            keypad,
            keymap: keymap.keymap(),
            held: HashMap::new(),
        })
    }

    /// drain pending terminal events, waiting up to `timeout` for the first
    pub fn poll(&mut self, timeout: Duration) -> Result<FeedStatus, io::Error> {
        let mut wait = timeout;
        while poll(wait)? {
            wait = Duration::ZERO;
            if let Event::Key(evt) = read()? {
                match evt.code {
                    KeyCode::Esc => return Ok(FeedStatus::Quit),
                    KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(FeedStatus::Quit)
                    }
                    KeyCode::Char(ch) => self.press(ch.to_ascii_lowercase()),
                    other => {
                        log::log!(UNMAPPED_KEY_LEVEL, "can't map {:?} to a COSMAC key", other)
                    }
                }
            }
        }
        self.release_expired(Instant::now());
        Ok(FeedStatus::Continue)
    }

    fn press(&mut self, ch: char) {
        match self.keymap.get(&ch) {
            Some(&key) => {
                if self.held.insert(key, Instant::now()).is_none() {
                    self.keypad.accept(KeyEvent::pressed(key));
                }
            }
            None => log::log!(UNMAPPED_KEY_LEVEL, "can't map {:?} to a COSMAC key", ch),
        }
    }

    fn release_expired(&mut self, now: Instant) {
        let keypad = &self.keypad;
        self.held.retain(|&key, since| {
            let still_held = now.duration_since(*since) < TERM_KEY_HOLD;
            if !still_held {
                keypad.accept(KeyEvent::released(key));
            }
            still_held
        });
    }

    /// pump events until the user quits or someone else raises `stop`
    pub fn run(mut self, stop: StopSignal) -> Result<(), io::Error> {
        while !stop.is_stopped() {
            if self.poll(WAIT_POLL)? == FeedStatus::Quit {
                log::info!("quit requested from keyboard");
                stop.stop();
            }
        }
        Ok(())
    }
}

impl Drop for TermInput {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            log::error!("couldn't restore terminal mode: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_accept_updates_state() {
        let k = Keypad::new();
        assert!(!k.is_pressed(0x5));
        k.accept(KeyEvent::pressed(0x5));
        assert!(k.is_pressed(0x5));
        k.accept(KeyEvent::released(0x5));
        assert!(!k.is_pressed(0x5));
    }

    #[test]
    fn test_out_of_range_key_ignored() {
        let k = Keypad::new();
        k.accept(KeyEvent::pressed(0x10));
        assert_eq!(k.take_press(), None);
        assert!(!k.is_pressed(0x0));
    }

    #[test]
    fn test_slot_keeps_most_recent_press() {
        let k = Keypad::new();
        k.accept(KeyEvent::pressed(0x1));
        k.accept(KeyEvent::pressed(0x2));
        k.accept(KeyEvent::released(0x2));
        assert_eq!(k.take_press(), Some(0x2));
        assert_eq!(k.take_press(), None);
    }

    #[test]
    fn test_arm_discards_earlier_presses() {
        let k = Keypad::new();
        k.accept(KeyEvent::pressed(0x3));
        k.arm();
        assert_eq!(k.take_press(), None);
        // key is still held though
        assert!(k.is_pressed(0x3));
    }

    #[test]
    fn test_wait_for_next_press_from_other_thread() {
        let k = Arc::new(Keypad::new());
        let stop = StopSignal::new();
        let producer = {
            let k = Arc::clone(&k);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                k.accept(KeyEvent::pressed(0xb));
            })
        };
        assert_eq!(k.wait_for_next_press(&stop), Some(0xb));
        producer.join().unwrap();
    }

    #[test]
    fn test_wait_for_next_press_cancelled() {
        let k = Keypad::new();
        let stop = StopSignal::new();
        let stopper = {
            let stop = stop.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                stop.stop();
            })
        };
        assert_eq!(k.wait_for_next_press(&stop), None);
        stopper.join().unwrap();
    }

    #[test]
    fn test_unmapped_keys_quiet_by_default() {
        // main's default filter is "warn"
        assert!(UNMAPPED_KEY_LEVEL > log::LevelFilter::Warn);
    }

    #[test]
    fn test_keymaps_cover_every_key() {
        for kind in [KeymapKind::Conventional, KeymapKind::Literal] {
            let mut keys: Vec<u8> = kind.keymap().values().copied().collect();
            keys.sort();
            assert_eq!(keys, (0..16).collect::<Vec<u8>>());
        }
        assert_eq!(KeymapKind::Conventional.keymap()[&'x'], 0x0);
        assert_eq!(KeymapKind::Literal.keymap()[&'a'], 0xa);
    }
}
