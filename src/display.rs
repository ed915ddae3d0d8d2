use std::fmt;
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// canonical CHIP-8 resolution
pub const CHIP8_DISPLAY_WIDTH: usize = 64;
pub const CHIP8_DISPLAY_HEIGHT: usize = 32;

/// sprites are at most this many rows tall
const MAX_SPRITE_ROWS: usize = 15;

/// Display is used by the interpreter to draw things on the screen. It should
/// abstract the implementation details, so a variety of kinds of screen would
/// work.
pub trait Display {
    /// blank the screen
    fn clear(&mut self) -> Result<(), io::Error>;

    /// light one pixel; nothing is visible until `draw`
    fn set_pixel(&mut self, x: usize, y: usize) -> Result<(), io::Error>;

    /// push the pixels set since the last `clear` to the screen
    fn draw(&mut self) -> Result<(), io::Error>;

    /// the session is over; give the screen back
    fn stop(&mut self) -> Result<(), io::Error>;
}

/// How a sprite's origin is brought back onto the screen before drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SpriteWrap {
    /// origin modulo (dimension - 1); this shifts the wrap point one
    /// row/column in from the edge, and is what the machine has always done
    #[default]
    Inherited,
    /// origin modulo dimension, as most other CHIP-8 interpreters do
    Modulo,
}

impl SpriteWrap {
    fn apply(self, origin: usize, dimension: usize) -> usize {
        match self {
            SpriteWrap::Inherited => origin % dimension.saturating_sub(1).max(1),
            SpriteWrap::Modulo => origin % dimension.max(1),
        }
    }
}

/// Monochrome pixel buffer, row-major, one byte per pixel holding 0 or 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Framebuffer {
            width,
            height,
            cells: vec![0; width * height],
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// raw access; panics outside the buffer
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.cells[y * self.width + x]
    }

    /// raw access; panics outside the buffer. Any non-zero value is stored as 1
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.cells[y * self.width + x] = (value != 0) as u8;
    }

    /// XOR a sprite onto the buffer with its top left corner at the origin.
    /// Returns true if any lit pixel was switched off.
    ///
    /// The origin is wrapped once according to `wrap`; pixels that still fall
    /// off the right or bottom edge are clipped.
    pub fn blit(
        &mut self,
        origin_x: usize,
        origin_y: usize,
        sprite: &[u8],
        wrap: SpriteWrap,
    ) -> bool {
        let ox = wrap.apply(origin_x, self.width);
        let oy = wrap.apply(origin_y, self.height);
        let mut collision = false;

        for (row, bits) in sprite.iter().take(MAX_SPRITE_ROWS).enumerate() {
            let y = oy + row;
            if y >= self.height {
                continue;
            }
            for col in 0..8 {
                let x = ox + col;
                if x >= self.width || (bits >> (7 - col)) & 1 == 0 {
                    continue;
                }
                let idx = y * self.width + x;
                if self.cells[idx] == 1 {
                    collision = true;
                }
                self.cells[idx] ^= 1;
            }
        }
        collision
    }

    /// iterate over the coordinates of lit pixels, row by row
    pub fn lit_pixels(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let w = self.width;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == 1)
            .map(move |(idx, _)| (idx % w, idx / w))
    }

    /// replay the buffer onto a display and flush it
    pub fn present(&self, display: &mut dyn Display) -> Result<(), io::Error> {
        display.clear()?;
        for (x, y) in self.lit_pixels() {
            display.set_pixel(x, y)?;
        }
        display.draw()
    }
}

/// plain text rendering, one line per row
impl fmt::Display for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.width.max(1)) {
            let line: String = row
                .iter()
                .map(|c| if *c == 1 { 'o' } else { ' ' })
                .collect();
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}

// store useful metadata about the terminal
struct Resolution(usize, usize);

impl Resolution {
    fn pixel_count(&self) -> usize {
        self.0 * self.1
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// canvas coordinates of every pixel matching `bitplane`
    fn bitplane_from_data<'a>(
        &self,
        data: &'a [u8],
        bitplane: u8,
    ) -> impl std::iter::Iterator<Item = (f64, f64)> + 'a {
        let w = self.0;
        data.iter()
            .take(self.pixel_count())
            .enumerate()
            .filter(move |(_, px)| **px == bitplane)
            .map(move |(idx, _)| {
                (
                    (idx % w) as f64,        // x
                    -1.0 * (idx / w) as f64, // y
                )
            })
    }
}

/// monochrome display in a terminal, rendered using TUI and Crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
    pixels: Vec<u8>,
}

impl MonoTermDisplay {
    pub fn new(x: usize, y: usize) -> Result<MonoTermDisplay, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(x, y),
            pixels: vec![0; x * y],
        })
    }
}

impl Display for MonoTermDisplay {
    fn clear(&mut self) -> Result<(), io::Error> {
        self.pixels.fill(0);
        Ok(())
    }

    fn set_pixel(&mut self, x: usize, y: usize) -> Result<(), io::Error> {
        if x < self.resolution.0 && y < self.resolution.1 {
            self.pixels[y * self.resolution.0 + x] = 1;
        }
        Ok(())
    }

    fn draw(&mut self) -> Result<(), io::Error> {
        let off = self
            .resolution
            .bitplane_from_data(&self.pixels, 0)
            .collect::<Vec<_>>();
        let on = self
            .resolution
            .bitplane_from_data(&self.pixels, 1)
            .collect::<Vec<_>>();
        let size = Rect::new(
            0,
            0,
            2 + self.resolution.0 as u16,
            2 + self.resolution.1 as u16,
        );
        let x_bounds = self.resolution.x_bounds();
        let y_bounds = self.resolution.y_bounds();

        // for now this assumes a 1:1 ratio between terminal, chip8 and the
        // internal TUI canvas
        self.terminal.draw(|f| {
            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(x_bounds)
                .y_bounds(y_bounds)
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &off,
                        color: Color::Black,
                    });
                    ctx.draw(&Points {
                        coords: &on,
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), io::Error> {
        self.terminal.show_cursor()?;
        // move below the frame so the shell prompt doesn't land on top of it
        self.terminal
            .set_cursor(0, 2 + self.resolution.1 as u16)?;
        Ok(())
    }
}

/// Headless display; keeps the last flushed frame so it can be inspected.
/// Useful for testing non-display routines.
pub struct DummyDisplay {
    pending: Vec<(usize, usize)>,
    frame: Vec<(usize, usize)>,
    pub draw_count: usize,
    pub stopped: bool,
}

impl DummyDisplay {
    pub fn new() -> DummyDisplay {
        DummyDisplay {
            pending: Vec::new(),
            frame: Vec::new(),
            draw_count: 0,
            stopped: false,
        }
    }

    /// lit pixels of the last flushed frame, in the order they were set
    pub fn frame(&self) -> &[(usize, usize)] {
        &self.frame
    }
}

impl Default for DummyDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for DummyDisplay {
    fn clear(&mut self) -> Result<(), io::Error> {
        self.pending.clear();
        Ok(())
    }

    fn set_pixel(&mut self, x: usize, y: usize) -> Result<(), io::Error> {
        self.pending.push((x, y));
        Ok(())
    }

    fn draw(&mut self) -> Result<(), io::Error> {
        self.frame = self.pending.clone();
        self.draw_count += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), io::Error> {
        self.stopped = true;
        Ok(())
    }
}
