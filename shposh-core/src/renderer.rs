//! Styled terminal output.
//!
//! A [`Renderer`] is immutable: it owns a color mode and a handle to the output
//! sink. Changing the color mode builds a new renderer and swaps it into the
//! shared [`RendererHandle`], so a render that is already in flight finishes
//! with the instance it started with.

use crate::notify::{Notification, NotificationKind};
use crossterm::style::{Attribute, Color, ContentStyle};
use std::fmt;
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use strum::{Display, EnumIter, EnumString};
use tracing::debug;

/// Rule width used when the sink is not a terminal.
const DEFAULT_COLUMNS: usize = 80;

const RULE_CHAR: &str = "─";

/// Color capability requested by the `colorScheme` config key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Standard,
    #[strum(to_string = "256")]
    EightBit,
    TrueColor,
    Windows,
}

/// Number of colors the renderer actually emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorDepth {
    NoColor,
    Ansi16,
    Ansi256,
    TrueColor,
}

impl ColorMode {
    pub fn depth(self) -> ColorDepth {
        match self {
            ColorMode::Auto => ColorDepth::detect(),
            // Legacy Windows consoles only understand the 16 base colors.
            ColorMode::Standard | ColorMode::Windows => ColorDepth::Ansi16,
            ColorMode::EightBit => ColorDepth::Ansi256,
            ColorMode::TrueColor => ColorDepth::TrueColor,
        }
    }
}

impl ColorDepth {
    /// Best depth supported by the attached terminal.
    pub fn detect() -> Self {
        if !console::colors_enabled() {
            return ColorDepth::NoColor;
        }
        let colorterm = std::env::var("COLORTERM").unwrap_or_default();
        if colorterm == "truecolor" || colorterm == "24bit" {
            return ColorDepth::TrueColor;
        }
        let term = std::env::var("TERM").unwrap_or_default();
        if term.contains("256") {
            ColorDepth::Ansi256
        } else {
            ColorDepth::Ansi16
        }
    }
}

/// Semantic color roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Text,
    Accent,
    Success,
    Warning,
    Error,
    Dim,
}

impl Tone {
    fn color(self, depth: ColorDepth) -> Option<Color> {
        match depth {
            ColorDepth::NoColor => None,
            ColorDepth::Ansi16 => Some(match self {
                Tone::Text => Color::White,
                Tone::Accent => Color::Blue,
                Tone::Success => Color::Green,
                Tone::Warning => Color::Yellow,
                Tone::Error => Color::Red,
                Tone::Dim => Color::DarkGrey,
            }),
            ColorDepth::Ansi256 => Some(Color::AnsiValue(match self {
                Tone::Text => 255,
                Tone::Accent => 39,
                Tone::Success => 107,
                Tone::Warning => 220,
                Tone::Error => 160,
                Tone::Dim => 242,
            })),
            ColorDepth::TrueColor => Some(match self {
                Tone::Text => Color::Rgb { r: 238, g: 238, b: 238 },
                Tone::Accent => Color::Rgb { r: 0, g: 175, b: 255 },
                Tone::Success => Color::Rgb { r: 112, g: 138, b: 88 },
                Tone::Warning => Color::Rgb { r: 255, g: 215, b: 0 },
                Tone::Error => Color::Rgb { r: 215, g: 0, b: 0 },
                Tone::Dim => Color::Rgb { r: 108, g: 108, b: 108 },
            }),
        }
    }
}

/// Shared, line-atomic output destination.
#[derive(Clone)]
pub struct Sink {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    terminal: bool,
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("writer", &"<Mutex>")
            .field("terminal", &self.terminal)
            .finish()
    }
}

impl Sink {
    pub fn stdout() -> Self {
        let stdout = io::stdout();
        let terminal = stdout.is_terminal();
        Self {
            writer: Arc::new(Mutex::new(Box::new(stdout))),
            terminal,
        }
    }

    /// Wrap an arbitrary writer. The sink is treated as a non-terminal.
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
            terminal: false,
        }
    }

    fn write(&self, text: &str) -> io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(text.as_bytes())?;
        writer.flush()
    }

    fn columns(&self) -> usize {
        if self.terminal {
            let (_rows, cols) = console::Term::stdout().size();
            usize::from(cols).max(1)
        } else {
            DEFAULT_COLUMNS
        }
    }
}

#[derive(Clone, Debug)]
pub struct Renderer {
    mode: ColorMode,
    depth: ColorDepth,
    sink: Sink,
}

impl Renderer {
    pub fn new(mode: ColorMode, sink: Sink) -> Self {
        Self {
            mode,
            depth: mode.depth(),
            sink,
        }
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    /// Style `text` for this renderer's color depth.
    pub fn paint(&self, text: &str, tone: Tone, attributes: &[Attribute]) -> String {
        if self.depth == ColorDepth::NoColor {
            return text.to_string();
        }
        let mut style = ContentStyle::new();
        style.foreground_color = tone.color(self.depth);
        for attribute in attributes {
            style.attributes.set(*attribute);
        }
        style.apply(text).to_string()
    }

    /// Plain output line.
    pub fn print(&self, text: &str) -> io::Result<()> {
        self.sink.write(&format!("{text}\n"))
    }

    /// Output line prefixed with the wall clock time.
    pub fn log(&self, text: &str) -> io::Result<()> {
        let stamp = chrono::Local::now().format("[%H:%M:%S]").to_string();
        self.sink
            .write(&format!("{} {text}\n", self.paint(&stamp, Tone::Dim, &[])))
    }

    pub fn warning(&self, text: &str) -> io::Result<()> {
        self.sink.write(&format!(
            "{}{}\n",
            self.paint("Warning: ", Tone::Warning, &[Attribute::Italic]),
            self.paint(text, Tone::Warning, &[Attribute::Italic, Attribute::Bold]),
        ))
    }

    /// Error banner: a full-width rule followed by the message.
    pub fn error(&self, text: &str) -> io::Result<()> {
        self.sink.write(&format!(
            "{}\n{}\n",
            self.rule("ERROR"),
            self.paint(text, Tone::Error, &[Attribute::Bold]),
        ))
    }

    pub fn unknown_error(&self, error: &dyn fmt::Display) -> io::Result<()> {
        self.error(&format!("An unknown error occurred.\n\n{error}"))
    }

    /// Horizontal rule with a centered title, as wide as the terminal.
    pub fn rule(&self, title: &str) -> String {
        let label = format!(" {title} ");
        let remaining = self
            .sink
            .columns()
            .saturating_sub(console::measure_text_width(&label));
        let left = remaining / 2;
        let right = remaining - left;
        format!(
            "{}{}{}",
            self.paint(&RULE_CHAR.repeat(left), Tone::Error, &[]),
            self.paint(&label, Tone::Error, &[Attribute::Bold]),
            self.paint(&RULE_CHAR.repeat(right), Tone::Error, &[]),
        )
    }

    pub fn render(&self, notification: &Notification) -> io::Result<()> {
        let text = notification.text.as_str();
        match notification.kind {
            NotificationKind::Info | NotificationKind::Input => self.log(text),
            NotificationKind::Task => self.log(&self.paint(text, Tone::Accent, &[])),
            NotificationKind::ConfigUpdate => self.log(&format!(
                "{} {text}",
                self.paint("Config Update:", Tone::Accent, &[Attribute::Bold])
            )),
            NotificationKind::Warning => self.warning(text),
            NotificationKind::Error => self.error(text),
        }
    }
}

/// Result of [`RendererHandle::reconfigure`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconfigured {
    /// A new renderer was published.
    Changed { from: ColorMode, to: ColorMode },
    /// The requested mode is already active.
    Unchanged(ColorMode),
    /// The requested value is not a color mode and was discarded.
    Ignored,
}

/// Atomically swappable renderer shared by every component.
#[derive(Clone, Debug)]
pub struct RendererHandle {
    current: Arc<RwLock<Arc<Renderer>>>,
}

impl RendererHandle {
    pub fn new(renderer: Renderer) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(renderer))),
        }
    }

    /// The renderer to use for one complete render.
    pub fn current(&self) -> Arc<Renderer> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn mode(&self) -> ColorMode {
        self.current().mode()
    }

    /// Switch to the color mode named by `scheme`.
    ///
    /// Never fails. A value outside the enumeration is dropped on purpose and
    /// the current renderer stays in place.
    pub fn reconfigure(&self, scheme: &str) -> Reconfigured {
        let Ok(mode) = scheme.parse::<ColorMode>() else {
            debug!(scheme, "ignoring unknown color scheme");
            return Reconfigured::Ignored;
        };

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let from = current.mode();
        if from == mode {
            return Reconfigured::Unchanged(mode);
        }
        *current = Arc::new(Renderer::new(mode, current.sink.clone()));
        debug!(%from, to = %mode, "renderer reconfigured");
        Reconfigured::Changed { from, to: mode }
    }
}
