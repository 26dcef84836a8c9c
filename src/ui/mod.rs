//! Interactive diagnosis view.
//!
//! The [`Orchestrator`] owns a single-threaded event loop. The explanation
//! request, spinner ticks and key presses all arrive as [`UiEvent`]s on one
//! channel; the loop dequeues an event, applies [`Model::update`], redraws and
//! repeats. Quitting simply stops the loop. An in-flight request is not
//! aborted and its late result lands in a channel nobody reads.

pub mod state;
pub mod theme;
pub mod view;

use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::{cursor, execute, queue, terminal};
use futures::StreamExt;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use textwrap::core::display_width;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::explain::{ExplainRequest, Explainer};
use crate::signals::Signals;

pub use state::{Action, Key, Model, Phase, UiEvent};
pub use theme::Theme;

/// Destination for rendered frames
pub trait Renderer {
    /// Replace the previous frame with `lines`.
    fn draw(&mut self, lines: &[String]) -> io::Result<()>;

    /// Columns available for layout
    fn width(&self) -> usize;

    /// Called once when the loop ends.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Redraws in place below the cursor, without an alternate screen, so the
/// final frame stays in the scrollback.
pub struct InlineRenderer<W: Write> {
    out: W,
    /// Terminal rows taken by the previous frame, soft wraps included
    drawn: usize,
    /// Fixed width instead of asking the terminal
    width: Option<usize>,
}

impl<W: Write> InlineRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            drawn: 0,
            width: None,
        }
    }

    pub fn with_width(out: W, width: usize) -> Self {
        Self {
            out,
            drawn: 0,
            width: Some(width),
        }
    }
}

/// Rows `lines` occupy on a terminal `width` columns wide.
fn rows(lines: &[String], width: usize) -> usize {
    let width = width.max(1);
    lines
        .iter()
        .map(|line| display_width(line).div_ceil(width).max(1))
        .sum()
}

impl<W: Write> Renderer for InlineRenderer<W> {
    fn draw(&mut self, lines: &[String]) -> io::Result<()> {
        queue!(self.out, cursor::MoveToColumn(0))?;
        if self.drawn > 1 {
            let up = u16::try_from(self.drawn - 1).unwrap_or(u16::MAX);
            queue!(self.out, cursor::MoveUp(up))?;
        }
        queue!(self.out, terminal::Clear(terminal::ClearType::FromCursorDown))?;
        // Raw mode: a bare \n would not return the carriage.
        self.out.write_all(lines.join("\r\n").as_bytes())?;
        self.out.flush()?;
        self.drawn = rows(lines, self.width());
        Ok(())
    }

    fn width(&self) -> usize {
        if let Some(width) = self.width {
            return width;
        }
        terminal::size()
            .map(|(cols, _)| usize::from(cols))
            .unwrap_or(80)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.write_all(b"\r\n")?;
        self.out.flush()
    }
}

/// Raw mode and a hidden cursor for as long as the guard lives
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        if let Err(err) = execute!(io::stdout(), cursor::Hide) {
            let _ = terminal::disable_raw_mode();
            return Err(err);
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}

fn restore_terminal() {
    let _ = terminal::disable_raw_mode();
    let _ = execute!(io::stdout(), cursor::Show);
}

/// Restore the terminal before the default panic message is printed.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        restore_terminal();
        default_hook(panic_info);
    }));
}

pub struct Orchestrator<R: Renderer> {
    model: Model,
    renderer: R,
    theme: Theme,
    tick: Duration,
    tx: UnboundedSender<UiEvent>,
    rx: UnboundedReceiver<UiEvent>,
}

impl<R: Renderer> Orchestrator<R> {
    pub fn new(renderer: R, theme: Theme, tick: Duration) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            model: Model::new(),
            renderer,
            theme,
            tick,
            tx,
            rx,
        }
    }

    /// Handle for feeding external events (keys) into the loop
    pub fn sender(&self) -> UnboundedSender<UiEvent> {
        self.tx.clone()
    }

    /// Issue the explanation request and run until the user quits.
    /// Returns the final model.
    pub async fn run(
        mut self,
        explainer: Arc<dyn Explainer>,
        request: ExplainRequest,
    ) -> io::Result<Model> {
        spawn_explanation(explainer, request, self.tx.clone());
        schedule_tick(self.tx.clone(), self.tick);
        self.draw()?;

        while let Some(event) = self.rx.recv().await {
            trace!(?event, "ui event");
            match self.model.update(event) {
                Action::Ignore => {}
                Action::Redraw => self.draw()?,
                Action::RedrawAndTick => {
                    self.draw()?;
                    schedule_tick(self.tx.clone(), self.tick);
                }
                Action::Quit => break,
            }
        }

        self.renderer.finish()?;
        debug!(phase = ?self.model.phase(), "view dismissed");
        Ok(self.model)
    }

    fn draw(&mut self) -> io::Result<()> {
        let lines = view::render(self.model.phase(), &self.theme, self.renderer.width());
        self.renderer.draw(&lines)
    }
}

fn spawn_explanation(
    explainer: Arc<dyn Explainer>,
    request: ExplainRequest,
    tx: UnboundedSender<UiEvent>,
) {
    tokio::spawn(async move {
        let event = match explainer.explain(&request).await {
            Ok(text) => {
                info!(backend = explainer.name(), chars = text.len(), "explanation ready");
                UiEvent::ExplanationReady(text)
            }
            Err(err) => {
                info!(backend = explainer.name(), %err, "explanation failed");
                UiEvent::ExplanationFailed(err.to_string())
            }
        };
        // The loop may already be gone; the result is dropped then.
        let _ = tx.send(event);
    });
}

fn schedule_tick(tx: UnboundedSender<UiEvent>, after: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        let _ = tx.send(UiEvent::SpinnerTick);
    });
}

fn map_key(event: Event) -> Option<Key> {
    let Event::Key(key) = event else {
        return None;
    };
    if key.kind != KeyEventKind::Press {
        return None;
    }
    Some(match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Key::Interrupt,
        KeyCode::Char(c) => Key::Char(c),
        _ => Key::Other,
    })
}

/// Forward terminal key presses into the loop.
fn spawn_keys(tx: UnboundedSender<UiEvent>) {
    tokio::spawn(async move {
        let mut events = EventStream::new();
        while let Some(Ok(event)) = events.next().await {
            if let Some(key) = map_key(event) {
                if tx.send(UiEvent::Key(key)).is_err() {
                    break;
                }
            }
        }
    });
}

/// Deliver every SIGINT or SIGTERM to the loop as [`Key::Interrupt`].
pub fn forward_signals(mut signals: Signals, tx: UnboundedSender<UiEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(sig) = signals.recv().await {
            debug!(signal = sig, "signal during view");
            if tx.send(UiEvent::Key(Key::Interrupt)).is_err() {
                break;
            }
        }
    })
}

/// Take over the terminal and run the diagnosis view until dismissed.
///
/// Fails only if the terminal cannot be put into raw mode or drawn to.
pub async fn run(
    explainer: Arc<dyn Explainer>,
    request: ExplainRequest,
    signals: Signals,
    theme: Theme,
    tick: Duration,
) -> io::Result<()> {
    let _guard = TerminalGuard::enter()?;
    let orchestrator = Orchestrator::new(InlineRenderer::new(io::stdout()), theme, tick);
    spawn_keys(orchestrator.sender());
    forward_signals(signals, orchestrator.sender());
    orchestrator.run(explainer, request).await?;
    Ok(())
}
