use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyEventKind};
use futures::StreamExt;
use tokio::sync::{broadcast, mpsc};

use relaygram_core::CoreEvent;

use crate::actions::{apply_outcome, ActionOutcome, Dispatcher};
use crate::input::{handle_key, handle_paste};
use crate::render::render;
use crate::ui::{App, Tui};

const TICK: Duration = Duration::from_millis(250);

async fn next_core_event(
    rx: &mut Option<broadcast::Receiver<CoreEvent>>,
) -> Result<CoreEvent, broadcast::error::RecvError> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

pub(crate) async fn run_app(
    terminal: &mut Tui,
    app: &mut App,
    dispatcher: &Dispatcher,
    mut outcomes: mpsc::UnboundedReceiver<ActionOutcome>,
) -> Result<()> {
    let mut event_stream = EventStream::new();
    let mut tick = tokio::time::interval(TICK);
    let mut core_events: Option<broadcast::Receiver<CoreEvent>> = None;

    while app.running {
        terminal.draw(|f| render(f, app))?;

        tokio::select! {
            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = handle_key(app, key) {
                            dispatcher.dispatch(app.core().cloned(), action);
                        }
                    }
                    Some(Ok(Event::Paste(text))) => handle_paste(app, &text),
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::error!("Terminal event error: {}", err);
                    }
                    None => app.quit(),
                }
            }
            Some(outcome) = outcomes.recv() => {
                if let ActionOutcome::Connected(core) = &outcome {
                    core_events = Some(core.events().subscribe());
                }
                if let Some(follow_up) = apply_outcome(app, outcome) {
                    dispatcher.dispatch(app.core().cloned(), follow_up);
                }
            }
            event = next_core_event(&mut core_events) => {
                match event {
                    Ok(event) => app.on_core_event(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!("UI lagged {} core events", skipped);
                        app.sync_from_core();
                    }
                    Err(broadcast::error::RecvError::Closed) => core_events = None,
                }
            }
            _ = tick.tick() => {
                app.tick();
                app.sync_from_core();
            }
        }
    }

    Ok(())
}
