//! Terminal rendering of build events.

use colored::Colorize;
use events::{Event, EventBus, OutputStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Print events from `bus` until the bus is dropped.
pub fn spawn_renderer(bus: &EventBus, builder: &'static str) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(envelope) => render(builder, &envelope.event),
                Err(RecvError::Lagged(skipped)) => {
                    eprintln!("{}", format!("... {} lines dropped", skipped).dimmed());
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn render(builder: &str, event: &Event) {
    let prefix = format!("{}:", builder).bold();
    match event {
        Event::Say { message } => println!("==> {} {}", prefix, message.green().bold()),
        Event::Message { message } => println!("    {} {}", prefix, message),
        Event::Error { message } => eprintln!("==> {} {}", prefix, message.red()),
        Event::Output { stream, line } => match stream {
            OutputStream::Stdout => println!("    {} {}", prefix, line.dimmed()),
            OutputStream::Stderr => eprintln!("    {} {}", prefix, line.yellow()),
        },
        Event::CleanupFailed { step, error } => eprintln!(
            "==> {} {} {}",
            prefix,
            format!("cleanup of {} failed:", step).yellow(),
            error
        ),
        Event::StepStarted { .. } | Event::StepFinished { .. } | Event::BuildFinished { .. } => {}
    }
}
