// src/debounce.rs
//
// Quiet-period debouncing for query input: only the latest submission
// survives a burst, and anything older than the latest submission is
// considered superseded.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{sleep, Instant},
};
use tracing::trace;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// A value that survived its quiet period, tagged with its submission number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket<T> {
    pub generation: u64,
    pub value: T,
}

/// Shared view of the newest submission number.
#[derive(Clone, Debug, Default)]
pub struct Generations(Arc<AtomicU64>);

impl Generations {
    pub fn latest(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// A run for `generation` is still wanted only if nothing newer arrived.
    pub fn is_current(&self, generation: u64) -> bool {
        self.latest() == generation
    }

    fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

pub struct Debouncer<T> {
    input: mpsc::UnboundedSender<(u64, T)>,
    generations: Generations,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Spawn the debounce task. Tickets come out of the returned receiver.
    pub fn spawn(delay: Duration) -> (Self, mpsc::UnboundedReceiver<Ticket<T>>) {
        let (input, rx) = mpsc::unbounded_channel();
        let (tx, output) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(delay, rx, tx));
        (
            Self {
                input,
                generations: Generations::default(),
                task,
            },
            output,
        )
    }

    /// Replace any pending value and restart the quiet period.
    pub fn submit(&self, value: T) -> u64 {
        let generation = self.generations.bump();
        // the task only stops once `input` is dropped
        let _ = self.input.send((generation, value));
        generation
    }

    /// Mark everything submitted so far as superseded without submitting.
    pub fn supersede(&self) -> u64 {
        self.generations.bump()
    }

    pub fn generations(&self) -> Generations {
        self.generations.clone()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generations.is_current(generation)
    }

    /// Stop accepting input, flush a pending value and wait for the task.
    pub async fn close(self) {
        drop(self.input);
        let _ = self.task.await;
    }
}

async fn run<T>(
    delay: Duration,
    mut input: mpsc::UnboundedReceiver<(u64, T)>,
    output: mpsc::UnboundedSender<Ticket<T>>,
) {
    let mut pending: Option<Ticket<T>> = None;
    let timer = sleep(delay);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            msg = input.recv() => match msg {
                Some((generation, value)) => {
                    trace!(generation, "debounce restarted");
                    pending = Some(Ticket { generation, value });
                    timer.as_mut().reset(Instant::now() + delay);
                }
                None => {
                    if let Some(ticket) = pending.take() {
                        let _ = output.send(ticket);
                    }
                    break;
                }
            },
            () = &mut timer, if pending.is_some() => {
                if let Some(ticket) = pending.take() {
                    trace!(generation = ticket.generation, "debounce fired");
                    if output.send(ticket).is_err() {
                        break;
                    }
                }
            }
        }
    }
}
