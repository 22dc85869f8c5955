// Beat events - what observers receive once per audible click

use crossbeam_channel::{Receiver, Sender};

/// One emitted click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeatEvent {
    /// 1-based, counts every click since `start`
    pub beat_number: u64,
    /// True only when the click is the first of its bar and accenting is on
    pub is_downbeat: bool,
}

impl BeatEvent {
    pub fn new(beat_number: u64, is_downbeat: bool) -> Self {
        Self {
            beat_number,
            is_downbeat,
        }
    }
}

/// Callback registered with `on_beat`
pub type BeatCallback = Box<dyn FnMut(BeatEvent) + Send + 'static>;

/// Registered observers: callbacks plus channel subscribers
///
/// Every observer sees every event in emission order. Nothing here blocks:
/// callbacks run inline and channel sends are unbounded.
#[derive(Default)]
pub struct BeatListeners {
    callbacks: Vec<BeatCallback>,
    subscribers: Vec<Sender<BeatEvent>>,
}

impl BeatListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_callback(&mut self, callback: BeatCallback) {
        self.callbacks.push(callback);
    }

    /// New channel receiving every future event
    pub fn subscribe(&mut self) -> Receiver<BeatEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn emit(&mut self, event: BeatEvent) {
        for callback in &mut self.callbacks {
            callback(event);
        }
        // Dropped receivers are pruned
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    pub fn len(&self) -> usize {
        self.callbacks.len() + self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for BeatListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeatListeners")
            .field("callbacks", &self.callbacks.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
