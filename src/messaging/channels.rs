// Communication channels
//
// Lock-free ring buffers cross the real-time boundary (engine -> audio
// callback for clicks, audio callback -> engine for stream errors). Commands
// and beat subscriptions between ordinary threads use crossbeam channels.

use crate::messaging::command::EngineCommand;
use crate::messaging::notification::Notification;
use crate::synth::click::ScheduledClick;
use ringbuf::{HeapRb, traits::Split};

pub type ClickProducer = ringbuf::HeapProd<ScheduledClick>;
pub type ClickConsumer = ringbuf::HeapCons<ScheduledClick>;

pub fn create_click_channel(capacity: usize) -> (ClickProducer, ClickConsumer) {
    let rb = HeapRb::<ScheduledClick>::new(capacity);
    rb.split()
}

pub type NotificationProducer = ringbuf::HeapProd<Notification>;
pub type NotificationConsumer = ringbuf::HeapCons<Notification>;

pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<Notification>::new(capacity);
    rb.split()
}

pub type CommandSender = crossbeam_channel::Sender<EngineCommand>;
pub type CommandReceiver = crossbeam_channel::Receiver<EngineCommand>;

pub fn create_command_channel() -> (CommandSender, CommandReceiver) {
    crossbeam_channel::unbounded()
}
