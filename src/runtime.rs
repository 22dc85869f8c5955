// Engine runtime - the thread that owns the scheduler
//
// Every scheduler mutation happens on one thread. Other threads talk to it
// through `MetronomeHandle`, which turns method calls into `EngineCommand`s.
// The loop sleeps until the earliest of: next command, next look-ahead pass,
// next due beat notification.

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::audio::output::OutputProvider;
use crate::config::EngineConfig;
use crate::error::MetronomeError;
use crate::messaging::channels::{CommandReceiver, CommandSender, create_command_channel};
use crate::messaging::command::EngineCommand;
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::sequencer::events::BeatEvent;
use crate::sequencer::scheduler::BeatScheduler;
use crate::sequencer::tempo::TempoConfig;

/// Wake-up period while stopped, to keep draining backend notifications
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Thread-safe front of a running metronome engine
///
/// Dropping the handle shuts the engine down and joins its thread.
pub struct MetronomeHandle {
    command_tx: CommandSender,
    thread: Option<JoinHandle<()>>,
}

impl MetronomeHandle {
    pub fn spawn<P>(provider: P, engine_config: EngineConfig) -> Result<Self, MetronomeError>
    where
        P: OutputProvider + Send + 'static,
    {
        Self::spawn_with_tempo(provider, engine_config, TempoConfig::default())
    }

    pub fn spawn_with_tempo<P>(
        provider: P,
        engine_config: EngineConfig,
        tempo: TempoConfig,
    ) -> Result<Self, MetronomeError>
    where
        P: OutputProvider + Send + 'static,
    {
        tempo.validate()?;
        let (command_tx, command_rx) = create_command_channel();

        // The output is created inside the thread (CPAL streams are not Send)
        let thread = std::thread::Builder::new()
            .name("metronome-engine".to_string())
            .spawn(move || {
                let scheduler = BeatScheduler::with_tempo(provider, engine_config, tempo);
                EngineLoop::new(scheduler, command_rx).run();
            })
            .map_err(|e| MetronomeError::Spawn(e.to_string()))?;

        log::debug!("Engine thread spawned");
        Ok(Self {
            command_tx,
            thread: Some(thread),
        })
    }

    /// Start playback; returns once beat 1 has been scheduled
    pub fn start(&self) -> Result<(), MetronomeError> {
        self.request(|reply| EngineCommand::Start { reply })?
    }

    pub fn stop(&self) {
        self.send(EngineCommand::Stop);
    }

    pub fn update_bpm(&self, bpm: f64) {
        self.send(EngineCommand::UpdateBpm(bpm));
    }

    /// Replace the configuration (restarts at beat 1 when playing)
    pub fn update_settings(&self, config: TempoConfig) -> Result<(), MetronomeError> {
        self.request(|reply| EngineCommand::UpdateSettings { config, reply })?
    }

    /// Register a callback run on the engine thread for every beat
    pub fn on_beat<F>(&self, callback: F)
    where
        F: FnMut(BeatEvent) + Send + 'static,
    {
        self.send(EngineCommand::OnBeat(Box::new(callback)));
    }

    pub fn subscribe(&self) -> Result<Receiver<BeatEvent>, MetronomeError> {
        self.request(|reply| EngineCommand::Subscribe { reply })
    }

    /// Diagnostics reported by the audio backend
    pub fn subscribe_notifications(&self) -> Result<Receiver<Notification>, MetronomeError> {
        self.request(|reply| EngineCommand::SubscribeNotifications { reply })
    }

    fn send(&self, command: EngineCommand) {
        if self.command_tx.send(command).is_err() {
            log::warn!("Metronome engine is not running, command ignored");
        }
    }

    fn request<T>(
        &self,
        make: impl FnOnce(Sender<T>) -> EngineCommand,
    ) -> Result<T, MetronomeError> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.command_tx
            .send(make(reply_tx))
            .map_err(|_| MetronomeError::EngineStopped)?;
        reply_rx.recv().map_err(|_| MetronomeError::EngineStopped)
    }
}

impl Drop for MetronomeHandle {
    fn drop(&mut self) {
        let _ = self.command_tx.send(EngineCommand::Shutdown);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            log::error!("Metronome engine thread panicked");
        }
    }
}

struct EngineLoop<P: OutputProvider> {
    scheduler: BeatScheduler<P>,
    command_rx: CommandReceiver,
    notification_subscribers: Vec<Sender<Notification>>,
    next_pass: Instant,
}

impl<P: OutputProvider> EngineLoop<P> {
    fn new(scheduler: BeatScheduler<P>, command_rx: CommandReceiver) -> Self {
        Self {
            scheduler,
            command_rx,
            notification_subscribers: Vec::new(),
            next_pass: Instant::now(),
        }
    }

    fn run(mut self) {
        loop {
            match self.command_rx.recv_timeout(self.time_until_wakeup()) {
                Ok(EngineCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(command) => self.handle_command(command),
                Err(RecvTimeoutError::Timeout) => {}
            }
            self.tick();
        }

        self.scheduler.stop();
        log::debug!("Engine thread exiting");
    }

    fn handle_command(&mut self, command: EngineCommand) {
        log::trace!("Engine command: {:?}", command);
        match command {
            EngineCommand::Start { reply } => {
                let result = self.scheduler.start();
                match &result {
                    Ok(()) => self.notify(Notification::info(
                        NotificationCategory::Engine,
                        format!("Started: {}", self.scheduler.tempo()),
                    )),
                    Err(e) => self.notify(Notification::error(
                        NotificationCategory::Engine,
                        format!("Failed to start: {}", e),
                    )),
                }
                // start() already ran the first pass
                self.next_pass = Instant::now() + self.scheduler.engine_config().lookahead;
                let _ = reply.send(result);
            }
            EngineCommand::Stop => self.scheduler.stop(),
            EngineCommand::UpdateBpm(bpm) => self.scheduler.update_bpm(bpm),
            EngineCommand::UpdateSettings { config, reply } => {
                let result = self.scheduler.update_settings(config);
                if let Err(e) = &result {
                    self.notify(Notification::warning(
                        NotificationCategory::Engine,
                        format!("Settings rejected: {}", e),
                    ));
                }
                self.next_pass = Instant::now() + self.scheduler.engine_config().lookahead;
                let _ = reply.send(result);
            }
            EngineCommand::OnBeat(callback) => self.scheduler.add_listener(callback),
            EngineCommand::Subscribe { reply } => {
                let _ = reply.send(self.scheduler.subscribe());
            }
            EngineCommand::SubscribeNotifications { reply } => {
                let (tx, rx) = crossbeam_channel::unbounded();
                self.notification_subscribers.push(tx);
                let _ = reply.send(rx);
            }
            EngineCommand::Shutdown => {}
        }
    }

    /// Run whatever is due: look-ahead pass, beat notifications, backend
    /// notifications
    fn tick(&mut self) {
        let now = Instant::now();
        if now >= self.next_pass {
            self.scheduler.run_pass();
            self.next_pass = now + self.scheduler.engine_config().lookahead;
        }

        self.scheduler.dispatch_due();

        while let Some(notification) = self.scheduler.poll_output_notification() {
            notification.log();
            self.notify(notification);
        }
    }

    fn notify(&mut self, notification: Notification) {
        self.notification_subscribers
            .retain(|tx| tx.send(notification.clone()).is_ok());
    }

    fn time_until_wakeup(&self) -> Duration {
        if !self.scheduler.is_playing() {
            return IDLE_POLL;
        }

        let now = Instant::now();
        let until_pass = self.next_pass.saturating_duration_since(now);

        let until_due = match (self.scheduler.next_due(), self.scheduler.current_time()) {
            (Some(due), Some(clock)) => Duration::from_secs_f64((due - clock).max(0.0)),
            _ => until_pass,
        };

        until_pass.min(until_due)
    }
}
