// Engine commands - control thread -> engine thread

use crossbeam_channel::Sender;

use crate::error::MetronomeError;
use crate::messaging::notification::Notification;
use crate::sequencer::events::{BeatCallback, BeatEvent};
use crate::sequencer::tempo::TempoConfig;

/// Reply slot for commands whose outcome the caller waits on
pub type Reply<T> = Sender<T>;

pub enum EngineCommand {
    Start {
        reply: Reply<Result<(), MetronomeError>>,
    },
    Stop,
    UpdateBpm(f64),
    UpdateSettings {
        config: TempoConfig,
        reply: Reply<Result<(), MetronomeError>>,
    },
    OnBeat(BeatCallback),
    Subscribe {
        reply: Reply<crossbeam_channel::Receiver<BeatEvent>>,
    },
    SubscribeNotifications {
        reply: Reply<crossbeam_channel::Receiver<Notification>>,
    },
    Shutdown,
}

impl std::fmt::Debug for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineCommand::Start { .. } => write!(f, "Start"),
            EngineCommand::Stop => write!(f, "Stop"),
            EngineCommand::UpdateBpm(bpm) => write!(f, "UpdateBpm({})", bpm),
            EngineCommand::UpdateSettings { config, .. } => {
                write!(f, "UpdateSettings({})", config)
            }
            EngineCommand::OnBeat(_) => write!(f, "OnBeat"),
            EngineCommand::Subscribe { .. } => write!(f, "Subscribe"),
            EngineCommand::SubscribeNotifications { .. } => write!(f, "SubscribeNotifications"),
            EngineCommand::Shutdown => write!(f, "Shutdown"),
        }
    }
}
