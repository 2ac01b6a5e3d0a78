use crate::actions::Action;
use crate::services::ActionSender;
use crate::speech::SpeechEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

/// Polls the speech clock while the engine is speaking and reports the
/// position as [`Action::AudioProgress`]. The only shared value it feeds
/// is the store's playback time.
pub struct PlaybackPoller {
    runtime: Handle,
    task: Option<JoinHandle<()>>,
}

impl PlaybackPoller {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            task: None,
        }
    }

    pub fn start(
        &mut self,
        generation: u64,
        speech: Arc<dyn SpeechEngine>,
        interval: Duration,
        sender: ActionSender,
    ) {
        self.cancel();
        self.task = Some(self.runtime.spawn(async move {
            while speech.is_speaking() {
                let time = speech.playback_position();
                if !sender.send(Action::AudioProgress { generation, time }) {
                    return;
                }
                tokio::time::sleep(interval).await;
            }
            debug!("playback finished");
            sender.send(Action::AudioFinished { generation });
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PlaybackPoller {
    fn drop(&mut self) {
        self.cancel();
    }
}
