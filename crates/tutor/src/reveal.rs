use crate::actions::Action;
use crate::services::ActionSender;
use concept_map::reveal::{graph_steps, typing_steps};
use concept_map::{GraphDocument, RevealTimings};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Runs the scripted reveal (typing plus graph growth) on one task.
///
/// Starting a reveal aborts the previous one first, so two reveals never
/// publish at the same time. Every message carries the generation it was
/// started with; the reducer drops anything stale that was already queued.
pub struct RevealOrchestrator {
    runtime: Handle,
    task: Option<JoinHandle<()>>,
}

impl RevealOrchestrator {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            task: None,
        }
    }

    pub fn start(
        &mut self,
        generation: u64,
        answer: String,
        document: GraphDocument,
        timings: RevealTimings,
        sender: ActionSender,
    ) {
        self.cancel();
        debug!(
            generation,
            words = answer.split(' ').count(),
            nodes = document.nodes.len(),
            "starting scripted reveal"
        );
        self.task = Some(self.runtime.spawn(async move {
            tokio::join!(
                type_answer(generation, answer, timings, sender.clone()),
                grow_graph(generation, document, timings, sender),
            );
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                debug!("cancelling scripted reveal");
            }
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for RevealOrchestrator {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn type_answer(
    generation: u64,
    answer: String,
    timings: RevealTimings,
    sender: ActionSender,
) {
    for step in typing_steps(&answer, &timings) {
        if !sender.send(Action::TypingProgress {
            generation,
            typed: step.typed,
        }) {
            return;
        }
        tokio::time::sleep(step.delay).await;
    }
    sender.send(Action::TypingFinished { generation, answer });
}

async fn grow_graph(
    generation: u64,
    document: GraphDocument,
    timings: RevealTimings,
    sender: ActionSender,
) {
    let steps = match graph_steps(&document, &timings) {
        Ok(steps) => steps,
        Err(e) => {
            warn!("{e}; skipping graph reveal");
            return;
        }
    };
    for step in steps {
        tokio::time::sleep(step.delay).await;
        if !sender.send(Action::GraphRevealed {
            generation,
            json: step.json,
        }) {
            return;
        }
    }
}
