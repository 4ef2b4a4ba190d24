use std::sync::Arc;

use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    time::{Duration, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    cache::{
        announcement::AnnouncementCache,
        featured::{FeaturedSpeakerCache, FeaturedUpdate},
        CacheError,
    },
    config::WorkerConfig,
};

use super::{
    events::TaskEvent,
    queue::{ConfirmationEmail, Job, QueueError, TaskQueue},
};

/// Failure of a single job attempt.
#[derive(Debug, Error)]
pub enum JobError {
    /// Reading or writing a cache slot failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// The notifier rejected a message.
    #[error("notification failed: {0}")]
    Notify(String),
    /// The blocking task running the job panicked or was cancelled.
    #[error("job task aborted: {0}")]
    Aborted(String),
}

/// Handle-side failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WorkerError {
    /// The worker loop has exited.
    #[error("task worker channel closed")]
    ChannelClosed,
}

/// Outbound message seam for confirmation jobs.
pub trait Notifier: Send + Sync {
    /// Delivers one confirmation.
    fn send_confirmation(&self, email: &ConfirmationEmail) -> Result<(), JobError>;
}

/// [`Notifier`] that only records the message in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send_confirmation(&self, email: &ConfirmationEmail) -> Result<(), JobError> {
        info!(
            to = %email.to,
            subject = ConfirmationEmail::SUBJECT,
            conference = %email.conference_name,
            "confirmation email"
        );
        Ok(())
    }
}

/// Everything a job may touch.
#[derive(Clone)]
pub struct JobContext {
    pub featured: FeaturedSpeakerCache,
    pub announcements: AnnouncementCache,
    pub notifier: Arc<dyn Notifier>,
}

enum JobOutcome {
    Featured(FeaturedUpdate),
    Announcement(bool),
    Notified,
}

impl JobContext {
    fn run(&self, job: &Job) -> Result<JobOutcome, JobError> {
        match job {
            Job::FeaturedSpeaker(job) => Ok(JobOutcome::Featured(self.featured.apply(job)?)),
            Job::ConfirmationEmail(email) => {
                self.notifier.send_confirmation(email)?;
                Ok(JobOutcome::Notified)
            }
            Job::RecomputeAnnouncement => {
                let text = self.announcements.recompute()?;
                Ok(JobOutcome::Announcement(!text.is_empty()))
            }
        }
    }
}

enum Command {
    Job(Job),
    Drain { resp: oneshot::Sender<()> },
    Shutdown { resp: oneshot::Sender<()> },
}

/// Cloneable handle to the worker; also the crate's [`TaskQueue`].
#[derive(Clone)]
pub struct TaskWorkerHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<TaskEvent>,
}

/// Spawns the worker loop on the current tokio runtime.
///
/// Jobs run one at a time in submission order. When
/// `announcement_interval_ms` is non-zero the announcement is also rebuilt on
/// that period.
pub fn spawn_task_worker(context: JobContext, config: WorkerConfig) -> TaskWorkerHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.queue_bound.max(1));
    let (events_tx, _) = broadcast::channel::<TaskEvent>(config.event_capacity.max(1));
    let events_tx_loop = events_tx.clone();

    tokio::spawn(async move {
        let ticking = config.announcement_interval_ms > 0;
        let period = Duration::from_millis(config.announcement_interval_ms.max(1));
        let mut tick = tokio::time::interval_at(Instant::now() + period, period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break; };
                    match cmd {
                        Command::Job(job) => {
                            run_job(&context, job, config.job_max_attempts, &events_tx_loop).await;
                        }
                        Command::Drain { resp } => {
                            let _ = resp.send(());
                        }
                        Command::Shutdown { resp } => {
                            let _ = resp.send(());
                            break;
                        }
                    }
                }
                _ = tick.tick(), if ticking => {
                    run_job(&context, Job::RecomputeAnnouncement, config.job_max_attempts, &events_tx_loop).await;
                }
            }
        }
        debug!("task worker stopped");
    });

    TaskWorkerHandle { cmd_tx, events_tx }
}

async fn run_job(
    context: &JobContext,
    job: Job,
    max_attempts: u32,
    events_tx: &broadcast::Sender<TaskEvent>,
) {
    let kind = job.kind();
    let context = context.clone();
    let max_attempts = max_attempts.max(1);

    let joined = tokio::task::spawn_blocking(move || {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match context.run(&job) {
                Ok(outcome) => return (attempts, Ok(outcome)),
                Err(err) if attempts < max_attempts => {
                    debug!(%kind, attempts, error = %err, "job attempt failed, retrying");
                }
                Err(err) => return (attempts, Err(err)),
            }
        }
    })
    .await;

    let (attempts, result) = match joined {
        Ok(done) => done,
        Err(e) => (1, Err(JobError::Aborted(e.to_string()))),
    };

    match result {
        Ok(outcome) => {
            match outcome {
                JobOutcome::Featured(update) => {
                    let _ = events_tx.send(TaskEvent::FeaturedSpeaker { update });
                }
                JobOutcome::Announcement(present) => {
                    let _ = events_tx.send(TaskEvent::AnnouncementRefreshed { present });
                }
                JobOutcome::Notified => {}
            }
            let _ = events_tx.send(TaskEvent::JobCompleted { kind, attempts });
        }
        Err(err) => {
            warn!(%kind, attempts, error = %err, "job dropped after final attempt");
            let _ = events_tx.send(TaskEvent::JobFailed {
                kind,
                attempts,
                message: err.to_string(),
            });
        }
    }
}

impl TaskWorkerHandle {
    /// Subscribes to worker events.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events_tx.subscribe()
    }

    /// Resolves once every job enqueued before this call has run.
    pub async fn drain(&self) -> Result<(), WorkerError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Drain { resp: tx })
            .await
            .map_err(|_| WorkerError::ChannelClosed)?;
        rx.await.map_err(|_| WorkerError::ChannelClosed)
    }

    /// Runs the jobs already queued, then stops the loop.
    pub async fn shutdown(&self) -> Result<(), WorkerError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .await
            .map_err(|_| WorkerError::ChannelClosed)?;
        rx.await.map_err(|_| WorkerError::ChannelClosed)
    }
}

impl TaskQueue for TaskWorkerHandle {
    fn enqueue(&self, job: Job) -> Result<(), QueueError> {
        self.cmd_tx.try_send(Command::Job(job)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }
}
