//! Remote abort and yield: two queues named after this host, each carrying
//! a job id. A command that doesn't match the task currently running is a
//! no-op — by the time it would arrive, the job has usually already moved
//! on, and `update_job`'s own guard is what actually protects state.

use std::sync::{Arc, Mutex};

use message_bus::{ack, BusConnection, ManualAckConsumer};
use scheduler_types::{queues, JobId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Clone)]
pub(crate) struct CurrentTask {
    pub job_id: JobId,
    pub abort_token: CancellationToken,
    pub yield_token: CancellationToken,
}

pub(crate) type CurrentTaskSlot = Arc<Mutex<Option<CurrentTask>>>;

pub(crate) fn spawn_command_listener(
    bus: BusConnection,
    queue_name: String,
    current: CurrentTaskSlot,
    select_token: impl Fn(&CurrentTask) -> &CancellationToken + Send + 'static,
) {
    tokio::spawn(async move {
        let channel = match bus.channel().await {
            Ok(channel) => channel,
            Err(err) => {
                warn!(%err, queue_name, "failed to open channel for command listener");
                return;
            }
        };
        let mut consumer = match ManualAckConsumer::new(channel, &queue_name, 1).await {
            Ok(consumer) => consumer,
            Err(err) => {
                warn!(%err, queue_name, "failed to start command listener");
                return;
            }
        };

        while let Some(delivery) = consumer.next().await {
            let delivery = match delivery {
                Ok(delivery) => delivery,
                Err(err) => {
                    warn!(%err, queue_name, "command listener consumer error, stopping");
                    return;
                }
            };

            let job_id: Option<JobId> = serde_json::from_slice(&delivery.data).ok();
            if let Err(err) = ack(&delivery).await {
                warn!(%err, "failed to ack worker command");
            }

            let Some(job_id) = job_id else {
                warn!(queue_name, "dropping malformed worker command payload");
                continue;
            };

            let guard = current.lock().unwrap();
            if matches_running_task(guard.as_ref(), job_id) {
                select_token(guard.as_ref().unwrap()).cancel();
            } else {
                debug!(%job_id, queue_name, "command did not match the currently running job, ignoring");
            }
        }
    });
}

fn matches_running_task(current: Option<&CurrentTask>, job_id: JobId) -> bool {
    current.is_some_and(|task| task.job_id == job_id)
}

pub(crate) fn abort_queue_name(hostname: &str) -> String {
    queues::abort_queue(hostname)
}

pub(crate) fn yield_queue_name(hostname: &str) -> String {
    queues::yield_queue(hostname)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_only_the_currently_running_job() {
        let running = CurrentTask {
            job_id: JobId::new(1),
            abort_token: CancellationToken::new(),
            yield_token: CancellationToken::new(),
        };
        assert!(matches_running_task(Some(&running), JobId::new(1)));
        assert!(!matches_running_task(Some(&running), JobId::new(2)));
        assert!(!matches_running_task(None, JobId::new(1)));
    }

    #[test]
    fn queue_names_are_namespaced_by_hostname() {
        assert_eq!(abort_queue_name("host-a"), "workers.host-a.abort_job");
        assert_eq!(yield_queue_name("host-a"), "workers.host-a.yield_job");
    }
}
