//! Background task runner
//!
//! Runs one blocking unit of work off the async executor and delivers its
//! events back to the caller in submission order: zero or more progress
//! chunks, then exactly one terminal event.

use tokio::sync::mpsc;

/// Notification delivered back to the submitting context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// A chunk of partial output
    Progress(String),
    /// Terminal: the task's final payload
    Completed(String),
    /// Terminal: a serialized failure document
    Failed(String),
}

impl TaskEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskEvent::Completed(_) | TaskEvent::Failed(_))
    }
}

/// Sender half handed to the unit of work for interim output
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<TaskEvent>,
}

impl ProgressSink {
    /// Report a chunk of partial output. A closed channel means the caller
    /// dropped its handle; the chunk is silently discarded.
    pub fn progress(&self, chunk: impl Into<String>) {
        let _ = self.tx.send(TaskEvent::Progress(chunk.into()));
    }
}

/// Receiving half held by the submitting context
#[derive(Debug)]
pub struct TaskHandle {
    rx: mpsc::UnboundedReceiver<TaskEvent>,
}

impl TaskHandle {
    /// Next event, in submission order. Yields `None` once the terminal
    /// event has been taken.
    pub async fn recv(&mut self) -> Option<TaskEvent> {
        self.rx.recv().await
    }

    /// Discard progress events and wait for the terminal event.
    pub async fn wait(mut self) -> TaskEvent {
        loop {
            match self.rx.recv().await {
                Some(event) if event.is_terminal() => return event,
                Some(_) => continue,
                // only reachable if the worker panicked before reporting
                None => return TaskEvent::Failed("task ended without a result".to_string()),
            }
        }
    }
}

/// Run `job` on the blocking thread pool.
///
/// The job receives a [`ProgressSink`] for interim chunks; its return value
/// becomes the single terminal event, enqueued after every progress chunk
/// the job sent. Must be called from within a tokio runtime.
pub fn spawn<F>(job: F) -> TaskHandle
where
    F: FnOnce(&ProgressSink) -> std::result::Result<String, String> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = ProgressSink { tx: tx.clone() };
    tokio::task::spawn_blocking(move || {
        let event = match job(&sink) {
            Ok(payload) => TaskEvent::Completed(payload),
            Err(message) => TaskEvent::Failed(message),
        };
        let _ = tx.send(event);
    });
    TaskHandle { rx }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_progress_precedes_terminal() {
        let mut handle = spawn(|sink| {
            sink.progress("one");
            sink.progress("two");
            Ok("done".to_string())
        });
        assert_eq!(handle.recv().await, Some(TaskEvent::Progress("one".into())));
        assert_eq!(handle.recv().await, Some(TaskEvent::Progress("two".into())));
        assert_eq!(handle.recv().await, Some(TaskEvent::Completed("done".into())));
        assert_eq!(handle.recv().await, None);
    }

    #[tokio::test]
    async fn test_failure_is_terminal() {
        let handle = spawn(|sink| {
            sink.progress("partial");
            Err("it broke".to_string())
        });
        assert_eq!(handle.wait().await, TaskEvent::Failed("it broke".into()));
    }

    #[tokio::test]
    async fn test_wait_skips_progress() {
        let handle = spawn(|sink| {
            for i in 0..5 {
                sink.progress(format!("chunk {}", i));
            }
            Ok("payload".to_string())
        });
        assert_eq!(handle.wait().await, TaskEvent::Completed("payload".into()));
    }

    #[tokio::test]
    async fn test_caller_is_not_blocked_by_the_job() {
        let mut handle = spawn(|_| {
            std::thread::sleep(std::time::Duration::from_millis(50));
            Ok("slept".to_string())
        });
        // runs concurrently with the sleeping job
        let side_work = async { 21 * 2 };
        assert_eq!(side_work.await, 42);
        assert_eq!(handle.recv().await, Some(TaskEvent::Completed("slept".into())));
    }
}
