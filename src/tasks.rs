use std::future::Future;

use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, info_span};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
pub struct TaskRunner;

/// Accepted job. Dropping the handle detaches the job; it keeps running.
#[derive(Debug)]
pub struct TaskHandle<T> {
    name: String,
    join: JoinHandle<AppResult<T>>,
}

impl TaskRunner {
    pub fn new() -> Self {
        Self
    }

    pub fn submit<F, T>(&self, name: impl Into<String>, job: F) -> TaskHandle<T>
    where
        F: Future<Output = AppResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let name = name.into();
        let span = info_span!("task", name = %name);
        let task_name = name.clone();

        let join = tokio::spawn(
            async move {
                info!("task started");
                let result = job.await;
                match &result {
                    Ok(_) => info!("task finished"),
                    Err(err) => error!(error = %err, task = %task_name, "task failed"),
                }
                result
            }
            .instrument(span),
        );

        TaskHandle { name, join }
    }
}

impl<T> TaskHandle<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn wait(self) -> AppResult<T> {
        match self.join.await {
            Ok(result) => result,
            Err(join_err) => {
                error!(task = %self.name, error = %join_err, "task aborted");
                Err(AppError::Task(format!("{}: {join_err}", self.name)))
            }
        }
    }
}
