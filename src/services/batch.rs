use crate::services::logger::Logger;
use crate::services::request_executor::{
    catch_panic, Dispatch, ErrorKind, ExecOptions, RequestSpec, ResultRecord,
};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Fans a list of raw request items out to a [`Dispatch`] implementation.
///
/// Every item yields exactly one record at its own index. Items that cannot
/// be turned into a [`RequestSpec`] become `invalid_request` records without
/// touching the network; the rest run concurrently on the calling task. A
/// panicking item becomes an `unknown` record in place.
#[derive(Clone)]
pub struct BatchCoordinator {
    logger: Logger,
    dispatcher: Arc<dyn Dispatch>,
}

impl BatchCoordinator {
    pub fn new(logger: Logger, dispatcher: Arc<dyn Dispatch>) -> Self {
        Self {
            logger: logger.child("batch"),
            dispatcher,
        }
    }

    pub async fn execute_batch(&self, items: &[Value], options: &ExecOptions) -> Vec<ResultRecord> {
        self.logger.info(
            "Starting batch request",
            Some(&serde_json::json!({
                "count": items.len(),
                "timeout": options.timeout_secs,
            })),
        );
        let started = Instant::now();

        let results = join_all(
            items
                .iter()
                .enumerate()
                .map(|(index, item)| self.run_item(index, item, options)),
        )
        .await;

        let failed = results.iter().filter(|record| !record.is_success()).count();
        self.logger.info(
            "Batch request completed",
            Some(&serde_json::json!({
                "count": results.len(),
                "failed": failed,
                "duration_ms": started.elapsed().as_millis() as u64,
            })),
        );
        results
    }

    async fn run_item(&self, index: usize, item: &Value, options: &ExecOptions) -> ResultRecord {
        match RequestSpec::from_args(item) {
            Ok(spec) => catch_panic(self.dispatcher.dispatch(&spec, options))
                .await
                .unwrap_or_else(|message| {
                    self.logger.error(
                        "Batch item panicked",
                        Some(&serde_json::json!({ "index": index, "message": message })),
                    );
                    ResultRecord::failure(ErrorKind::Unknown, message)
                }),
            Err(err) => {
                self.logger.debug(
                    "Rejected batch item",
                    Some(&serde_json::json!({ "index": index, "reason": err.to_string() })),
                );
                ResultRecord::invalid_request(err.to_string())
            }
        }
    }
}
