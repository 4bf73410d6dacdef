//! # SQS Message Source
//!
//! `MessageSource` backed by Amazon SQS (or any SQS-compatible endpoint such
//! as LocalStack) using the official AWS SDK.

use super::{validate_fetch_request, MessageSource};
use crate::config::QueueConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{AckEntry, AckFailure, RawMessage};
use aws_sdk_sqs::config::Region;
use aws_sdk_sqs::error::{DisplayErrorContext, SdkError};
use aws_sdk_sqs::types::DeleteMessageBatchRequestEntry;
use aws_sdk_sqs::Client;
use tracing::{debug, info, warn};

/// SQS client bound to a single queue
#[derive(Debug, Clone)]
pub struct SqsMessageSource {
    client: Client,
    queue_url: String,
    queue_name: String,
    wait_time_seconds: i32,
}

impl SqsMessageSource {
    /// Build a client from the default AWS credential chain
    pub async fn new(config: &QueueConfig) -> Self {
        info!(queue_url = %config.queue_url, region = %config.region, "Connecting to SQS");

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_sqs::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint_url {
            info!(endpoint = %endpoint, "Using custom SQS endpoint");
            builder = builder.endpoint_url(endpoint);
        }

        Self::from_client(
            Client::from_conf(builder.build()),
            &config.queue_url,
            config.wait_time_seconds,
        )
    }

    /// Wrap an already configured client (BYOC - Bring Your Own Client)
    pub fn from_client(client: Client, queue_url: &str, wait_time_seconds: i32) -> Self {
        Self {
            client,
            queue_url: queue_url.to_string(),
            queue_name: queue_name_from_url(queue_url).to_string(),
            wait_time_seconds,
        }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait::async_trait]
impl MessageSource for SqsMessageSource {
    async fn fetch(&self, max_batch: i32, lease_seconds: i32) -> PipelineResult<Vec<RawMessage>> {
        validate_fetch_request(max_batch, lease_seconds)?;

        debug!(
            queue = %self.queue_name,
            max_batch,
            lease_seconds,
            "Receiving messages from SQS"
        );

        let mut request = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_batch)
            .visibility_timeout(lease_seconds);
        if self.wait_time_seconds > 0 {
            request = request.wait_time_seconds(self.wait_time_seconds);
        }

        let output = request
            .send()
            .await
            .map_err(|e| PipelineError::source_unavailable(&self.queue_name, describe_sdk_error(&e)))?;

        let batch = output
            .messages()
            .iter()
            .map(|message| -> PipelineResult<RawMessage> {
                let message_id = message.message_id().ok_or_else(|| {
                    PipelineError::source_unavailable(&self.queue_name, "message without MessageId")
                })?;
                let receipt_handle = message.receipt_handle().ok_or_else(|| {
                    PipelineError::source_unavailable(
                        &self.queue_name,
                        format!("message {message_id} without ReceiptHandle"),
                    )
                })?;
                let body = message.body().unwrap_or_default();
                Ok(RawMessage::new(message_id, receipt_handle, body.as_bytes().to_vec()))
            })
            .collect::<PipelineResult<Vec<RawMessage>>>()?;

        debug!(queue = %self.queue_name, count = batch.len(), "Received SQS batch");
        Ok(batch)
    }

    async fn acknowledge(&self, entries: &[AckEntry]) -> PipelineResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let request_entries = entries
            .iter()
            .map(|entry| {
                DeleteMessageBatchRequestEntry::builder()
                    .id(&entry.message_id)
                    .receipt_handle(&entry.receipt_handle)
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                PipelineError::configuration("sqs", format!("invalid delete entry: {e}"))
            })?;

        let output = match self
            .client
            .delete_message_batch()
            .queue_url(&self.queue_url)
            .set_entries(Some(request_entries))
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                // The whole call failed, so none of the entries can be assumed deleted
                let reason = describe_sdk_error(&e);
                warn!(queue = %self.queue_name, count = entries.len(), error = %reason, "Batch delete failed");
                let failed = entries
                    .iter()
                    .map(|entry| AckFailure {
                        message_id: entry.message_id.clone(),
                        code: "TransportError".to_string(),
                        reason: Some(reason.clone()),
                    })
                    .collect();
                return Err(PipelineError::partial_ack(failed, 0));
            }
        };

        let failed: Vec<AckFailure> = output
            .failed()
            .iter()
            .map(|entry| AckFailure {
                message_id: entry.id().to_string(),
                code: entry.code().to_string(),
                reason: entry.message().map(str::to_string),
            })
            .collect();
        let succeeded = output.successful().len();

        if failed.is_empty() {
            debug!(queue = %self.queue_name, count = succeeded, "Deleted SQS batch");
            Ok(())
        } else {
            warn!(
                queue = %self.queue_name,
                successful = succeeded,
                failed = failed.len(),
                "Partial batch delete failure"
            );
            Err(PipelineError::partial_ack(failed, succeeded))
        }
    }

    fn queue_name(&self) -> &str {
        &self.queue_name
    }
}

/// Last path segment of a queue URL, e.g. `login-queue` for
/// `http://localhost:4566/000000000000/login-queue`
fn queue_name_from_url(queue_url: &str) -> &str {
    queue_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(queue_url)
}

fn describe_sdk_error<E>(err: &SdkError<E>) -> String
where
    E: std::error::Error + 'static,
{
    match err.raw_response().map(|response| response.status().as_u16()) {
        Some(status) => format!("HTTP {status}: {}", DisplayErrorContext(err)),
        None => DisplayErrorContext(err).to_string(),
    }
}
