//! Bulk Handler
//!
//! Applies one resolve action to a batch. Every request is resolved in its
//! own transaction, so one failure never rolls back another.

use sqlx::SqlitePool;

use crate::domain::{DomainError, OperationContext};
use crate::error::AppResult;

use super::{BulkItemResult, BulkResolveCommand, BulkResolveResult, RequestHandler, ResolveCommand};

pub struct BulkResolveHandler {
    requests: RequestHandler,
}

impl BulkResolveHandler {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_request_handler(RequestHandler::new(pool))
    }

    pub fn with_request_handler(requests: RequestHandler) -> Self {
        Self { requests }
    }

    /// Resolve each request in order; an empty batch is a validation error
    pub async fn execute(&self, command: BulkResolveCommand, context: &OperationContext) -> AppResult<BulkResolveResult> {
        if command.request_ids.is_empty() {
            return Err(DomainError::InvalidRequest("No requests selected".to_string()).into());
        }

        let mut results = Vec::with_capacity(command.request_ids.len());
        for request_id in &command.request_ids {
            let resolve = ResolveCommand::new(*request_id, command.action, command.actor_id);
            let item = match self.requests.resolve(resolve, context).await {
                Ok(resolved) => BulkItemResult {
                    request_id: *request_id,
                    success: true,
                    status: Some(resolved.request.status),
                    error_code: None,
                    message: None,
                },
                Err(e) => {
                    let response = e.to_response();
                    tracing::warn!(
                        request_id = %request_id,
                        error_code = %response.error_code,
                        "Bulk item failed"
                    );
                    BulkItemResult {
                        request_id: *request_id,
                        success: false,
                        status: None,
                        error_code: Some(response.error_code),
                        message: Some(response.error),
                    }
                }
            };
            results.push(item);
        }

        let processed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - processed;

        tracing::info!(
            actor_id = %command.actor_id,
            action = ?command.action,
            processed = processed,
            failed = failed,
            correlation_id = %context.correlation(),
            "Bulk resolve finished"
        );

        Ok(BulkResolveResult {
            processed,
            failed,
            results,
        })
    }
}
