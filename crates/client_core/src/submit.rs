//! The four-event submit protocol.
//!
//! Every request to the server is wrapped by a [`SubmitAction`]: `SEND` is
//! dispatched synchronously, then exactly one of `OK`, `FAIL` or
//! `NETWORK_FAIL` once the transport settles. Failures are converted into
//! store events and never escape to the caller's loop.

use std::sync::Arc;

use serde_json::Value;
use shared::error::ApiError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    action::{Action, ActionType, Operation, Phase},
    error::TransportError,
    store::Store,
    transport::{ApiRequest, Method, Transport},
};

/// Builds the request body (query for GET) from the submitted payload.
pub type BuildBody = fn(&Value) -> Option<Value>;

fn payload_as_body(payload: &Value) -> Option<Value> {
    (!payload.is_null()).then(|| payload.clone())
}

/// Transport plus store: everything a submission needs.
#[derive(Clone)]
pub struct SyncClient {
    transport: Arc<dyn Transport>,
    store: Store,
}

impl SyncClient {
    pub fn new(transport: Arc<dyn Transport>, store: Store) -> Self {
        Self { transport, store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SubmitAction {
    operation: Operation,
    method: Method,
    url: &'static str,
    build_body: BuildBody,
}

impl SubmitAction {
    pub const fn new(operation: Operation, method: Method, url: &'static str) -> Self {
        Self {
            operation,
            method,
            url,
            build_body: payload_as_body,
        }
    }

    pub const fn with_body(self, build_body: BuildBody) -> Self {
        Self { build_body, ..self }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn url(&self) -> &'static str {
        self.url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn send_type(&self) -> ActionType {
        ActionType::new(self.operation, Phase::Send)
    }

    pub fn ok_type(&self) -> ActionType {
        ActionType::new(self.operation, Phase::Ok)
    }

    pub fn fail_type(&self) -> ActionType {
        ActionType::new(self.operation, Phase::Fail)
    }

    pub fn network_fail_type(&self) -> ActionType {
        ActionType::new(self.operation, Phase::NetworkFail)
    }

    pub fn types(&self) -> [ActionType; 4] {
        [
            self.send_type(),
            self.ok_type(),
            self.fail_type(),
            self.network_fail_type(),
        ]
    }

    pub fn request(&self, payload: &Value) -> ApiRequest {
        ApiRequest {
            method: self.method,
            path: self.url.to_string(),
            body: (self.build_body)(payload),
        }
    }

    /// Dispatches `SEND` now and settles the request on a spawned task.
    /// Overlapping calls are independent; nothing is de-duplicated.
    pub fn submit(&self, client: &SyncClient, payload: Value) -> Submission {
        let request = self.request(&payload);
        debug!(operation = %self.operation, path = self.url, "submitting");
        client.store.dispatch(Action::Send {
            operation: self.operation,
            payload,
        });

        let client = client.clone();
        let operation = self.operation;
        let handle = tokio::spawn(async move { settle(&client, operation, request).await });
        Submission { operation, handle }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Ok(Value),
    Fail(ApiError),
    NetworkFail(TransportError),
}

impl SubmitOutcome {
    pub fn phase(&self) -> Phase {
        match self {
            SubmitOutcome::Ok(_) => Phase::Ok,
            SubmitOutcome::Fail(_) => Phase::Fail,
            SubmitOutcome::NetworkFail(_) => Phase::NetworkFail,
        }
    }
}

async fn settle(client: &SyncClient, operation: Operation, request: ApiRequest) -> SubmitOutcome {
    let outcome = match client.transport.request(request).await {
        Ok(res) if res.is_success() => SubmitOutcome::Ok(res.body),
        Ok(res) => SubmitOutcome::Fail(ApiError::from_response(res.status, &res.body)),
        Err(err) => SubmitOutcome::NetworkFail(err),
    };

    let action = match &outcome {
        SubmitOutcome::Ok(data) => Action::Ok {
            operation,
            data: data.clone(),
        },
        SubmitOutcome::Fail(error) => {
            warn!(%operation, %error, "request rejected");
            Action::Fail {
                operation,
                error: error.clone(),
            }
        }
        SubmitOutcome::NetworkFail(error) => {
            warn!(%operation, %error, "request failed in transit");
            Action::NetworkFail {
                operation,
                error: error.to_string(),
            }
        }
    };
    client.store.dispatch(action);
    outcome
}

/// A submission in flight. Dropping it does not cancel the request.
pub struct Submission {
    operation: Operation,
    handle: JoinHandle<SubmitOutcome>,
}

impl Submission {
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Waits for the terminal event to be dispatched.
    pub async fn outcome(self) -> SubmitOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(err) => SubmitOutcome::NetworkFail(TransportError::Connection(format!(
                "submission task ended early: {err}"
            ))),
        }
    }
}

#[cfg(test)]
#[path = "tests/submit_tests.rs"]
mod tests;
