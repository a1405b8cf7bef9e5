//! Uniform wrapper around user-facing backend calls.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::api::{ApiResult, Envelope};
use crate::error::GatewayError;
use crate::notify::Notifier;

pub type Outcome<T> = Result<T, GatewayError>;

/// How a single call presents itself to the user.
#[derive(Debug, Clone, Copy)]
pub struct Call<'a> {
    failure: &'a str,
    busy_label: Option<&'a str>,
    quiet: bool,
}

impl<'a> Call<'a> {
    /// `failure` prefixes the alert raised when the call fails.
    pub fn new(failure: &'a str) -> Self {
        Self {
            failure,
            busy_label: None,
            quiet: false,
        }
    }

    /// Show the busy indicator with `label` while the call is in flight.
    pub fn busy(mut self, label: &'a str) -> Self {
        self.busy_label = Some(label);
        self
    }

    /// Log failures instead of alerting.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct RequestGateway {
    notifier: Notifier,
    deadline: Duration,
    cancel: Arc<Mutex<CancellationToken>>,
}

impl RequestGateway {
    pub fn new(notifier: Notifier, deadline: Duration) -> Self {
        Self {
            notifier,
            deadline,
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Cancel every call currently in flight. Later calls are unaffected.
    pub fn abort(&self) {
        let mut token = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        token.cancel();
        *token = CancellationToken::new();
        tracing::info!("in-flight requests aborted");
    }

    fn token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn execute<T, F>(&self, call: Call<'_>, operation: F) -> Outcome<T>
    where
        F: Future<Output = ApiResult<T>>,
    {
        self.execute_then(call, operation, || {}).await
    }

    /// Runs `operation`, surfaces any failure, then runs `always` exactly once
    /// whichever branch fired. The busy indicator is hidden before `always` runs.
    pub async fn execute_then<T, F, A>(&self, call: Call<'_>, operation: F, always: A) -> Outcome<T>
    where
        F: Future<Output = ApiResult<T>>,
        A: FnOnce(),
    {
        let outcome = {
            let _busy = call.busy_label.map(|label| self.notifier.show_busy(label));
            self.dispatch(operation).await
        };

        if let Err(err) = &outcome {
            self.surface(&call, err);
        }

        always();
        outcome
    }

    async fn dispatch<T, F>(&self, operation: F) -> Outcome<T>
    where
        F: Future<Output = ApiResult<T>>,
    {
        let token = self.token();

        tokio::select! {
            _ = token.cancelled() => Err(GatewayError::Cancelled),
            result = tokio::time::timeout(self.deadline, operation) => match result {
                Err(_) => Err(GatewayError::Timeout(self.deadline)),
                Ok(Err(transport)) => Err(transport.into()),
                Ok(Ok(Envelope::Failure(message))) => Err(GatewayError::Application(message)),
                Ok(Ok(Envelope::Success(payload))) => Ok(payload),
            },
        }
    }

    fn surface(&self, call: &Call<'_>, err: &GatewayError) {
        if call.quiet {
            tracing::warn!(error = %err, "{}", call.failure);
            return;
        }
        self.notifier.alert(format!("{}: {}", call.failure, err));
    }
}
