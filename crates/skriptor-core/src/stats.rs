use std::sync::Arc;

use crate::api::Backend;
use crate::gateway::{Call, RequestGateway};
use crate::status::{Badge, BadgeTier};

/// Generated-scripts counter with a badge that flips once a threshold is reached.
pub struct StatsWidget {
    backend: Arc<dyn Backend>,
    gateway: RequestGateway,
    threshold: u64,
    count: Option<u64>,
    reached: bool,
}

impl StatsWidget {
    pub fn new(backend: Arc<dyn Backend>, gateway: RequestGateway, threshold: u64) -> Self {
        Self {
            backend,
            gateway,
            threshold,
            count: None,
            reached: false,
        }
    }

    pub fn count(&self) -> Option<u64> {
        self.count
    }

    pub fn threshold_reached(&self) -> bool {
        self.reached
    }

    pub fn badge(&self) -> Badge {
        if self.reached {
            Badge::new(BadgeTier::Success, format!("{}+ scripts", self.threshold))
        } else {
            Badge::new(BadgeTier::Neutral, format!("goal: {}", self.threshold))
        }
    }

    /// Failures are logged only; the last known count stays.
    pub async fn refresh(&mut self) -> Option<u64> {
        let outcome = self
            .gateway
            .execute(Call::new("Failed to load statistics").quiet(), self.backend.usage_stats())
            .await;

        if let Ok(stats) = outcome {
            self.count = Some(stats.generated_scripts_count);
            if stats.generated_scripts_count >= self.threshold && !self.reached {
                tracing::info!(count = stats.generated_scripts_count, "script goal reached");
                self.reached = true;
            }
        }
        self.count
    }
}
