//! Default crisis alert: a `warn` log line plus a `CrisisEscalated` event.
//!
//! Delivery to caregivers (SMS, push) subscribes to the event bus.

use async_trait::async_trait;
use carebridge_core::alert::CrisisAlert;
use carebridge_core::emotion::RiskLevel;
use carebridge_core::error::AlertError;
use carebridge_core::event::{DomainEvent, EventBus, preview};
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

const PREVIEW_CHARS: usize = 40;

pub struct LoggingCrisisAlert {
    events: Arc<EventBus>,
}

impl LoggingCrisisAlert {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl CrisisAlert for LoggingCrisisAlert {
    async fn notify(&self, user_id: &str, risk_level: RiskLevel, last_message: &str) -> Result<(), AlertError> {
        let message_preview = preview(last_message, PREVIEW_CHARS);
        warn!(
            user_id,
            risk_level = risk_level.as_u8(),
            message = %message_preview,
            "CRISIS ALERT: caregiver notification required"
        );
        self.events.publish(DomainEvent::CrisisEscalated {
            user_id: user_id.to_string(),
            risk_level,
            message_preview,
            timestamp: Utc::now(),
        });
        Ok(())
    }
}
