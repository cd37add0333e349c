//! CrisisAlert trait: notifies caregivers when a turn escalates to crisis.

use async_trait::async_trait;
use crate::emotion::RiskLevel;
use crate::error::AlertError;

/// Fire-and-forget crisis notification.
///
/// Callers log a returned error and carry on; a failed alert never changes
/// the reply of the turn that triggered it.
#[async_trait]
pub trait CrisisAlert: Send + Sync {
    async fn notify(
        &self,
        user_id: &str,
        risk_level: RiskLevel,
        last_message: &str,
    ) -> std::result::Result<(), AlertError>;
}
