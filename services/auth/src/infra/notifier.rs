use anyhow::Context as _;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection};
use serde_json::json;
use uuid::Uuid;

use keeper_auth_schema::outbox_events;

use crate::domain::repository::Notifier;
use crate::domain::types::OtpNotice;

/// Outbox event kind picked up by the mailer.
pub const OTP_ISSUED: &str = "otp_issued";

/// Queues one-time code emails in `outbox_events` for an external mailer.
#[derive(Clone)]
pub struct OutboxNotifier {
    pub db: DatabaseConnection,
}

impl Notifier for OutboxNotifier {
    async fn notify_one_time_code(&self, notice: OtpNotice) -> anyhow::Result<()> {
        outbox_events::ActiveModel {
            id: Set(Uuid::now_v7()),
            kind: Set(OTP_ISSUED.to_owned()),
            recipient: Set(notice.email.clone()),
            payload: Set(json!({
                "name": notice.name,
                "email": notice.email,
                "code": notice.code,
            })),
            created_at: Set(Utc::now()),
            dispatched_at: Set(None),
        }
        .insert(&self.db)
        .await
        .context("queue otp_issued event")?;
        Ok(())
    }
}
