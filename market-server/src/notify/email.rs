//! Email channel via AWS SES (fallback)

use super::{NotificationChannel, NotificationMessage, SendError};
use async_trait::async_trait;
use aws_sdk_sesv2::Client as SesClient;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use shared::models::ChannelKind;

pub struct SesEmailChannel {
    ses: SesClient,
    from: String,
}

impl SesEmailChannel {
    pub fn new(ses: SesClient, from: String) -> Self {
        Self { ses, from }
    }

    /// Client from the default AWS credential chain, honouring `SES_REGION`
    pub async fn from_env(from: String) -> Self {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let ses = if let Ok(ses_region) = std::env::var("SES_REGION") {
            let ses_config = aws_config
                .to_builder()
                .region(aws_config::Region::new(ses_region))
                .build();
            SesClient::new(&ses_config)
        } else {
            SesClient::new(&aws_config)
        };
        Self::new(ses, from)
    }
}

fn content(data: &str) -> Result<Content, SendError> {
    Content::builder()
        .data(data)
        .charset("UTF-8")
        .build()
        .map_err(|e| SendError::Transport(e.to_string()))
}

#[async_trait]
impl NotificationChannel for SesEmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(&self, target: &str, message: &NotificationMessage) -> Result<(), SendError> {
        let body = Body::builder().text(content(&message.body)?).build();
        let email = Message::builder()
            .subject(content(&message.subject)?)
            .body(body)
            .build();

        self.ses
            .send_email()
            .from_email_address(&self.from)
            .destination(Destination::builder().to_addresses(target).build())
            .content(EmailContent::builder().simple(email).build())
            .send()
            .await
            .map_err(|e| SendError::Transport(format!("{}", aws_sdk_sesv2::error::DisplayErrorContext(&e))))?;

        tracing::debug!(to = target, "Notification email sent");
        Ok(())
    }
}
