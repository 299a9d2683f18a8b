use anyhow::{anyhow, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::ConversationGateway;
use crate::capture::AudioPayload;
use crate::config::ServiceConfig;
use crate::error::BridgeError;
use crate::model::{Conversation, Message, SenderRole, SummaryResponse};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateConversationRequest<'a> {
    doctor_language: &'a str,
    patient_language: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextMessageRequest<'a> {
    conversation_id: &'a str,
    sender_role: SenderRole,
    text: &'a str,
}

/// reqwest-backed implementation of the bridge service contract.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Treat any non-2xx status as a plain failure; the service does not send
/// structured error bodies the client could act on.
fn into_result(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(anyhow!("service returned {status}"))
    }
}

#[async_trait::async_trait]
impl ConversationGateway for HttpGateway {
    async fn create_conversation(
        &self,
        doctor_language: &str,
        patient_language: &str,
    ) -> Result<Conversation, BridgeError> {
        debug!("creating conversation ({doctor_language} / {patient_language})");

        let attempt = async {
            let response = self
                .client
                .post(self.url("/conversations"))
                .json(&CreateConversationRequest {
                    doctor_language,
                    patient_language,
                })
                .send()
                .await?;
            let response = into_result(response)?;
            Ok::<_, anyhow::Error>(response.json::<Conversation>().await?)
        };

        attempt.await.map_err(BridgeError::ServiceUnreachable)
    }

    async fn send_text(
        &self,
        conversation_id: &str,
        sender_role: SenderRole,
        text: &str,
    ) -> Result<Message, BridgeError> {
        debug!("sending text message as {sender_role} to {conversation_id}");

        let attempt = async {
            let response = self
                .client
                .post(self.url("/messages/text"))
                .json(&TextMessageRequest {
                    conversation_id,
                    sender_role,
                    text,
                })
                .send()
                .await?;
            let response = into_result(response)?;
            Ok::<_, anyhow::Error>(response.json::<Message>().await?)
        };

        attempt.await.map_err(BridgeError::SendFailed)
    }

    async fn send_audio(
        &self,
        conversation_id: &str,
        sender_role: SenderRole,
        payload: AudioPayload,
    ) -> Result<Message, BridgeError> {
        debug!(
            "sending voice message as {sender_role} to {conversation_id} ({} bytes)",
            payload.bytes.len()
        );

        let attempt = async {
            let part = reqwest::multipart::Part::bytes(payload.bytes)
                .file_name("message.wav")
                .mime_str(payload.content_type)?;
            let form = reqwest::multipart::Form::new()
                .part("file", part)
                .text("conversationId", conversation_id.to_string())
                .text("senderRole", sender_role.as_str());

            let response = self
                .client
                .post(self.url("/messages/audio"))
                .multipart(form)
                .send()
                .await?;
            let response = into_result(response)?;
            Ok::<_, anyhow::Error>(response.json::<Message>().await?)
        };

        attempt.await.map_err(BridgeError::SendFailed)
    }

    async fn search(&self, query: &str) -> Result<Vec<Message>, BridgeError> {
        debug!("searching messages: {query:?}");

        let attempt = async {
            let response = self
                .client
                .get(self.url("/search"))
                .query(&[("query", query)])
                .send()
                .await?;
            let response = into_result(response)?;
            Ok::<_, anyhow::Error>(response.json::<Vec<Message>>().await?)
        };

        attempt.await.map_err(BridgeError::SearchFailed)
    }

    async fn summarize(&self, conversation_id: &str) -> Result<SummaryResponse, BridgeError> {
        debug!("requesting summary for {conversation_id}");

        let attempt = async {
            let response = self
                .client
                .post(self.url(&format!("/summary/{conversation_id}")))
                .send()
                .await?;
            let response = into_result(response)?;
            Ok::<_, anyhow::Error>(response.json::<SummaryResponse>().await?)
        };

        attempt.await.map_err(BridgeError::SummaryFailed)
    }
}
