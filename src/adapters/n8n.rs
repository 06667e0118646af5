//! Connector for the n8n workflows behind IssueCoin: event notifications,
//! receipt OCR, deal search, the MCP planning agent and Whisper STT.

use crate::config::N8nConfig;
use crate::domain::model::PurchaseItem;
use crate::utils::error::{Result, TrackerError};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::time::Duration;

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Notify,
    Ocr,
    Deals,
    Mcp,
    Stt,
}

impl Hook {
    pub fn name(self) -> &'static str {
        match self {
            Hook::Notify => "notify",
            Hook::Ocr => "ocr",
            Hook::Deals => "deals",
            Hook::Mcp => "mcp",
            Hook::Stt => "stt",
        }
    }
}

/// A file sent as the multipart `file` field.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct N8nClient {
    client: Client,
    config: N8nConfig,
}

impl N8nClient {
    pub fn new(config: N8nConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &N8nConfig {
        &self.config
    }

    pub fn url(&self, hook: Hook) -> &str {
        match hook {
            Hook::Notify => &self.config.webhook_url,
            Hook::Ocr => &self.config.ocr_url,
            Hook::Deals => &self.config.deals_url,
            Hook::Mcp => &self.config.mcp_url,
            Hook::Stt => &self.config.stt_url,
        }
    }

    pub fn is_configured(&self, hook: Hook) -> bool {
        !self.url(hook).is_empty()
    }

    /// Fire-and-forget event for the automation side. Never fails the caller.
    pub async fn notify(&self, event: &Value) {
        let url = self.url(Hook::Notify);
        if url.is_empty() {
            tracing::debug!("n8n notify webhook not set, skipping event");
            return;
        }

        match self
            .client
            .post(url)
            .json(event)
            .timeout(NOTIFY_TIMEOUT)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("📨 n8n event delivered ({})", response.status());
            }
            Ok(response) => {
                tracing::warn!("n8n event rejected with status {}", response.status());
            }
            Err(e) => tracing::warn!("n8n event not delivered: {}", e),
        }
    }

    pub async fn post_json(&self, hook: Hook, payload: &Value) -> Result<Value> {
        let request = self.client.post(self.require(hook)?).json(payload);
        self.send(hook, request).await
    }

    pub async fn post_file(
        &self,
        hook: Hook,
        fields: &[(&str, &str)],
        upload: Upload,
    ) -> Result<Value> {
        let url = self.require(hook)?;

        let mut form = Form::new();
        for (name, value) in fields {
            form = form.text(name.to_string(), value.to_string());
        }
        let mime = guess_mime(&upload.filename);
        let part = Part::bytes(upload.bytes)
            .file_name(upload.filename)
            .mime_str(mime)?;
        form = form.part("file", part);

        let request = self.client.post(url).multipart(form);
        self.send(hook, request).await
    }

    pub async fn send_receipt_to_ocr(&self, upload: Upload, store_hint: &str) -> Result<Value> {
        tracing::info!("🔠 Sending {} to n8n OCR", upload.filename);
        self.post_file(Hook::Ocr, &[("store_hint", store_hint)], upload)
            .await
    }

    pub async fn ask_deals(
        &self,
        address: &str,
        stores: &[String],
        items: &[PurchaseItem],
    ) -> Result<Value> {
        let payload = json!({
            "address": address,
            "stores": stores,
            "items": items,
        });
        self.post_json(Hook::Deals, &payload).await
    }

    pub async fn ask_mcp_plan(&self, context: &Value) -> Result<Value> {
        self.post_json(Hook::Mcp, context).await
    }

    /// Speech-to-text through the Whisper workflow.
    pub async fn transcribe(&self, upload: Upload) -> Result<String> {
        tracing::info!("🎙️ Transcribing {}", upload.filename);
        let reply = self.post_file(Hook::Stt, &[], upload).await?;
        match reply {
            Value::String(text) => Ok(text),
            Value::Object(ref obj) => obj
                .get("text")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    TrackerError::processing("STT reply has no 'text' field".to_string())
                }),
            other => Err(TrackerError::processing(format!(
                "unexpected STT reply: {}",
                other
            ))),
        }
    }

    fn require(&self, hook: Hook) -> Result<&str> {
        let url = self.url(hook);
        if url.is_empty() {
            return Err(TrackerError::WebhookNotConfigured {
                hook: hook.name().to_string(),
            });
        }
        Ok(url)
    }

    async fn send(&self, hook: Hook, request: RequestBuilder) -> Result<Value> {
        let timeout = Duration::from_secs(self.config.timeout_seconds);
        tracing::debug!("Calling n8n '{}' webhook", hook.name());

        let response = request.timeout(timeout).send().await?;
        let status = response.status();
        tracing::debug!("n8n '{}' response status: {}", hook.name(), status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::WebhookError {
                hook: hook.name().to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("application/json"))
            .unwrap_or(false);

        if is_json {
            Ok(response.json().await?)
        } else {
            Ok(Value::String(response.text().await?))
        }
    }
}

pub fn guess_mime(filename: &str) -> &'static str {
    let ext = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "txt" => "text/plain",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "wav" => "audio/wav",
        "ogg" | "oga" => "audio/ogg",
        "webm" => "audio/webm",
        _ => "application/octet-stream",
    }
}
