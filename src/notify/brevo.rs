// src/notify/brevo.rs

use super::{listing_email, subject_for, Notifier};
use crate::domain::listing::SeenListing;
use crate::errors::NotifyError;
use reqwest::blocking::Client;
use serde::Serialize;
use std::time::Duration;

const BREVO_ENDPOINT: &str = "https://api.brevo.com/v3/smtp/email";

pub struct BrevoMailer {
    api_key: String,
    sender_email: String,
    sender_name: String,
    endpoint: String,
    client: Client,
}

#[derive(Serialize)]
struct BrevoSender<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct BrevoRecipient<'a> {
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoPayload<'a> {
    sender: BrevoSender<'a>,
    to: Vec<BrevoRecipient<'a>>,
    subject: String,
    html_content: String,
}

impl BrevoMailer {
    pub fn new(
        api_key: String,
        sender_email: String,
        sender_name: String,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NotifyError::ClientSetup(e.to_string()))?;

        Ok(Self {
            api_key,
            sender_email,
            sender_name,
            endpoint: BREVO_ENDPOINT.to_string(),
            client,
        })
    }

    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl Notifier for BrevoMailer {
    fn notify(&self, seen: &SeenListing, to: &str) -> Result<(), NotifyError> {
        let payload = BrevoPayload {
            sender: BrevoSender {
                name: &self.sender_name,
                email: &self.sender_email,
            },
            to: vec![BrevoRecipient { email: to }],
            subject: subject_for(seen),
            html_content: listing_email(seen).into_string(),
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .json(&payload)
            .send()
            .map_err(|e| NotifyError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_body = resp.text().unwrap_or_else(|_| "(no body)".to_string());
            return Err(NotifyError::ApiError(format!("{status} - {error_body}")));
        }

        Ok(())
    }
}
