//! Transactional email client and templates

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;

use super::{http_client, AdapterError};
use crate::config::MailConfig;

const SERVICE: &str = "mail";

/// Result of a successful send
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryInfo {
    pub message_id: Option<String>,
}

/// Outbound email transport
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str)
        -> Result<DeliveryInfo, AdapterError>;
}

/// Client for a SendGrid-style JSON mail API
#[derive(Clone)]
pub struct HttpMailer {
    http_client: Client,
    api_url: String,
    api_key: Option<String>,
    from_address: String,
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: &'a str,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 1],
}

impl HttpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, AdapterError> {
        Ok(Self {
            http_client: http_client(SERVICE, config.timeout_secs)?,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<DeliveryInfo, AdapterError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AdapterError::Unconfigured("mail transport"))?;

        shared::validate_email(to).map_err(|e| AdapterError::Rejected {
            service: SERVICE,
            status: 400,
            body: format!("{}: {}", e, to),
        })?;

        let request = SendRequest {
            personalizations: [Personalization {
                to: [Address { email: to }],
            }],
            from: Address {
                email: &self.from_address,
            },
            subject,
            content: [Content {
                content_type: "text/html",
                value: html_body,
            }],
        };

        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AdapterError::transport(SERVICE, e))?;

        let response = AdapterError::check(SERVICE, response).await?;
        let message_id = response
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        tracing::info!(to, subject, "Email sent");
        Ok(DeliveryInfo { message_id })
    }
}

// ============================================================================
// Templates
// ============================================================================

/// Subject and HTML body for the "certification approved" email
pub fn certification_approved_email(
    vendor_name: &str,
    product_name: &str,
    certificate_number: &str,
    expiry_date: DateTime<Utc>,
) -> (String, String) {
    let subject = format!("Halal certification approved: {}", product_name);
    let body = format!(
        "<h1>Certification approved</h1>\
         <p>Dear {vendor},</p>\
         <p>Your product <strong>{product}</strong> has been granted halal certification.</p>\
         <ul>\
         <li>Certificate number: <strong>{number}</strong></li>\
         <li>Valid until: {expiry}</li>\
         </ul>\
         <p>Customers can verify this certificate at any time using its number.</p>",
        vendor = escape_html(vendor_name),
        product = escape_html(product_name),
        number = escape_html(certificate_number),
        expiry = expiry_date.format("%Y-%m-%d"),
    );
    (subject, body)
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
