//! Microsoft Graph client for the signed-in user's mailbox.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use relay_domain::error::HandlerError;
use relay_domain::time::Timestamp;

pub const DEFAULT_BASE_URL: &str = "https://graph.microsoft.com";

#[derive(Debug, Clone)]
pub struct MicrosoftConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for MicrosoftConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to build HTTP client")]
pub struct ClientBuildError(#[source] reqwest::Error);

#[derive(Debug, Deserialize)]
struct EmailAddress {
    #[serde(default)]
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sender {
    email_address: EmailAddress,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Message {
    #[serde(default)]
    subject: String,
    from: Option<Sender>,
    received_date_time: Timestamp,
}

#[derive(Debug, Deserialize)]
struct MessagePage {
    #[serde(default)]
    value: Vec<Message>,
}

/// Newest message of the inbox query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMail {
    pub from: String,
    pub subject: String,
    pub received_at: Timestamp,
}

/// Outgoing plain-text mail to a single recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub subject: String,
    pub body: String,
    pub recipient: String,
}

#[derive(Serialize)]
struct SendMailRequest<'a> {
    message: OutgoingMessage<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutgoingMessage<'a> {
    subject: &'a str,
    body: ItemBody<'a>,
    to_recipients: [Recipient<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemBody<'a> {
    content_type: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Recipient<'a> {
    email_address: Address<'a>,
}

#[derive(Serialize)]
struct Address<'a> {
    address: &'a str,
}

impl<'a> From<&'a OutgoingMail> for SendMailRequest<'a> {
    fn from(mail: &'a OutgoingMail) -> Self {
        Self {
            message: OutgoingMessage {
                subject: &mail.subject,
                body: ItemBody {
                    content_type: "Text",
                    content: &mail.body,
                },
                to_recipients: [Recipient {
                    email_address: Address {
                        address: &mail.recipient,
                    },
                }],
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct MicrosoftClient {
    http: reqwest::Client,
    base_url: String,
}

impl MicrosoftClient {
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if the HTTP client cannot be built.
    pub fn new(config: MicrosoftConfig) -> Result<Self, ClientBuildError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientBuildError)?;
        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }

    /// Newest message received strictly after `since`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::UnexpectedStatus`] on a non-200 status, or
    /// [`HandlerError::Upstream`] if the request or decoding fails.
    pub async fn latest_mail_since(
        &self,
        token: &str,
        since: Timestamp,
    ) -> Result<Option<ReceivedMail>, HandlerError> {
        let filter = format!(
            "receivedDateTime gt {}",
            since.format("%Y-%m-%dT%H:%M:%SZ")
        );
        let response = self
            .http
            .get(format!("{}/v1.0/me/messages", self.base_url))
            .bearer_auth(token)
            .query(&[
                ("$filter", filter.as_str()),
                ("$orderby", "receivedDateTime desc"),
                ("$top", "1"),
            ])
            .send()
            .await
            .map_err(HandlerError::upstream)?;
        if response.status() != StatusCode::OK {
            return Err(HandlerError::UnexpectedStatus {
                status: response.status().as_u16(),
            });
        }
        let page: MessagePage = response.json().await.map_err(HandlerError::upstream)?;
        Ok(page.value.into_iter().next().map(|message| ReceivedMail {
            from: message
                .from
                .map(|sender| sender.email_address.address)
                .unwrap_or_default(),
            subject: message.subject,
            received_at: message.received_date_time,
        }))
    }

    /// Send `mail` from the signed-in user's mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::UnexpectedStatus`] unless Graph answers
    /// `202 Accepted`, or [`HandlerError::Upstream`] if the request fails.
    pub async fn send_mail(&self, token: &str, mail: &OutgoingMail) -> Result<(), HandlerError> {
        let response = self
            .http
            .post(format!("{}/v1.0/me/sendMail", self.base_url))
            .bearer_auth(token)
            .json(&SendMailRequest::from(mail))
            .send()
            .await
            .map_err(HandlerError::upstream)?;
        let status = response.status();
        tracing::debug!(recipient = %mail.recipient, %status, "mail submitted");
        if status == StatusCode::ACCEPTED {
            Ok(())
        } else {
            Err(HandlerError::UnexpectedStatus {
                status: status.as_u16(),
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{MicrosoftClient, MicrosoftConfig};

    pub(crate) const TOKEN: &str = "graph-token";

    pub(crate) async fn setup() -> (MockServer, MicrosoftClient) {
        let server = MockServer::start().await;
        let client = MicrosoftClient::new(MicrosoftConfig {
            base_url: server.uri(),
            ..MicrosoftConfig::default()
        })
        .unwrap();
        (server, client)
    }

    /// Answer the inbox query filtered on `since` with `messages`.
    pub(crate) async fn mount_inbox(
        server: &MockServer,
        since: &str,
        messages: serde_json::Value,
    ) {
        Mock::given(method("GET"))
            .and(path("/v1.0/me/messages"))
            .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
            .and(query_param(
                "$filter",
                format!("receivedDateTime gt {since}").as_str(),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": messages })))
            .mount(server)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{TOKEN, mount_inbox, setup};
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn since() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn should_return_newest_mail_after_timestamp() {
        let (server, client) = setup().await;
        mount_inbox(
            &server,
            "2024-05-01T09:00:00Z",
            json!([{
                "id": "AAMk1",
                "subject": "Invoice",
                "from": { "emailAddress": { "name": "Ada", "address": "ada@example.com" } },
                "receivedDateTime": "2024-05-01T09:30:00Z"
            }]),
        )
        .await;

        let mail = client.latest_mail_since(TOKEN, since()).await.unwrap();

        assert_eq!(
            mail,
            Some(ReceivedMail {
                from: "ada@example.com".to_string(),
                subject: "Invoice".to_string(),
                received_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            })
        );
    }

    #[tokio::test]
    async fn should_return_none_when_inbox_has_nothing_new() {
        let (server, client) = setup().await;
        mount_inbox(&server, "2024-05-01T09:00:00Z", json!([])).await;
        assert_eq!(client.latest_mail_since(TOKEN, since()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn should_report_unauthorized_inbox_query() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me/messages"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client.latest_mail_since(TOKEN, since()).await.unwrap_err();

        assert!(matches!(err, HandlerError::UnexpectedStatus { status: 401 }));
    }

    #[tokio::test]
    async fn should_post_graph_send_mail_payload() {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/v1.0/me/sendMail"))
            .and(header("authorization", "Bearer graph-token"))
            .and(body_json(json!({
                "message": {
                    "subject": "Hello",
                    "body": { "contentType": "Text", "content": "It works" },
                    "toRecipients": [{ "emailAddress": { "address": "bob@example.com" } }]
                }
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let mail = OutgoingMail {
            subject: "Hello".to_string(),
            body: "It works".to_string(),
            recipient: "bob@example.com".to_string(),
        };
        client.send_mail(TOKEN, &mail).await.unwrap();
    }

    #[tokio::test]
    async fn should_treat_ok_as_unexpected_for_send_mail() {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/v1.0/me/sendMail"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mail = OutgoingMail {
            subject: String::new(),
            body: String::new(),
            recipient: "bob@example.com".to_string(),
        };
        let err = client.send_mail(TOKEN, &mail).await.unwrap_err();

        assert!(matches!(err, HandlerError::UnexpectedStatus { status: 200 }));
    }
}
