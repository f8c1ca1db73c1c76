//! Email-marketing campaign operations. All of them are plain pass-through calls.
use crate::api::utils::require_string;
use crate::errors::RouterError;
use crate::handler::{HandlerContext, HandlerResult, OperationRequest, RouteHandler};
use crate::upstream::UpstreamCall;
use async_trait::async_trait;
use hyper::Method;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Deserialize)]
struct ValidateLinksPayload {
    html: Option<String>,
}

pub struct ValidateLinksHandler;

#[async_trait]
impl RouteHandler for ValidateLinksHandler {
    fn name(&self) -> &'static str {
        "validate_links"
    }

    async fn handle(&self, request: OperationRequest, context: &HandlerContext) -> HandlerResult {
        let payload: ValidateLinksPayload = request.payload()?;
        let html = require_string(payload.html, "html")?;

        let call = UpstreamCall::new(
            "validate_links",
            Method::POST,
            [
                "email-marketing",
                "v1",
                "campaign-validation",
                "validate-html-links",
            ],
        )
        .json(json!({ "html": html }));

        context
            .upstream
            .pass_through(request.project()?, call)
            .await
    }
}

#[derive(Deserialize)]
struct ValidateLinkPayload {
    url: Option<String>,
}

pub struct ValidateLinkHandler;

#[async_trait]
impl RouteHandler for ValidateLinkHandler {
    fn name(&self) -> &'static str {
        "validate_link"
    }

    async fn handle(&self, request: OperationRequest, context: &HandlerContext) -> HandlerResult {
        let payload: ValidateLinkPayload = request.payload()?;
        let url = require_string(payload.url, "url")?;

        let call = UpstreamCall::new(
            "validate_link",
            Method::POST,
            ["email-marketing", "v1", "campaign-validation", "validate-link"],
        )
        .json(json!({ "url": url }));

        context
            .upstream
            .pass_through(request.project()?, call)
            .await
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendTestEmailPayload {
    campaign_id: Option<String>,
    email_subject: Option<String>,
    to_email_address: Option<String>,
}

pub struct SendTestEmailHandler;

#[async_trait]
impl RouteHandler for SendTestEmailHandler {
    fn name(&self) -> &'static str {
        "send_test_email"
    }

    async fn handle(&self, request: OperationRequest, context: &HandlerContext) -> HandlerResult {
        let payload: SendTestEmailPayload = request.payload()?;
        let campaign_id = require_string(payload.campaign_id, "campaignId")?;
        let email_subject = require_string(payload.email_subject, "emailSubject")?;
        let to_email_address = require_string(payload.to_email_address, "toEmailAddress")?;

        let call = UpstreamCall::new(
            "send_test_email",
            Method::POST,
            ["email-marketing", "v1", "campaigns", campaign_id.as_str(), "test"],
        )
        .json(json!({
            "emailSubject": email_subject,
            "toEmailAddress": to_email_address,
        }));

        context
            .upstream
            .pass_through(request.project()?, call)
            .await
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetStatsPayload {
    campaign_ids: Option<Value>,
}

pub struct GetStatsHandler;

impl GetStatsHandler {
    /// `campaignIds` must be a non-empty array of non-empty strings.
    fn campaign_ids(value: Option<Value>) -> Result<Vec<String>, RouterError> {
        let Some(Value::Array(items)) = value else {
            return Err(RouterError::MissingField("campaignIds"));
        };
        if items.is_empty() {
            return Err(RouterError::MissingField("campaignIds"));
        }

        items
            .into_iter()
            .map(|item| match item {
                Value::String(id) if !id.trim().is_empty() => Ok(id),
                other => Err(RouterError::RequestBodyError(format!(
                    "campaignIds must contain campaign id strings, got {other}"
                ))),
            })
            .collect()
    }
}

#[async_trait]
impl RouteHandler for GetStatsHandler {
    fn name(&self) -> &'static str {
        "get_stats"
    }

    async fn handle(&self, request: OperationRequest, context: &HandlerContext) -> HandlerResult {
        let payload: GetStatsPayload = request.payload()?;
        let campaign_ids = Self::campaign_ids(payload.campaign_ids)?;

        let call = campaign_ids.into_iter().fold(
            UpstreamCall::new(
                "get_stats",
                Method::GET,
                ["email-marketing", "v1", "campaigns", "statistics"],
            ),
            |call, id| call.query("campaignIds", id),
        );

        context
            .upstream
            .pass_through(request.project()?, call)
            .await
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetRecipientsPayload {
    campaign_id: Option<String>,
    activity: Option<String>,
}

pub struct GetRecipientsHandler;

#[async_trait]
impl RouteHandler for GetRecipientsHandler {
    fn name(&self) -> &'static str {
        "get_recipients"
    }

    async fn handle(&self, request: OperationRequest, context: &HandlerContext) -> HandlerResult {
        let payload: GetRecipientsPayload = request.payload()?;
        let campaign_id = require_string(payload.campaign_id, "campaignId")?;
        let activity = require_string(payload.activity, "activity")?;

        let call = UpstreamCall::new(
            "get_recipients",
            Method::GET,
            [
                "email-marketing",
                "v1",
                "campaigns",
                campaign_id.as_str(),
                "statistics",
                "recipients",
            ],
        )
        .query("activity", activity);

        context
            .upstream
            .pass_through(request.project()?, call)
            .await
    }
}
