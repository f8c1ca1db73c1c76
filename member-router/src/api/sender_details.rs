use crate::errors::RouterError;
use crate::handler::{HandlerContext, HandlerResult, OperationRequest, RouteHandler};
use crate::upstream::UpstreamCall;
use async_trait::async_trait;
use hyper::Method;
use serde::Deserialize;
use serde_json::{Value, json};

const SENDER_DETAILS_PATH: [&str; 3] = ["email-marketing", "v1", "sender-details"];

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePayload {
    sender_details: Option<Value>,
}

/// Reads the sender details on POST and updates them on PATCH.
pub struct SenderDetailsHandler;

#[async_trait]
impl RouteHandler for SenderDetailsHandler {
    fn name(&self) -> &'static str {
        "sender_details"
    }

    async fn handle(&self, request: OperationRequest, context: &HandlerContext) -> HandlerResult {
        let call = match request.method {
            Method::POST => {
                UpstreamCall::new("get_sender_details", Method::GET, SENDER_DETAILS_PATH)
            }
            Method::PATCH => {
                let payload: UpdatePayload = request.payload()?;
                let sender_details = payload
                    .sender_details
                    .filter(Value::is_object)
                    .ok_or(RouterError::MissingField("senderDetails"))?;
                UpstreamCall::new("update_sender_details", Method::PATCH, SENDER_DETAILS_PATH)
                    .json(json!({ "senderDetails": sender_details }))
            }
            ref other => return Err(RouterError::MethodNotAllowed(other.clone())),
        };

        context
            .upstream
            .pass_through(request.project()?, call)
            .await
    }
}
