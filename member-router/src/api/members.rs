//! Member operations: register, search, bulk delete and list-all.
use crate::api::utils::{json_response, require_string};
use crate::errors::RouterError;
use crate::handler::{HandlerContext, HandlerResult, OperationRequest, RouteHandler};
use crate::upstream::UpstreamCall;
use async_trait::async_trait;
use hyper::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Deserialize)]
struct RegisterPayload {
    email: Option<String>,
}

pub struct RegisterHandler;

#[async_trait]
impl RouteHandler for RegisterHandler {
    fn name(&self) -> &'static str {
        "register"
    }

    async fn handle(&self, request: OperationRequest, context: &HandlerContext) -> HandlerResult {
        let payload: RegisterPayload = request.payload()?;
        let email = require_string(payload.email, "email")?;

        let call = UpstreamCall::new(
            "register",
            Method::POST,
            ["_api", "iam", "authentication", "v2", "register"],
        )
        .json(json!({
            "loginId": { "email": email },
            "password": context.upstream.member_password(),
            "captcha_tokens": [],
        }));

        context
            .upstream
            .pass_through(request.project()?, call)
            .await
    }
}

#[derive(Deserialize)]
struct SearchPayload {
    query: Option<String>,
}

pub struct SearchHandler;

#[async_trait]
impl RouteHandler for SearchHandler {
    fn name(&self) -> &'static str {
        "search"
    }

    async fn handle(&self, request: OperationRequest, context: &HandlerContext) -> HandlerResult {
        let payload: SearchPayload = request.payload()?;
        let query = require_string(payload.query, "query")?;

        let call = UpstreamCall::new("search", Method::POST, ["members", "v1", "members", "query"])
            .json(json!({
                "fieldsets": ["FULL"],
                "query": { "filter": { "loginEmail": query } },
            }));

        context
            .upstream
            .pass_through(request.project()?, call)
            .await
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeletePayload {
    member_ids: Option<Vec<MemberId>>,
}

/// Numeric ids are accepted and used as their decimal text.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(untagged)]
enum MemberId {
    Text(String),
    Number(serde_json::Number),
}

impl From<MemberId> for String {
    fn from(id: MemberId) -> Self {
        match id {
            MemberId::Text(id) => id,
            MemberId::Number(id) => id.to_string(),
        }
    }
}

/// Deletes members in parallel and reports one result per requested id.
pub struct DeleteHandler;

#[async_trait]
impl RouteHandler for DeleteHandler {
    fn name(&self) -> &'static str {
        "delete"
    }

    async fn handle(&self, request: OperationRequest, context: &HandlerContext) -> HandlerResult {
        let payload: DeletePayload = request.payload()?;
        let member_ids = payload
            .member_ids
            .ok_or(RouterError::MissingField("memberIds"))?
            .into_iter()
            .map(String::from)
            .collect();

        let results = context
            .upstream
            .delete_members(request.project()?, member_ids)
            .await;

        json_response(StatusCode::OK, &results)
    }
}

#[derive(Serialize)]
struct MembersResponse {
    members: Vec<Value>,
}

/// Collects every member of the site across all upstream pages.
pub struct ListAllHandler;

#[async_trait]
impl RouteHandler for ListAllHandler {
    fn name(&self) -> &'static str {
        "list_all"
    }

    async fn handle(&self, request: OperationRequest, context: &HandlerContext) -> HandlerResult {
        let members = context
            .upstream
            .list_all_members(request.project()?)
            .await?;

        json_response(StatusCode::OK, &MembersResponse { members })
    }
}
