//! Fan-out execution of member deletions.
//!
//! One DELETE is spawned per member id, all at once, and every task is awaited.
//! Each outcome is tagged with the member id it belongs to, so the result list is
//! always complete: one entry per requested id, whatever order the tasks finish in.

use crate::errors::RouterError;
use crate::metrics_defs::MEMBERS_DELETED;
use crate::upstream::{UpstreamCall, UpstreamClient};
use hyper::{Method, StatusCode};
use projects::Project;
use serde::Serialize;
use shared::counter;
use std::collections::HashMap;
use tokio::task::{Id, JoinSet};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeleteStatus {
    Success,
    Failed,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub member_id: String,
    pub status: DeleteStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeleteResult {
    fn success(member_id: String) -> Self {
        DeleteResult {
            member_id,
            status: DeleteStatus::Success,
            error: None,
        }
    }

    fn failed(member_id: String, error: String) -> Self {
        DeleteResult {
            member_id,
            status: DeleteStatus::Failed,
            error: Some(error),
        }
    }
}

impl UpstreamClient {
    /// Deletes every member in `member_ids` concurrently.
    pub async fn delete_members(
        &self,
        project: &Project,
        member_ids: Vec<String>,
    ) -> Vec<DeleteResult> {
        let mut join_set = JoinSet::new();
        // Maps task ids back to member ids in case a task panics
        let mut task_members: HashMap<Id, String> = HashMap::new();

        for member_id in member_ids {
            let client = self.clone();
            let project = project.clone();
            let task_member_id = member_id.clone();

            let handle = join_set.spawn(async move {
                client.delete_member(&project, task_member_id).await
            });
            task_members.insert(handle.id(), member_id);
        }

        let mut results = Vec::with_capacity(task_members.len());
        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((id, result)) => {
                    task_members.remove(&id);
                    results.push(result);
                }
                Err(e) => {
                    tracing::error!("Delete task panicked: {}", e);
                    if let Some(member_id) = task_members.remove(&e.id()) {
                        results.push(DeleteResult::failed(member_id, e.to_string()));
                    }
                }
            }
        }

        let failed = results
            .iter()
            .filter(|r| r.status == DeleteStatus::Failed)
            .count();
        tracing::info!(
            site_id = %project.site_id,
            requested = results.len(),
            failed,
            "Bulk delete finished"
        );

        results
    }

    async fn delete_member(&self, project: &Project, member_id: String) -> DeleteResult {
        let result = self.try_delete_member(project, &member_id).await;

        let outcome = match &result {
            Ok(()) => "success",
            Err(_) => "failed",
        };
        counter!(MEMBERS_DELETED, "outcome" => outcome).increment(1);

        match result {
            Ok(()) => DeleteResult::success(member_id),
            Err(error) => {
                tracing::warn!(
                    site_id = %project.site_id,
                    member_id = %member_id,
                    error = %error,
                    "Member delete failed"
                );
                DeleteResult::failed(member_id, error)
            }
        }
    }

    // Only a 200 counts as deleted. Any other status yields the upstream body as the error.
    async fn try_delete_member(&self, project: &Project, member_id: &str) -> Result<(), String> {
        let call = UpstreamCall::new(
            "delete_member",
            Method::DELETE,
            ["members", "v1", "members", member_id],
        );
        let request = self
            .request(project, &call)
            .map_err(|e: RouterError| e.to_string())?;
        let response = request.send().await.map_err(|e| e.to_string())?;

        if response.status() == StatusCode::OK {
            return Ok(());
        }

        let status = response.status();
        match response.text().await {
            Ok(body) if !body.is_empty() => Err(body),
            Ok(_) => Err(format!("upstream returned {status}")),
            Err(e) => Err(e.to_string()),
        }
    }
}
