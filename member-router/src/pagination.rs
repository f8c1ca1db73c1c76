//! Paginated listing of every member of a site.
//!
//! Pages are fetched strictly one after another, starting at offset 0. The loop stops
//! when a page comes back empty, or once the number of collected members reaches the
//! total reported in the response metadata. A missing total means "keep going until an
//! empty page". Any failed page fails the whole listing; there are no retries.

use crate::errors::RouterError;
use crate::metrics_defs::MEMBERS_LISTED_PAGES;
use crate::upstream::{UpstreamCall, UpstreamClient};
use hyper::Method;
use projects::Project;
use serde::Deserialize;
use serde_json::Value;
use shared::histogram;

const MEMBERS_PATH: [&str; 3] = ["members", "v1", "members"];

#[derive(Deserialize)]
struct MembersPage {
    #[serde(default)]
    members: Vec<Value>,
    #[serde(default)]
    metadata: Option<PagingMetadata>,
}

#[derive(Deserialize)]
struct PagingMetadata {
    total: Option<u64>,
}

impl UpstreamClient {
    /// Fetches all members of `project`'s site, in upstream order.
    pub async fn list_all_members(&self, project: &Project) -> Result<Vec<Value>, RouterError> {
        let mut members: Vec<Value> = Vec::new();
        let mut offset: u64 = 0;
        let mut page_fetches = 0;

        loop {
            let call = UpstreamCall::new("list_members", Method::GET, MEMBERS_PATH)
                .query("paging.limit", self.page_size().to_string())
                .query("paging.offset", offset.to_string())
                .query("fieldsets", "FULL");

            let response = self.request(project, &call)?.send().await.map_err(|e| {
                tracing::error!(site_id = %project.site_id, offset, error = %e, "Members page request failed");
                RouterError::UpstreamRequestFailed(e.to_string())
            })?;

            let status = response.status();
            if !status.is_success() {
                tracing::error!(site_id = %project.site_id, offset, %status, "Members page rejected");
                return Err(RouterError::UpstreamPageFailed { offset, status });
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| RouterError::UpstreamRequestFailed(e.to_string()))?;
            let page: MembersPage = serde_json::from_slice(&body)
                .map_err(|e| RouterError::UpstreamResponseInvalid(e.to_string()))?;

            page_fetches += 1;
            let page_len = page.members.len();
            let total = page.metadata.and_then(|m| m.total);

            if page_len == 0 {
                if let Some(total) = total
                    && (members.len() as u64) < total
                {
                    tracing::warn!(
                        site_id = %project.site_id,
                        collected = members.len(),
                        total,
                        "Upstream returned an empty page before reaching its reported total"
                    );
                }
                break;
            }

            members.extend(page.members);
            offset += page_len as u64;

            if let Some(total) = total
                && members.len() as u64 >= total
            {
                if members.len() as u64 > total {
                    tracing::warn!(
                        site_id = %project.site_id,
                        collected = members.len(),
                        total,
                        "Upstream returned more members than its reported total"
                    );
                }
                break;
            }
        }

        histogram!(MEMBERS_LISTED_PAGES).record(page_fetches as f64);
        tracing::info!(
            site_id = %project.site_id,
            members = members.len(),
            pages = page_fetches,
            "Listed all members"
        );

        Ok(members)
    }
}
