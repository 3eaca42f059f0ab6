use std::sync::Arc;

use tracing::{debug, info};

use crate::application::{EvidenceRenderer, FolderPolicy, PublishRunUseCase};
use crate::domain::error::Result;
use crate::domain::publisher_config::PublisherConfig;
use crate::domain::status_map::{StatusMap, StatusPreset};
use crate::infrastructure::clients::{
    catalog_transport, tracker_transport, JiraIssueResolver, ScaleCatalogClient,
};
use crate::infrastructure::http::Transport;

/// Wires transports, clients and the run use case from validated settings.
pub fn build_publisher(
    config: &PublisherConfig,
    policy: FolderPolicy,
    preset: StatusPreset,
) -> Result<PublishRunUseCase> {
    let run = config.run_context();
    info!(run_id = %run.run_id, branch = %run.branch_name, ?policy, "Preparing run");

    let catalog_http = catalog_transport(config)?;
    let tracker_http = tracker_transport(config)?;
    debug!(
        catalog = %catalog_http.base_url(),
        tracker = %tracker_http.base_url(),
        "Remote endpoints"
    );
    let catalog_remote: Arc<dyn Transport> = Arc::new(catalog_http);
    let tracker_remote: Arc<dyn Transport> = Arc::new(tracker_http);

    let statuses = StatusMap::preset(preset).with_overrides(&config.statuses);
    debug!(?preset, mapped = statuses.len(), "Status mapping ready");
    let evidence = EvidenceRenderer::new(statuses)
        .with_screenshots(config.serenity_report_domain.as_deref(), &run.run_id);

    let catalog = Arc::new(ScaleCatalogClient::new(catalog_remote, &config.zephyr, run));
    let issues = Arc::new(JiraIssueResolver::new(tracker_remote));

    Ok(PublishRunUseCase::new(catalog, issues, evidence, policy))
}
