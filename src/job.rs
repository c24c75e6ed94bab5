use log::info;

use crate::config::Settings;
use crate::coordinator::{RunCoordinator, RunSummary};
use crate::error::Result;
use crate::interval::DateWindow;
use crate::source::acrcloud::AcrCloudClient;
use crate::storage::minio::{MinioProbe, S3Client};
use crate::storage::owncloud::{OwnCloudProbe, WebDavClient};

/// Check the enabled backends for the days in `window` and load what is
/// missing from ACRCloud.
pub fn load_missing_reports(settings: &Settings, window: &DateWindow) -> Result<RunSummary> {
    info!(
        "checking {} day(s) {} for stream {} of project {}",
        window.len(),
        window,
        settings.stream.stream_id,
        settings.stream.project_id
    );

    let mut owncloud = match &settings.owncloud {
        Some(oc) => {
            let client = WebDavClient::new(&oc.url, &oc.user, &oc.password, settings.http_timeout)?;
            Some(OwnCloudProbe::new(client, &oc.path))
        }
        None => None,
    };
    let mut minio = match &settings.minio {
        Some(mc) => {
            let client = S3Client::new(
                &mc.endpoint,
                mc.secure,
                &mc.region,
                &mc.access_key,
                &mc.secret_key,
                settings.http_timeout,
            )?;
            Some(MinioProbe::new(client, &mc.bucket))
        }
        None => None,
    };

    let source = AcrCloudClient::new(&settings.bearer_token, settings.http_timeout)?;
    let mut coordinator = RunCoordinator::new(settings.stream.clone());
    if let Some(probe) = owncloud.as_mut() {
        coordinator.add_backend(probe);
    }
    if let Some(probe) = minio.as_mut() {
        coordinator.add_backend(probe);
    }
    coordinator.run(window, &source)
}
