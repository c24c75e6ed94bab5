use std::time::Duration;

use jiff::civil::Date;
use log::debug;
use reqwest::{
    blocking::Client,
    header::{ACCEPT, USER_AGENT},
    Url,
};
use serde::Serialize;
use serde_json::Value;

use super::ReportSource;
use crate::error::{Error, Result, UpstreamError};
use crate::interval::DayNames;

pub const ACRCLOUD_API: &str = "https://api-v2.acrcloud.com";

/// Query parameters of the broadcast monitoring results endpoint.
#[derive(Debug, Serialize, PartialEq)]
pub struct ResultsParams {
    #[serde(rename = "type")]
    pub kind: String,
    pub date: String,
    pub min_duration: u32,
    pub max_duration: u32,
    pub isrc_country: String,
}

impl ResultsParams {
    /// Everything recognized during one day, no country filter.
    pub fn day(date: Date) -> ResultsParams {
        ResultsParams {
            kind: "day".to_string(),
            date: date.query_date(),
            min_duration: 0,
            max_duration: 3600,
            isrc_country: String::new(),
        }
    }
}

/// Client for the ACRCloud console API.
/// See https://docs.acrcloud.com/reference/console-api/bm-projects/custom-streams-projects/results
pub struct AcrCloudClient {
    client: Client,
    base: Url,
    bearer_token: String,
}

impl AcrCloudClient {
    pub fn new(bearer_token: &str, timeout: Duration) -> Result<AcrCloudClient> {
        AcrCloudClient::with_base_url(ACRCLOUD_API, bearer_token, timeout)
    }

    pub fn with_base_url(base: &str, bearer_token: &str, timeout: Duration) -> Result<AcrCloudClient> {
        let base = Url::parse(base)
            .map_err(|e| Error::Config(format!("invalid ACRCloud url {base}: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(AcrCloudClient {
            client,
            base,
            bearer_token: bearer_token.to_string(),
        })
    }

    pub fn results_url(&self, project_id: i64, stream_id: &str) -> std::result::Result<Url, UpstreamError> {
        let project = project_id.to_string();
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::Request(format!("{} cannot be a base", self.base)))?
            .pop_if_empty()
            .extend([
                "api",
                "bm-cs-projects",
                project.as_str(),
                "streams",
                stream_id,
                "results",
            ]);
        Ok(url)
    }
}

impl ReportSource for AcrCloudClient {
    fn query_day_report(
        &self,
        project_id: i64,
        stream_id: &str,
        date: Date,
    ) -> std::result::Result<Value, UpstreamError> {
        let url = self.results_url(project_id, stream_id)?;
        debug!("GET {} for {}", url, date);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.bearer_token)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("acrloader/", env!("CARGO_PKG_VERSION")))
            .query(&ResultsParams::day(date))
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }
        Ok(response.json::<Value>()?)
    }
}
