//! HTTP indicator feed.
//!
//! Indicator computation is out of scope for the bot; an external
//! service exposes the current RSI/ADX pair as JSON. Any failure here
//! yields `None`, which the risk machine treats as a cooldown trigger,
//! so a broken feed fails safe.

use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use grid_core::BoxFuture;
use grid_risk::{IndicatorProvider, IndicatorSnapshot};

use crate::error::AppResult;

const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct IndicatorResponse {
    rsi: f64,
    adx: f64,
}

#[derive(Debug)]
pub struct HttpIndicatorProvider {
    http: reqwest::Client,
    url: String,
}

impl HttpIndicatorProvider {
    pub fn new(url: String) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(grid_client::ClientError::from)?;
        Ok(Self { http, url })
    }

    async fn fetch(&self, timeframe: &str) -> Result<IndicatorSnapshot, reqwest::Error> {
        let response: IndicatorResponse = self
            .http
            .get(&self.url)
            .query(&[("timeframe", timeframe)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(IndicatorSnapshot {
            rsi: response.rsi,
            adx: response.adx,
        })
    }
}

impl IndicatorProvider for HttpIndicatorProvider {
    fn indicators(&self, timeframe: &str) -> BoxFuture<'_, Option<IndicatorSnapshot>> {
        let timeframe = timeframe.to_string();
        Box::pin(async move {
            match self.fetch(&timeframe).await {
                Ok(snapshot) => Some(snapshot),
                Err(err) => {
                    warn!(error = %err, "indicator fetch failed");
                    None
                }
            }
        })
    }
}
