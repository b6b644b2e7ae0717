//! VilageFcst API client.
//!
//! Fetches short-range forecast, now-cast observation, and very-short-range
//! forecast products from `apis.data.go.kr` for a grid cell.

pub mod basetime;
pub mod parse;
pub mod response;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::{debug, warn};

use common::grid::GridCell;
use common::store::{ReadingKind, ReadingSet, WeatherDataSource};
use common::text::truncate_utf8;
use common::{Error, Result};

use crate::response::{KmaResponse, SUCCESS_CODE};

const DEFAULT_BASE_URL: &str = "https://apis.data.go.kr/1360000/VilageFcstInfoService_2.0";

/// Row limits per product; the forecast product pages at 1000 rows.
const FORECAST_ROWS: u32 = 1000;
const NOWCAST_ROWS: u32 = 10;
const SHORT_FORECAST_ROWS: u32 = 60;

/// Byte cap for response bodies quoted in errors. Provider error pages
/// are Korean text, so the cut must land on a char boundary.
const MAX_ERROR_BODY: usize = 500;

/// HTTP client for the weather provider, with a fixed request timeout.
#[derive(Debug, Clone)]
pub struct KmaClient {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl KmaClient {
    pub fn new(service_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(service_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        service_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            service_key: service_key.into(),
        })
    }

    /// Short-range forecast (3-day outlook), eight publications a day.
    pub async fn village_forecast(
        &self,
        cell: GridCell,
        publication: NaiveDateTime,
    ) -> Result<ReadingSet> {
        self.call("getVilageFcst", cell, publication, FORECAST_ROWS)
            .await
    }

    /// Now-cast observation for the current hour.
    pub async fn ultra_short_nowcast(
        &self,
        cell: GridCell,
        publication: NaiveDateTime,
    ) -> Result<ReadingSet> {
        self.call("getUltraSrtNcst", cell, publication, NOWCAST_ROWS)
            .await
    }

    /// Very-short-range forecast (next six hours).
    pub async fn ultra_short_forecast(
        &self,
        cell: GridCell,
        publication: NaiveDateTime,
    ) -> Result<ReadingSet> {
        self.call("getUltraSrtFcst", cell, publication, SHORT_FORECAST_ROWS)
            .await
    }

    async fn call(
        &self,
        path: &str,
        cell: GridCell,
        publication: NaiveDateTime,
        rows: u32,
    ) -> Result<ReadingSet> {
        let url = format!("{}/{}", self.base_url, path);
        let base_date = basetime::base_date_param(publication);
        let base_time = basetime::base_time_param(publication);

        debug!(%cell, %base_date, %base_time, path, "calling weather provider");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("serviceKey", self.service_key.as_str()),
                ("pageNo", "1"),
                ("numOfRows", &rows.to_string()),
                ("dataType", "JSON"),
                ("base_date", &base_date),
                ("base_time", &base_time),
                ("nx", &cell.gx.to_string()),
                ("ny", &cell.gy.to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(format!("{path} request failed for {cell}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http(format!(
                "{path} returned {status} for {cell}: {}",
                truncate_utf8(&body, MAX_ERROR_BODY)
            )));
        }

        let parsed: KmaResponse = resp
            .json()
            .await
            .map_err(|e| Error::Provider(format!("{path} response parse failed: {e}")))?;

        let header = &parsed.response.header;
        if header.result_code != SUCCESS_CODE {
            warn!(%cell, code = %header.result_code, msg = %header.result_msg, "provider error response");
            return Err(Error::Provider(format!(
                "{path} error {}: {}",
                header.result_code, header.result_msg
            )));
        }

        let set = parsed.into_readings();
        if set.is_empty() {
            warn!(%cell, path, "provider returned no readings");
        }
        Ok(set)
    }
}

#[async_trait]
impl WeatherDataSource for KmaClient {
    async fn fetch(
        &self,
        cell: GridCell,
        publication: NaiveDateTime,
        kind: ReadingKind,
    ) -> Result<ReadingSet> {
        match kind {
            ReadingKind::Forecast => self.village_forecast(cell, publication).await,
            ReadingKind::NowCast => self.ultra_short_nowcast(cell, publication).await,
            ReadingKind::ShortForecast => self.ultra_short_forecast(cell, publication).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn korean_error_body_is_quoted_without_splitting_characters() {
        // Provider error pages exceed the cap with multi-byte text.
        let body = "기상청 오류 응답 ".repeat(40);
        assert!(body.len() > MAX_ERROR_BODY);
        let quoted = truncate_utf8(&body, MAX_ERROR_BODY);
        assert!(quoted.len() <= MAX_ERROR_BODY);
        assert!(body.starts_with(quoted));
    }
}
