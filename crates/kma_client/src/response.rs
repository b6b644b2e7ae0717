//! Wire types for the VilageFcst API.
//!
//! All payload values arrive as strings; forecast products carry
//! `fcstValue`, the now-cast carries `obsrValue`.

use chrono::NaiveDate;
use serde::Deserialize;

use common::store::{Reading, ReadingSet};

pub const SUCCESS_CODE: &str = "00";

#[derive(Debug, Deserialize)]
pub struct KmaResponse {
    pub response: ResponseEnvelope,
}

#[derive(Debug, Deserialize)]
pub struct ResponseEnvelope {
    pub header: ResponseHeader,
    #[serde(default)]
    pub body: Option<ResponseBody>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseHeader {
    #[serde(rename = "resultCode")]
    pub result_code: String,
    #[serde(rename = "resultMsg")]
    pub result_msg: String,
}

#[derive(Debug, Deserialize)]
pub struct ResponseBody {
    #[serde(default)]
    pub items: Option<ResponseItems>,
    #[serde(rename = "totalCount", default)]
    pub total_count: u32,
}

#[derive(Debug, Deserialize)]
pub struct ResponseItems {
    #[serde(default)]
    pub item: Vec<ResponseItem>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseItem {
    #[serde(rename = "baseDate")]
    pub base_date: String,
    #[serde(rename = "baseTime")]
    pub base_time: String,
    pub category: String,
    #[serde(rename = "fcstDate", default)]
    pub fcst_date: Option<String>,
    #[serde(rename = "fcstTime", default)]
    pub fcst_time: Option<String>,
    #[serde(rename = "fcstValue", default)]
    pub fcst_value: Option<String>,
    #[serde(rename = "obsrValue", default)]
    pub obsr_value: Option<String>,
    pub nx: i32,
    pub ny: i32,
}

impl KmaResponse {
    /// Flatten the envelope into category readings. Forecast items use
    /// `fcstValue` with their target date; now-cast items use `obsrValue`.
    pub fn into_readings(self) -> ReadingSet {
        let items = self
            .response
            .body
            .and_then(|b| b.items)
            .map(|i| i.item)
            .unwrap_or_default();

        let readings = items
            .into_iter()
            .filter_map(|item| {
                let forecast_date = item
                    .fcst_date
                    .as_deref()
                    .and_then(|d| NaiveDate::parse_from_str(d, "%Y%m%d").ok());
                let value = item.fcst_value.or(item.obsr_value)?;
                Some(Reading {
                    category: item.category,
                    value,
                    forecast_date,
                })
            })
            .collect();

        ReadingSet { readings }
    }
}
