/*
 *  timesync.rs
 *
 *  paperframe - battery e-paper picture frame node
 *
 *  Time-base collaborator: periodic recalibration against a network
 *  time source
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use reqwest::{Client, header};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimeSyncError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("time server sent no Date header")]
    MissingDate,
    #[error("unparseable Date header: {0}")]
    BadDate(String),
}

/// Network time source consulted every Nth cycle. Best-effort by
/// contract: callers log a failure and carry on with the cycle.
#[allow(async_fn_in_trait)]
pub trait TimeSource {
    async fn sync(&mut self) -> Result<DateTime<FixedOffset>, TimeSyncError>;
}

/// Recalibrates off the `Date` header of a plain HTTP server - one
/// round-trip, second-level resolution, plenty for a frame that redraws
/// twice an hour.
pub struct HttpTimeSource {
    client: Client,
    url: String,
    offset: FixedOffset,
}

impl HttpTimeSource {
    pub fn new(url: &str, utc_offset_hours: i32) -> Self {
        let client = Client::builder()
            .http1_only()
            .no_proxy()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap(); // acceptable at client initialization

        let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());

        Self { client, url: url.to_string(), offset }
    }
}

impl TimeSource for HttpTimeSource {
    async fn sync(&mut self) -> Result<DateTime<FixedOffset>, TimeSyncError> {
        let resp = self.client.head(&self.url).send().await?;
        let date = resp
            .headers()
            .get(header::DATE)
            .ok_or(TimeSyncError::MissingDate)?;
        let text = date
            .to_str()
            .map_err(|e| TimeSyncError::BadDate(e.to_string()))?;
        parse_date_header(text, self.offset)
    }
}

fn parse_date_header(
    text: &str,
    offset: FixedOffset,
) -> Result<DateTime<FixedOffset>, TimeSyncError> {
    DateTime::parse_from_rfc2822(text)
        .map(|t| t.with_timezone(&offset))
        .map_err(|e| TimeSyncError::BadDate(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_header_lands_in_local_offset() {
        let jst = FixedOffset::east_opt(9 * 3600).unwrap();
        let t = parse_date_header("Wed, 21 Oct 2015 07:28:00 GMT", jst).unwrap();
        assert_eq!(t.to_rfc3339(), "2015-10-21T16:28:00+09:00");
    }

    #[test]
    fn test_garbage_date_header_is_rejected() {
        let utc = FixedOffset::east_opt(0).unwrap();
        assert!(matches!(
            parse_date_header("yesterday-ish", utc),
            Err(TimeSyncError::BadDate(_))
        ));
    }
}
