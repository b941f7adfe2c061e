use crate::error::HarvestError;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

/// Read-only view of the remote photo service.
pub trait PhotoSource {
    /// One page of an owner's photo list; the payload exposes `photos.pages`.
    fn list_page(&self, owner: &str, page: u32, per_page: u32) -> Result<Value>;

    /// Full detail for one photo (dates and tags).
    fn photo_detail(&self, photo_id: &str) -> Result<Value>;
}

pub struct FlickrClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl FlickrClient {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Value> {
        let mut query: Vec<(&str, String)> = vec![
            ("method", method.to_string()),
            ("api_key", self.api_key.clone()),
            ("format", "json".to_string()),
            ("nojsoncallback", "1".to_string()),
        ];
        query.extend(params.iter().cloned());

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .with_context(|| format!("{method} request failed"))?;
        if !response.status().is_success() {
            return Err(HarvestError::Remote(format!(
                "{method} returned http status {}",
                response.status()
            ))
            .into());
        }
        let json: Value = response
            .json()
            .with_context(|| format!("{method} response is not json"))?;
        check_api_status(method, &json)?;
        Ok(json)
    }
}

impl PhotoSource for FlickrClient {
    fn list_page(&self, owner: &str, page: u32, per_page: u32) -> Result<Value> {
        self.call(
            "flickr.people.getPhotos",
            &[
                ("user_id", owner.to_string()),
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
            ],
        )
    }

    fn photo_detail(&self, photo_id: &str) -> Result<Value> {
        self.call("flickr.photos.getInfo", &[("photo_id", photo_id.to_string())])
    }
}

/// The API answers errors with HTTP 200 and `{"stat": "fail", ...}`.
pub fn check_api_status(method: &str, json: &Value) -> Result<(), HarvestError> {
    if json.get("stat").and_then(Value::as_str) != Some("fail") {
        return Ok(());
    }
    let code = json
        .get("code")
        .map(|v| v.to_string())
        .unwrap_or_else(|| "?".to_string());
    let message = json
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("no message");
    Err(HarvestError::Remote(format!(
        "{method} failed with code {code}: {message}"
    )))
}

fn value_u32(value: &Value) -> Option<u32> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<u64>().ok()))
        .and_then(|n| u32::try_from(n).ok())
}

/// Total page count of a listing payload. Some deployments send numbers as
/// strings, so both are accepted.
pub fn listing_total_pages(listing: &Value) -> Option<u32> {
    listing
        .get("photos")
        .and_then(|v| v.get("pages"))
        .and_then(value_u32)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedPhoto {
    pub id: String,
    pub title: String,
}

pub fn listing_photos(listing: &Value) -> Option<Vec<ListedPhoto>> {
    let items = listing
        .get("photos")
        .and_then(|v| v.get("photo"))
        .and_then(Value::as_array)?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let id = match item.get("id")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let title = item
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        out.push(ListedPhoto { id, title });
    }
    Some(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoDetail {
    pub taken: String,
    pub raw_tags: Vec<String>,
}

pub fn parse_photo_detail(detail: &Value) -> Option<PhotoDetail> {
    let photo = detail.get("photo")?;
    let taken = photo
        .get("dates")
        .and_then(|v| v.get("taken"))
        .and_then(Value::as_str)?
        .to_string();
    let raw_tags = photo
        .get("tags")
        .and_then(|v| v.get("tag"))
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(|t| t.get("raw").and_then(Value::as_str))
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default();
    Some(PhotoDetail { taken, raw_tags })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fail_envelope_becomes_remote_error() {
        let body = json!({"stat": "fail", "code": 100, "message": "Invalid API Key"});
        let err = check_api_status("flickr.people.getPhotos", &body).unwrap_err();
        assert!(matches!(err, HarvestError::Remote(_)));
        assert!(err.to_string().contains("Invalid API Key"));
        assert!(check_api_status("m", &json!({"stat": "ok"})).is_ok());
    }

    #[test]
    fn total_pages_accepts_number_or_string() {
        assert_eq!(listing_total_pages(&json!({"photos": {"pages": 12}})), Some(12));
        assert_eq!(listing_total_pages(&json!({"photos": {"pages": "3"}})), Some(3));
        assert_eq!(listing_total_pages(&json!({"photos": {}})), None);
    }

    #[test]
    fn listing_photos_reads_ids_and_titles() {
        let listing = json!({"photos": {"photo": [
            {"id": "101", "title": " Harbor "},
            {"id": 102}
        ]}});
        let photos = listing_photos(&listing).expect("photos");
        assert_eq!(
            photos,
            vec![
                ListedPhoto { id: "101".into(), title: " Harbor ".into() },
                ListedPhoto { id: "102".into(), title: String::new() },
            ]
        );
        assert!(listing_photos(&json!({"photos": {}})).is_none());
    }

    #[test]
    fn detail_parsing_collects_raw_tags() {
        let detail = json!({"photo": {
            "dates": {"taken": "2014-12-24 12:53:11"},
            "tags": {"tag": [{"raw": "Sunset", "_content": "sunset"}, {"raw": "Beach"}]}
        }});
        let parsed = parse_photo_detail(&detail).expect("detail");
        assert_eq!(parsed.taken, "2014-12-24 12:53:11");
        assert_eq!(parsed.raw_tags, vec!["Sunset", "Beach"]);

        let untagged = json!({"photo": {"dates": {"taken": "2014-12-24 12:53:11"}, "tags": {"tag": []}}});
        assert!(parse_photo_detail(&untagged).expect("untagged").raw_tags.is_empty());
        assert!(parse_photo_detail(&json!({"photo": {}})).is_none());
    }
}
