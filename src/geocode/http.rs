use crate::{
    core::config::GeocoderConfig,
    geocode::{
        response::deserialize_opt_coordinate, GeocodeError, Geocoder, LookupHit, LookupResponse,
    },
};
use async_trait::async_trait;
use serde::Deserialize;

const ADDRESS_PATH: &str = "/v2/local/search/address.json";
const KEYWORD_PATH: &str = "/v2/local/search/keyword.json";

#[derive(Debug, Deserialize)]
struct SearchDocument {
    #[serde(default, deserialize_with = "deserialize_opt_coordinate")]
    x: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_coordinate")]
    y: Option<f64>,
    #[serde(default)]
    place_name: Option<String>,
    #[serde(default)]
    address_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    documents: Vec<SearchDocument>,
}

impl From<SearchBody> for LookupResponse {
    fn from(body: SearchBody) -> Self {
        let hits = body
            .documents
            .into_iter()
            .map(|doc| LookupHit {
                x: doc.x,
                y: doc.y,
                name: doc.place_name.or(doc.address_name),
            })
            .collect();
        LookupResponse::ok(hits)
    }
}

/// [`Geocoder`] backed by the Kakao Local REST API.
///
/// Both lookups ask for a single hit; an empty `documents` list is reported
/// as `ZERO_RESULT`, any non-success HTTP status as `ERROR`.
pub struct LocalSearchClient {
    client: reqwest::Client,
    config: GeocoderConfig,
}

impl LocalSearchClient {
    pub fn new(config: GeocoderConfig) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("restomap/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, GeocodeError> {
        Self::new(GeocoderConfig::from_env())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn search(&self, path: &str, query: &str) -> Result<LookupResponse, GeocodeError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| GeocodeError::Unavailable("no REST API key configured".into()))?;

        let size = self.config.page_size.max(1).to_string();
        let response = self
            .client
            .get(self.endpoint(path))
            .header(reqwest::header::AUTHORIZATION, format!("KakaoAK {api_key}"))
            .query(&[("query", query), ("size", size.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("lookup {path} for {query:?} returned HTTP {status}");
            return Ok(LookupResponse::error());
        }

        let body: SearchBody = response.json().await?;
        Ok(body.into())
    }
}

#[async_trait]
impl Geocoder for LocalSearchClient {
    async fn address_search(&self, query: &str) -> Result<LookupResponse, GeocodeError> {
        self.search(ADDRESS_PATH, query).await
    }

    async fn keyword_search(&self, query: &str) -> Result<LookupResponse, GeocodeError> {
        self.search(KEYWORD_PATH, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::LatLng;
    use crate::geocode::LookupStatus;

    #[test]
    fn test_documents_map_to_hits() {
        let body: SearchBody = serde_json::from_str(
            r#"{
                "meta": {"total_count": 1},
                "documents": [
                    {"address_name": "Seoul Jung-gu Sejong-daero 110", "x": "126.9780", "y": "37.5665"}
                ]
            }"#,
        )
        .unwrap();

        let response = LookupResponse::from(body);
        assert_eq!(response.status, LookupStatus::Ok);
        assert_eq!(response.first_point(), Some(LatLng::new(37.5665, 126.978)));
        assert_eq!(
            response.hits[0].name.as_deref(),
            Some("Seoul Jung-gu Sejong-daero 110")
        );
    }

    #[test]
    fn test_empty_documents_is_zero_result() {
        let body: SearchBody = serde_json::from_str(r#"{"documents": []}"#).unwrap();
        assert_eq!(LookupResponse::from(body).status, LookupStatus::ZeroResult);
    }

    #[tokio::test]
    async fn test_missing_key_is_unavailable() {
        let client = LocalSearchClient::new(GeocoderConfig::default()).unwrap();
        let result = client.keyword_search("anything").await;
        assert!(matches!(result, Err(GeocodeError::Unavailable(_))));
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = LocalSearchClient::new(GeocoderConfig {
            base_url: "http://localhost:8080/".into(),
            ..GeocoderConfig::default()
        })
        .unwrap();
        assert_eq!(
            client.endpoint(ADDRESS_PATH),
            "http://localhost:8080/v2/local/search/address.json"
        );
    }
}
