//! Outbound map-search links shown when the map cannot load

use crate::layers::marker::MapMarker;
use reqwest::Url;
use serde::Serialize;

const KAKAO_SEARCH_URL: &str = "https://map.kakao.com/";
const NAVER_SEARCH_URL: &str = "https://map.naver.com/v5/search/";

/// Search links on two external map services
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackLinks {
    pub query: String,
    pub kakao: String,
    pub naver: String,
}

impl FallbackLinks {
    /// Links searching for `query`. `None` for blank queries.
    pub fn for_query(query: &str) -> Option<Self> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        let kakao = Url::parse_with_params(KAKAO_SEARCH_URL, &[("q", query)]).ok()?;
        let mut naver = Url::parse(NAVER_SEARCH_URL).ok()?;
        naver.path_segments_mut().ok()?.pop_if_empty().push(query);

        Some(Self {
            query: query.to_string(),
            kakao: kakao.to_string(),
            naver: naver.to_string(),
        })
    }

    /// Links for the marker's best search text (address, else locality + name)
    pub fn for_marker(marker: &MapMarker) -> Option<Self> {
        Self::for_query(&marker.search_text()?)
    }

    /// Links for the first marker that has any search text
    pub fn for_markers(markers: &[MapMarker]) -> Option<Self> {
        markers.iter().find_map(Self::for_marker)
    }
}
