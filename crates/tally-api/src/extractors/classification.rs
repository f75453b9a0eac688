//! `ClientClassification` extractor: derives a classification from
//! connection metadata.
//!
//! The region comes from `cf-ipcountry`, the client address from
//! `cf-connecting-ip` or the first `x-forwarded-for` entry. Both can be
//! supplied as `region` / `ip` query parameters instead, which is how
//! clients not behind an edge proxy identify themselves.

use axum::extract::{FromRequestParts, Query};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use serde::Deserialize;

use tally_core::config::CounterMode;
use tally_core::types::Classification;

use crate::error::ApiError;
use crate::state::AppState;

/// Region header set by the edge proxy.
pub const REGION_HEADER: &str = "cf-ipcountry";
/// Client address header set by the edge proxy.
pub const CLIENT_IP_HEADER: &str = "cf-connecting-ip";
/// Fallback client address header.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// The caller's classification, if the request carried enough metadata.
///
/// Always `None` for a scalar counter. Metadata that is present but
/// malformed is rejected with `400`.
#[derive(Debug, Clone)]
pub struct ClientClassification(pub Option<Classification>);

#[derive(Debug, Default, Deserialize)]
struct ClassificationQuery {
    region: Option<String>,
    ip: Option<String>,
}

impl FromRequestParts<AppState> for ClientClassification {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if state.config.counter.mode == CounterMode::Scalar {
            return Ok(Self(None));
        }

        let query = Query::<ClassificationQuery>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default();

        let region = header(&parts.headers, REGION_HEADER).or(query.region);
        let ip = header(&parts.headers, CLIENT_IP_HEADER)
            .or_else(|| forwarded_for(&parts.headers))
            .or(query.ip);

        match (region, ip) {
            (Some(region), Some(ip)) => {
                let classification =
                    Classification::from_connection(&region, &ip, state.config.counter.depth)?;
                Ok(Self(Some(classification)))
            }
            _ => Ok(Self(None)),
        }
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    header(headers, FORWARDED_FOR_HEADER)?
        .split(',')
        .next()
        .map(|first| first.trim().to_string())
        .filter(|first| !first.is_empty())
}
