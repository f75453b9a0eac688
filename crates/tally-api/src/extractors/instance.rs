//! `CounterInstance` extractor: resolves the counter a request addresses.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;

use tally_realtime::CounterActor;

use crate::error::ApiError;
use crate::state::AppState;

/// The counter actor named by the `instance` query parameter.
///
/// Requests without the parameter address the configured instance. Any
/// other name is rejected with `404`.
#[derive(Clone)]
pub struct CounterInstance(pub Arc<CounterActor>);

#[derive(Debug, Default, Deserialize)]
struct InstanceQuery {
    instance: Option<String>,
}

impl FromRequestParts<AppState> for CounterInstance {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let query = Query::<InstanceQuery>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default();
        let name = query
            .instance
            .as_deref()
            .unwrap_or(&state.config.counter.instance);

        Ok(Self(state.engine.instance(name)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::Request;
    use tally_core::config::AppConfig;
    use tally_core::error::ErrorKind;
    use tally_realtime::CounterEngine;
    use tally_store::memory::MemoryStore;

    fn state() -> AppState {
        let config = AppConfig::default();
        let engine = CounterEngine::new(&config, Arc::new(MemoryStore::new()));
        AppState::new(Arc::new(config), engine)
    }

    async fn extract(uri: &str) -> Result<CounterInstance, ApiError> {
        let (mut parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        CounterInstance::from_request_parts(&mut parts, &state()).await
    }

    #[tokio::test]
    async fn test_defaults_to_configured_instance() {
        let CounterInstance(actor) = extract("/increment").await.unwrap();
        assert_eq!(actor.name(), "main");

        let CounterInstance(actor) = extract("/increment?instance=main").await.unwrap();
        assert_eq!(actor.name(), "main");
    }

    #[tokio::test]
    async fn test_unknown_instance_is_not_found() {
        let Err(ApiError(err)) = extract("/connect?instance=other").await else {
            panic!("unknown instance resolved");
        };
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
