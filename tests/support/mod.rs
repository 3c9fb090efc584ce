use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use metabase_dispatch::dispatcher::{Dispatcher, RequestIdGenerator};
use metabase_dispatch::errors::{MetabaseError, MetabaseResult};
use metabase_dispatch::transport::{ApiRequest, SessionProvider, Transport};

/// Replays scripted responses in order and records every request.
/// An exhausted script answers with an empty body.
#[derive(Default)]
pub struct RecordingTransport {
    responses: Mutex<VecDeque<MetabaseResult<Option<Value>>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl RecordingTransport {
    pub fn respond_with(self, response: Value) -> Self {
        self.push(Ok(Some(response)))
    }

    pub fn respond_empty(self) -> Self {
        self.push(Ok(None))
    }

    pub fn fail_with(self, error: MetabaseError) -> Self {
        self.push(Err(error))
    }

    fn push(self, response: MetabaseResult<Option<Value>>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn request(&self, request: ApiRequest) -> MetabaseResult<Option<Value>> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(None))
    }
}

pub struct FixedToken;

#[async_trait]
impl SessionProvider for FixedToken {
    async fn session_token(&self) -> MetabaseResult<String> {
        Ok("dummy_token".to_string())
    }
}

pub struct RejectedLogin;

#[async_trait]
impl SessionProvider for RejectedLogin {
    async fn session_token(&self) -> MetabaseResult<String> {
        Err(MetabaseError::Session("authentication failed with status 401".into()))
    }
}

pub struct FixedIds;

impl RequestIdGenerator for FixedIds {
    fn generate(&self) -> String {
        "test-request-id".to_string()
    }
}

pub fn dispatcher_with(transport: Arc<RecordingTransport>) -> Dispatcher {
    Dispatcher::new(transport, Arc::new(FixedToken), Arc::new(FixedIds))
}

pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap()
}
