//! Capability dispatch: route → validate → build → call → format.
//!
//! `Dispatcher::execute` returns `Err` only for argument problems found before
//! any request is sent. Every other failure, including an unknown capability
//! name, comes back as an `isError` envelope so the host can always render a
//! text response.

pub mod arguments;
pub mod normalizer;
pub mod router;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Instrument;

use crate::envelope::ResultEnvelope;
use crate::errors::{MetabaseResult, ValidationError};
use crate::handlers::cards::{
    CreateCard, DeleteCard, ExecuteCard, GetCardDetails, ListCards, UpdateCard,
    UpdateCardVisualization,
};
use crate::handlers::collections::{CreateCollection, ListCollections};
use crate::handlers::dashboards::{
    AddCardToDashboard, CreateDashboard, GetDashboardDetails, ListDashboards,
};
use crate::handlers::databases::{ExecuteQuery, ListDatabases};
use crate::handlers::tables::{GetTableFields, ListTables};
use crate::handlers::{require_body, MergeHandler, ToolHandler};
use crate::transport::{SessionProvider, Transport};

use self::arguments::Arguments;
use self::router::Capability;

/// Produces the correlation id attached to every log line of one invocation.
pub trait RequestIdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

pub struct UuidRequestIds;

impl RequestIdGenerator for UuidRequestIds {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Wire form of an invocation request from the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default = "unknown_tool_name")]
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

fn unknown_tool_name() -> String {
    "unknown".to_string()
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub capability_name: String,
    pub arguments: Arguments,
    pub request_id: String,
}

/// Stateless between invocations; clones share the same collaborators.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    session: Arc<dyn SessionProvider>,
    request_ids: Arc<dyn RequestIdGenerator>,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        session: Arc<dyn SessionProvider>,
        request_ids: Arc<dyn RequestIdGenerator>,
    ) -> Self {
        Self {
            transport,
            session,
            request_ids,
        }
    }

    pub async fn execute(&self, call: ToolCall) -> Result<ResultEnvelope, ValidationError> {
        let invocation = Invocation {
            capability_name: call.name,
            arguments: Arguments::from_value(call.arguments),
            request_id: self.request_ids.generate(),
        };
        let span = tracing::info_span!(
            "invocation",
            request_id = %invocation.request_id,
            tool = %invocation.capability_name
        );
        self.dispatch(&invocation).instrument(span).await
    }

    async fn dispatch(&self, invocation: &Invocation) -> Result<ResultEnvelope, ValidationError> {
        let name = invocation.capability_name.as_str();
        tracing::info!(
            arguments = %invocation.arguments.as_value(),
            "Processing tool execution request: {name}"
        );

        // The token itself is consumed by the transport; this only guarantees
        // one is available before any handler runs.
        if let Err(err) = self.session.session_token().await {
            return Ok(normalizer::soft_failure(&err));
        }

        let Some(capability) = Capability::parse(name) else {
            tracing::warn!("Received request for unknown tool: {name}");
            return Ok(ResultEnvelope::error(format!("Unknown tool: {name}")));
        };

        let args = &invocation.arguments;
        match capability {
            Capability::ListCards => self.run::<ListCards>(args).await,
            Capability::ListDatabases => self.run::<ListDatabases>(args).await,
            Capability::ExecuteCard => self.run::<ExecuteCard>(args).await,
            Capability::ExecuteQuery => self.run::<ExecuteQuery>(args).await,
            Capability::CreateCard => self.run::<CreateCard>(args).await,
            Capability::GetCardDetails => self.run::<GetCardDetails>(args).await,
            Capability::UpdateCard => self.run::<UpdateCard>(args).await,
            Capability::DeleteCard => self.run::<DeleteCard>(args).await,
            Capability::UpdateCardVisualization => {
                self.run_merge::<UpdateCardVisualization>(args).await
            }
            Capability::ListCollections => self.run::<ListCollections>(args).await,
            Capability::CreateCollection => self.run::<CreateCollection>(args).await,
            Capability::ListTables => self.run::<ListTables>(args).await,
            Capability::GetTableFields => self.run::<GetTableFields>(args).await,
            Capability::ListDashboards => self.run::<ListDashboards>(args).await,
            Capability::GetDashboardDetails => self.run::<GetDashboardDetails>(args).await,
            Capability::CreateDashboard => self.run::<CreateDashboard>(args).await,
            Capability::AddCardToDashboard => self.run_merge::<AddCardToDashboard>(args).await,
        }
    }

    async fn run<H: ToolHandler>(&self, args: &Arguments) -> Result<ResultEnvelope, ValidationError> {
        let validated = H::validate(args)?;
        Ok(normalizer::normalize(self.call::<H>(&validated).await))
    }

    async fn call<H: ToolHandler>(&self, validated: &H::Args) -> MetabaseResult<String> {
        let response = self.transport.request(H::build(validated)).await?;
        H::format(validated, response)
    }

    async fn run_merge<H: MergeHandler>(
        &self,
        args: &Arguments,
    ) -> Result<ResultEnvelope, ValidationError> {
        let validated = H::validate(args)?;
        Ok(normalizer::normalize(self.read_modify_write::<H>(&validated).await))
    }

    /// No version check between the read and the write: a concurrent update
    /// landing in between is overwritten.
    async fn read_modify_write<H: MergeHandler>(&self, validated: &H::Args) -> MetabaseResult<String> {
        let fetch = H::fetch_current(validated);
        let path = fetch.path.clone();
        let current = require_body(self.transport.request(fetch).await?, &path)?;
        let write = H::merge_fields(validated, current)?;
        let response = self.transport.request(write).await?;
        H::format(validated, response)
    }
}
