//! Amazon Athena backend.

use crate::config::QueryConfig;
use crate::service::{QueryId, QueryService, QueryState, QueryStatus, ResultPage, Row};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::types::{QueryExecutionContext, QueryExecutionState, ResultConfiguration};
use aws_sdk_athena::Client;
use chatlog_core::{Error, Result};
use tracing::{debug, info};

/// Athena client bound to one database and result location.
#[derive(Clone)]
pub struct AthenaQueryService {
    client: Client,
    database: String,
    output_location: String,
    workgroup: Option<String>,
}

impl AthenaQueryService {
    /// Loads AWS configuration from the environment and builds a client.
    pub async fn from_config(config: &QueryConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        info!(
            database = %config.database,
            output_location = %config.output_location,
            workgroup = config.workgroup.as_deref().unwrap_or("default"),
            "Created Athena client"
        );

        Self::new(Client::new(&sdk_config), config)
    }

    pub fn new(client: Client, config: &QueryConfig) -> Self {
        Self {
            client,
            database: config.database.clone(),
            output_location: config.output_location.clone(),
            workgroup: config.workgroup.clone(),
        }
    }
}

fn map_state(state: &QueryExecutionState) -> Option<QueryState> {
    match state {
        QueryExecutionState::Queued => Some(QueryState::Queued),
        QueryExecutionState::Running => Some(QueryState::Running),
        QueryExecutionState::Succeeded => Some(QueryState::Succeeded),
        QueryExecutionState::Failed => Some(QueryState::Failed),
        QueryExecutionState::Cancelled => Some(QueryState::Cancelled),
        _ => None,
    }
}

#[async_trait]
impl QueryService for AthenaQueryService {
    async fn start_query(&self, query: &str) -> Result<QueryId> {
        let context = QueryExecutionContext::builder()
            .database(&self.database)
            .build();

        let mut request = self
            .client
            .start_query_execution()
            .query_string(query)
            .query_execution_context(context)
            .set_work_group(self.workgroup.clone());

        if !self.output_location.is_empty() {
            request = request.result_configuration(
                ResultConfiguration::builder()
                    .output_location(&self.output_location)
                    .build(),
            );
        }

        let output = request
            .send()
            .await
            .map_err(|e| Error::submission(DisplayErrorContext(&e).to_string()))?;

        let id = output
            .query_execution_id()
            .ok_or_else(|| Error::submission("no query execution id returned"))?;

        debug!(query_id = %id, "Started query execution");
        Ok(id.to_string())
    }

    async fn poll_query(&self, id: &str) -> Result<QueryStatus> {
        let output = self
            .client
            .get_query_execution()
            .query_execution_id(id)
            .send()
            .await
            .map_err(|e| Error::poll(DisplayErrorContext(&e).to_string()))?;

        let status = output
            .query_execution()
            .and_then(|execution| execution.status())
            .ok_or_else(|| Error::poll(format!("no status for query {}", id)))?;

        let raw_state = status
            .state()
            .ok_or_else(|| Error::poll(format!("no state for query {}", id)))?;
        let state = map_state(raw_state)
            .ok_or_else(|| Error::poll(format!("unknown state {:?} for query {}", raw_state, id)))?;

        Ok(QueryStatus {
            state,
            reason: status.state_change_reason().map(str::to_string),
        })
    }

    async fn fetch_results(&self, id: &str, next_token: Option<String>) -> Result<ResultPage> {
        let output = self
            .client
            .get_query_results()
            .query_execution_id(id)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| Error::query(DisplayErrorContext(&e).to_string()))?;

        let rows: Vec<Row> = output
            .result_set()
            .map(|set| {
                set.rows()
                    .iter()
                    .map(|row| {
                        row.data()
                            .iter()
                            .map(|datum| datum.var_char_value().unwrap_or_default().to_string())
                            .collect()
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ResultPage {
            rows,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .list_work_groups()
            .max_results(1)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| Error::query(DisplayErrorContext(&e).to_string()))
    }
}
