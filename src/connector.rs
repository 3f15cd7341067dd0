//! Connector lifecycle
//!
//! The connector object the host framework drives: validates configuration
//! before any task exists, fans identical property maps out to the requested
//! number of tasks, and tracks coarse lifecycle state. Tasks created from
//! those property maps do the actual record forwarding.

use crate::config::{ConfigDef, ConfigValidation, HttpSinkConfig};
use crate::error::{HttpSinkError, Result};
use crate::record::ConnectorState;
use crate::VERSION;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// Status snapshot for the framework's REST surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorStatus {
    pub name: String,
    pub state: ConnectorState,
    pub tasks: u32,
    /// Error trace when the connector is in a failed state.
    pub trace: Option<String>,
}

/// HTTP sink connector lifecycle object.
pub struct HttpSinkConnector {
    name: String,
    props: Option<HashMap<String, String>>,
    state: ConnectorState,
    error: Option<String>,
}

impl HttpSinkConnector {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            props: None,
            state: ConnectorState::Unassigned,
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Connector version, from the crate metadata.
    pub fn version(&self) -> &'static str {
        VERSION
    }

    /// The configuration definitions understood by this connector.
    pub fn config_definitions(&self) -> Vec<ConfigDef> {
        HttpSinkConfig::definitions()
    }

    /// Validate a property map key by key without starting anything.
    pub fn validate_config(&self, props: &HashMap<String, String>) -> Vec<ConfigValidation> {
        HttpSinkConfig::validate_props(props)
    }

    /// Start the connector: validate and retain the properties.
    ///
    /// Fails fast with a configuration fault; no producers or HTTP clients
    /// are created here, that happens per task.
    pub fn start(&mut self, props: HashMap<String, String>) -> Result<()> {
        info!(connector = %self.name, "Starting HTTP sink connector");

        match HttpSinkConfig::from_props(&props) {
            Ok(config) => {
                info!(
                    connector = %self.name,
                    url = %config.http_api_url,
                    method = %config.http_method,
                    auth = config.auth.type_name(),
                    response_topic = config.response_topic.enabled,
                    error_topic = config.error_topic.enabled,
                    "Connector configuration validated"
                );
                self.props = Some(props);
                self.state = ConnectorState::Running;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                warn!(connector = %self.name, error = %e, "Connector configuration rejected");
                self.state = ConnectorState::Failed;
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Property maps for up to `max_tasks` tasks.
    ///
    /// Every task receives an identical copy; tasks do not partition the
    /// configuration among themselves, the framework partitions the topics.
    pub fn task_configs(&self, max_tasks: u32) -> Result<Vec<HashMap<String, String>>> {
        let props = self
            .props
            .as_ref()
            .ok_or_else(|| HttpSinkError::Task("Connector is not started".to_string()))?;
        Ok((0..max_tasks.max(1)).map(|_| props.clone()).collect())
    }

    /// Stop the connector. Tasks are stopped by the framework.
    pub fn stop(&mut self) {
        info!(connector = %self.name, "Stopping HTTP sink connector");
        self.state = ConnectorState::Paused;
    }

    pub fn state(&self) -> ConnectorState {
        self.state
    }

    pub fn status(&self, tasks: u32) -> ConnectorStatus {
        ConnectorStatus {
            name: self.name.clone(),
            state: self.state,
            tasks,
            trace: self.error.clone(),
        }
    }
}
