// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Polling a resource until it exists and reports the condition its kind requires.

use crate::args;
use crate::constants::{kinds, poll};
use crate::error::{KetError, Result};
use crate::kubectl::{Kubectl, ResourceRef, CONDITIONS_JSONPATH, NAMES_JSONPATH};
use crate::tools::CommandRunner;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// Measured from the start of the wait, regardless of how long checks take
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(poll::CHECK_INTERVAL_SECS),
            timeout: Duration::from_secs(poll::TIMEOUT_SECS),
        }
    }
}

/// What has to hold for an object of some kind to count as ready
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The named status condition type must be present
    Condition(&'static str),
    /// Being listed is enough
    Exists,
}

pub fn readiness_for(kind: &str) -> Readiness {
    let kind = kind.to_lowercase();
    let kind = kind.as_str();
    if kinds::POD.contains(&kind) {
        Readiness::Condition("Ready")
    } else if kinds::DEPLOYMENT.contains(&kind) {
        Readiness::Condition("Available")
    } else {
        Readiness::Exists
    }
}

/// Split single-line kubectl output into its space separated items.
/// A matching pair of outer quotes (`"`, `'` or backtick) is stripped first.
pub fn parse_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let unquoted = ['"', '\'', '`']
        .iter()
        .find_map(|q| {
            trimmed
                .strip_prefix(*q)
                .and_then(|rest| rest.strip_suffix(*q))
        })
        .unwrap_or(trimmed);

    unquoted
        .split(' ')
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

impl<R: CommandRunner> Kubectl<R> {
    /// Names of every object of `kind` in `namespace`
    pub async fn resource_names(&self, namespace: &str, kind: &str) -> Result<Vec<String>> {
        let out = self
            .runner
            .capture(&args!["get", kind, "-n", namespace, NAMES_JSONPATH])
            .await
            .map_err(|e| KetError::manifest("list", format!("{} in {}", kind, namespace), e))?;
        Ok(parse_list(&out.stdout))
    }

    /// Condition types currently reported in the object's status
    pub async fn resource_conditions(&self, resource: &ResourceRef) -> Result<Vec<String>> {
        let out = self
            .runner
            .capture(&args![
                "get",
                resource.kind,
                resource.name,
                "-n",
                resource.namespace,
                CONDITIONS_JSONPATH
            ])
            .await
            .map_err(|e| KetError::manifest("get status of", resource.to_string(), e))?;
        Ok(parse_list(&out.stdout))
    }

    /// One readiness check: listed, and carrying the condition its kind requires
    pub async fn resource_ready(&self, resource: &ResourceRef) -> Result<bool> {
        self.check(resource, readiness_for(&resource.kind)).await
    }

    async fn check(&self, resource: &ResourceRef, readiness: Readiness) -> Result<bool> {
        let names = self.resource_names(&resource.namespace, &resource.kind).await?;
        if !names.contains(&resource.name) {
            return Ok(false);
        }
        match readiness {
            Readiness::Exists => Ok(true),
            Readiness::Condition(condition) => {
                let conditions = self.resource_conditions(resource).await?;
                Ok(conditions.iter().any(|c| c == condition))
            }
        }
    }

    /// Poll until the resource is ready. Fails on the first query error, or
    /// with [`KetError::Timeout`] once the budget is spent.
    pub async fn wait_ready(&self, resource: &ResourceRef) -> Result<()> {
        self.poll_until(resource, readiness_for(&resource.kind)).await
    }

    /// Poll until the resource is listed and reports `condition`, whatever its kind
    pub async fn wait_for_condition(&self, resource: &ResourceRef, condition: &'static str) -> Result<()> {
        self.poll_until(resource, Readiness::Condition(condition)).await
    }

    #[instrument(skip(self), fields(resource = %resource))]
    async fn poll_until(&self, resource: &ResourceRef, readiness: Readiness) -> Result<()> {
        let started = Instant::now();

        loop {
            if started.elapsed() > self.poll.timeout {
                return Err(KetError::Timeout {
                    kind: resource.kind.clone(),
                    namespace: resource.namespace.clone(),
                    name: resource.name.clone(),
                });
            }

            if self.check(resource, readiness).await? {
                info!("{} is ready after {:?}", resource, started.elapsed());
                return Ok(());
            }

            debug!("{} not ready yet", resource);
            sleep(self.poll.interval).await;
        }
    }
}
