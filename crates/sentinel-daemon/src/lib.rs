//! Sentinel daemon: runs the monitors described by a TOML file against HTTP
//! report, crypto, enforcement and finalization backends.

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod http;

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use sentinel::{LedgerSink, Monitor};

use crate::config::MonitorSettings;
use crate::http::{HttpEncryptor, HttpEnforcer, HttpFinalizer, HttpReportSource};

/// Wire one `[[monitor]]` table to its HTTP collaborators and the shared ledger.
pub fn build_monitor(
    settings: &MonitorSettings,
    client: &Client,
    ledger: Arc<dyn LedgerSink>,
) -> Result<Monitor> {
    let endpoints = &settings.endpoints;
    let mut builder = Monitor::builder(settings.name.clone())
        .config(settings.monitor_config()?)
        .report_source(Arc::new(HttpReportSource::new(
            client.clone(),
            endpoints.reports.clone(),
        )))
        .predicate(settings.predicate.build())
        .tier_actions(settings.actions)
        .encryptor(Arc::new(HttpEncryptor::new(
            client.clone(),
            endpoints.encrypt.clone(),
        )))
        .enforcer(Arc::new(HttpEnforcer::new(
            client.clone(),
            endpoints.enforce.clone(),
        )))
        .ledger(ledger);
    if let Some(url) = &endpoints.finalize {
        builder = builder.finalizer(Arc::new(HttpFinalizer::new(client.clone(), url.clone())));
    }
    builder
        .build()
        .with_context(|| format!("Failed to build monitor {}", settings.name))
}
