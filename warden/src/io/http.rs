//! Probe client: bounded HTTP GETs classified as pass/fail.
//!
//! The [`HttpProbe`] trait decouples the health check from the actual network
//! stack. Tests use scripted probes that answer from a map without sockets.

use std::time::Duration;

use tracing::{debug, instrument};

use crate::core::types::{CheckKind, CheckResult};

/// Abstraction over issuing a single GET.
///
/// `Err` carries the transport failure description (DNS, refused, timeout);
/// `Ok` carries the HTTP status code.
pub trait HttpProbe: Sync {
    fn get_status(&self, url: &str, timeout: Duration) -> Result<u16, String>;
}

/// Probe backed by a blocking `reqwest` client.
pub struct ReqwestProbe;

impl HttpProbe for ReqwestProbe {
    fn get_status(&self, url: &str, timeout: Duration) -> Result<u16, String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("build http client: {e}"))?;
        let response = client.get(url).send().map_err(|e| e.to_string())?;
        Ok(response.status().as_u16())
    }
}

/// Issue one GET and fold the outcome into a [`CheckResult`].
///
/// `passed` requires exactly HTTP 200. Transport failures are data, never
/// errors: the caller always gets a result per target.
#[instrument(skip(probe))]
pub fn probe(probe: &dyn HttpProbe, kind: CheckKind, url: &str, timeout: Duration) -> CheckResult {
    let (passed, detail) = match probe.get_status(url, timeout) {
        Ok(200) => (true, "HTTP 200".to_string()),
        Ok(status) => (false, format!("HTTP {status} (expected 200)")),
        Err(transport) => (false, transport),
    };
    debug!(passed, %detail, "probe finished");
    CheckResult {
        kind,
        target: Some(url.to_string()),
        passed,
        detail,
    }
}

/// Probe every asset URL independently and concurrently.
///
/// One failing asset never short-circuits the others, and results come back
/// in the original target order regardless of completion order.
pub fn probe_assets(probe_impl: &dyn HttpProbe, urls: &[String], timeout: Duration) -> Vec<CheckResult> {
    let mut slots: Vec<Option<CheckResult>> = urls.iter().map(|_| None).collect();
    std::thread::scope(|scope| {
        for (slot, url) in slots.iter_mut().zip(urls) {
            scope.spawn(move || {
                *slot = Some(probe(probe_impl, CheckKind::Asset, url, timeout));
            });
        }
    });
    slots
        .into_iter()
        .zip(urls)
        .map(|(slot, url)| {
            slot.unwrap_or_else(|| CheckResult {
                kind: CheckKind::Asset,
                target: Some(url.clone()),
                passed: false,
                detail: "probe worker did not report".to_string(),
            })
        })
        .collect()
}
