//! CloudTrail `CredentialVerification` event parsing.
//!
//! Events arrive two ways: as embedded JSON strings from the `LookupEvents`
//! API, or as records inside exported CloudTrail log files
//! (`{"Records": [...]}`, often gzip compressed). Both end up as
//! [`AuthEvent`]s.

use super::types::{AuthEvent, Outcome};
use crate::utils::reader::open_file;
use crate::utils::time::parse_event_time;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

/// CloudTrail event name of an Identity Center sign-in credential check.
pub const CREDENTIAL_VERIFICATION: &str = "CredentialVerification";

/// The parts of a CloudTrail record this tool reads.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloudTrailRecord {
    event_name: Option<String>,
    event_time: Option<String>,
    user_identity: Option<UserIdentity>,
    service_event_details: Option<ServiceEventDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserIdentity {
    user_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceEventDetails {
    #[serde(rename = "CredentialVerification")]
    credential_verification: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CloudTrailLogFile {
    #[serde(rename = "Records", default)]
    records: Vec<CloudTrailRecord>,
}

/// Why an event did not become an [`AuthEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Error)]
pub enum SkipReason {
    #[error("event is not valid JSON")]
    InvalidJson,
    #[error("event has no userIdentity.userName")]
    MissingUserName,
    #[error("event time is missing or unparseable")]
    BadTimestamp,
    #[error("event has no Success/Failure outcome")]
    UnknownOutcome,
}

/// Events collected from one or more sources.
#[derive(Debug, Default)]
pub struct ParsedEvents {
    pub events: Vec<AuthEvent>,
    /// Skipped events, counted per reason
    pub skipped: BTreeMap<SkipReason, usize>,
}

impl ParsedEvents {
    fn push(&mut self, parsed: Result<AuthEvent, SkipReason>) {
        match parsed {
            Ok(event) => self.events.push(event),
            Err(reason) => *self.skipped.entry(reason).or_insert(0) += 1,
        }
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

impl CloudTrailRecord {
    fn into_auth_event(self) -> Result<AuthEvent, SkipReason> {
        let user_name = self
            .user_identity
            .and_then(|identity| identity.user_name)
            .filter(|name| !name.is_empty())
            .ok_or(SkipReason::MissingUserName)?;

        let time = self
            .event_time
            .as_deref()
            .and_then(|ts| parse_event_time(ts).ok())
            .ok_or(SkipReason::BadTimestamp)?;

        let outcome = self
            .service_event_details
            .and_then(|details| details.credential_verification)
            .as_deref()
            .and_then(Outcome::parse)
            .ok_or(SkipReason::UnknownOutcome)?;

        Ok(AuthEvent {
            user_name,
            time,
            outcome,
        })
    }
}

/// Parse one embedded CloudTrail event document from `LookupEvents`.
pub fn parse_credential_event(raw: &str) -> Result<AuthEvent, SkipReason> {
    let record: CloudTrailRecord =
        serde_json::from_str(raw).map_err(|_| SkipReason::InvalidJson)?;
    record.into_auth_event()
}

/// Parse a batch of embedded event documents.
pub fn parse_credential_events<I, S>(raw_events: I) -> ParsedEvents
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed = ParsedEvents::default();
    for raw in raw_events {
        parsed.push(parse_credential_event(raw.as_ref()));
    }
    parsed
}

/// Read `CredentialVerification` events from exported CloudTrail log files.
///
/// Records with any other event name are ignored without counting as
/// skipped. `.gz` and `.zst` files are decompressed transparently.
pub fn read_cloudtrail_logs<P: AsRef<Path>>(paths: &[P]) -> Result<ParsedEvents> {
    let mut parsed = ParsedEvents::default();

    for path in paths {
        let path = path.as_ref();
        let reader = BufReader::new(open_file(path)?);
        let log: CloudTrailLogFile = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse CloudTrail log: {}", path.display()))?;

        for record in log.records {
            if record.event_name.as_deref() != Some(CREDENTIAL_VERIFICATION) {
                continue;
            }
            parsed.push(record.into_auth_event());
        }
    }

    Ok(parsed)
}
