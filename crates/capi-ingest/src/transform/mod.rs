//! Record transformer
//!
//! Turns one [`RawRecord`] into a hashed [`ConversionEvent`] plus the
//! [`AuditEntry`] that documents it, or a [`RejectReason`].
//!
//! The audit entry carries a copy of the exact event that is uploaded, so
//! what is persisted always matches what was sent.

pub mod clean;

use crate::clock::{Clock, SystemClock};
use crate::parser::RawRecord;
use capi_common::hashing::{hash_identifier, IdentifierKind};
use capi_common::types::{
    AuditEntry, CleanedFields, ConversionEvent, CustomData, EmailMatchMode, RawSnapshot, UserData,
};
use thiserror::Error;

/// Why a record was left out of the batch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("em0 is empty")]
    MissingEmail,

    #[error("em0 is not an email address")]
    InvalidEmail,

    #[error("none of em0, em1, em2 contains an email address")]
    NoValidEmail,

    #[error("row could not be read: {0}")]
    MalformedRow(String),
}

/// Result of transforming one record
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOutcome {
    Accepted {
        event: ConversionEvent,
        audit: Box<AuditEntry>,
    },
    Rejected(RejectReason),
}

impl TransformOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TransformOutcome::Accepted { .. })
    }
}

/// Cleans, hashes and packages records
pub struct RecordTransformer<C: Clock = SystemClock> {
    email_mode: EmailMatchMode,
    clock: C,
}

impl RecordTransformer<SystemClock> {
    pub fn new(email_mode: EmailMatchMode) -> Self {
        Self::with_clock(email_mode, SystemClock)
    }
}

impl<C: Clock> RecordTransformer<C> {
    /// Use a specific clock for rows without a readable timestamp
    pub fn with_clock(email_mode: EmailMatchMode, clock: C) -> Self {
        Self { email_mode, clock }
    }

    pub fn email_mode(&self) -> EmailMatchMode {
        self.email_mode
    }

    /// Transform one record
    ///
    /// `sequence` is written into the audit entry; the caller only advances
    /// it when the record is accepted.
    pub fn transform(&self, record: &RawRecord, sequence: u64) -> TransformOutcome {
        match self.build(record, sequence) {
            Ok((event, audit)) => TransformOutcome::Accepted {
                event,
                audit: Box::new(audit),
            },
            Err(reason) => TransformOutcome::Rejected(reason),
        }
    }

    fn build(
        &self,
        record: &RawRecord,
        sequence: u64,
    ) -> Result<(ConversionEvent, AuditEntry), RejectReason> {
        let raw_emails = clean::select_emails(record.email_columns(), self.email_mode)?;
        let emails: Vec<String> = raw_emails.iter().map(|e| clean::clean_email(e)).collect();

        let phone = clean::clean_phone(record.phone.as_deref());
        let (first_name, last_name) = clean::split_name(record.name.as_deref());
        let zip = clean::clean_code(record.zip.as_deref());
        let country = clean::clean_code(record.country.as_deref());
        let gender = clean::gender_code(record.gender.as_deref()).to_string();
        let madid = clean::clean_madid(record.madid.as_deref());

        let value = clean::parse_value(record.price.as_deref());
        let currency = clean::infer_currency(record.price.as_deref());

        let event_time = clean::parse_event_time(record.time.as_deref())
            .unwrap_or_else(|| self.clock.now())
            .timestamp();

        let hashed = |field: &str, kind: IdentifierKind| -> Vec<String> {
            hash_identifier(Some(field), kind).into_iter().collect()
        };

        let user_data = UserData {
            em: emails
                .iter()
                .filter_map(|email| hash_identifier(Some(email), IdentifierKind::Email))
                .collect(),
            ph: hashed(&phone, IdentifierKind::Phone),
            first_name: hashed(&first_name, IdentifierKind::FirstName),
            last_name: hashed(&last_name, IdentifierKind::LastName),
            ge: hashed(&gender, IdentifierKind::Gender),
            zp: hashed(&zip, IdentifierKind::Zip),
            country: hashed(&country, IdentifierKind::Country),
            madid: madid.clone(),
        };

        let event = ConversionEvent::purchase(event_time, user_data, CustomData { value, currency });

        let audit = AuditEntry {
            sequence,
            raw: RawSnapshot {
                emails: raw_emails,
                name: record.name.clone(),
                phone: record.phone.clone(),
                madid: record.madid.clone(),
                zip: record.zip.clone(),
                country: record.country.clone(),
                gender: record.gender.clone(),
                price: record.price.clone(),
                time: record.time.clone(),
            },
            cleaned: CleanedFields {
                emails,
                first_name,
                last_name,
                phone,
                madid,
                zip,
                country,
                gender,
                value,
                currency,
                event_time,
            },
            event: event.clone(),
        };

        Ok((event, audit))
    }
}
