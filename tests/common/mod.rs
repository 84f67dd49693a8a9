//! Common test utilities and helpers for costaudit tests
//!
//! This module provides a record builder and a few fixed record sets so the
//! integration tests read as scenarios rather than struct literals.

use chrono::NaiveDate;
use costaudit::{OwnerTag, Record, RecordId};

/// Common test services
pub const TEST_SERVICES: &[&str] = &["AmazonEC2", "AmazonS3", "AWSLambda", "AmazonRDS"];

/// Common test owners
#[allow(dead_code)]
pub const TEST_OWNERS: &[&str] = &["alice", "bob", "carol", "dave"];

/// Common test accounts
#[allow(dead_code)]
pub const TEST_ACCOUNTS: &[&str] = &["platform-dev", "platform-prod", "research"];

/// Day of January 2019
pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 1, d).unwrap()
}

/// Builder for creating test Record instances
pub struct RecordBuilder {
    record_id: Option<String>,
    owner: Option<String>,
    service: String,
    account: String,
    region: String,
    period_date: NaiveDate,
    cost: f64,
}

impl RecordBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            record_id: None,
            owner: Some("alice".to_string()),
            service: TEST_SERVICES[0].to_string(),
            account: "platform-dev".to_string(),
            region: "us-west-2a".to_string(),
            period_date: day(1),
            cost: 1.0,
        }
    }

    #[allow(dead_code)]
    pub fn with_id(mut self, id: &str) -> Self {
        self.record_id = Some(id.to_string());
        self
    }

    pub fn with_owner(mut self, owner: &str) -> Self {
        self.owner = Some(owner.to_string());
        self
    }

    #[allow(dead_code)]
    pub fn without_owner(mut self) -> Self {
        self.owner = None;
        self
    }

    pub fn with_service(mut self, service: &str) -> Self {
        self.service = service.to_string();
        self
    }

    #[allow(dead_code)]
    pub fn with_account(mut self, account: &str) -> Self {
        self.account = account.to_string();
        self
    }

    #[allow(dead_code)]
    pub fn with_region(mut self, region: &str) -> Self {
        self.region = region.to_string();
        self
    }

    pub fn on_day(mut self, d: u32) -> Self {
        self.period_date = day(d);
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    /// Build the Record
    pub fn build(self) -> Record {
        Record {
            record_id: self.record_id.map(RecordId::new),
            owner: OwnerTag::from_raw(self.owner.as_deref()),
            service: self.service,
            account: self.account,
            region: self.region,
            period_date: self.period_date,
            cost: self.cost,
        }
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for an owner/service/cost record on a given day
#[allow(dead_code)]
pub fn record(owner: &str, service: &str, cost: f64, d: u32) -> Record {
    RecordBuilder::new()
        .with_owner(owner)
        .with_service(service)
        .with_cost(cost)
        .on_day(d)
        .build()
}

/// A mixed day of records across owners, services, accounts and regions
#[allow(dead_code)]
pub fn mixed_day(d: u32) -> Vec<Record> {
    let mut records = Vec::new();
    for (i, owner) in TEST_OWNERS.iter().enumerate() {
        for (j, service) in TEST_SERVICES.iter().enumerate() {
            if (i + j) % 3 == 0 {
                continue;
            }
            records.push(
                RecordBuilder::new()
                    .with_owner(owner)
                    .with_service(service)
                    .with_account(TEST_ACCOUNTS[(i + j) % TEST_ACCOUNTS.len()])
                    .with_region(if j % 2 == 0 { "us-west-2a" } else { "" })
                    .with_cost((i * 4 + j) as f64 * 0.75 + d as f64)
                    .on_day(d)
                    .build(),
            );
        }
    }
    records
}
