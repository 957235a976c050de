//! # Activities
//!
//! Stored shape of a winter activity plus the request payloads that create or change one.
//!
//! ## Schema
//! - `_id` (**string**): UUID v4, assigned on insert
//! - `name` (**string**): required, non-empty
//! - `price` (**number**): required, minimum 0
//! - `isSnowNeeded` (**bool**): required
//! - `createdAt` / `updatedAt` (**timestamp**): maintained by the server
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required fields: name, price, isSnowNeeded")]
    MissingFields,

    #[error("Validation failed: name must not be empty")]
    EmptyName,

    #[error("Validation failed: price ({0}) is less than minimum allowed value (0)")]
    NegativePrice(f64),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub price: f64,
    pub is_snow_needed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    pub fn create(new: NewActivity, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            price: new.price,
            is_snow_needed: new.is_snow_needed,
            created_at: now,
            updated_at: now,
        }
    }

    /// Each activity of a batch gets its own `createdAt`, one microsecond apart, so sorting
    /// by `createdAt` gives back the order of `new`.
    pub fn create_batch(new: Vec<NewActivity>, now: DateTime<Utc>) -> Vec<Self> {
        new.into_iter()
            .zip(0..)
            .map(|(new, offset)| Self::create(new, now + TimeDelta::microseconds(offset)))
            .collect()
    }

    pub fn apply(&mut self, changes: ActivityChanges, now: DateTime<Utc>) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(price) = changes.price {
            self.price = price;
        }
        if let Some(is_snow_needed) = changes.is_snow_needed {
            self.is_snow_needed = is_snow_needed;
        }

        self.updated_at = now;
    }

    pub fn is_free(&self) -> bool {
        self.price == 0.0
    }
}

/// Wire body of create and update requests, nothing is required at this level.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPayload {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub is_snow_needed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub name: String,
    pub price: f64,
    pub is_snow_needed: bool,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ActivityChanges {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub is_snow_needed: Option<bool>,
}

impl ActivityPayload {
    pub fn into_new(self) -> Result<NewActivity, ValidationError> {
        let (Some(name), Some(price), Some(is_snow_needed)) =
            (self.name, self.price, self.is_snow_needed)
        else {
            return Err(ValidationError::MissingFields);
        };

        if name.is_empty() {
            return Err(ValidationError::MissingFields);
        }
        check_price(price)?;

        Ok(NewActivity {
            name,
            price,
            is_snow_needed,
        })
    }

    /// Absent fields stay as they are, present ones go through the create rules.
    pub fn into_changes(self) -> Result<ActivityChanges, ValidationError> {
        if self.name.as_deref().is_some_and(str::is_empty) {
            return Err(ValidationError::EmptyName);
        }
        if let Some(price) = self.price {
            check_price(price)?;
        }

        Ok(ActivityChanges {
            name: self.name,
            price: self.price,
            is_snow_needed: self.is_snow_needed,
        })
    }
}

fn check_price(price: f64) -> Result<(), ValidationError> {
    if price < 0.0 || price.is_nan() {
        return Err(ValidationError::NegativePrice(price));
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    SnowNeeded(bool),
    Free,
}

impl Filter {
    /// Only the literal `"true"` counts as true.
    pub fn snow_from_param(required: &str) -> Self {
        Filter::SnowNeeded(required == "true")
    }

    pub fn matches(&self, activity: &Activity) -> bool {
        match self {
            Filter::SnowNeeded(required) => activity.is_snow_needed == *required,
            Filter::Free => activity.is_free(),
        }
    }
}
