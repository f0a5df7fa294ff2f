//! Customer records parsed from the prediction form

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Youngest accepted customer age
pub const MIN_AGE: i64 = 18;
/// Oldest accepted customer age
pub const MAX_AGE: i64 = 100;

/// Input column the encoder was fit on, named as in the training data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    Income,
    Recency,
    Age,
    #[serde(rename = "Total_Kids")]
    TotalKids,
    #[serde(rename = "Total_Spend")]
    TotalSpend,
    #[serde(rename = "Total_Purchases")]
    TotalPurchases,
    #[serde(rename = "NumWebVisitsMonth")]
    WebVisitsPerMonth,
    Education,
    #[serde(rename = "Marital_Status")]
    MaritalStatus,
}

impl Feature {
    /// Column name used by the training data and artifact files
    pub fn name(self) -> &'static str {
        match self {
            Feature::Income => "Income",
            Feature::Recency => "Recency",
            Feature::Age => "Age",
            Feature::TotalKids => "Total_Kids",
            Feature::TotalSpend => "Total_Spend",
            Feature::TotalPurchases => "Total_Purchases",
            Feature::WebVisitsPerMonth => "NumWebVisitsMonth",
            Feature::Education => "Education",
            Feature::MaritalStatus => "Marital_Status",
        }
    }

    pub fn is_categorical(self) -> bool {
        matches!(self, Feature::Education | Feature::MaritalStatus)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a form submission could not be turned into a record.
///
/// Only logged; callers see the generic format message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("missing form field `{0}`")]
    Missing(&'static str),

    #[error("form field `{field}` has invalid value {value:?}")]
    Invalid { field: &'static str, value: String },
}

/// One customer as submitted through the form
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRecord {
    pub income: f64,
    pub recency: i64,
    pub age: i64,
    pub total_kids: i64,
    pub total_spend: f64,
    pub total_purchases: i64,
    pub web_visits_per_month: i64,
    pub education: String,
    pub marital_status: String,
}

impl CustomerRecord {
    /// Parse the submitted form fields.
    ///
    /// The form has a single `web_visits` input which feeds both
    /// `Total_Purchases` and `NumWebVisitsMonth`; the deployed model was
    /// trained against that mapping.
    pub fn from_form(fields: &HashMap<String, String>) -> Result<Self, FieldError> {
        let web_visits: i64 = parse_number(fields, "web_visits")?;

        Ok(Self {
            income: parse_real(fields, "income")?,
            recency: parse_number(fields, "recency")?,
            age: parse_number(fields, "age")?,
            total_kids: parse_number(fields, "kids")?,
            total_spend: parse_real(fields, "spend")?,
            total_purchases: web_visits,
            web_visits_per_month: web_visits,
            education: raw_field(fields, "education")?.to_string(),
            marital_status: raw_field(fields, "marital")?.to_string(),
        })
    }

    /// Range checks applied before inference. Only income and age are
    /// constrained.
    pub fn is_valid(&self) -> bool {
        self.income >= 0.0 && (MIN_AGE..=MAX_AGE).contains(&self.age)
    }

    /// Value of a numeric feature, `None` for categorical ones
    pub fn numeric(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::Income => Some(self.income),
            Feature::Recency => Some(self.recency as f64),
            Feature::Age => Some(self.age as f64),
            Feature::TotalKids => Some(self.total_kids as f64),
            Feature::TotalSpend => Some(self.total_spend),
            Feature::TotalPurchases => Some(self.total_purchases as f64),
            Feature::WebVisitsPerMonth => Some(self.web_visits_per_month as f64),
            Feature::Education | Feature::MaritalStatus => None,
        }
    }

    /// Value of a categorical feature, `None` for numeric ones
    pub fn categorical(&self, feature: Feature) -> Option<&str> {
        match feature {
            Feature::Education => Some(&self.education),
            Feature::MaritalStatus => Some(&self.marital_status),
            _ => None,
        }
    }
}

fn raw_field<'a>(
    fields: &'a HashMap<String, String>,
    name: &'static str,
) -> Result<&'a str, FieldError> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or(FieldError::Missing(name))
}

fn parse_number<T: FromStr>(
    fields: &HashMap<String, String>,
    name: &'static str,
) -> Result<T, FieldError> {
    let raw = raw_field(fields, name)?;
    raw.trim().parse().map_err(|_| FieldError::Invalid {
        field: name,
        value: raw.to_string(),
    })
}

fn parse_real(fields: &HashMap<String, String>, name: &'static str) -> Result<f64, FieldError> {
    let value: f64 = parse_number(fields, name)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FieldError::Invalid {
            field: name,
            value: raw_field(fields, name)?.to_string(),
        })
    }
}
