//! Policy domain models: grants, groupings and scoped permission names

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const ACTION_READ: &str = "read";
pub const ACTION_WRITE: &str = "write";

/// Namespace shared by every customer-data permission object
pub const PORTAL_DATA_PREFIX: &str = "portal::data";
const CUSTOMER_SEGMENT: &str = "customer";
const SEPARATOR: &str = "::";

/// `(subject, object, action)` permission triple.
///
/// The subject is either a user id or a role name; role grants are the
/// catalog entries attached to that role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyGrant {
    pub subject: String,
    pub object: String,
    pub action: String,
}

impl PolicyGrant {
    pub fn new(
        subject: impl Into<String>,
        object: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
            action: action.into(),
        }
    }

    /// Read grant on a scoped customer-data object
    pub fn scoped_read(subject: impl Into<String>, object: &ScopedObject) -> Self {
        Self::new(subject, object.to_string(), ACTION_READ)
    }
}

/// `(subject, role)` membership record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupingGrant {
    pub subject: String,
    pub role: String,
}

impl GroupingGrant {
    pub fn new(subject: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            role: role.into(),
        }
    }
}

/// Discriminator stored in `policy_rules.ptype`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyType {
    Grant,
    Grouping,
}

impl PolicyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyType::Grant => "p",
            PolicyType::Grouping => "g",
        }
    }
}

/// Raw `policy_rules` row
#[derive(Debug, Clone, FromRow)]
pub struct PolicyRuleRow {
    pub ptype: String,
    pub v0: String,
    pub v1: String,
    pub v2: String,
}

/// Decoded policy record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyRule {
    Grant(PolicyGrant),
    Grouping(GroupingGrant),
}

impl TryFrom<PolicyRuleRow> for PolicyRule {
    type Error = AppError;

    fn try_from(row: PolicyRuleRow) -> Result<Self, Self::Error> {
        match row.ptype.as_str() {
            "p" => Ok(PolicyRule::Grant(PolicyGrant::new(row.v0, row.v1, row.v2))),
            "g" => Ok(PolicyRule::Grouping(GroupingGrant::new(row.v0, row.v1))),
            other => Err(AppError::Internal(anyhow::anyhow!(
                "Unknown policy rule type '{}'",
                other
            ))),
        }
    }
}

/// Customer-data permission object.
///
/// Wire forms:
/// - `portal::data::<customer_id>::<attribute>` (Specific)
/// - `portal::data::customer::<attribute>` (Fallback, "for at least one customer")
/// - `portal::data::customer` (CustomerWide, customer-portal login eligibility)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopedObject {
    Specific { customer_id: i64, attribute: String },
    Fallback { attribute: String },
    CustomerWide,
}

impl ScopedObject {
    pub fn specific(customer_id: i64, attribute: impl Into<String>) -> Self {
        ScopedObject::Specific {
            customer_id,
            attribute: attribute.into(),
        }
    }

    pub fn fallback(attribute: impl Into<String>) -> Self {
        ScopedObject::Fallback {
            attribute: attribute.into(),
        }
    }

    pub fn attribute(&self) -> Option<&str> {
        match self {
            ScopedObject::Specific { attribute, .. } | ScopedObject::Fallback { attribute } => {
                Some(attribute)
            }
            ScopedObject::CustomerWide => None,
        }
    }

    pub fn customer_id(&self) -> Option<i64> {
        match self {
            ScopedObject::Specific { customer_id, .. } => Some(*customer_id),
            _ => None,
        }
    }
}

impl fmt::Display for ScopedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopedObject::Specific {
                customer_id,
                attribute,
            } => write!(f, "{PORTAL_DATA_PREFIX}{SEPARATOR}{customer_id}{SEPARATOR}{attribute}"),
            ScopedObject::Fallback { attribute } => {
                write!(f, "{PORTAL_DATA_PREFIX}{SEPARATOR}{CUSTOMER_SEGMENT}{SEPARATOR}{attribute}")
            }
            ScopedObject::CustomerWide => write!(f, "{PORTAL_DATA_PREFIX}{SEPARATOR}{CUSTOMER_SEGMENT}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopedObjectError {
    #[error("'{0}' is not a portal data object")]
    UnknownNamespace(String),
    #[error("'{0}' has an invalid customer segment")]
    InvalidCustomer(String),
    #[error("attribute '{0}' is invalid")]
    InvalidAttribute(String),
}

impl From<ScopedObjectError> for AppError {
    fn from(err: ScopedObjectError) -> Self {
        AppError::Validation(err.to_string())
    }
}

lazy_static::lazy_static! {
    /// Attributes are single path segments
    static ref ATTRIBUTE_REGEX: regex::Regex = regex::Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

pub fn validate_attribute(attribute: &str) -> Result<(), ScopedObjectError> {
    if ATTRIBUTE_REGEX.is_match(attribute) {
        Ok(())
    } else {
        Err(ScopedObjectError::InvalidAttribute(attribute.to_string()))
    }
}

impl FromStr for ScopedObject {
    type Err = ScopedObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(PORTAL_DATA_PREFIX)
            .and_then(|r| r.strip_prefix(SEPARATOR))
            .ok_or_else(|| ScopedObjectError::UnknownNamespace(s.to_string()))?;

        let (scope, attribute) = match rest.split_once(SEPARATOR) {
            Some((scope, attribute)) => (scope, Some(attribute)),
            None => (rest, None),
        };

        match (scope, attribute) {
            (CUSTOMER_SEGMENT, None) => Ok(ScopedObject::CustomerWide),
            (CUSTOMER_SEGMENT, Some(attribute)) => {
                validate_attribute(attribute)?;
                Ok(ScopedObject::fallback(attribute))
            }
            (customer, Some(attribute)) => {
                let customer_id: i64 = Some(customer)
                    .filter(|c| !c.is_empty() && c.bytes().all(|b| b.is_ascii_digit()))
                    .and_then(|c| c.parse::<i64>().ok())
                    .filter(|id| *id > 0)
                    .ok_or_else(|| ScopedObjectError::InvalidCustomer(s.to_string()))?;
                validate_attribute(attribute)?;
                Ok(ScopedObject::specific(customer_id, attribute))
            }
            (_, None) => Err(ScopedObjectError::InvalidCustomer(s.to_string())),
        }
    }
}
