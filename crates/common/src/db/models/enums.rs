//! String-backed enumerations shared by storage, validation and clients

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller role carried by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[sea_orm(string_value = "ADMIN")]
    Admin,
    #[sea_orm(string_value = "STAFF")]
    Staff,
    #[sea_orm(string_value = "USER")]
    User,
}

impl Role {
    /// Roles with elevated shelter permissions
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Staff)
    }
}

/// Adoption application status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "REVIEWING")]
    Reviewing,
    #[sea_orm(string_value = "WAITLISTED")]
    Waitlisted,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    #[sea_orm(string_value = "WITHDRAWN")]
    Withdrawn,
    #[sea_orm(string_value = "ADOPTED")]
    Adopted,
}

/// Per-animal task status. `Deleted` is a soft-delete marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    #[sea_orm(string_value = "TODO")]
    Todo,
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "DONE")]
    Done,
    #[sea_orm(string_value = "DELETED")]
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    #[sea_orm(string_value = "LOW")]
    Low,
    #[default]
    #[sea_orm(string_value = "MEDIUM")]
    Medium,
    #[sea_orm(string_value = "HIGH")]
    High,
    #[sea_orm(string_value = "URGENT")]
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskCategory {
    #[sea_orm(string_value = "MEDICAL")]
    Medical,
    #[sea_orm(string_value = "BEHAVIORAL")]
    Behavioral,
    #[sea_orm(string_value = "GROOMING")]
    Grooming,
    #[sea_orm(string_value = "FEEDING")]
    Feeding,
    #[sea_orm(string_value = "ADMINISTRATIVE")]
    Administrative,
    #[sea_orm(string_value = "OTHER")]
    Other,
}

/// Publication state of an animal record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(24))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnimalListingStatus {
    #[default]
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "PUBLISHED")]
    Published,
    #[sea_orm(string_value = "PENDING_ADOPTION")]
    PendingAdoption,
    #[sea_orm(string_value = "ARCHIVED")]
    Archived,
}

impl AnimalListingStatus {
    /// Visible on the public site
    pub fn is_public(&self) -> bool {
        matches!(self, AnimalListingStatus::Published | AnimalListingStatus::PendingAdoption)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sex {
    #[sea_orm(string_value = "MALE")]
    Male,
    #[sea_orm(string_value = "FEMALE")]
    Female,
    #[default]
    #[sea_orm(string_value = "UNKNOWN")]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(24))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    #[default]
    #[sea_orm(string_value = "HEALTHY")]
    Healthy,
    #[sea_orm(string_value = "UNDER_TREATMENT")]
    UnderTreatment,
    #[sea_orm(string_value = "CHRONIC_CONDITION")]
    ChronicCondition,
    #[sea_orm(string_value = "CRITICAL")]
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(24))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegalStatus {
    #[default]
    #[sea_orm(string_value = "STRAY_HOLD")]
    StrayHold,
    #[sea_orm(string_value = "OWNER_SURRENDERED")]
    OwnerSurrendered,
    #[sea_orm(string_value = "SHELTER_OWNED")]
    ShelterOwned,
    #[sea_orm(string_value = "FOSTER")]
    Foster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HousingType {
    #[sea_orm(string_value = "HOUSE")]
    House,
    #[sea_orm(string_value = "APARTMENT")]
    Apartment,
    #[sea_orm(string_value = "CONDO")]
    Condo,
    #[sea_orm(string_value = "OTHER")]
    Other,
}

/// Terminal disposition of an animal's shelter journey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(24))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeType {
    #[sea_orm(string_value = "ADOPTION")]
    Adoption,
    #[sea_orm(string_value = "TRANSFER")]
    Transfer,
    #[sea_orm(string_value = "RETURN_TO_OWNER")]
    ReturnToOwner,
    #[sea_orm(string_value = "DIED")]
    Died,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoteCategory {
    #[default]
    #[sea_orm(string_value = "GENERAL")]
    General,
    #[sea_orm(string_value = "MEDICAL")]
    Medical,
    #[sea_orm(string_value = "BEHAVIORAL")]
    Behavioral,
    #[sea_orm(string_value = "ADOPTION")]
    Adoption,
}

/// Input type of an assessment template field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    #[sea_orm(string_value = "TEXT")]
    Text,
    #[sea_orm(string_value = "NUMBER")]
    Number,
    #[sea_orm(string_value = "SELECT")]
    Select,
    #[sea_orm(string_value = "BOOLEAN")]
    Boolean,
    #[sea_orm(string_value = "DATE")]
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentRating {
    #[sea_orm(string_value = "EXCELLENT")]
    Excellent,
    #[sea_orm(string_value = "GOOD")]
    Good,
    #[sea_orm(string_value = "FAIR")]
    Fair,
    #[sea_orm(string_value = "POOR")]
    Poor,
}

/// Display as the stored string value
macro_rules! display_as_value {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.to_value())
                }
            }
        )+
    };
}

display_as_value!(
    Role,
    ApplicationStatus,
    TaskStatus,
    TaskPriority,
    TaskCategory,
    AnimalListingStatus,
    Sex,
    HealthStatus,
    LegalStatus,
    HousingType,
    OutcomeType,
    NoteCategory,
    FieldType,
    AssessmentRating,
);

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Iterable;

    #[test]
    fn test_wire_and_storage_names_agree() {
        for status in ApplicationStatus::iter() {
            let wire = serde_json::to_value(status).unwrap();
            assert_eq!(wire, serde_json::Value::String(status.to_value()));
        }
        for status in TaskStatus::iter() {
            let wire = serde_json::to_value(status).unwrap();
            assert_eq!(wire, serde_json::Value::String(status.to_value()));
        }
        assert_eq!(AnimalListingStatus::PendingAdoption.to_string(), "PENDING_ADOPTION");
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        assert!(serde_json::from_str::<Role>("\"SUPERUSER\"").is_err());
        assert_eq!(serde_json::from_str::<Role>("\"STAFF\"").unwrap(), Role::Staff);
    }

    #[test]
    fn test_staff_roles() {
        assert!(Role::Admin.is_staff());
        assert!(Role::Staff.is_staff());
        assert!(!Role::User.is_staff());
    }
}
