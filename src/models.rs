// models.rs
// Domain models for all MongoDB collections. Field names are camelCase to
// stay compatible with documents written by earlier versions of the app.

use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// Calendar month, stored as its full English name. Revenue rows are keyed
/// by `(userId, year, month)` with the month in this format, so the name
/// (not a numeric index) is the persisted representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Zero-based ordinal, matching the calendar index used for storage.
    pub fn ordinal(self) -> usize {
        Month::ALL.iter().position(|m| *m == self).unwrap_or(0)
    }

    pub fn from_ordinal(ordinal: usize) -> Option<Month> {
        Month::ALL.get(ordinal).copied()
    }

    /// Month for a chrono zero-based month index (`Datelike::month0`).
    pub fn from_month0(month0: u32) -> Month {
        Month::from_ordinal(month0 as usize).unwrap_or(Month::January)
    }

    pub fn name(self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }

    pub fn parse(value: &str) -> Option<Month> {
        Month::ALL.iter().copied().find(|m| m.name() == value)
    }

    /// Full month names for the inclusive ordinal range `[start, end]`.
    pub fn names_in_range(start: usize, end: usize) -> Vec<&'static str> {
        Month::ALL
            .iter()
            .enumerate()
            .filter(|(i, _)| *i >= start && *i <= end)
            .map(|(_, m)| m.name())
            .collect()
    }
}

/// Account that owns every other entity transitively via `userId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    /// bcrypt hash, never the plain text.
    pub password: String,
    pub role: String,
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

/// Bearer-token session linking an opaque token to a user and expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub token: String,
    pub user_id: ObjectId,
    pub expires_at: DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientStatus {
    Active,
    Inactive,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Active => "Active",
            ClientStatus::Inactive => "Inactive",
        }
    }

    pub fn parse(value: &str) -> Option<ClientStatus> {
        match value.trim() {
            "Active" => Some(ClientStatus::Active),
            "Inactive" => Some(ClientStatus::Inactive),
            _ => None,
        }
    }
}

impl Default for ClientStatus {
    fn default() -> Self {
        ClientStatus::Active
    }
}

/// Client document. `projects` is a denormalized counter maintained by
/// `state::clients::adjust_project_count`; nothing else mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub status: ClientStatus,
    #[serde(default)]
    pub projects: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    Active,
    OnHold,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "planning",
            ProjectStatus::Active => "active",
            ProjectStatus::OnHold => "on_hold",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }

    /// Accepts both the stored value and the display labels the frontend
    /// sends ("On Hold", "Active", ...).
    pub fn parse(value: &str) -> Option<ProjectStatus> {
        match value.trim().to_lowercase().replace(' ', "_").as_str() {
            "planning" => Some(ProjectStatus::Planning),
            "active" => Some(ProjectStatus::Active),
            "on_hold" => Some(ProjectStatus::OnHold),
            "completed" => Some(ProjectStatus::Completed),
            "cancelled" => Some(ProjectStatus::Cancelled),
            _ => None,
        }
    }
}

impl Default for ProjectStatus {
    fn default() -> Self {
        ProjectStatus::Planning
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MilestoneStatus {
    Pending,
    Paid,
    Overdue,
}

impl MilestoneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneStatus::Pending => "Pending",
            MilestoneStatus::Paid => "Paid",
            MilestoneStatus::Overdue => "Overdue",
        }
    }

    pub fn parse(value: &str) -> Option<MilestoneStatus> {
        match value.trim() {
            "Pending" => Some(MilestoneStatus::Pending),
            "Paid" => Some(MilestoneStatus::Paid),
            "Overdue" => Some(MilestoneStatus::Overdue),
            _ => None,
        }
    }
}

impl Default for MilestoneStatus {
    fn default() -> Self {
        MilestoneStatus::Pending
    }
}

/// Payment checkpoint embedded in a project's `milestones` array.
///
/// The achieved flag is stored as `isAchived`; the misspelling predates this
/// rewrite and existing documents use it, so it is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub percentage: f64,
    pub amount: f64,
    pub due_date: DateTime,
    #[serde(default)]
    pub status: MilestoneStatus,
    #[serde(default)]
    pub is_achived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

/// Project document with its embedded, ordered milestone list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub client_id: ObjectId,
    pub user_id: ObjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate_id: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub status: ProjectStatus,
    pub start_date: DateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_end_date: Option<DateTime>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

/// One proposed plan for a project. At most one estimate per project is
/// selected; the selected estimate's price feeds dashboard revenue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub project_id: ObjectId,
    pub name: String,
    pub description: String,
    pub timeline: String,
    pub price: f64,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub is_selected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    USD,
    EUR,
    GBP,
    INR,
    CAD,
    AUD,
    JPY,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::INR => "INR",
            Currency::CAD => "CAD",
            Currency::AUD => "AUD",
            Currency::JPY => "JPY",
        }
    }

    pub fn parse(value: &str) -> Option<Currency> {
        match value.trim().to_uppercase().as_str() {
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "INR" => Some(Currency::INR),
            "CAD" => Some(Currency::CAD),
            "AUD" => Some(Currency::AUD),
            "JPY" => Some(Currency::JPY),
            _ => None,
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::INR
    }
}

/// Expense owned by a user. Amounts are rounded to 2 decimals on write.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub currency: Currency,
    pub category: String,
    pub expense_date: DateTime,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

/// Cached dashboard rollup, one document per user, upserted on recompute.
/// `activeProjects` holds the user's full project count; that is what the
/// dashboard has always displayed under this key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    #[serde(default)]
    pub total_clients: i64,
    #[serde(default)]
    pub active_clients: i64,
    #[serde(default)]
    pub total_revenue: f64,
    #[serde(default)]
    pub total_expenses: f64,
    #[serde(default)]
    pub active_projects: i64,
    #[serde(default)]
    pub completed_projects: i64,
    pub last_updated: DateTime,
}

/// Stored per-month revenue row, unique on `(userId, year, month)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revenue {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub year: i32,
    pub month: Month,
    #[serde(default)]
    pub revenue: f64,
    pub calculated_at: DateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_names_round_trip() {
        for (i, month) in Month::ALL.iter().enumerate() {
            assert_eq!(month.ordinal(), i);
            assert_eq!(Month::parse(month.name()), Some(*month));
            assert_eq!(Month::from_ordinal(i), Some(*month));
        }
        assert_eq!(Month::parse("Nov"), None);
        assert_eq!(Month::parse("november"), None);
        assert_eq!(Month::from_ordinal(12), None);
    }

    #[test]
    fn month_range_names() {
        assert_eq!(Month::names_in_range(10, 11), vec!["November", "December"]);
        assert_eq!(Month::names_in_range(0, 1), vec!["January", "February"]);
        assert_eq!(Month::names_in_range(5, 5), vec!["June"]);
    }

    #[test]
    fn project_status_parses_display_labels() {
        assert_eq!(ProjectStatus::parse("On Hold"), Some(ProjectStatus::OnHold));
        assert_eq!(ProjectStatus::parse("Active"), Some(ProjectStatus::Active));
        assert_eq!(
            ProjectStatus::parse("completed"),
            Some(ProjectStatus::Completed)
        );
        assert_eq!(ProjectStatus::parse("archived"), None);
    }

    #[test]
    fn milestone_achieved_flag_keeps_stored_spelling() {
        let milestone = Milestone {
            id: ObjectId::new(),
            name: "Kickoff".into(),
            description: String::new(),
            percentage: 25.0,
            amount: 500.0,
            due_date: DateTime::now(),
            status: MilestoneStatus::Pending,
            is_achived: true,
            paid_date: None,
            notes: None,
            created_at: None,
            updated_at: None,
        };
        let doc = bson::to_document(&milestone).unwrap();
        assert!(doc.get_bool("isAchived").unwrap());
        assert!(doc.get("isAchieved").is_none());
    }
}
