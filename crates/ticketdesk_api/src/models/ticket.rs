//! Ticket table rows and write payloads.

use serde::{Deserialize, Serialize};

/// Logical column names of the ticket table, shared by payloads and filter expressions.
pub mod fields {
    pub const ID: &str = "cr76d_ticketid";
    pub const TITLE: &str = "cr76d_tickettitle";
    pub const DESCRIPTION: &str = "cr76d_description";
    pub const PRIORITY: &str = "cr76d_priority";
    pub const STATUS: &str = "cr76d_status";
    pub const OWNER: &str = "cr76d_ticketowner";
    pub const CREATED_ON: &str = "createdon";
}

/// A ticket row as returned by the table service. Every column may be missing or null.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct TicketRecord {
    #[serde(rename = "cr76d_ticketid", default)]
    pub id: Option<String>,
    #[serde(rename = "cr76d_tickettitle", default)]
    pub title: Option<String>,
    #[serde(rename = "cr76d_description", default)]
    pub description: Option<String>,
    #[serde(rename = "cr76d_priority", default)]
    pub priority: Option<i64>,
    #[serde(rename = "cr76d_status", default)]
    pub status: Option<i64>,
    #[serde(rename = "cr76d_ticketowner", default)]
    pub owner: Option<String>,
    #[serde(rename = "createdon", default)]
    pub created_on: Option<String>,
}

/// Body for create and update calls. Carries only the five editable columns;
/// the row id and server-owned columns are never written.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct TicketPayload {
    #[serde(rename = "cr76d_tickettitle")]
    pub title: String,
    #[serde(rename = "cr76d_description")]
    pub description: String,
    #[serde(rename = "cr76d_priority")]
    pub priority: i64,
    #[serde(rename = "cr76d_status")]
    pub status: i64,
    #[serde(rename = "cr76d_ticketowner")]
    pub owner: String,
}
