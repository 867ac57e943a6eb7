//! Date and time tools.

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use orc_domain::tool::names::{GET_TIME, GET_TODAY_DATE};
use orc_domain::{ToolCall, ToolContext, ToolDefinition, ToolError, ToolHandler, ToolSafety};

fn today_sentence<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("Today's date is {}", now.format("%Y-%m-%d"))
}

fn time_sentence<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("The current time is {}", now.format("%H:%M"))
}

/// `get_today_date`: the server's local date.
pub struct TodayDateTool;

#[async_trait]
impl ToolHandler for TodayDateTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            GET_TODAY_DATE,
            "Returns today's date in YYYY-MM-DD format.",
            ToolSafety::ReadOnly,
        )
    }

    async fn invoke(&self, _call: &ToolCall, _context: &ToolContext) -> Result<String, ToolError> {
        Ok(today_sentence(&Local::now()))
    }
}

/// `get_time`: the server's local time of day.
pub struct TimeTool;

#[async_trait]
impl ToolHandler for TimeTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            GET_TIME,
            "Returns the current time (hour and minutes) in HH:MM format.",
            ToolSafety::ReadOnly,
        )
    }

    async fn invoke(&self, _call: &ToolCall, _context: &ToolContext) -> Result<String, ToolError> {
        Ok(time_sentence(&Local::now()))
    }
}
