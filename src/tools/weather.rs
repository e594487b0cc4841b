//! Weather lookup tool
//!
//! Returns a fixed reading; it exists to exercise the tool loop end to end.

use super::{Tool, ToolContext, ToolOutput};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

/// Get the weather for a given location
pub struct GetWeatherTool;

#[derive(Debug, Deserialize)]
struct WeatherInput {
    location: String,
}

#[async_trait]
impl Tool for GetWeatherTool {
    fn name(&self) -> &'static str {
        "get_weather"
    }

    fn description(&self) -> String {
        "Get the weather for a given location.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["location"],
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City or place to report the weather for"
                }
            }
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        match serde_json::from_value::<WeatherInput>(input) {
            Ok(WeatherInput { location }) if !location.trim().is_empty() => {
                tracing::debug!(run_id = %ctx.run_id, call_id = %ctx.tool_call_id, %location, "Weather lookup");
                ToolOutput::success(format!("The weather for {location} is 70 degrees."))
            }
            Ok(_) => ToolOutput::error("location must not be empty"),
            Err(e) => ToolOutput::error(format!("Invalid input: {e}")),
        }
    }
}
