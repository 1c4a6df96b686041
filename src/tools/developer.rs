use super::{Tool, ToolContext};
use crate::config::DeveloperInfo;
use crate::core::error::TchatError;
use async_trait::async_trait;
use serde_json::{Value, json};

pub struct DeveloperInfoTool {
    info: DeveloperInfo,
}

impl DeveloperInfoTool {
    pub fn new(info: DeveloperInfo) -> Self {
        Self { info }
    }
}

#[async_trait]
impl Tool for DeveloperInfoTool {
    fn name(&self) -> &str {
        "developer_info"
    }

    fn description(&self) -> &str {
        "Returns the name, mail and GitHub profile of the developer of this assistant."
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn call(&self, _args: &Value, _ctx: &ToolContext<'_>) -> Result<String, TchatError> {
        Ok(format!(
            "Developer Name: {}, Developer Mail: {}, Github Profile: {}",
            self.info.name, self.info.mail, self.info.github_profile
        ))
    }
}
