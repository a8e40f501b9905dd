//! Verification job polling.

use super::CHECK_JOB_STATUS;
use crate::error::ToolOutcome;
use crate::format;
use crate::server::{Tool, ToolContext};
use crate::types::ToolDefinition;
use crate::validation;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Tool to poll a verification job by ID.
///
/// Each call fetches a fresh snapshot; nothing is cached between polls.
pub struct CheckJobStatusTool;

#[async_trait]
impl Tool for CheckJobStatusTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            CHECK_JOB_STATUS,
            "Poll the status of a verification job using its job ID. Returns current status (pending, processing, completed, failed) and result data when completed.",
        )
        .read_only()
        .with_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "jobId": {
                    "type": "string",
                    "description": "The verification job ID",
                    "minLength": 1
                }
            },
            "required": ["jobId"]
        }))
    }

    #[instrument(skip(self, args, context), fields(tool = "sourcify_check_job_status"))]
    async fn execute(&self, args: serde_json::Value, context: &ToolContext) -> ToolOutcome<String> {
        let request = validation::job_status(&args)?;
        debug!("Polling job {}", request.job_id);

        let job = context.client().job_status(&request).await?;
        debug!("Job {} is {}", job.job_id, job.status.as_str());
        Ok(format::job_status(&job))
    }
}
