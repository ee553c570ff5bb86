//! `mdexport tools` command implementation.

use clap::Args;
use mdexport_server::Tool;

use crate::error::CliError;
use crate::output::Output;
use crate::remote::{McpClient, ToolSummary};

/// Arguments for the tools command.
#[derive(Args)]
pub(crate) struct ToolsArgs {
    /// List the tools of a running server's MCP endpoint instead.
    #[arg(long, env = "MDEXPORT_REMOTE")]
    remote: Option<String>,
}

impl ToolsArgs {
    /// Execute the tools command.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote server cannot be queried.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let tools = match &self.remote {
            Some(url) => McpClient::new(url.as_str()).list_tools()?,
            None => local_tools(),
        };

        output.highlight(&format!("Available tools ({}):", tools.len()));
        for tool in &tools {
            output.info(&format!("  {}", tool.name));
            output.detail(&tool.description);
        }
        Ok(())
    }
}

fn local_tools() -> Vec<ToolSummary> {
    Tool::ALL
        .into_iter()
        .map(|tool| {
            let definition = tool.definition();
            ToolSummary {
                name: tool.name().to_owned(),
                description: definition["description"]
                    .as_str()
                    .unwrap_or_default()
                    .to_owned(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_local_tools() {
        let names: Vec<String> = local_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "convert_markdown_to_word",
                "convert_markdown_to_pdf",
                "convert_markdown_to_html"
            ]
        );
    }
}
