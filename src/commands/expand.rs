//! Expand command handler.

use notecog::PromptService;
use notecog::cli::{CommandResult, ExpandArgs, TemplateSource};

use super::TemplateArgs;

/// Expand command.
pub async fn cmd_expand(
    service: &PromptService,
    template: TemplateArgs,
    selection: Option<String>,
    active: Option<String>,
) -> CommandResult {
    let source = match (template.template, template.prompt) {
        (Some(text), _) => TemplateSource::Inline(text),
        (None, Some(title)) => TemplateSource::Stored(title),
        (None, None) => TemplateSource::Stdin,
    };

    let args = ExpandArgs {
        source,
        selection: selection.unwrap_or_default(),
        active,
    };
    notecog::cli::cmd_expand(service, &args).await
}
