//! Prompt CLI commands.
//!
//! Provides CLI commands for managing stored prompt templates.

// Allow print_stdout/stderr in CLI module (consistent with main.rs)
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;

use super::CommandResult;
use crate::models::PromptTemplate;
use crate::services::PromptService;

/// Longest preview of a template body shown in tables.
const PREVIEW_CHARS: usize = 60;

/// Output format for prompt commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table format (default for list).
    #[default]
    Table,
    /// JSON format.
    Json,
    /// Raw template text (default for get).
    Template,
}

impl OutputFormat {
    /// Parses output format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "template" | "raw" => Self::Template,
            _ => Self::Table,
        }
    }
}

/// Where template content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Given on the command line.
    Inline(String),
    /// Read from a file.
    File(PathBuf),
    /// Read from stdin.
    Stdin,
}

impl ContentSource {
    /// Picks the source from mutually exclusive CLI options.
    ///
    /// # Errors
    ///
    /// Returns an error if none of the options is set.
    pub fn from_options(
        content: Option<String>,
        from_file: Option<PathBuf>,
        from_stdin: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        match (content, from_file, from_stdin) {
            (Some(content), _, _) => Ok(Self::Inline(content)),
            (None, Some(path), _) => Ok(Self::File(path)),
            (None, None, true) => Ok(Self::Stdin),
            (None, None, false) => {
                Err("Template content required: use --content, --from-file, or --stdin".into())
            },
        }
    }

    /// Reads the content.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or stdin cannot be read.
    pub fn read(&self) -> Result<String, Box<dyn std::error::Error>> {
        match self {
            Self::Inline(content) => Ok(content.clone()),
            Self::File(path) => std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read {}: {e}", path.display()).into()),
            Self::Stdin => {
                let mut buffer = String::new();
                io::stdin().read_to_string(&mut buffer)?;
                Ok(buffer)
            },
        }
    }
}

/// Renders templates as a table with a one-line preview of each body.
#[must_use]
pub fn render_prompt_table(templates: &[PromptTemplate]) -> String {
    if templates.is_empty() {
        return "No prompt templates found.\n".to_string();
    }

    let width = templates
        .iter()
        .map(|t| t.title.chars().count())
        .max()
        .unwrap_or(0)
        .max("TITLE".len());

    let mut out = format!("{:<width$}  PREVIEW\n", "TITLE");
    for template in templates {
        out.push_str(&format!(
            "{:<width$}  {}\n",
            template.title,
            preview(&template.content)
        ));
    }
    out
}

/// First line of a body, shortened to [`PREVIEW_CHARS`].
fn preview(content: &str) -> String {
    let line = content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    if line.chars().count() <= PREVIEW_CHARS {
        return line.to_string();
    }
    let truncated: String = line.chars().take(PREVIEW_CHARS - 3).collect();
    format!("{truncated}...")
}

/// Executes the `prompt list` subcommand.
///
/// # Errors
///
/// Returns an error if the templates cannot be listed or serialized.
pub async fn cmd_prompt_list(service: &PromptService, format: OutputFormat) -> CommandResult {
    let templates = service.list().await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&templates)?),
        OutputFormat::Table | OutputFormat::Template => print!("{}", render_prompt_table(&templates)),
    }
    Ok(())
}

/// Executes the `prompt get` subcommand.
///
/// # Errors
///
/// Returns an error if the template does not exist or cannot be read.
pub async fn cmd_prompt_get(
    service: &PromptService,
    title: &str,
    format: OutputFormat,
) -> CommandResult {
    let Some(template) = service.get(title).await? else {
        return Err(format!("Prompt not found: {title}").into());
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&template)?),
        OutputFormat::Table => print!("{}", render_prompt_table(std::slice::from_ref(&template))),
        OutputFormat::Template => println!("{}", template.content),
    }
    Ok(())
}

/// Executes the `prompt save` subcommand.
///
/// # Errors
///
/// Returns an error if the content cannot be read or the template cannot be
/// created.
pub async fn cmd_prompt_save(
    service: &PromptService,
    title: &str,
    source: &ContentSource,
) -> CommandResult {
    let content = source.read()?;
    let template = service.create(title, &content).await?;
    println!(
        "Prompt '{}' saved to {}.",
        template.title,
        service.settings().path_for(&template.title)
    );
    Ok(())
}

/// Executes the `prompt update` subcommand.
///
/// # Errors
///
/// Returns an error if the content cannot be read or the update fails.
pub async fn cmd_prompt_update(
    service: &PromptService,
    title: &str,
    rename: Option<&str>,
    source: &ContentSource,
) -> CommandResult {
    let content = source.read()?;
    let new_title = rename.unwrap_or(title);
    let template = service.update(title, new_title, &content).await?;

    if template.title == title {
        println!("Prompt '{title}' updated.");
    } else {
        println!("Prompt '{title}' updated and renamed to '{}'.", template.title);
    }
    Ok(())
}

/// Executes the `prompt delete` subcommand.
///
/// Asks for confirmation on stdin unless `force` is set.
///
/// # Errors
///
/// Returns an error if the template does not exist or cannot be deleted.
pub async fn cmd_prompt_delete(service: &PromptService, title: &str, force: bool) -> CommandResult {
    if !force {
        print!("Delete prompt '{title}'? [y/N]: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    service.delete(title).await?;
    println!("Prompt '{title}' deleted.");
    Ok(())
}
