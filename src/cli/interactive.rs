//! plansync interactive command implementation
//!
//! A small numbered menu that builds one [`Operation`] from prompts and then
//! runs it exactly like `plansync update`.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::cli::update::{confirm_delete, execute};
use crate::error::{Error, Result};
use crate::mutation::Operation;
use crate::output::{emit_success, HumanOutput, OutputOptions};

/// Options for the interactive command
pub struct InteractiveOptions {
    pub dir: PathBuf,
    pub no_sync: bool,
    pub output: OutputOptions,
}

const MENU: &str = "\
Select an operation:
  1. Extend a task deadline
  2. Change a task start date
  3. Delete a task
  4. Change a task priority
  5. Quit
";

pub fn run(options: InteractiveOptions) -> Result<()> {
    let stdin = io::stdin();
    let mut stderr = io::stderr();
    match prompt_operation(&mut stdin.lock(), &mut stderr)? {
        Some(operation) => execute(&options.dir, &operation, options.no_sync, options.output),
        None => {
            let human = HumanOutput::new("plansync interactive: no changes made");
            emit_success(
                options.output,
                "interactive",
                &serde_json::json!({ "operation": null }),
                Some(&human),
            )
        }
    }
}

/// Walk the menu and return the chosen operation, or `None` when the user
/// quits, declines a deletion or input ends.
pub fn prompt_operation<R: BufRead, W: Write>(
    input: &mut R,
    prompt: &mut W,
) -> Result<Option<Operation>> {
    write!(prompt, "{MENU}")?;
    let Some(choice) = ask(input, prompt, "Choice (1-5): ")? else {
        return Ok(None);
    };

    let operation = match choice.as_str() {
        "1" => {
            let Some(task_id) = ask_task(input, prompt)? else {
                return Ok(None);
            };
            let Some(raw) = ask(input, prompt, "Days to extend (negative shortens): ")? else {
                return Ok(None);
            };
            let days = raw
                .parse::<i64>()
                .map_err(|_| Error::InvalidArgument(format!("not a whole number of days: {raw}")))?;
            Operation::ExtendDeadline { task_id, days }
        }
        "2" => {
            let Some(task_id) = ask_task(input, prompt)? else {
                return Ok(None);
            };
            let Some(start_date) = ask(input, prompt, "New start date (YYYY-MM-DD): ")? else {
                return Ok(None);
            };
            Operation::ChangeStartDate {
                task_id,
                start_date,
            }
        }
        "3" => {
            let Some(task_id) = ask_task(input, prompt)? else {
                return Ok(None);
            };
            if !confirm_delete(input, prompt, &task_id)? {
                return Ok(None);
            }
            Operation::DeleteTask { task_id }
        }
        "4" => {
            let Some(task_id) = ask_task(input, prompt)? else {
                return Ok(None);
            };
            let Some(priority) = ask(input, prompt, "New priority (high/medium/low): ")? else {
                return Ok(None);
            };
            Operation::ChangePriority { task_id, priority }
        }
        "5" | "q" | "quit" => return Ok(None),
        other => {
            return Err(Error::InvalidArgument(format!("unknown menu choice: {other}")));
        }
    };

    tracing::debug!(%operation, "interactive operation selected");
    Ok(Some(operation))
}

fn ask_task<R: BufRead, W: Write>(input: &mut R, prompt: &mut W) -> Result<Option<String>> {
    let task_id = ask(input, prompt, "Task ID (e.g. TASK-007): ")?;
    match task_id {
        Some(id) if id.is_empty() => Err(Error::InvalidArgument("task ID cannot be empty".to_string())),
        other => Ok(other),
    }
}

/// Print `question` and read one trimmed line; `None` at end of input.
fn ask<R: BufRead, W: Write>(input: &mut R, prompt: &mut W, question: &str) -> Result<Option<String>> {
    write!(prompt, "{question}")?;
    prompt.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
