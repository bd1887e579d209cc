//! GitHub bridge over the `gh` CLI.
//!
//! Issues are addressed through `gh issue`, the Projects V2 board through
//! `gh api graphql`. Nothing here retries; callers turn failures into
//! warnings.

use std::collections::HashMap;
use std::process::Command;

use chrono::NaiveDate;
use serde_json::Value;

use crate::config::{GithubConfig, OwnerKind};
use crate::error::{Error, Result};
use crate::schedule::DATE_FORMAT;

/// Items fetched per GraphQL page
const ITEMS_PAGE_SIZE: u32 = 100;

/// Upper bound on item pages, so a misbehaving cursor cannot loop forever
const MAX_ITEM_PAGES: usize = 50;

/// Longest error message kept from `gh` output
const MAX_MESSAGE_LEN: usize = 400;

const UPDATE_DATE_MUTATION: &str = "mutation($project: ID!, $item: ID!, $field: ID!, $date: Date!) {
  updateProjectV2ItemFieldValue(input: {projectId: $project, itemId: $item, fieldId: $field, value: {date: $date}}) {
    projectV2Item { id }
  }
}";

/// Projects V2 board lookup tables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectBoard {
    pub project_id: String,
    /// Field name -> field id
    pub fields: HashMap<String, String>,
    /// Issue number -> project item id
    pub items: HashMap<String, String>,
}

impl ProjectBoard {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn item_for_issue(&self, issue: &str) -> Option<&str> {
        self.items.get(issue).map(String::as_str)
    }
}

/// External issue tracker operations used by sync
pub trait IssueTracker {
    /// Fetch the project board's ids
    fn project_board(&mut self) -> Result<ProjectBoard>;

    /// Assign an issue to a milestone by title
    fn set_milestone(&mut self, issue: &str, milestone: &str) -> Result<()>;

    /// Close an issue, leaving a comment
    fn close_issue(&mut self, issue: &str, comment: &str) -> Result<()>;

    /// Write a date field on a project item
    fn set_date_field(
        &mut self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        date: NaiveDate,
    ) -> Result<()>;
}

/// [`IssueTracker`] backed by the `gh` binary
#[derive(Debug, Clone)]
pub struct GhCli {
    bin: String,
    repo: String,
    owner: String,
    owner_kind: OwnerKind,
    project_number: u32,
}

impl GhCli {
    pub fn new(config: &GithubConfig) -> Self {
        Self {
            bin: config.gh_bin.clone(),
            repo: config.repo.clone(),
            owner: config.owner.clone(),
            owner_kind: config.owner_kind,
            project_number: config.project_number,
        }
    }

    fn run(&self, args: &[String]) -> Result<String> {
        tracing::debug!(bin = %self.bin, args = ?args, "running gh");
        let output = Command::new(&self.bin).args(args).output()?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = first_non_empty(stderr.trim(), stdout.trim()).unwrap_or("unknown error");
        Err(Error::OperationFailed(format!(
            "{} exit={} msg={}",
            self.bin,
            output.status.code().unwrap_or(-1),
            truncate(message, MAX_MESSAGE_LEN)
        )))
    }

    /// Run a GraphQL document; `vars` are string variables, `typed` are sent
    /// with `-F` so numbers keep their type
    fn graphql(&self, query: &str, vars: &[(&str, &str)], typed: &[(&str, String)]) -> Result<Value> {
        let mut args = vec![
            "api".to_string(),
            "graphql".to_string(),
            "-f".to_string(),
            format!("query={query}"),
        ];
        for (name, value) in vars {
            args.push("-f".to_string());
            args.push(format!("{name}={value}"));
        }
        for (name, value) in typed {
            args.push("-F".to_string());
            args.push(format!("{name}={value}"));
        }

        let stdout = self.run(&args)?;
        let value: Value = serde_json::from_str(&stdout)?;
        if let Some(errors) = value.get("errors").and_then(Value::as_array) {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|err| err.get("message").and_then(Value::as_str))
                .collect();
            if !messages.is_empty() {
                return Err(Error::OperationFailed(format!(
                    "graphql: {}",
                    truncate(&messages.join("; "), MAX_MESSAGE_LEN)
                )));
            }
        }
        Ok(value)
    }

    fn board_query(&self) -> String {
        format!(
            "query($owner: String!, $number: Int!, $first: Int!, $after: String) {{
  {owner}(login: $owner) {{
    projectV2(number: $number) {{
      id
      fields(first: 50) {{ nodes {{ ... on ProjectV2FieldCommon {{ id name }} }} }}
      items(first: $first, after: $after) {{
        pageInfo {{ hasNextPage endCursor }}
        nodes {{ id content {{ ... on Issue {{ number }} }} }}
      }}
    }}
  }}
}}",
            owner = self.owner_kind.graphql_field()
        )
    }
}

impl IssueTracker for GhCli {
    fn project_board(&mut self) -> Result<ProjectBoard> {
        let query = self.board_query();
        let typed = vec![
            ("number", self.project_number.to_string()),
            ("first", ITEMS_PAGE_SIZE.to_string()),
        ];

        let mut board = ProjectBoard::default();
        let mut cursor: Option<String> = None;
        for _ in 0..MAX_ITEM_PAGES {
            let mut vars = vec![("owner", self.owner.as_str())];
            if let Some(after) = cursor.as_deref() {
                vars.push(("after", after));
            }
            let response = self.graphql(&query, &vars, &typed)?;
            let page = parse_board_page(&response, self.owner_kind)?;

            board.project_id = page.project_id;
            board.fields.extend(page.fields);
            board.items.extend(page.items);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        tracing::debug!(
            fields = board.fields.len(),
            items = board.items.len(),
            "project board loaded"
        );
        Ok(board)
    }

    fn set_milestone(&mut self, issue: &str, milestone: &str) -> Result<()> {
        self.run(&[
            "issue".to_string(),
            "edit".to_string(),
            issue.to_string(),
            "--repo".to_string(),
            self.repo.clone(),
            "--milestone".to_string(),
            milestone.to_string(),
        ])?;
        Ok(())
    }

    fn close_issue(&mut self, issue: &str, comment: &str) -> Result<()> {
        self.run(&[
            "issue".to_string(),
            "close".to_string(),
            issue.to_string(),
            "--repo".to_string(),
            self.repo.clone(),
            "--comment".to_string(),
            comment.to_string(),
        ])?;
        Ok(())
    }

    fn set_date_field(
        &mut self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        date: NaiveDate,
    ) -> Result<()> {
        let date = date.format(DATE_FORMAT).to_string();
        self.graphql(
            UPDATE_DATE_MUTATION,
            &[
                ("project", project_id),
                ("item", item_id),
                ("field", field_id),
                ("date", &date),
            ],
            &[],
        )?;
        Ok(())
    }
}

/// One page of the board query
#[derive(Debug)]
struct BoardPage {
    project_id: String,
    fields: HashMap<String, String>,
    items: HashMap<String, String>,
    next_cursor: Option<String>,
}

fn parse_board_page(response: &Value, owner_kind: OwnerKind) -> Result<BoardPage> {
    let project = response
        .pointer(&format!("/data/{}/projectV2", owner_kind.graphql_field()))
        .filter(|value| !value.is_null())
        .ok_or_else(|| Error::OperationFailed("project board not found".to_string()))?;

    let project_id = project
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::OperationFailed("project board has no id".to_string()))?
        .to_string();

    let fields = nodes(project, "fields")
        .filter_map(|node| {
            let id = node.get("id")?.as_str()?;
            let name = node.get("name")?.as_str()?;
            Some((name.to_string(), id.to_string()))
        })
        .collect();

    let items = nodes(project, "items")
        .filter_map(|node| {
            let id = node.get("id")?.as_str()?;
            let number = node.pointer("/content/number")?.as_u64()?;
            Some((number.to_string(), id.to_string()))
        })
        .collect();

    let page_info = project.pointer("/items/pageInfo");
    let has_next = page_info
        .and_then(|info| info.get("hasNextPage"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let next_cursor = if has_next {
        page_info
            .and_then(|info| info.get("endCursor"))
            .and_then(Value::as_str)
            .map(str::to_string)
    } else {
        None
    };

    Ok(BoardPage {
        project_id,
        fields,
        items,
        next_cursor,
    })
}

fn nodes<'a>(project: &'a Value, connection: &str) -> impl Iterator<Item = &'a Value> {
    project
        .get(connection)
        .and_then(|conn| conn.get("nodes"))
        .and_then(Value::as_array)
        .map(|nodes| nodes.iter())
        .into_iter()
        .flatten()
}

fn first_non_empty<'a>(a: &'a str, b: &'a str) -> Option<&'a str> {
    if !a.is_empty() {
        return Some(a);
    }
    if !b.is_empty() {
        return Some(b);
    }
    None
}

fn truncate(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    value.chars().take(max_len).collect()
}
