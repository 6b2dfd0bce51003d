use anyhow::Result;
use clap::ValueEnum;
use colored::{Color as ThemeColor, Colorize};
use comfy_table::{Attribute, Cell, Color as TableColor, Table};
use serde::Serialize;

use feedgraph::{
    AudioRecord, CommentNode, CommentRecord, Failure, Post, PostStatus, UserProfile, UserRecord, UserSummary,
};

use crate::theme::{ICONS, THEME};

/// Output format options for CLI commands
#[derive(Clone, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// Formatted table output (default)
    #[default]
    Table,
    /// JSON output for scripting
    Json,
    /// Compact single-line output
    Compact,
}

#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub no_color: bool,
}

/// Data that can be rendered as a table or a single line.
pub trait TableDisplay {
    fn to_table(&self, options: &GlobalOptions) -> Table;
    fn to_compact(&self) -> String;
}

/// One row of a listing.
pub trait TableRow {
    const HEADERS: &'static [&'static str];

    fn cells(&self) -> Vec<String>;

    fn compact(&self) -> String;
}

/// Listing rendered one row per item.
#[derive(Serialize)]
#[serde(transparent)]
pub struct Rows<T>(pub Vec<T>);

pub struct OutputManager {
    pub options: GlobalOptions,
}

fn themed_table(options: &GlobalOptions) -> Table {
    let mut table = Table::new();
    if options.no_color {
        table.load_preset(comfy_table::presets::ASCII_FULL);
    } else {
        table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
    }
    table
}

fn header_cells(headers: &[&str], options: &GlobalOptions) -> Vec<Cell> {
    headers
        .iter()
        .map(|header| {
            let cell = Cell::new(header).add_attribute(Attribute::Bold);
            if options.no_color { cell } else { cell.fg(TableColor::Cyan) }
        })
        .collect()
}

fn key_value_table(pairs: Vec<(&str, String)>, options: &GlobalOptions) -> Table {
    let mut table = themed_table(options);
    for (key, value) in pairs {
        table.add_row(vec![Cell::new(key).add_attribute(Attribute::Bold), Cell::new(value)]);
    }
    table
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        Self { options }
    }

    /// Display data according to the configured output format
    pub fn display<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + TableDisplay,
    {
        if self.options.quiet {
            return Ok(());
        }

        match self.options.output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                println!("{json}");
            }
            OutputFormat::Table => {
                let table = data.to_table(&self.options);
                println!("{table}");
            }
            OutputFormat::Compact => {
                println!("{}", data.to_compact());
            }
        }
        Ok(())
    }

    pub fn rows<T>(&self, rows: Vec<T>) -> Result<()>
    where
        T: Serialize + TableRow,
    {
        self.display(&Rows(rows))
    }

    fn line(&self, icon: &str, color: ThemeColor, message: &str) -> String {
        if self.options.no_color {
            format!("{icon} {message}")
        } else {
            format!("{} {}", icon.color(color), message.color(color))
        }
    }

    pub fn success(&self, message: &str) {
        if !self.options.quiet {
            println!("{}", self.line(ICONS.success, THEME.success, message));
        }
    }

    /// Errors are printed to stderr even in quiet mode.
    pub fn error(&self, message: &str) {
        eprintln!("{}", self.line(ICONS.error, THEME.error, message));
    }

    pub fn warning(&self, message: &str) {
        if !self.options.quiet {
            println!("{}", self.line(ICONS.warning, THEME.warning, message));
        }
    }

    pub fn info(&self, message: &str) {
        if !self.options.quiet {
            println!("{}", self.line(ICONS.info, THEME.info, message));
        }
    }

    /// Status label with its icon, colored unless colors are off.
    pub fn status_badge(&self, status: PostStatus) -> String {
        let label = format!("{} {status}", ICONS.status(status));
        if self.options.no_color {
            label
        } else {
            label.color(THEME.status(status)).to_string()
        }
    }

    /// Reports a library failure with its stable kind.
    pub fn failure(&self, failure: &Failure) {
        self.error(&format!("[{}] {}", failure.kind, failure.message));
    }

    /// Prints a comment tree as indented lines, or JSON.
    pub fn comment_tree(&self, nodes: &[CommentNode]) -> Result<()> {
        if self.options.quiet {
            return Ok(());
        }
        if self.options.output_format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(nodes)?);
            return Ok(());
        }
        if nodes.is_empty() {
            self.info("No comments yet");
            return Ok(());
        }

        let mut stack: Vec<&CommentNode> = nodes.iter().rev().collect();
        while let Some(node) = stack.pop() {
            let indent = "  ".repeat(node.depth);
            let marker = if node.depth == 0 { ICONS.arrow } else { ICONS.reply };
            let liked = if node.liked_by_viewer { ICONS.heart } else { "" };
            let meta = format!("{} {} {}{liked}", node.age, ICONS.heart, node.like_count);
            if self.options.no_color {
                println!("{indent}{marker} {}: {} ({meta}) [{}]", node.author.username, node.text, node.id);
            } else {
                println!(
                    "{indent}{} {}: {} {} {}",
                    marker.color(THEME.muted),
                    node.author.username.color(THEME.author).bold(),
                    node.text.color(THEME.value),
                    format!("({meta})").color(THEME.secondary),
                    node.id.color(THEME.muted)
                );
            }
            stack.extend(node.replies.iter().rev());
        }
        Ok(())
    }
}

impl<T> TableDisplay for Rows<T>
where
    T: TableRow + Serialize,
{
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options);
        if self.0.is_empty() {
            table.add_row(vec![Cell::new("No items found")]);
            return table;
        }
        table.set_header(header_cells(T::HEADERS, options));
        for item in &self.0 {
            table.add_row(item.cells());
        }
        table
    }

    fn to_compact(&self) -> String {
        self.0.iter().map(TableRow::compact).collect::<Vec<_>>().join("\n")
    }
}

fn summarize(text: Option<&str>, width: usize) -> String {
    let text = text.unwrap_or("");
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
    short.push('…');
    short
}

impl TableRow for Post {
    const HEADERS: &'static [&'static str] = &["ID", "Owner", "Caption", "Status", "Likes", "Comments", "Created"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id().to_string(),
            self.owner.username.clone(),
            summarize(self.record.caption.as_deref(), 40),
            self.status().to_string(),
            self.likes.len().to_string(),
            self.comments.len().to_string(),
            self.record.created_at.format("%Y-%m-%d %H:%M").to_string(),
        ]
    }

    fn compact(&self) -> String {
        format!(
            "{} {} [{}] {}",
            self.id(),
            self.owner.username,
            self.status(),
            summarize(self.record.caption.as_deref(), 60)
        )
    }
}

impl TableDisplay for Post {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut pairs = vec![
            ("ID", self.id().to_string()),
            ("Owner", format!("{} ({})", self.owner.username, self.owner.id)),
            ("Status", format!("{} {}", ICONS.status(self.status()), self.status())),
            ("Caption", self.record.caption.clone().unwrap_or_default()),
        ];
        if let Some(image) = &self.record.image_ref {
            pairs.push(("Image", image.to_string()));
        }
        if let Some(video) = &self.record.video_ref {
            pairs.push(("Video", video.to_string()));
        }
        if let Some(audio) = &self.record.audio_id {
            pairs.push(("Audio", audio.clone()));
        }
        pairs.push(("Likes", self.likes.len().to_string()));
        pairs.push(("Tagged", self.tagged_friends.iter().cloned().collect::<Vec<_>>().join(", ")));
        pairs.push(("Comments", self.comments.len().to_string()));
        pairs.push(("Created", self.record.created_at.to_rfc3339()));
        key_value_table(pairs, options)
    }

    fn to_compact(&self) -> String {
        TableRow::compact(self)
    }
}

impl TableRow for UserSummary {
    const HEADERS: &'static [&'static str] = &["ID", "Username"];

    fn cells(&self) -> Vec<String> {
        vec![self.id.clone(), self.username.clone()]
    }

    fn compact(&self) -> String {
        format!("{} {}", self.id, self.username)
    }
}

impl TableDisplay for UserRecord {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let visibility = if self.is_private {
            format!("{} private", ICONS.lock)
        } else {
            "public".to_string()
        };
        key_value_table(
            vec![
                ("ID", self.id.clone()),
                ("Username", self.username.clone()),
                ("Bio", self.bio.clone().unwrap_or_default()),
                ("Visibility", visibility),
                ("Role", format!("{:?}", self.role).to_lowercase()),
                ("Joined", self.created_at.to_rfc3339()),
            ],
            options,
        )
    }

    fn to_compact(&self) -> String {
        format!("{} {}", self.id, self.username)
    }
}

impl TableDisplay for UserProfile {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = self.user.to_table(options);
        table.add_row(vec![Cell::new("Followers").add_attribute(Attribute::Bold), Cell::new(self.followers)]);
        table.add_row(vec![Cell::new("Following").add_attribute(Attribute::Bold), Cell::new(self.followings)]);
        table.add_row(vec![Cell::new("Posts").add_attribute(Attribute::Bold), Cell::new(self.posts)]);
        table
    }

    fn to_compact(&self) -> String {
        format!(
            "{} {} followers={} following={} posts={}",
            self.user.id, self.user.username, self.followers, self.followings, self.posts
        )
    }
}

impl TableDisplay for AudioRecord {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        key_value_table(
            vec![
                ("ID", self.id.clone()),
                ("Name", self.name.clone()),
                ("Artists", self.artists.join(", ")),
                ("Track", self.audio_ref.to_string()),
                (
                    "Cover",
                    self.image_ref.as_ref().map(ToString::to_string).unwrap_or_default(),
                ),
            ],
            options,
        )
    }

    fn to_compact(&self) -> String {
        format!("{} {}", self.id, self.name)
    }
}

impl TableDisplay for CommentRecord {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        key_value_table(
            vec![
                ("ID", self.id.clone()),
                ("Post", self.post_id.clone()),
                ("Author", self.author_id.clone()),
                ("Parent", self.parent_id.clone().unwrap_or_default()),
                ("Text", self.text.clone()),
            ],
            options,
        )
    }

    fn to_compact(&self) -> String {
        format!("{} {}", self.id, summarize(Some(&self.text), 60))
    }
}
