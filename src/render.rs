//! Table rendering for health snapshots
//!
//! A snapshot is first turned into [`TableRow`]s, which tests and callers
//! can inspect, and then into the HTML that replaces the table body. The
//! markup lives in `templates/`; askama escapes every interpolated value.

use crate::freshness::{self, Rgb};
use crate::models::{HealthData, HealthEntry, StatusConfig};
use crate::errors::Result;
use askama::Template;
use chrono::{DateTime, Local, Utc};

/// Columns in the health table
pub const COLUMN_COUNT: usize = 6;

pub const NO_DATA_MESSAGE: &str = "No health data available.";
pub const ERROR_MESSAGE: &str = "Error loading data. Check logs.";
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn from_dark(is_dark: bool) -> Self {
        if is_dark { Theme::Dark } else { Theme::Light }
    }

    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }

    pub fn toggled(self) -> Self {
        Theme::from_dark(!self.is_dark())
    }

    /// Class placed on the page body
    pub fn body_class(self) -> &'static str {
        match self {
            Theme::Light => "",
            Theme::Dark => "dark-mode",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StatusCell {
    pub icon_class: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TimestampCell {
    pub text: String,
    pub color: Option<Rgb>,
    pub italic: bool,
}

impl TimestampCell {
    /// Inline style for the cell, `None` when the stamp is uncolored
    pub fn style(&self) -> Option<String> {
        let mut parts = Vec::with_capacity(2);
        if let Some(color) = self.color {
            parts.push(format!("color: {};", color));
        }
        if self.italic {
            parts.push("font-style: italic;".to_string());
        }
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ItemRow {
    /// Set on the first row of a category only
    pub category_label: Option<String>,
    pub item: String,
    pub status: StatusCell,
    pub last_updated: TimestampCell,
    pub message: String,
    pub link: Option<String>,
}

impl ItemRow {
    pub fn label(&self) -> Option<&str> {
        self.category_label.as_deref()
    }

    pub fn link_url(&self) -> Option<&str> {
        self.link.as_deref()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    NoData,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TableRow {
    Item(ItemRow),
    /// Category without items: label plus one cell spanning the rest
    EmptyCategory { category: String },
    /// Single full-width row replacing the table body
    Notice(NoticeKind),
}

impl NoticeKind {
    pub fn message(self) -> &'static str {
        match self {
            NoticeKind::NoData => NO_DATA_MESSAGE,
            NoticeKind::Error => ERROR_MESSAGE,
        }
    }
}

impl TableRow {
    pub fn item(&self) -> Option<&ItemRow> {
        match self {
            TableRow::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn empty_category(&self) -> Option<&str> {
        match self {
            TableRow::EmptyCategory { category } => Some(category),
            _ => None,
        }
    }

    pub fn notice_message(&self) -> Option<&'static str> {
        match self {
            TableRow::Notice(kind) => Some(kind.message()),
            _ => None,
        }
    }
}

/// Rendered table body together with the theme it was rendered for
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderedTable {
    pub rows: Vec<TableRow>,
    pub theme: Theme,
}

impl RenderedTable {
    pub fn error(theme: Theme) -> Self {
        Self {
            rows: vec![TableRow::Notice(NoticeKind::Error)],
            theme,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.rows.as_slice(), [TableRow::Notice(NoticeKind::Error)])
    }

    pub fn item_rows(&self) -> impl Iterator<Item = &ItemRow> {
        self.rows.iter().filter_map(TableRow::item)
    }

    /// Inner HTML of the table body
    pub fn to_html(&self) -> Result<String> {
        let partial = RowsPartial {
            rows: &self.rows,
            columns: COLUMN_COUNT,
            not_available: NOT_AVAILABLE,
        };
        Ok(partial.render()?)
    }
}

/// Build the table rows for a snapshot.
///
/// `now` anchors the staleness colors.
pub fn render_table(
    data: &HealthData,
    config: &StatusConfig,
    theme: Theme,
    now: DateTime<Utc>,
) -> RenderedTable {
    if data.is_empty() {
        return RenderedTable {
            rows: vec![TableRow::Notice(NoticeKind::NoData)],
            theme,
        };
    }

    let mut rows = Vec::with_capacity(data.item_count() + data.categories.len());

    for category in &data.categories {
        if category.items.is_empty() {
            rows.push(TableRow::EmptyCategory {
                category: category.name.clone(),
            });
            continue;
        }

        for (index, entry) in category.items.iter().enumerate() {
            let label = (index == 0).then(|| category.name.clone());
            rows.push(TableRow::Item(item_row(label, entry, config, theme, now)));
        }
    }

    RenderedTable { rows, theme }
}

fn item_row(
    category_label: Option<String>,
    entry: &HealthEntry,
    config: &StatusConfig,
    theme: Theme,
    now: DateTime<Utc>,
) -> ItemRow {
    let item = &entry.item;

    let icon_class = match config.lookup(item.status()) {
        Some(style) if style.pulse => format!("status-icon status-{} status-pulse", style.color),
        Some(style) => format!("status-icon status-{}", style.color),
        None => "status-icon status-unknown".to_string(),
    };

    let last_updated = match item.last_updated_at() {
        None => TimestampCell {
            text: NOT_AVAILABLE.to_string(),
            color: None,
            italic: false,
        },
        Some(Err(raw)) => TimestampCell {
            text: raw.to_string(),
            color: None,
            italic: false,
        },
        Some(Ok(ts)) => {
            let age = freshness::age_hours(ts, now);
            TimestampCell {
                text: format_timestamp(ts),
                color: Some(freshness::age_color(age, theme.is_dark())),
                italic: freshness::is_italic(age),
            }
        }
    };

    ItemRow {
        category_label,
        item: entry.name.clone(),
        status: StatusCell {
            icon_class,
            text: item.display_status(),
        },
        last_updated,
        message: item.message().unwrap_or(NOT_AVAILABLE).to_string(),
        link: item.url().map(str::to_string),
    }
}

/// Local-time rendering of a timestamp
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local)
        .format("%-m/%-d/%Y, %-I:%M:%S %p")
        .to_string()
}

#[derive(Template)]
#[template(path = "_partials/health_rows.html")]
struct RowsPartial<'a> {
    rows: &'a [TableRow],
    columns: usize,
    not_available: &'static str,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardPage<'a> {
    body_class: &'static str,
    rows: &'a [TableRow],
    columns: usize,
    not_available: &'static str,
}

/// Complete dashboard page around a rendered table
pub fn render_page(table: &RenderedTable) -> Result<String> {
    let page = DashboardPage {
        body_class: table.theme.body_class(),
        rows: &table.rows,
        columns: COLUMN_COUNT,
        not_available: NOT_AVAILABLE,
    };
    Ok(page.render()?)
}
