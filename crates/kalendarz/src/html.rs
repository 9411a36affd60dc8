use anyhow::Result;
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::fs;
use std::path::Path;

use crate::types::{DateKey, DayCell, WeekRow, YearMonth};

pub const WEEKDAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Colours used by the page. Emitted as CSS custom properties so the
/// stylesheet itself stays constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub primary: String,
    pub ordered: String,
    pub action: String,
    pub cell_background: String,
    pub other_month_background: String,
    pub muted_text: String,
    pub text: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: "#0070ff".to_string(),
            ordered: "#4688eb".to_string(),
            action: "#ffaa2a".to_string(),
            cell_background: "#f6f6f6".to_string(),
            other_month_background: "#f0f0f0".to_string(),
            muted_text: "#aaa".to_string(),
            text: "#333".to_string(),
        }
    }
}

impl Theme {
    fn css_variables(&self) -> String {
        format!(
            ":root {{ --primary: {}; --ordered: {}; --action: {}; --cell-bg: {}; \
             --other-month-bg: {}; --muted: {}; --text: {}; }}",
            self.primary,
            self.ordered,
            self.action,
            self.cell_background,
            self.other_month_background,
            self.muted_text,
            self.text,
        )
    }
}

/// Everything the page needs for one render
#[derive(Debug, Clone)]
pub struct Page<'a> {
    pub month: YearMonth,
    pub weeks: &'a [WeekRow],
    pub selected: Option<DateKey>,
    pub submitting: bool,
    pub notice: Option<&'a str>,
    /// Render navigation, selection and order controls
    pub interactive: bool,
}

/// Render `page` and write it to `path`
pub fn generate_html(page: &Page<'_>, theme: &Theme, path: &Path) -> Result<()> {
    let html = render_page(page, theme);
    fs::write(path, html.into_string())?;
    Ok(())
}

pub fn render_page(page: &Page<'_>, theme: &Theme) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Kalendarz" }
                style { (PreEscaped(theme.css_variables())) (PreEscaped(CSS)) }
            }
            body {
                div.calendar {
                    (render_header(page))
                    div.week-header {
                        @for name in WEEKDAY_NAMES {
                            div.weekday-name title=(name) { (&name[..1]) }
                        }
                    }
                    @for week in page.weeks {
                        div.week-row data-week=(week.first().key.to_string()) {
                            @for day in week.iter() {
                                (render_day(day, page))
                            }
                        }
                    }
                    @if let Some(notice) = page.notice {
                        div.notice role="status" { (notice) }
                    }
                    @if let Some(selected) = page.selected {
                        (render_footer(selected, page))
                    }
                }
            }
        }
    }
}

fn render_header(page: &Page<'_>) -> Markup {
    html! {
        div.month-header {
            @if page.interactive {
                form method="post" action="/prev" {
                    button.nav-button type="submit" aria-label="Previous month" { "‹" }
                }
            }
            span.month-label #"month-label" { (page.month.label()) }
            @if page.interactive {
                form method="post" action="/next" {
                    button.nav-button type="submit" aria-label="Next month" { "›" }
                }
            }
        }
    }
}

fn day_classes(day: &DayCell, selected: Option<DateKey>) -> String {
    let mut classes = vec!["day"];
    if !day.in_current_month {
        classes.push("other-month");
    } else if !day.has_offer {
        classes.push("no-offer");
    }
    if day.is_today && day.in_current_month {
        classes.push("today");
    }
    if selected == Some(day.key) {
        classes.push("selected");
    }
    classes.join(" ")
}

fn render_day(day: &DayCell, page: &Page<'_>) -> Markup {
    let label = if day.in_current_month {
        day.day_label.as_str()
    } else {
        ""
    };
    html! {
        div class=(day_classes(day, page.selected)) data-date=(day.key.to_string()) {
            @if page.interactive {
                form method="post" action={"/select/" (day.key.to_string())} {
                    button.day-button type="submit" disabled[!day.has_offer] { (label) }
                }
            } @else {
                span.day-button { (label) }
            }
            @if day.has_order {
                span.order-badge title="Ordered" {}
            }
        }
    }
}

fn render_footer(selected: DateKey, page: &Page<'_>) -> Markup {
    html! {
        div.selection-footer {
            p.selected-date { "Selected date: " (selected.to_string()) }
            @if page.interactive {
                form method="post" action="/order" {
                    button.order-button type="submit" disabled[page.submitting] {
                        @if page.submitting { "Ordering…" } @else { "Order" }
                    }
                }
            }
        }
    }
}

const CSS: &str = r#"
* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    font-family: -apple-system, BlinkMacSystemFont, sans-serif;
    color: var(--text);
    padding: 16px;
}

.calendar {
    max-width: 480px;
    margin: 0 auto;
}

.month-header {
    display: flex;
    justify-content: space-between;
    align-items: center;
    margin: 0 16px 8px;
}

.month-label {
    font-size: 16px;
    font-weight: bold;
}

.nav-button {
    font-size: 24px;
    color: var(--primary);
    background: none;
    border: none;
    padding: 0 12px;
    cursor: pointer;
}

.week-header,
.week-row {
    display: grid;
    grid-template-columns: repeat(7, 1fr);
}

.weekday-name {
    text-align: center;
    color: var(--muted);
    font-weight: bold;
    text-transform: uppercase;
    font-size: 8px;
    padding: 2px;
}

.day {
    position: relative;
    padding: 1px;
}

.day form {
    height: 100%;
}

.day-button {
    display: flex;
    width: 100%;
    aspect-ratio: 1;
    align-items: center;
    justify-content: center;
    font-size: 13px;
    background: var(--cell-bg);
    border: 1px solid var(--cell-bg);
    border-radius: 4px;
    color: inherit;
    cursor: pointer;
}

.day-button:disabled {
    cursor: default;
}

.day.no-offer .day-button {
    opacity: 0.4;
}

.day.other-month .day-button {
    background: var(--other-month-bg);
    border-color: var(--other-month-bg);
    opacity: 0.4;
}

.day.today .day-button {
    border-color: var(--primary);
    color: var(--primary);
    font-weight: bold;
}

.day.selected .day-button {
    border: 2px solid var(--primary);
}

.order-badge {
    position: absolute;
    top: -3px;
    right: -3px;
    width: 15px;
    aspect-ratio: 1;
    border-radius: 5px;
    background: var(--ordered);
}

.notice {
    margin-top: 12px;
    text-align: center;
}

.selection-footer {
    margin-top: 12px;
    text-align: center;
}

.selected-date {
    margin-bottom: 8px;
}

.order-button {
    background: var(--action);
    color: #fff;
    font-weight: bold;
    border: none;
    border-radius: 8px;
    padding: 10px 20px;
    cursor: pointer;
}

.order-button:disabled {
    opacity: 0.6;
}
"#;
