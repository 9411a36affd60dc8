//! Plain-text month grid for terminals.

use std::fmt::Write;

use crate::html::WEEKDAY_NAMES;
use crate::types::{DateKey, DayCell, WeekRow, YearMonth};

/// Narrowest column that still fits a bracketed, marked day (`[15]*`).
const MIN_COLUMN: usize = 5;

/// Render `weeks` into `width` columns of text, each `width / 7` wide.
///
/// Markers: `[dd]` today, `*` offer, `#` order, `>` selected. Days outside
/// the displayed month are left blank.
pub fn render_text(
    month: YearMonth,
    weeks: &[WeekRow],
    selected: Option<DateKey>,
    width: usize,
) -> String {
    let column = (width / 7).max(MIN_COLUMN);
    let mut out = String::new();

    let _ = writeln!(out, "{:^w$}", month.label(), w = column * 7);
    for name in WEEKDAY_NAMES {
        let _ = write!(out, "{:^column$}", &name[..1]);
    }
    out.push('\n');

    for week in weeks {
        for day in week.iter() {
            let _ = write!(out, "{:^column$}", cell_text(day, selected));
        }
        // Keep lines free of trailing padding
        let trimmed = out.trim_end_matches(' ').len();
        out.truncate(trimmed);
        out.push('\n');
    }

    if let Some(selected) = selected {
        let _ = writeln!(out, "Selected date: {selected}");
    }
    out
}

fn cell_text(day: &DayCell, selected: Option<DateKey>) -> String {
    if !day.in_current_month {
        return String::new();
    }
    let mut text = if day.is_today {
        format!("[{}]", day.day_label)
    } else {
        day.day_label.clone()
    };
    if selected == Some(day.key) {
        text.insert(0, '>');
    }
    if day.has_order {
        text.push('#');
    } else if day.has_offer {
        text.push('*');
    }
    text
}
