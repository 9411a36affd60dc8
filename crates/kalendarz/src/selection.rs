//! Selection state of the calendar widget.
//!
//! Holds the displayed month, at most one selected day, and whether an order
//! submission is outstanding. Navigation never clears the selection.

use chrono::NaiveDate;
use tracing::debug;

use crate::grid;
use crate::order::{OrderError, OrderSubmitter};
use crate::types::{DateKey, MarkedDates, WeekRow, YearMonth};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionController {
    reference_month: YearMonth,
    selected: Option<DateKey>,
    submitting: bool,
}

impl SelectionController {
    /// Start on the month containing `from` with nothing selected.
    pub fn new(from: NaiveDate) -> Self {
        Self {
            reference_month: YearMonth::of(from),
            selected: None,
            submitting: false,
        }
    }

    pub fn reference_month(&self) -> YearMonth {
        self.reference_month
    }

    pub fn selected_date(&self) -> Option<DateKey> {
        self.selected
    }

    /// True while an order for the selected date is in flight.
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn go_to_previous_month(&mut self) {
        self.reference_month = self.reference_month.pred();
        debug!(month = %self.reference_month, "Previous month");
    }

    pub fn go_to_next_month(&mut self) {
        self.reference_month = self.reference_month.succ();
        debug!(month = %self.reference_month, "Next month");
    }

    /// Select `key` unconditionally. Whether the day is orderable is up to the
    /// caller; the rendering layer only offers selection on offer days.
    pub fn select_day(&mut self, key: DateKey) {
        self.selected = Some(key);
        debug!(date = %key, "Day selected");
    }

    /// Grid for the displayed month.
    pub fn grid(&self, marked: &MarkedDates, today: NaiveDate) -> Vec<WeekRow> {
        grid::build_grid(
            self.reference_month.first_day(),
            &marked.offer_days,
            &marked.order_days,
            today,
        )
    }

    /// Claim the selected date for submission.
    ///
    /// Returns `None` when nothing is selected or another submission is still
    /// outstanding. Every `Some` must be paired with [`finish_submission`].
    ///
    /// [`finish_submission`]: Self::finish_submission
    pub fn begin_submission(&mut self) -> Option<DateKey> {
        if self.submitting {
            debug!("Submission already in flight, ignoring");
            return None;
        }
        let date = self.selected?;
        self.submitting = true;
        Some(date)
    }

    /// Mark the outstanding submission as done. The outcome does not change
    /// the selection or the marked dates.
    pub fn finish_submission(&mut self) {
        self.submitting = false;
    }

    /// Submit an order for the selected date.
    ///
    /// `None` means nothing was sent.
    pub async fn confirm_order<S: OrderSubmitter>(
        &mut self,
        submitter: &S,
    ) -> Option<Result<DateKey, OrderError>> {
        let date = self.begin_submission()?;
        let in_flight = InFlight { controller: self };
        let result = submitter.submit(&date).await.map(|()| date);
        drop(in_flight);
        Some(result)
    }
}

/// Clears the in-flight flag when dropped, including when the submitting
/// future is cancelled mid-request.
struct InFlight<'a> {
    controller: &'a mut SelectionController,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.controller.finish_submission();
    }
}
