use std::fmt;

use thiserror::Error;

use crate::{domain::row::ResearchRow, grouping::ThreadGroup};

pub const DEFAULT_ROWS_PER_MESSAGE: usize = 10;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeadlineError {
    #[error("deadline `{0}` is not in month/day form")]
    MissingSegment(String),
    #[error("deadline `{0}` has a non-numeric month or day")]
    NonNumeric(String),
}

/// A `MM/DD` deadline as shown in thread titles and message bodies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayDeadline {
    pub month: String,
    pub day: String,
}

impl DisplayDeadline {
    /// Reads the first two `/`-separated segments of a sheet deadline and
    /// zero-pads each to two digits. Anything after the day (a year, say) is
    /// ignored.
    pub fn parse(raw: &str) -> Result<Self, DeadlineError> {
        let mut segments = raw.trim().split('/').map(str::trim);
        let (Some(month), Some(day)) = (segments.next(), segments.next()) else {
            return Err(DeadlineError::MissingSegment(raw.to_owned()));
        };
        if month.is_empty() || day.is_empty() {
            return Err(DeadlineError::MissingSegment(raw.to_owned()));
        }
        if !month.chars().chain(day.chars()).all(|ch| ch.is_ascii_digit()) {
            return Err(DeadlineError::NonNumeric(raw.to_owned()));
        }

        Ok(Self { month: format!("{month:0>2}"), day: format!("{day:0>2}") })
    }
}

impl fmt::Display for DisplayDeadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.month, self.day)
    }
}

pub fn thread_title(deadline: &DisplayDeadline, identity: &str) -> String {
    format!("{deadline} {identity}")
}

/// Renders one row as the fixed block posted into a thread. Downstream
/// readers parse these labels, so their text and order must not drift.
pub fn render_row(uploader: &str, deadline: &DisplayDeadline, row: &ResearchRow) -> String {
    format!(
        "{uploader}\n Deadline: {deadline}\n Order Number: {}\n eBay Item Id: {}\n Product ID: {}\n Category: {}\n Keyword: {}\n Identity: {}\n JP Keyword: {}\n Appendix: {}\n Order Detail URL: {}\n Est. Profit: {}",
        row.order_number,
        row.ebay_item_id,
        row.product_id,
        row.category,
        row.keyword,
        row.identity,
        row.jp_keyword,
        row.appendix,
        row.order_detail_url,
        row.estimated_profit,
    )
}

/// Splits a group into message-sized batches. A zero size is treated as one
/// row per message.
pub fn chunk_rows(
    rows: &[ResearchRow],
    rows_per_message: usize,
) -> impl Iterator<Item = &[ResearchRow]> {
    rows.chunks(rows_per_message.max(1))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedThread {
    pub title: String,
    pub identity: String,
    pub deadline: DisplayDeadline,
    pub messages: Vec<String>,
}

pub fn render_thread(
    uploader: &str,
    group: &ThreadGroup,
    rows_per_message: usize,
) -> Result<RenderedThread, DeadlineError> {
    let first = group.first_row();
    let deadline = DisplayDeadline::parse(&first.deadline)?;
    let identity = first.identity.clone();

    let messages = chunk_rows(&group.rows, rows_per_message)
        .map(|chunk| {
            chunk.iter().map(|row| render_row(uploader, &deadline, row)).collect::<Vec<_>>().join("\n")
        })
        .collect();

    Ok(RenderedThread { title: thread_title(&deadline, &identity), identity, deadline, messages })
}

#[cfg(test)]
mod tests {
    use super::{chunk_rows, render_row, render_thread, thread_title, DeadlineError, DisplayDeadline};
    use crate::{domain::row::ResearchRow, grouping::ThreadGroup};

    fn group(identity: &str, deadline: &str, size: usize) -> ThreadGroup {
        ThreadGroup {
            key: format!("{identity}-{deadline}"),
            rows: (0..size)
                .map(|index| ResearchRow {
                    identity: identity.to_owned(),
                    deadline: deadline.to_owned(),
                    order_number: format!("ORD-{index}"),
                    ..ResearchRow::default()
                })
                .collect(),
        }
    }

    #[test]
    fn single_digit_month_and_day_are_padded() {
        let deadline = DisplayDeadline::parse("3/7").expect("deadline");
        assert_eq!(thread_title(&deadline, "Acme"), "03/07 Acme");
    }

    #[test]
    fn two_digit_deadline_is_unchanged() {
        let deadline = DisplayDeadline::parse("12/25").expect("deadline");
        assert_eq!(deadline.to_string(), "12/25");
    }

    #[test]
    fn trailing_year_is_ignored() {
        let deadline = DisplayDeadline::parse("4/9/2025").expect("deadline");
        assert_eq!(deadline.to_string(), "04/09");
    }

    #[test]
    fn malformed_deadlines_are_rejected() {
        assert_eq!(
            DisplayDeadline::parse("tomorrow"),
            Err(DeadlineError::MissingSegment("tomorrow".to_owned()))
        );
        assert_eq!(DisplayDeadline::parse("5/"), Err(DeadlineError::MissingSegment("5/".to_owned())));
        assert_eq!(
            DisplayDeadline::parse("May/1"),
            Err(DeadlineError::NonNumeric("May/1".to_owned()))
        );
    }

    #[test]
    fn twenty_three_rows_chunk_into_ten_ten_three() {
        let group = group("Acme", "5/1", 23);

        let sizes: Vec<_> = chunk_rows(&group.rows, 10).map(<[ResearchRow]>::len).collect();
        assert_eq!(sizes, vec![10, 10, 3]);

        let flattened: Vec<_> =
            chunk_rows(&group.rows, 10).flatten().map(|row| row.order_number.clone()).collect();
        let expected: Vec<_> = group.rows.iter().map(|row| row.order_number.clone()).collect();
        assert_eq!(flattened, expected);
    }

    #[test]
    fn row_block_lists_labels_in_fixed_order() {
        let row = ResearchRow {
            deadline: "5/1".to_owned(),
            order_number: "A-1".to_owned(),
            ebay_item_id: "111".to_owned(),
            product_id: "P-1".to_owned(),
            category: "Toys".to_owned(),
            keyword: "robot".to_owned(),
            identity: "WidgetA".to_owned(),
            jp_keyword: "ロボット".to_owned(),
            appendix: "n/a".to_owned(),
            order_detail_url: "https://example.test/1".to_owned(),
            estimated_profit: "9.99".to_owned(),
            sanitized_by: "alice".to_owned(),
        };
        let deadline = DisplayDeadline::parse(&row.deadline).expect("deadline");

        assert_eq!(
            render_row("<@42>", &deadline, &row),
            "<@42>\n Deadline: 05/01\n Order Number: A-1\n eBay Item Id: 111\n Product ID: P-1\n Category: Toys\n Keyword: robot\n Identity: WidgetA\n JP Keyword: ロボット\n Appendix: n/a\n Order Detail URL: https://example.test/1\n Est. Profit: 9.99"
        );
    }

    #[test]
    fn rendered_thread_joins_each_chunk_into_one_message() {
        let rendered = render_thread("uploader", &group("Acme", "3/7", 12), 10).expect("render");

        assert_eq!(rendered.title, "03/07 Acme");
        assert_eq!(rendered.messages.len(), 2);
        assert_eq!(rendered.messages[0].matches("Order Number:").count(), 10);
        assert_eq!(rendered.messages[1].matches("Order Number:").count(), 2);
        assert!(rendered.messages[1].starts_with("uploader\n Deadline: 03/07\n Order Number: ORD-10"));
    }

    #[test]
    fn rendered_thread_propagates_deadline_errors() {
        let error = render_thread("uploader", &group("Acme", "soon", 1), 10).expect_err("must fail");
        assert!(matches!(error, DeadlineError::MissingSegment(_)));
    }
}
