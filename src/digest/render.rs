//! Digest renderer: orders tasks and formats them as a self-contained HTML email.

use std::cmp::Reverse;
use std::fmt::Write as _;

use crate::todos::model::{Priority, Task};

/// Label shown for tasks the classifier has not reached yet.
pub const DEFAULT_PRIORITY_LABEL: &str = "Medium";

const HIGH_COLOR: &str = "#e74c3c";
const MEDIUM_COLOR: &str = "#f39c12";
const LOW_COLOR: &str = "#27ae60";

/// One rendered line of the digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestRow<'a> {
    pub text: &'a str,
    pub priority_label: &'static str,
    pub completed: bool,
    pub color: &'static str,
}

impl<'a> DigestRow<'a> {
    pub fn from_task(task: &'a Task) -> Self {
        Self {
            text: &task.text,
            priority_label: task
                .priority
                .map(|p| p.as_str())
                .unwrap_or(DEFAULT_PRIORITY_LABEL),
            completed: task.completed,
            color: priority_color(task.priority),
        }
    }
}

/// Display color for a tier. Unset shares Medium's.
pub fn priority_color(priority: Option<Priority>) -> &'static str {
    match priority {
        Some(Priority::High) => HIGH_COLOR,
        Some(Priority::Low) => LOW_COLOR,
        Some(Priority::Medium) | None => MEDIUM_COLOR,
    }
}

/// Open tasks first, then by tier descending. Stable, so ties keep input order.
pub fn order_tasks(tasks: &[Task]) -> Vec<&Task> {
    let mut ordered: Vec<&Task> = tasks.iter().collect();
    ordered.sort_by_key(|t| (t.completed, Reverse(Priority::rank(t.priority))));
    ordered
}

/// Ordered rows for `tasks`.
pub fn digest_rows(tasks: &[Task]) -> Vec<DigestRow<'_>> {
    order_tasks(tasks)
        .into_iter()
        .map(DigestRow::from_task)
        .collect()
}

/// Render the full digest document.
pub fn render_digest(tasks: &[Task]) -> String {
    let rows = digest_rows(tasks);
    let open = rows.iter().filter(|r| !r.completed).count();
    let done = rows.len() - open;

    let mut html = String::with_capacity(512 + rows.len() * 256);
    html.push_str(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Your Task Digest</title>\n</head>\n\
         <body style=\"font-family: Arial, Helvetica, sans-serif; color: #333333; margin: 0; padding: 24px;\">\n\
         <h2 style=\"margin: 0 0 4px 0;\">Your Task Digest</h2>\n",
    );
    let _ = writeln!(
        html,
        "<p style=\"margin: 0 0 16px 0; color: #777777;\">{open} open, {done} completed</p>"
    );
    html.push_str(
        "<table style=\"border-collapse: collapse; width: 100%;\">\n\
         <thead>\n<tr>\
         <th style=\"text-align: left; padding: 8px; border-bottom: 2px solid #dddddd;\">Task</th>\
         <th style=\"text-align: left; padding: 8px; border-bottom: 2px solid #dddddd;\">Priority</th>\
         <th style=\"text-align: left; padding: 8px; border-bottom: 2px solid #dddddd;\">Status</th>\
         </tr>\n</thead>\n<tbody>\n",
    );

    if rows.is_empty() {
        html.push_str(
            "<tr><td colspan=\"3\" style=\"padding: 8px; color: #777777;\">No tasks yet.</td></tr>\n",
        );
    }

    for row in &rows {
        let (status, text_style) = if row.completed {
            ("Completed", "text-decoration: line-through; color: #999999;")
        } else {
            ("Open", "")
        };
        let _ = writeln!(
            html,
            "<tr>\
             <td style=\"padding: 8px; border-bottom: 1px solid #eeeeee; {text_style}\">{text}</td>\
             <td style=\"padding: 8px; border-bottom: 1px solid #eeeeee; color: {color}; font-weight: bold;\">{label}</td>\
             <td style=\"padding: 8px; border-bottom: 1px solid #eeeeee;\">{status}</td>\
             </tr>",
            text = escape_html(row.text),
            color = row.color,
            label = row.priority_label,
        );
    }

    html.push_str("</tbody>\n</table>\n</body>\n</html>\n");
    html
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::task_with;

    #[test]
    fn orders_open_before_done_then_by_tier() {
        let tasks = vec![
            task_with(1, "open low", false, Some(Priority::Low)),
            task_with(2, "open high", false, Some(Priority::High)),
            task_with(3, "done high", true, Some(Priority::High)),
        ];
        let order: Vec<&str> = order_tasks(&tasks).iter().map(|t| t.text.as_str()).collect();
        assert_eq!(order, vec!["open high", "open low", "done high"]);
    }

    #[test]
    fn unset_priority_sorts_last_within_group() {
        let tasks = vec![
            task_with(1, "unset", false, None),
            task_with(2, "low", false, Some(Priority::Low)),
            task_with(3, "medium", false, Some(Priority::Medium)),
            task_with(4, "done unset", true, None),
            task_with(5, "done low", true, Some(Priority::Low)),
        ];
        let order: Vec<i64> = order_tasks(&tasks).iter().map(|t| t.id).collect();
        assert_eq!(order, vec![3, 2, 1, 5, 4]);
    }

    #[test]
    fn ties_keep_input_order() {
        let tasks = vec![
            task_with(1, "a", false, Some(Priority::High)),
            task_with(2, "b", false, Some(Priority::High)),
            task_with(3, "c", false, Some(Priority::High)),
        ];
        let order: Vec<i64> = order_tasks(&tasks).iter().map(|t| t.id).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn rows_use_default_label_and_tier_colors() {
        let tasks = vec![
            task_with(1, "unset", false, None),
            task_with(2, "high", false, Some(Priority::High)),
            task_with(3, "low", false, Some(Priority::Low)),
        ];
        let rows = digest_rows(&tasks);

        assert_eq!(rows[0].priority_label, "High");
        assert_eq!(rows[0].color, "#e74c3c");
        assert_eq!(rows[1].priority_label, "Low");
        assert_eq!(rows[1].color, "#27ae60");
        assert_eq!(rows[2].priority_label, "Medium");
        assert_eq!(rows[2].color, priority_color(Some(Priority::Medium)));
        assert_eq!(tasks[0].priority, None);
    }

    #[test]
    fn render_lists_rows_in_order() {
        let tasks = vec![
            task_with(1, "water plants", false, Some(Priority::Low)),
            task_with(2, "pay rent", false, Some(Priority::High)),
            task_with(3, "call mom", true, Some(Priority::High)),
        ];
        let html = render_digest(&tasks);

        let rent = html.find("pay rent").unwrap();
        let plants = html.find("water plants").unwrap();
        let mom = html.find("call mom").unwrap();
        assert!(rent < plants && plants < mom);
        assert!(html.contains("2 open, 1 completed"));
        assert!(html.contains("line-through"));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(!html.contains("<link"));
    }

    #[test]
    fn render_escapes_task_text() {
        let tasks = vec![task_with(1, "<script>alert('x')</script> & more", false, None)];
        let html = render_digest(&tasks);
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; more"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn render_is_deterministic() {
        let tasks = vec![
            task_with(1, "a", false, Some(Priority::Low)),
            task_with(2, "b", true, None),
        ];
        assert_eq!(render_digest(&tasks), render_digest(&tasks));
    }

    #[test]
    fn render_empty_list() {
        let html = render_digest(&[]);
        assert!(html.contains("No tasks yet."));
        assert!(html.contains("0 open, 0 completed"));
    }
}
