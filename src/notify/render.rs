use std::fmt::Write;

use html_escape::encode_text;

use crate::domain::{ClassSnapshot, Measure};
use crate::notify::Renderer;
use crate::scraper::site::NOT_AVAILABLE;

/// HTML message listing the changed entries of each class.
///
/// The fixed parts of the document are built once in `new` and reused for
/// every message.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    head: String,
    tail: String,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        let head = concat!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"></head>\n",
            "<body style=\"font-family: sans-serif\">\n"
        )
        .to_string();
        let tail = concat!(
            "<p style=\"color: #888\">You are receiving this because result ",
            "notifications are enabled for your account.</p>\n</body>\n</html>\n"
        )
        .to_string();

        Self { head, tail }
    }

    fn render_class(out: &mut String, class: &ClassSnapshot) {
        let _ = writeln!(
            out,
            "<h3>{} (group {}, {})</h3>",
            encode_text(&class.spec.name),
            encode_text(&class.spec.group),
            encode_text(&class.spec.year)
        );

        if !class.results.is_empty() {
            out.push_str("<table border=\"1\" cellpadding=\"4\">\n");
            out.push_str("<tr><th>Evaluation</th><th>Result</th><th>Average</th></tr>\n");
            for entry in &class.results {
                let _ = writeln!(
                    out,
                    "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                    encode_text(&entry.name),
                    encode_text(&entry.normal.result),
                    encode_text(&entry.normal.average)
                );
            }
            out.push_str("</table>\n");
        }

        if let Some(total) = class.total.as_ref().filter(|t| !t.is_blank()) {
            let _ = writeln!(out, "<p>Total: {}</p>", format_measure(total));
        }
        if let Some(grade) = class.final_grade.as_deref().filter(|g| !g.is_empty()) {
            let _ = writeln!(out, "<p><strong>Final grade: {}</strong></p>", encode_text(grade));
        }
    }
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn format_measure(measure: &Measure) -> String {
    if measure.average.is_empty() || measure.average == NOT_AVAILABLE {
        encode_text(&measure.result).into_owned()
    } else {
        format!(
            "{} (average {})",
            encode_text(&measure.result),
            encode_text(&measure.average)
        )
    }
}

impl Renderer for HtmlRenderer {
    fn render(&self, user_name: &str, changed: &[ClassSnapshot]) -> String {
        let mut out = self.head.clone();
        let _ = writeln!(out, "<p>Hi {},</p>", encode_text(user_name));
        out.push_str("<p>New results were posted for the following classes:</p>\n");
        for class in changed {
            Self::render_class(&mut out, class);
        }
        out.push_str(&self.tail);
        out
    }
}
