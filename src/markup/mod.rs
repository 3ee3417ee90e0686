use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

static ENTRY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p").expect("static selector"));
static BOLD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("b, strong").expect("static selector"));

/// One paragraph-level log entry, detached from the parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Concatenated text of every descendant text node.
    pub text: String,
    /// Text of the first bold span, when the line names its speaker.
    pub bold: Option<String>,
}

impl LogEntry {
    pub fn new(text: impl Into<String>, bold: Option<&str>) -> Self {
        Self { text: text.into(), bold: bold.map(str::to_string) }
    }
}

pub struct LogDocument {
    html: Html,
}

impl LogDocument {
    pub fn parse(content: &str) -> Self {
        Self { html: Html::parse_document(content) }
    }

    /// Every non-blank `<p>` in document order.
    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.html
            .select(&ENTRY_SELECTOR)
            .filter_map(|node| {
                let text = plain_text(node);
                if text.trim().is_empty() {
                    return None;
                }
                let bold = node.select(&BOLD_SELECTOR).next().map(plain_text);
                Some(LogEntry { text, bold })
            })
            .collect()
    }
}

fn plain_text(node: ElementRef<'_>) -> String {
    node.text().collect()
}
