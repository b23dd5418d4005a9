use crate::finalize::Report;

use super::events::StreamEvent;

/// Output renderer (controls how a run is presented).
///
/// `format_*` produce the text; `render_*` write it to stdout.
pub trait OutputRenderer: Send + Sync {
    fn name(&self) -> &str;
    fn format(&self) -> &str;
    fn supports_streaming(&self) -> bool {
        false
    }

    /// One line (or block) for a live event. `None` means the renderer ignores it.
    fn format_event(&self, event: &StreamEvent) -> Option<String>;

    fn format_report(&self, report: &Report) -> String;

    fn render_event(&self, event: &StreamEvent) {
        if let Some(line) = self.format_event(event) {
            println!("{line}");
        }
    }

    fn render_report(&self, report: &Report) {
        println!("{}", self.format_report(report));
    }
}
