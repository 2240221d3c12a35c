/// Collects one human-readable line per processed event plus a
/// closing tally, in the order events were supplied.
#[derive(Debug, Default)]
pub struct RunSummary {
    lines: Vec<String>,
    tally: Option<String>,
}

impl RunSummary {
    pub fn record(&mut self, line: String) {
        self.lines.push(line);
    }

    pub fn record_no_events(&mut self) {
        self.lines.push("No events today.".to_string());
    }

    /// Close out the summary. Nothing may be recorded after this.
    pub fn finalize_tally(&mut self, used: u32, ceiling: u32) {
        self.tally = Some(format!("{} of {} monthly notifications used", used, ceiling));
    }

    pub fn all_lines(&self) -> Vec<String> {
        let mut lines = self.lines.clone();
        if let Some(tally) = &self.tally {
            lines.push(tally.clone());
        }
        lines
    }

    /// Title plus itemized list, for the summary email body.
    pub fn render_html(&self, title: &str) -> String {
        let items: String = self
            .all_lines()
            .iter()
            .map(|line| format!("<li>{}</li>", line))
            .collect();
        format!("<h3>{}</h3><ul>{}</ul>", title, items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_keeps_lines_in_order_and_appends_the_tally() {
        let mut summary = RunSummary::default();
        summary.record("Notified Jane at +15551234567: Reminder".to_string());
        summary.record("No notification requested: Dentist".to_string());
        summary.finalize_tally(1, 100);

        let lines = summary.all_lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Notified Jane"));
        assert_eq!(lines[2], "1 of 100 monthly notifications used");
    }

    #[test]
    fn it_reports_an_empty_day() {
        let mut summary = RunSummary::default();
        summary.record_no_events();
        summary.finalize_tally(0, 100);

        assert_eq!(
            summary.all_lines(),
            vec![
                "No events today.".to_string(),
                "0 of 100 monthly notifications used".to_string()
            ]
        );
    }

    #[test]
    fn it_renders_a_titled_item_list() {
        let mut summary = RunSummary::default();
        summary.record("Line one".to_string());
        summary.finalize_tally(1, 10);

        let html = summary.render_html("Notification summary");
        assert_eq!(
            html,
            "<h3>Notification summary</h3><ul><li>Line one</li><li>1 of 10 monthly notifications used</li></ul>"
        );
    }
}
