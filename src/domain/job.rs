use crate::domain::ScrapeOutcome;

/// A detail-scraping run over a fixed list of links.
///
/// The only way to advance the cursor is [`ScrapeJob::record`], which stores
/// exactly one outcome per step, so `results().len() == cursor()` always holds.
#[derive(Debug, Clone)]
pub struct ScrapeJob {
    links: Vec<String>,
    cursor: usize,
    results: Vec<ScrapeOutcome>,
}

impl ScrapeJob {
    pub fn new(links: Vec<String>) -> Self {
        let results = Vec::with_capacity(links.len());
        Self {
            links,
            cursor: 0,
            results,
        }
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.cursor == self.links.len()
    }

    /// Link at the cursor, or `None` once the job is complete
    pub fn current_link(&self) -> Option<&str> {
        self.links.get(self.cursor).map(String::as_str)
    }

    /// Store the outcome for the current link and advance the cursor.
    ///
    /// Ignored once the job is complete.
    pub fn record(&mut self, outcome: ScrapeOutcome) {
        if self.is_complete() {
            return;
        }
        self.results.push(outcome);
        self.cursor += 1;
        debug_assert_eq!(self.results.len(), self.cursor);
    }

    pub fn results(&self) -> &[ScrapeOutcome] {
        &self.results
    }

    pub fn into_results(self) -> Vec<ScrapeOutcome> {
        self.results
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_failed()).count()
    }

    /// Human readable progress line, e.g. `Parsing 2 of 5...`
    pub fn progress_text(&self) -> String {
        format!("Parsing {} of {}...", self.cursor + 1, self.links.len())
    }
}
