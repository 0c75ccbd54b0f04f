use crate::model::Diagnosis;

/// One past consultation as reported by the backend history endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    date: String,
    diagnosis: Diagnosis,
}

impl HistoryEntry {
    #[must_use]
    pub fn new(date: impl Into<String>, diagnosis: Diagnosis) -> Self {
        Self {
            date: date.into(),
            diagnosis,
        }
    }

    #[must_use]
    pub fn date(&self) -> &str {
        &self.date
    }

    #[must_use]
    pub fn diagnosis(&self) -> &Diagnosis {
        &self.diagnosis
    }

    /// One-line rendering used by history listings.
    #[must_use]
    pub fn summary_line(&self) -> String {
        let lines = self.diagnosis.display_lines();
        let summary = lines.first().map_or("(no diagnosis)", String::as_str);
        format!("{}: {summary}", self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_uses_first_diagnosis_line() {
        let entry = HistoryEntry::new(
            "12/09/2025",
            Diagnosis::text("Possible bronchitis - Rest recommended"),
        );
        assert_eq!(entry.summary_line(), "12/09/2025: Possible bronchitis");
    }

    #[test]
    fn summary_survives_an_empty_diagnosis() {
        let entry = HistoryEntry::new("01/01/2025", Diagnosis::text(""));
        assert_eq!(entry.summary_line(), "01/01/2025: (no diagnosis)");
    }
}
