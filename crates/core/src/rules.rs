//! Deterministic local diagnosis, used when the remote assessment service is
//! unavailable.

//
// ─── RULE TABLES ───────────────────────────────────────────────────────────────
//

/// Which prioritized rule table to evaluate. Each persona answers a fixed
/// slot layout: patients a five-symptom vector, clinicians a three-symptom
/// vector about the examined patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSet {
    /// Slots: chest pain, shortness of breath, swelling, palpitations,
    /// dizziness.
    Patient,
    /// Slots: fever, persistent cough, breathing difficulty.
    Clinician,
}

impl RuleSet {
    /// Number of answer slots the table expects.
    #[must_use]
    pub fn slots(self) -> usize {
        match self {
            RuleSet::Patient => 5,
            RuleSet::Clinician => 3,
        }
    }

    /// Evaluates the ordered answer vector against the table. Rules are
    /// checked in priority order and the first match wins. Slots missing
    /// from a short vector count as "no".
    #[must_use]
    pub fn evaluate(self, answers: &[bool]) -> &'static str {
        let slot = |i: usize| answers.get(i).copied().unwrap_or(false);

        match self {
            RuleSet::Patient => {
                let chest_pain = slot(0);
                let shortness_of_breath = slot(1);
                let swelling = slot(2);
                let palpitations = slot(3);
                let dizziness = slot(4);

                if chest_pain || shortness_of_breath {
                    "severe cardiovascular issue, seek care immediately"
                } else if swelling || palpitations {
                    "possible heart failure/arrhythmia, consult a doctor"
                } else if dizziness {
                    "possible blood-pressure/dehydration issue, hydrate and consult if persistent"
                } else {
                    "mild symptoms, rest and observe"
                }
            }
            RuleSet::Clinician => {
                let fever = slot(0);
                let persistent_cough = slot(1);
                let breathing_difficulty = slot(2);

                if breathing_difficulty {
                    "possible pneumonia/severe respiratory illness, refer to specialist"
                } else if fever && persistent_cough {
                    "possible bronchitis/respiratory infection"
                } else {
                    "mild symptoms, recommend rest and observation"
                }
            }
        }
    }
}
