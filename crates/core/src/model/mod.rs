mod diagnosis;
mod history;
pub mod ids;
mod question;
mod user;

pub use ids::{ParseIdError, PatientId, QuestionId};

pub use diagnosis::Diagnosis;
pub use history::HistoryEntry;
pub use question::{Answer, Question};
pub use user::{Role, User, UserError};
