mod ids;
mod outcome;
mod question;

pub use ids::{ParseIdError, QuestionId, SkillId};
pub use outcome::{SessionOutcome, ValidationResult};
pub use question::{OptionLabel, Question, QuestionError, QuestionSet};
