pub mod answer;
pub mod failure_streak;
pub mod question;
pub mod relay;
pub mod review;
pub mod session;
pub mod stats;
pub mod taxonomy;
pub mod test_result;

pub use answer::{AnswerEvent, AnswerOrigin};
pub use failure_streak::{FailureStreak, StreakHit, StreakUpdate};
pub use question::{Question, QuestionFilters, QuestionView};
pub use session::{SessionError, SessionState, TestSession};
pub use test_result::{PersistenceSummary, ScoreSummary, TestResult};
