pub mod attempt;
pub mod quiz;
pub mod snapshot;

pub use attempt::{
    AnswerPayload, AnswerView, AnsweredQuestion, Attempt, AttemptResult, AttemptStatus,
    AttemptView, QuestionOutcome, RecordAnswerAck, RecordAnswerRequest, ResumeAttemptResponse,
    StartAttemptRequest, StartAttemptResponse, SubmitAttemptRequest, SubmitAttemptResponse,
    SubmitMode,
};
pub use quiz::{
    AnswerOption, MultiAnswerPolicy, Question, QuestionGroup, QuestionType, QuizDefinition,
    QuizPolicy, QuizSection,
};
pub use snapshot::{QuizSnapshot, SnapshotGroup, SnapshotOption, SnapshotQuestion, SnapshotSection};
