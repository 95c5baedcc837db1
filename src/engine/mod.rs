// src/engine/mod.rs

//! Timed exam session engine.
//!
//! A session shuffles the exam once, walks the learner through its
//! questions while a countdown runs, and turns the answers into exactly one
//! stored report, either on manual submission or when time runs out.

pub mod actor;
pub mod gateway;
pub mod grader;
pub mod randomizer;
pub mod session;
pub mod timer;

pub use actor::{SessionContext, SessionEvent, SessionHandle};
pub use gateway::ReportGateway;
pub use session::{AnswerMap, ExamSession, SessionSnapshot, SubmitTrigger, View};
