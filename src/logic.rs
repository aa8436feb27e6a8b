//! Request-level orchestration shared by the HTTP handlers.
//!
//! Each function takes the shared state plus an explicit, validated command and
//! runs its collaborator calls strictly one after another.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{error, info, instrument, warn};

use crate::analysis::{self, AnalysisInput, ProblemBrief};
use crate::domain::{Question, SubmissionRecord, TestResult};
use crate::error::CoreError;
use crate::generator::{self, GenerationMode};
use crate::grader::{self, GradeSummary};
use crate::ledger::WeaknessLedger;
use crate::protocol::*;
use crate::recorder;
use crate::state::AppState;

/// Grade code against caller-supplied test cases. Nothing is persisted.
#[instrument(level = "info", skip(state, cmd), fields(language = %cmd.language, cases = cmd.test_cases.len()))]
pub async fn run_tests(state: &AppState, cmd: &SubmitCmd) -> Result<Vec<TestResult>, CoreError> {
  grader::grade(state.executor.as_ref(), &cmd.language, &cmd.version, &cmd.source_code, &cmd.test_cases).await
}

/// Analyze a graded submission and replace the learner's weaknesses with the verdict.
///
/// A ledger write failure is logged and reported through `persisted`; the learner
/// still gets the analysis.
#[instrument(level = "info", skip(state, cmd), fields(user_id = %cmd.user_id, language = %cmd.language))]
pub async fn analyze_submission(state: &AppState, cmd: AnalyzeCmd) -> Result<AnalyzeOut, CoreError> {
  let oracle = state.oracle()?;
  let ledger = WeaknessLedger::new(state.store.as_ref());

  let previous = match cmd.previous_weaknesses {
    Some(list) => list,
    None => ledger.get(&cmd.user_id).await?,
  };

  let verdict = analysis::analyze(
    oracle,
    &state.prompts,
    &state.tuning,
    &AnalysisInput {
      problem: &cmd.question,
      code: &cmd.code,
      language: &cmd.language,
      results: &cmd.test_results,
      attempts: cmd.attempts,
      time_spent_secs: cmd.time_spent,
      previous_weaknesses: &previous,
    },
  )
  .await?;

  let persisted = match ledger.replace(&cmd.user_id, &verdict.weaknesses).await {
    Ok(()) => true,
    Err(e) => {
      error!(target: "ledger", user_id = %cmd.user_id, error = %e, "Failed to update weaknesses; returning analysis anyway");
      false
    }
  };

  Ok(AnalyzeOut { analysis: verdict.analysis, weaknesses: verdict.weaknesses, persisted })
}

#[instrument(level = "info", skip(state))]
pub async fn generate_first(state: &AppState, topic: &str, user_id: &str) -> Result<Question, CoreError> {
  generator::generate(
    state.oracle()?,
    state.store.as_ref(),
    &state.prompts,
    &state.tuning,
    topic,
    user_id,
    GenerationMode::First,
  )
  .await
}

/// Generate the learner's next question. Missing weaknesses come from the ledger,
/// missing solved titles from the learner's passing submissions on this topic.
#[instrument(level = "info", skip(state, cmd), fields(topic = %cmd.topic, user_id = %cmd.user_id))]
pub async fn generate_next(state: &AppState, cmd: GenerateNextCmd) -> Result<Question, CoreError> {
  let oracle = state.oracle()?;
  let weaknesses = match cmd.weaknesses {
    Some(list) => list,
    None => WeaknessLedger::new(state.store.as_ref()).get(&cmd.user_id).await?,
  };
  let solved = match cmd.solved_questions {
    Some(list) => list,
    None => solved_titles(state, &cmd.user_id, &cmd.topic).await?,
  };

  generator::generate(
    oracle,
    state.store.as_ref(),
    &state.prompts,
    &state.tuning,
    &cmd.topic,
    &cmd.user_id,
    GenerationMode::Next { weaknesses: &weaknesses, solved_titles: &solved },
  )
  .await
}

/// Titles of questions on `topic` the learner has fully passed, earliest created first.
async fn solved_titles(state: &AppState, user_id: &str, topic: &str) -> Result<Vec<String>, CoreError> {
  let passed: HashSet<String> = state
    .store
    .submissions_for_user(user_id)
    .await?
    .into_iter()
    .filter(|s| GradeSummary::of(&s.test_results).all_passed)
    .map(|s| s.question_id)
    .collect();

  Ok(state
    .store
    .questions_for_user(user_id)
    .await?
    .into_iter()
    .filter(|q| q.topic == topic && passed.contains(&q.id))
    .map(|q| q.title)
    .collect())
}

#[instrument(level = "info", skip(state))]
pub async fn learner_weaknesses(state: &AppState, user_id: &str) -> Result<Vec<String>, CoreError> {
  Ok(WeaknessLedger::new(state.store.as_ref()).get(user_id).await?)
}

async fn load_question(state: &AppState, id: &str) -> Result<Question, CoreError> {
  state
    .store
    .get_question(id)
    .await?
    .ok_or_else(|| CoreError::NotFound(format!("Unknown question: {}", id)))
}

pub async fn get_question(state: &AppState, id: &str) -> Result<Question, CoreError> {
  load_question(state, id).await
}

/// Full submission flow: grade the whole suite, record the attempt, and on a full
/// pass analyze it and update the learner's weaknesses.
#[instrument(level = "info", skip(state, cmd), fields(question_id = %cmd.question_id, user_id = %cmd.user_id, attempts = cmd.attempts))]
pub async fn evaluate_submission(state: &AppState, cmd: EvaluateCmd) -> Result<EvaluateOut, CoreError> {
  let question = load_question(state, &cmd.question_id).await?;
  let results = grader::grade(
    state.executor.as_ref(),
    &cmd.language,
    &cmd.version,
    &cmd.source_code,
    &question.testcases,
  )
  .await?;
  let summary = GradeSummary::of(&results);
  let xp = if summary.all_passed { question.xp } else { 0 };

  let recorded = recorder::record(
    state.store.as_ref(),
    &SubmissionRecord {
      question_id: question.id.clone(),
      user_id: cmd.user_id.clone(),
      code: cmd.source_code.clone(),
      language: cmd.language.clone(),
      test_results: results.clone(),
      time_spent: cmd.time_spent,
      attempts: cmd.attempts,
      xp,
    },
  )
  .await;

  let mut out = EvaluateOut {
    passed: summary.passed,
    total: summary.total,
    all_passed: summary.all_passed,
    xp,
    hint_unlocked: cmd.attempts >= state.tuning.hint_unlock_attempts,
    recorded,
    analysis: None,
    weaknesses: None,
    analysis_error: None,
    results,
  };

  if summary.all_passed {
    let analyzed = analyze_submission(
      state,
      AnalyzeCmd {
        code: cmd.source_code,
        language: cmd.language,
        question: ProblemBrief {
          title: question.title,
          description: question.description,
          constraints: question.constraints,
        },
        test_results: out.results.clone(),
        attempts: cmd.attempts,
        time_spent: cmd.time_spent,
        previous_weaknesses: None,
        user_id: cmd.user_id,
      },
    )
    .await;
    match analyzed {
      Ok(a) => {
        out.analysis = Some(a.analysis);
        out.weaknesses = Some(a.weaknesses);
      }
      // Grading already happened and was recorded; report the oracle problem alongside it.
      Err(e) => {
        warn!(target: "oracle", code = e.code(), error = %e, "Analysis failed after full pass");
        out.analysis_error = Some(e.to_string());
      }
    }
  }

  info!(target: "grading", passed = out.passed, total = out.total, xp = out.xp, recorded = out.recorded, "Submission evaluated");
  Ok(out)
}

/// Reveal a question's hint once the learner has made enough attempts.
#[instrument(level = "info", skip(state))]
pub async fn unlock_hint(state: &AppState, question_id: &str, attempts: u32) -> Result<String, CoreError> {
  let threshold = state.tuning.hint_unlock_attempts;
  if attempts < threshold {
    return Err(CoreError::HintLocked { remaining: threshold - attempts });
  }
  Ok(load_question(state, question_id).await?.hint)
}

#[instrument(level = "info", skip(state, code), fields(code_len = code.len()))]
pub async fn save_scratch(state: &AppState, question_id: &str, code: &str, language: &str) -> Result<(), CoreError> {
  if state.store.update_scratch(question_id, code, language).await? {
    Ok(())
  } else {
    Err(CoreError::NotFound(format!("Unknown question: {}", question_id)))
  }
}

/// Latest question the learner owns for `topic`, or a freshly generated first one.
#[instrument(level = "info", skip(state))]
pub async fn open_practice(state: &AppState, topic: &str, user_id: &str) -> Result<PracticeOut, CoreError> {
  if let Some(q) = state.store.latest_question(user_id, topic).await? {
    return Ok(PracticeOut { id: q.id, generated: false });
  }
  let q = generate_first(state, topic, user_id).await?;
  Ok(PracticeOut { id: q.id, generated: true })
}

/// XP per topic and question history (newest first) for a learner.
#[instrument(level = "info", skip(state))]
pub async fn learner_progress(state: &AppState, user_id: &str) -> Result<ProgressOut, CoreError> {
  let questions = state.store.questions_for_user(user_id).await?;
  let submissions = state.store.submissions_for_user(user_id).await?;
  Ok(summarize_progress(&questions, &submissions))
}

pub fn summarize_progress(questions: &[Question], submissions: &[SubmissionRecord]) -> ProgressOut {
  let topic_of: HashMap<&str, &str> = questions.iter().map(|q| (q.id.as_str(), q.topic.as_str())).collect();

  let mut xp_by_topic: BTreeMap<String, u64> = BTreeMap::new();
  let mut completed: HashSet<&str> = HashSet::new();
  for s in submissions {
    let topic = topic_of.get(s.question_id.as_str()).copied().unwrap_or("Unknown");
    *xp_by_topic.entry(topic.to_string()).or_default() += u64::from(s.xp);
    if GradeSummary::of(&s.test_results).all_passed {
      completed.insert(s.question_id.as_str());
    }
  }

  let topics = xp_by_topic.into_iter().map(|(name, xp)| TopicXp { name, xp }).collect();
  let history = questions
    .iter()
    .rev()
    .map(|q| HistoryEntry {
      id: q.id.clone(),
      title: q.title.clone(),
      topic: q.topic.clone(),
      status: if completed.contains(q.id.as_str()) { "Completed" } else { "In Progress" },
    })
    .collect();

  ProgressOut { topics, history }
}
