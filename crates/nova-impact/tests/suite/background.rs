use nova_impact::DeclState;
use nova_scheduler::{Scheduler, SchedulerConfig, TaskError};
use pretty_assertions::assert_eq;

use super::support::{TestProject, A, B, FIELD_PROJECT};

fn scheduler() -> Scheduler {
    Scheduler::new(SchedulerConfig {
        background_threads: 1,
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn background_pass_reports_problems() {
    let scheduler = scheduler();
    let mut project = TestProject::new(FIELD_PROJECT);
    let a = project.file(A);
    project.replace(A, "field", "f");

    let task = project.engine.highlight_in_background(&scheduler, a).unwrap();
    let field = project.decl(A, "A.f");
    assert_eq!(project.engine.state(field), Some(DeclState::Analyzing));

    let result = task.join().await.unwrap();
    assert_eq!(result.file(), a);
    assert!(project.engine.finish_highlight(result));
    assert_eq!(project.problem_texts(B), vec!["A.field = \"foo\";"]);
    assert_eq!(project.engine.state(field), Some(DeclState::Reported));
}

#[tokio::test(flavor = "multi_thread")]
async fn newer_edit_cancels_the_running_pass() {
    let scheduler = scheduler();
    let mut project = TestProject::new(FIELD_PROJECT);
    let a = project.file(A);
    project.replace(A, "field", "f");

    let task = project.engine.highlight_in_background(&scheduler, a).unwrap();
    project.replace(A, "String f;", "String g;");
    assert!(task.is_cancelled());
    assert_eq!(task.join().await, Err(TaskError::Cancelled));

    // The cancelled pass left its baseline untouched; the next pass still sees the rename.
    project.highlight(A);
    assert_eq!(project.problem_texts(B), vec!["A.field = \"foo\";"]);
    let field = project.decl(A, "A.g");
    assert_eq!(project.engine.state(field), Some(DeclState::Reported));
}

#[tokio::test(flavor = "multi_thread")]
async fn explicit_cancellation_rewinds_the_pass() {
    let scheduler = scheduler();
    let mut project = TestProject::new(FIELD_PROJECT);
    let a = project.file(A);
    project.replace(A, "field", "f");

    let task = project.engine.highlight_in_background(&scheduler, a).unwrap();
    assert!(project.engine.cancel_highlight(a));
    assert!(!project.engine.cancel_highlight(a));
    assert_eq!(task.join().await, Err(TaskError::Cancelled));

    let field = project.decl(A, "A.f");
    assert_ne!(project.engine.state(field), Some(DeclState::Analyzing));
    project.highlight(A);
    assert_eq!(project.problems(B).len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn completed_result_of_a_superseded_pass_is_discarded() {
    let scheduler = scheduler();
    let mut project = TestProject::new(FIELD_PROJECT);
    let a = project.file(A);
    project.replace(A, "field", "f");

    let task = project.engine.highlight_in_background(&scheduler, a).unwrap();
    let result = task.join().await.unwrap();

    // Reverting before the result is applied makes it stale.
    project.replace(A, "String f;", "String field;");
    assert!(!project.engine.finish_highlight(result));
    assert_eq!(project.engine.problem_count(), 0);

    project.highlight(A);
    assert_eq!(project.engine.problem_count(), 0);
    let field = project.decl(A, "A.field");
    assert_eq!(project.engine.state(field), Some(DeclState::Clean));
}
