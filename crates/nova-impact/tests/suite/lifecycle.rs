use nova_core::{Range, TextEdit, TextRange, TextSize, WorkspaceEdit};
use nova_impact::{DeclState, EngineError};
use nova_vfs::{ContentChange, VfsPath};
use pretty_assertions::assert_eq;

use super::support::{TestProject, A, B, FIELD_PROJECT};

const TWO_REFERENCES: &str = r#"
    //- /foo/A.java
    package foo;
    public class A {
        public static String field;
    }
    //- /foo/B.java
    package foo;
    class B { void m() { A.field = "b"; } }
    //- /foo/C.java
    package foo;
    class C { void m() { A.field = "c"; } }
"#;

#[test]
fn split_editors_share_problems() {
    let mut project = TestProject::new(FIELD_PROJECT);
    let a = project.file(A);
    let left = project.engine.open_editor(a).unwrap();
    let right = project.engine.open_editor(a).unwrap();
    assert_eq!(project.engine.editors_of(a), vec![left, right]);

    project.replace(A, "field", "f");
    project.highlight(A);
    let shown = project.engine.problems(left).unwrap();
    assert_eq!(shown.len(), 1);
    assert_eq!(project.engine.problems(right).unwrap(), shown);

    // A fix typed into one split is visible in the other after its own pass.
    project.replace(A, "String f;", "String field;");
    project.highlight(A);
    assert!(project.engine.problems(right).unwrap().is_empty());
    assert!(project.engine.problems(left).unwrap().is_empty());
}

#[test]
fn full_text_revert_through_the_editor_protocol() {
    let mut project = TestProject::new(FIELD_PROJECT);
    let a = project.file(A);
    let original = project.engine.text(a).unwrap().to_string();

    let renamed = original.replace("field", "renamed");
    project
        .engine
        .document_changed(a, 1, &[ContentChange::full(renamed)])
        .unwrap();
    project.highlight(A);
    assert_eq!(project.problems(B).len(), 1);

    project
        .engine
        .document_changed(a, 2, &[ContentChange::full(original)])
        .unwrap();
    project.highlight(A);
    assert!(project.problems(B).is_empty());
}

#[test]
fn incremental_content_changes_are_analysed() {
    let mut project = TestProject::new(
        r#"
        //- /foo/A.java
        package foo;
        public class A {
            public static String $0field$1;
        }
        //- /foo/B.java
        package foo;
        class B {
            void m() {
                /*start*/A.field = "foo";/*end*/
            }
        }
        "#,
    );
    let a = project.file(A);
    let range = Range::new(
        project.fixture.marker_position(0),
        project.fixture.marker_position(1),
    );
    project
        .engine
        .document_changed(a, 1, &[ContentChange::replace(range, "f")])
        .unwrap();
    assert!(project.engine.text(a).unwrap().contains("String f;"));

    project.highlight(A);
    let problems = project.problems(B);
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].range, project.fixture.range(B));
}

#[test]
fn deleting_a_referencing_file_retracts_only_its_problems() {
    let mut project = TestProject::new(TWO_REFERENCES);
    project.replace(A, "field", "f");
    project.highlight(A);
    let field = project.decl(A, "A.f");
    assert_eq!(project.engine.problems_for(field).len(), 2);

    let c = project.file("/foo/C.java");
    project.engine.delete_file(c).unwrap();
    assert_eq!(project.problem_texts(B), vec!["A.field = \"b\";"]);
    assert_eq!(project.engine.state(field), Some(DeclState::Reported));
}

#[test]
fn moving_files_retracts_problems() {
    let mut project = TestProject::new(TWO_REFERENCES);
    project.replace(A, "field", "f");
    project.highlight(A);
    let field = project.decl(A, "A.f");

    let c = project.file("/foo/C.java");
    project
        .engine
        .move_file(c, VfsPath::local("/foo/moved/C.java"))
        .unwrap();
    assert_eq!(project.engine.problems_for(field).len(), 1);
    assert_eq!(project.engine.file_id(&VfsPath::local("/foo/moved/C.java")), Some(c));

    let a = project.file(A);
    project
        .engine
        .move_file(a, VfsPath::local("/foo/other/A.java"))
        .unwrap();
    assert_eq!(project.engine.problem_count(), 0);
    assert_eq!(project.engine.state(field), Some(DeclState::Clean));
}

#[test]
fn workspace_edit_is_analysed_as_one_change() {
    let mut project = TestProject::new(FIELD_PROJECT);
    let a = project.file(A);
    let b = project.file(B);

    let mut edit = WorkspaceEdit::default();
    edit.add_edit(a, replace_edit(&project, A, "field", "f"));
    edit.add_edit(b, replace_edit(&project, B, "field", "f"));
    let undo = project.engine.apply_workspace_edit(&edit).unwrap();

    project.highlight(A);
    assert!(project.problems(B).is_empty());
    let field = project.decl(A, "A.f");
    assert_eq!(project.engine.state(field), Some(DeclState::Clean));

    project.engine.apply_workspace_edit(&undo).unwrap();
    assert!(project.engine.text(b).unwrap().contains("A.field"));
    project.highlight(A);
    assert_eq!(project.engine.problem_count(), 0);
}

#[test]
fn failing_workspace_edit_changes_nothing() {
    let mut project = TestProject::new(FIELD_PROJECT);
    let a = project.file(A);
    let b = project.file(B);
    let before_a = project.engine.text(a).unwrap().to_string();
    let before_b = project.engine.text(b).unwrap().to_string();

    let mut edit = WorkspaceEdit::default();
    edit.add_edit(a, replace_edit(&project, A, "field", "f"));
    edit.add_edit(
        b,
        TextEdit::new(
            TextRange::at(TextSize::from(10_000), TextSize::from(1)),
            "x",
        ),
    );
    let err = project.engine.apply_workspace_edit(&edit).unwrap_err();
    assert!(matches!(err, EngineError::InvalidEdit(_)), "{err}");
    assert_eq!(project.engine.text(a).unwrap(), before_a);
    assert_eq!(project.engine.text(b).unwrap(), before_b);

    project.highlight(A);
    assert_eq!(project.engine.problem_count(), 0);
}

#[test]
fn edits_to_unknown_files_are_rejected() {
    let mut project = TestProject::new(FIELD_PROJECT);
    let a = project.file(A);
    project.engine.delete_file(a).unwrap();
    assert_eq!(
        project.engine.set_text(a, "class A {}"),
        Err(EngineError::UnknownFile(a))
    );
    assert_eq!(project.engine.open_editor(a), Err(EngineError::UnknownFile(a)));
}

fn replace_edit(project: &TestProject, path: &str, needle: &str, with: &str) -> TextEdit {
    let text = project.engine.text(project.file(path)).unwrap();
    let start = text.find(needle).unwrap();
    TextEdit::new(
        TextRange::at(
            TextSize::from(start as u32),
            TextSize::from(needle.len() as u32),
        ),
        with,
    )
}
