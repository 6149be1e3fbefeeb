use std::sync::Arc;

use nova_core::{FileId, TextEdit, TextRange, TextSize};
use nova_impact::project::ParsedFile;
use nova_impact::scope::{scan_scope, scope_of};
use nova_impact::{DeclState, ProblemKind, ScanScope};
use pretty_assertions::assert_eq;

use super::support::{TestProject, A, B, FIELD_PROJECT};

#[test]
fn highlighting_twice_yields_the_same_problems() {
    let mut project = TestProject::new(FIELD_PROJECT);
    project.replace(A, "field", "f");

    project.highlight(A);
    let first = project.problems(B);
    assert_eq!(first.len(), 1);

    project.highlight(A);
    assert_eq!(project.problems(B), first);
    project.highlight(B);
    assert_eq!(project.problems(B), first);
}

#[test]
fn undoing_a_breaking_edit_restores_the_previous_problems() {
    let mut project = TestProject::new(FIELD_PROJECT);

    // An earlier edit already broke the assignment.
    project.replace(A, "String field", "int field");
    project.highlight(A);
    let field = project.decl(A, "A.field");
    let before = project.engine.problems_for(field);
    assert_eq!(
        before.iter().map(|problem| problem.kind.clone()).collect::<Vec<_>>(),
        vec![ProblemKind::TypeMismatch {
            expected: "int".to_string(),
            found: "String".to_string()
        }]
    );

    let undo = project.replace(A, "field", "f");
    project.highlight(A);
    let during = project.engine.problems_for(field);
    assert_eq!(during.len(), 1);
    assert_eq!(during[0].kind.tag(), "unresolved-reference");

    project.undo(A, &undo);
    project.highlight(A);
    assert_eq!(project.engine.problems_for(field), before);
}

#[test]
fn undoing_the_only_breaking_edit_leaves_nothing() {
    let mut project = TestProject::new(FIELD_PROJECT);
    let undo = project.replace(A, "public static String", "private static String");
    project.highlight(A);
    assert_eq!(
        project.problems(B)[0].kind,
        ProblemKind::Inaccessible {
            name: "field".to_string()
        }
    );

    project.undo(A, &undo);
    project.highlight(A);
    assert!(project.problems(B).is_empty());
    assert_eq!(
        project.engine.state(project.decl(A, "A.field")),
        Some(DeclState::Clean)
    );
}

#[test]
fn narrowing_never_widens_the_scope() {
    let variants = [
        "public static int x;",
        "protected static int x;",
        "static int x;",
        "private static int x;",
    ];
    let parsed: Vec<ParsedFile> = variants
        .iter()
        .map(|member| {
            let text = format!("package foo; public class A {{ {member} }}");
            ParsedFile::parse(FileId::from_raw(0), 0, Arc::new(text))
        })
        .collect();
    let scopes: Vec<ScanScope> = parsed
        .iter()
        .map(|file| {
            let index = file.find("A.x").expect("field");
            scope_of(file, file.site_ref(index), &file.decls[index as usize].snapshot)
        })
        .collect();
    assert_eq!(
        scopes,
        vec![
            ScanScope::Project,
            ScanScope::Project,
            ScanScope::Package,
            ScanScope::File
        ]
    );
    for pair in scopes.windows(2) {
        assert!(pair[1] <= pair[0]);
    }

    // The scan after a narrowing still covers the old scope, so broken callers are found.
    let narrow = &parsed[3];
    let index = narrow.find("A.x").expect("field");
    let previous = &parsed[0].decls[index as usize].snapshot;
    assert_eq!(
        scan_scope(
            narrow,
            narrow.site_ref(index),
            Some(previous),
            &narrow.decls[index as usize].snapshot
        ),
        ScanScope::Project
    );
}

#[test]
fn narrowing_reports_callers_in_the_old_scope() {
    let mut project = TestProject::new(
        r#"
        //- /foo/A.java
        package foo;
        public class A {
            public static String field;
        }
        //- /bar/C.java
        package bar;
        class C {
            void m() {
                foo.A.field = "x";
            }
        }
        "#,
    );
    project.replace(A, "public static", "static");
    project.highlight(A);
    assert_eq!(project.problem_texts("/bar/C.java"), vec!["foo.A.field = \"x\";"]);
}

#[test]
fn exceeding_the_threshold_clears_problems_even_for_compatible_changes() {
    let mut project = TestProject::new(
        r#"
        //- /foo/A.java
        package foo;
        public class A {
            static String field;
        }
        //- /foo/B.java
        package foo;
        class B {
            void m() {
                A.field = "foo";
            }
        }
        "#,
    );
    project.replace(A, "field", "f");
    project.highlight(A);
    let field = project.decl(A, "A.f");
    assert_eq!(project.problems(B).len(), 1);

    // Widening is not breaking, but the scan no longer fits.
    project.engine.set_max_files_to_search_usages_in(1);
    project.replace(A, "static String f", "public static String f");
    project.highlight(A);
    assert!(project.problems(B).is_empty());
    assert_eq!(project.engine.state(field), Some(DeclState::Unknown));
}

#[test]
fn one_problem_per_element() {
    let mut project = TestProject::new(
        r#"
        //- /foo/A.java
        package foo;
        public class A {
            public static String field;
        }
        //- /foo/B.java
        package foo;
        class B {
            void m() {
                A.field = A.field + "!";
                String copy = A.field;
            }
        }
        "#,
    );
    project.replace(A, "field", "f");
    project.highlight(A);
    let texts = vec!["A.field = A.field + \"!\";", "String copy = A.field;"];
    assert_eq!(project.problem_texts(B), texts);

    // B is now both a word match and pinned by its problems; it is still verified once.
    project.replace(A, "String f;", "String g;");
    project.highlight(A);
    assert_eq!(project.problem_texts(B), texts);
    assert_eq!(project.engine.problem_count(), 2);
}

#[test]
fn element_broken_by_two_declarations_is_reported_once() {
    let mut project = TestProject::new(
        r#"
        //- /foo/A.java
        package foo;
        public class A {
            public static String x;
            public static String y;
        }
        //- /foo/B.java
        package foo;
        class B {
            String s = A.x + A.y;
        }
        "#,
    );
    let a = project.file(A);
    let text = project.engine.text(a).unwrap().to_string();
    let x = text.find("String x").unwrap() + "String ".len();
    let y = text.find("String y").unwrap() + "String ".len();
    let edits = [
        TextEdit::new(range(x, 1), "x2"),
        TextEdit::new(range(y, 1), "y2"),
    ];
    project.engine.apply_edits(a, &edits).unwrap();

    project.highlight(A);
    let problems = project.problems(B);
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].decl, project.decl(A, "A.y2"));
    assert_eq!(
        project.engine.state(project.decl(A, "A.x2")),
        Some(DeclState::Clean)
    );

    project.highlight(A);
    assert_eq!(project.problems(B), problems);
}

fn range(start: usize, len: usize) -> TextRange {
    TextRange::at(TextSize::from(start as u32), TextSize::from(len as u32))
}

/// `A.field` written from three other files of its package.
const THREE_WRITERS: &str = r#"
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
    //- /foo/D.java
    package foo;
    class D { void m() { A.field = "d"; } }
"#;

#[test]
fn undo_after_overflow_returns_to_clean() {
    let mut project = TestProject::with_limit(THREE_WRITERS, 2);
    let undo = project.replace(A, "field", "f");
    project.highlight(A);
    let field = project.decl(A, "A.f");
    assert_eq!(project.engine.state(field), Some(DeclState::Unknown));

    project.undo(A, &undo);
    let file = project.file(A);
    let _pass = project.engine.begin_highlight(file).expect("pass begins");
    assert_eq!(project.engine.state(field), Some(DeclState::Analyzing));
    assert!(project.engine.cancel_highlight(file));
    assert_eq!(project.engine.state(field), Some(DeclState::Unknown));

    project.highlight(A);
    assert_eq!(project.engine.state(field), Some(DeclState::Clean));
    assert_eq!(project.engine.problem_count(), 0);
}

#[test]
fn undo_after_overflow_to_a_reported_shape_ends_clean() {
    let mut project = TestProject::new(FIELD_PROJECT);
    project.replace(A, "field", "f");
    project.highlight(A);
    let field = project.decl(A, "A.f");
    assert_eq!(project.engine.state(field), Some(DeclState::Reported));

    project.engine.set_max_files_to_search_usages_in(1);
    let undo = project.replace(A, "String f", "Integer f");
    project.highlight(A);
    assert_eq!(project.engine.state(field), Some(DeclState::Unknown));

    project.undo(A, &undo);
    project.highlight(A);
    assert_eq!(project.engine.state(field), Some(DeclState::Clean));
    assert!(project.problems(B).is_empty());
}
