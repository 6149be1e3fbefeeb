use nova_impact::{DeclState, ProblemKind};
use pretty_assertions::assert_eq;

use super::support::{TestProject, A, B, FIELD_PROJECT};

#[test]
fn renaming_a_class_breaks_its_anonymous_instantiation() {
    let mut project = TestProject::new(
        r#"
        //- /foo/A.java
        package foo;
        public class A extends Parent {}
        //- /foo/Parent.java
        package foo;
        public class Parent {}
        //- /bar/B.java
        package bar;
        import foo.*;
        class B {
            void m() {
                Parent parent = new A() {};
            }
        }
        "#,
    );

    project.replace("/foo/A.java", "class A", "class Bar");
    project.highlight("/foo/A.java");

    assert_eq!(
        project.problem_texts("/bar/B.java"),
        vec!["Parent parent = new A() {};"]
    );
    let problems = project.problems("/bar/B.java");
    assert_eq!(
        problems[0].kind,
        ProblemKind::UnresolvedReference {
            name: "A".to_string()
        }
    );
    assert_eq!(problems[0].decl, project.decl("/foo/A.java", "Bar"));
    assert_eq!(project.engine.problem_count(), 1);
}

#[test]
fn renaming_a_field_and_back_clears_the_problem() {
    let mut project = TestProject::new(FIELD_PROJECT);

    project.replace(A, "field", "f");
    project.highlight(A);
    assert_eq!(project.problem_texts(B), vec!["A.field = \"foo\";"]);
    assert_eq!(project.problems(B)[0].kind.tag(), "unresolved-reference");
    let field = project.decl(A, "A.f");
    assert_eq!(project.engine.state(field), Some(DeclState::Reported));

    project.replace(A, "String f;", "String field;");
    project.highlight(A);
    assert!(project.problems(B).is_empty());
    assert_eq!(project.engine.state(field), Some(DeclState::Clean));
}

const THREE_REFERENCES: &str = r#"
    //- /foo/A.java
    package foo;
    public class A {
        public static String field;
    }
    //- /foo/R1.java
    package foo;
    class R1 { void m() { A.field = "1"; } }
    //- /foo/R2.java
    package foo;
    class R2 { void m() { A.field = "2"; } }
    //- /foo/R3.java
    package foo;
    class R3 { void m() { A.field = "3"; } }
"#;

#[test]
fn threshold_turns_a_rename_into_unknown() {
    let mut project = TestProject::with_limit(THREE_REFERENCES, 4);

    project.replace(A, "field", "f");
    project.highlight(A);
    let field = project.decl(A, "A.f");
    assert_eq!(project.engine.problems_for(field).len(), 3);
    for path in ["/foo/R1.java", "/foo/R2.java", "/foo/R3.java"] {
        assert_eq!(project.problems(path).len(), 1, "{path}");
    }

    project.add(
        "/foo/R4.java",
        "package foo;\nclass R4 { void m() { A.field = \"4\"; } }\n",
    );
    project.replace(A, "String f;", "String g;");
    project.highlight(A);

    assert!(project.engine.problems_for(field).is_empty());
    assert_eq!(project.engine.problem_count(), 0);
    assert_eq!(project.engine.state(field), Some(DeclState::Unknown));
}

#[test]
fn widening_past_the_threshold_clears_existing_problems() {
    let mut project = TestProject::with_limit(
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
                A.field = "in package";
            }
        }
        //- /bar/C.java
        package bar;
        class C {
            void m() {
                foo.A.field = "out of package";
            }
        }
        "#,
        2,
    );

    project.replace(A, "static String", "static final String");
    project.highlight(A);
    assert_eq!(project.problem_texts(B), vec!["A.field = \"in package\";"]);
    assert_eq!(
        project.problems(B)[0].kind,
        ProblemKind::AssignToFinal {
            name: "field".to_string()
        }
    );
    assert!(project.problems("/bar/C.java").is_empty());

    project.replace(A, "static final", "public static final");
    project.highlight(A);

    let field = project.decl(A, "A.field");
    assert!(project.problems(B).is_empty());
    assert!(project.problems("/bar/C.java").is_empty());
    assert_eq!(project.engine.state(field), Some(DeclState::Unknown));
}

#[test]
fn deleting_the_declaring_file_retracts_its_problems() {
    let mut project = TestProject::new(FIELD_PROJECT);
    let a = project.file(A);
    let b = project.file(B);
    let editor = project.engine.open_editor(b).unwrap();
    let a_editor = project.engine.open_editor(a).unwrap();

    project.replace(A, "field", "f");
    project.highlight(A);
    let field = project.decl(A, "A.f");
    assert_eq!(project.problems(B).len(), 1);
    assert_eq!(project.engine.problems(a_editor).unwrap().len(), 1);

    project.engine.delete_file(a).unwrap();

    assert!(project.problems(B).is_empty());
    assert_eq!(project.engine.problem_count(), 0);
    assert_eq!(project.engine.state(field), None);
    assert!(project.engine.problems(editor).unwrap().is_empty());
    assert!(project.engine.problems(a_editor).is_err());
}
