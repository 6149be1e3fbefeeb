use nova_core::{FileId, TextEdit, TextRange, TextSize};
use nova_impact::{DeclId, ImpactConfig, ImpactEngine, Problem};
use nova_test_utils::Fixture;
use nova_vfs::VfsPath;

/// `A.field` (public static) assigned from a class of the same package.
pub const FIELD_PROJECT: &str = r#"
    //- /foo/A.java
    package foo;
    public class A {
        public static String field;
    }
    //- /foo/B.java
    package foo;
    class B {
        void m() {
            A.field = "foo";
        }
    }
"#;

pub const A: &str = "/foo/A.java";
pub const B: &str = "/foo/B.java";

/// An engine loaded from a multi-file fixture, addressed by path.
pub struct TestProject {
    pub engine: ImpactEngine,
    pub fixture: Fixture,
}

impl TestProject {
    pub fn new(fixture: &str) -> Self {
        Self::with_config(fixture, ImpactConfig::default())
    }

    pub fn with_config(fixture: &str, config: ImpactConfig) -> Self {
        let fixture = Fixture::parse(fixture);
        let mut engine = ImpactEngine::new(config);
        for file in fixture.files() {
            engine
                .add_file(VfsPath::local(file.path.as_str()), file.text.clone())
                .expect("fixture file is added");
        }
        Self { engine, fixture }
    }

    pub fn with_limit(fixture: &str, limit: usize) -> Self {
        let mut project = Self::new(fixture);
        project.engine.set_max_files_to_search_usages_in(limit);
        project
    }

    pub fn file(&self, path: &str) -> FileId {
        self.engine
            .file_id(&VfsPath::local(path))
            .unwrap_or_else(|| panic!("no file {path}"))
    }

    pub fn add(&mut self, path: &str, text: &str) -> FileId {
        self.engine
            .add_file(VfsPath::local(path), text)
            .expect("file is added")
    }

    pub fn decl(&self, path: &str, member: &str) -> DeclId {
        self.engine
            .find_declaration(self.file(path), member)
            .unwrap_or_else(|| panic!("no declaration {member} in {path}"))
    }

    /// Replaces the first occurrence of `needle` in `path`, returning the undo edits.
    pub fn replace(&mut self, path: &str, needle: &str, with: &str) -> Vec<TextEdit> {
        let file = self.file(path);
        let text = self.engine.text(file).expect("file text");
        let start = text
            .find(needle)
            .unwrap_or_else(|| panic!("{needle:?} not found in {path}"));
        let range = TextRange::at(
            TextSize::from(start as u32),
            TextSize::from(needle.len() as u32),
        );
        self.engine
            .apply_edits(file, &[TextEdit::new(range, with)])
            .expect("edit applies")
    }

    pub fn undo(&mut self, path: &str, inverse: &[TextEdit]) {
        let file = self.file(path);
        self.engine.apply_edits(file, inverse).expect("undo applies");
    }

    pub fn highlight(&mut self, path: &str) {
        let file = self.file(path);
        self.engine.highlight(file).expect("highlighting pass");
    }

    /// Problems reported in `path`, in text order.
    pub fn problems(&self, path: &str) -> Vec<Problem> {
        let mut problems = self.engine.problems_in_file(self.file(path));
        problems.sort_by_key(|problem| problem.range.start());
        problems
    }

    /// Source text of each problem reported in `path`.
    pub fn problem_texts(&self, path: &str) -> Vec<String> {
        let text = self.engine.text(self.file(path)).expect("file text");
        self.problems(path)
            .iter()
            .map(|problem| {
                let start = u32::from(problem.range.start()) as usize;
                let end = u32::from(problem.range.end()) as usize;
                text[start..end].to_string()
            })
            .collect()
    }
}
