//! On-disk fixtures: program dumps and rule files in a temp directory

use gadgetchain_ir::features::program::ClassDecl;
use std::path::PathBuf;
use tempfile::TempDir;

/// Deserialization entries plus `Runtime.exec(String)` as sink on its argument
pub const EXEC_RULES: &str = r#"
sources:
  - method: Serializable
sinks:
  - method: "<java.lang.Runtime: void exec(java.lang.String)>"
    index: [0]
"#;

/// Same as [`EXEC_RULES`] with the `Object` overload as sink as well
pub const EXEC_OBJECT_RULES: &str = r#"
sources:
  - method: Serializable
sinks:
  - method: "<java.lang.Runtime: void exec(java.lang.String)>"
    index: [0]
  - method: "<java.lang.Runtime: void exec(java.lang.Object)>"
    index: [0]
"#;

/// Temp directory holding `program.json` and `rules.yaml`
pub struct Workspace {
    pub dir: TempDir,
    pub program: PathBuf,
    pub rules: PathBuf,
}

impl Workspace {
    pub fn new(classes: &[ClassDecl], rules: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("program.json");
        let dump = serde_json::json!({ "classes": classes });
        std::fs::write(&program, serde_json::to_string_pretty(&dump).unwrap()).unwrap();
        let rules_path = dir.path().join("rules.yaml");
        std::fs::write(&rules_path, rules).unwrap();
        Self {
            dir,
            program,
            rules: rules_path,
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).unwrap();
        path
    }
}
