#![allow(dead_code)]

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Compact JSON of the fixture items. The checksum in `navigation_001.json`
/// is computed over exactly this text; `nav_4` is written the way a
/// JavaScript producer would (integer rating, no `featured` flag).
const ITEMS: &str = concat!(
    "[",
    r#"{"id":"nav_1","title":"ChatGPT","description":"Conversational assistant from OpenAI","url":"https://chat.openai.com","categoryId":"cat_1","tags":["chatbot","openai"],"featured":true,"isActive":true,"visitCount":120,"rating":4.8,"createTime":"2024-01-10T08:00:00Z","updateTime":"2024-03-01T08:00:00Z"},"#,
    r#"{"id":"nav_2","title":"Claude","description":"Assistant for writing and analysis","url":"https://claude.ai","categoryId":"cat_1","tags":["chatbot","writing"],"featured":false,"isActive":true,"visitCount":80,"rating":4.7,"createTime":"2024-02-15T08:00:00Z","updateTime":"2024-02-20T08:00:00Z"},"#,
    r#"{"id":"nav_3","title":"Midjourney","description":"Image generation from text prompts","url":"https://www.midjourney.com","categoryId":"cat_2","tags":["image","art"],"featured":true,"isActive":true,"visitCount":95,"rating":4.6,"createTime":"2023-11-05T08:00:00Z","updateTime":"2024-01-05T08:00:00Z"},"#,
    r#"{"id":"nav_4","title":"Upscayl","description":"Open source image upscaler","url":"https://upscayl.org","categoryId":"cat_3","tags":["image","upscale"],"isActive":true,"visitCount":10,"rating":4,"createTime":"2024-03-20T08:00:00Z","updateTime":"2024-03-21T08:00:00Z"}"#,
    "]"
);

const CATEGORIES: &str = r##"{
  "version": "1.0.0",
  "lastUpdate": "2024-03-21T08:00:00Z",
  "categories": [
    {
      "id": "cat_1",
      "name": "AI Chat",
      "description": "Chat assistants",
      "color": "#3b82f6",
      "order": 1,
      "parentId": null,
      "level": 0,
      "isActive": true,
      "createTime": "2023-10-01T00:00:00Z",
      "updateTime": "2024-01-01T00:00:00Z"
    },
    {
      "id": "cat_2",
      "name": "AI Art",
      "description": "Image generation",
      "color": "#ec4899",
      "order": 2,
      "parentId": null,
      "level": 0,
      "isActive": true,
      "createTime": "2023-10-01T00:00:00Z",
      "updateTime": "2024-01-01T00:00:00Z",
      "children": [
        {
          "id": "cat_3",
          "name": "Upscaling",
          "order": 1,
          "parentId": "cat_2",
          "level": 1,
          "isActive": true,
          "createTime": "2023-10-01T00:00:00Z",
          "updateTime": "2024-01-01T00:00:00Z"
        }
      ]
    }
  ]
}"##;

/// A temporary project directory for CLI tests.
pub struct TestProject {
    pub dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the project root, creating parent dirs as needed.
    pub fn write_file(&self, relative_path: &str, content: &str) {
        let full = self.dir.path().join(relative_path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        std::fs::write(&full, content).expect("failed to write file");
    }

    pub fn read_file(&self, relative_path: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(relative_path)).expect("failed to read file")
    }

    /// Write `data/categories.json` and a checksummed `data/navigation_001.json`.
    pub fn write_data_fixtures(&self) {
        self.write_file("data/categories.json", CATEGORIES);
        self.write_navigation_file("navigation_001.json", &items_checksum());
    }

    /// Write the fixture navigation file with an arbitrary checksum.
    pub fn write_navigation_file(&self, name: &str, checksum: &str) {
        let content = format!(
            r#"{{"version":"1.0.0","fileIndex":1,"totalFiles":1,"lastUpdate":"2024-03-21T08:00:00Z","items":{ITEMS},"meta":{{"totalItems":4,"activeItems":4,"categories":["cat_1","cat_2","cat_3"],"checksum":"{checksum}"}}}}"#
        );
        self.write_file(&format!("data/{name}"), &content);
    }

    /// Run `navdir init` on this directory.
    pub fn navdir_init(&self) {
        let output = std::process::Command::new(Self::navdir_bin())
            .arg("init")
            .arg(self.path())
            .output()
            .expect("failed to run navdir init");
        assert!(output.status.success(), "navdir init failed");
    }

    /// Path to the navdir binary built by cargo.
    pub fn navdir_bin() -> PathBuf {
        PathBuf::from(env!("CARGO_BIN_EXE_navdir"))
    }
}

/// Lowercase hex SHA-256 of the fixture items
pub fn items_checksum() -> String {
    hex::encode(Sha256::digest(ITEMS.as_bytes()))
}

/// An initialized project with the data fixtures in place.
pub fn init_project() -> TestProject {
    let project = TestProject::new();
    project.write_data_fixtures();
    project.navdir_init();
    project
}
