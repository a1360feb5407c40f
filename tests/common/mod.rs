#![allow(dead_code, clippy::unwrap_used)]

use crudgen::{generate, load_spec, GenConfig, GenerateOptions, GenerationReport};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const SHOP_SPEC: &str = r#"{
    "enums": {
        "WidgetStatus": [
            {"value": "ACTIVE", "comment": "Active"},
            {"value": "RETIRED", "comment": "Retired"}
        ]
    },
    "entities": [
        {
            "className": "Widget",
            "tableName": "t_widget",
            "moduleName": "biz",
            "comment": "Sellable widget",
            "fields": [
                {"name": "title", "type": "String", "length": 64, "notNull": true},
                {"name": "status", "type": "enum", "enumName": "WidgetStatus", "defaultValue": "ACTIVE"},
                {"name": "weightKg", "type": "Integer", "defaultValue": 0}
            ],
            "uniqueConstraints": [{"name": "uk_widget_title", "columns": ["title"]}],
            "apis": [
                {"name": "save", "requiredPerms": ["biz:widget:save"]},
                {"name": "update", "requiredPerms": ["biz:widget:update"]},
                {"name": "list"},
                {"name": "remove", "paramMode": "IDS", "authRequired": true},
                {"name": "page", "paramMode": "QUERY"},
                {"name": "archive", "paramMode": "CUSTOM",
                 "params": [{"name": "reason", "type": "String", "required": true}]}
            ]
        },
        {
            "className": "SysUser",
            "tableName": "t_user",
            "moduleName": "sys",
            "fields": [{"name": "userName", "type": "String", "length": 32, "notNull": true}],
            "apis": [{"name": "page", "paramMode": "QUERY"}]
        }
    ]
}"#;

/// Spec file inside a scratch directory.
pub fn write_spec(dir: &Path, name: &str, json: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, json).unwrap();
    path.canonicalize().unwrap()
}

pub fn options(root: &Path, spec_path: &Path, clean: bool) -> GenerateOptions {
    GenerateOptions {
        root: root.to_path_buf(),
        spec_path: spec_path.to_path_buf(),
        clean,
        dry_run: false,
    }
}

/// Load the spec at `spec_path` and generate into `root`.
pub fn run(root: &Path, spec_path: &Path, config: &GenConfig, clean: bool) -> GenerationReport {
    let spec = load_spec(spec_path).unwrap();
    generate(&spec, config, &options(root, spec_path, clean)).unwrap()
}

/// Every file under `root` with its contents, keyed by relative path.
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, String> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            (rel, fs::read_to_string(e.path()).unwrap())
        })
        .collect()
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}
