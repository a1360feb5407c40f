#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{read, run, snapshot, write_spec, SHOP_SPEC};
use crudgen::generator::{
    dir_marker_origin, is_generated_file, plan_clean, spec_origin, OutputLayout, DIR_MARKER,
};
use crudgen::GenConfig;
use std::fs;
use tempfile::TempDir;

const GADGET_ONLY: &str = r#"[
    {"className": "Gadget", "tableName": "t_gadget", "moduleName": "shop",
     "fields": [{"name": "label", "type": "String"}],
     "apis": [{"name": "save"}]}
]"#;

#[test]
fn test_dropped_entity_is_removed_on_clean() {
    let dir = TempDir::new().unwrap();
    let spec = write_spec(dir.path(), "shop.json", SHOP_SPEC);
    let cfg = GenConfig::from_json_str(r#"{"extensions": ["Widget"]}"#).unwrap();
    run(dir.path(), &spec, &cfg, false);

    let app = dir.path().join("app");
    let user_impl = app.join("services/biz/widget_service_impl.py");
    assert!(user_impl.exists());

    // same spec path, Widget and SysUser gone
    fs::write(&spec, GADGET_ONLY).unwrap();
    run(dir.path(), &spec, &GenConfig::default(), true);

    assert!(!app.join("models/biz").exists());
    assert!(!app.join("api/biz").exists());
    assert!(!app.join("models/sys").exists());
    assert!(!app.join("services/biz/widget_service.py").exists());
    assert!(!app.join("services/biz").join(DIR_MARKER).exists());
    // the hand-written extension and its directory survive
    assert!(user_impl.exists());
    assert!(!is_generated_file(&user_impl));

    assert!(app.join("models/shop/gadget.py").exists());
    let router = read(&app.join("api/router.py"));
    assert!(router.contains("shop_gadget_router"));
    assert!(!router.contains("biz_widget_router"));
}

const WIDGET_AND_GADGET: &str = r#"[
    {"className": "Widget", "tableName": "t_widget", "moduleName": "biz",
     "fields": [{"name": "title", "type": "String"}],
     "apis": [{"name": "save"}, {"name": "publish", "paramMode": "CUSTOM"}]},
    {"className": "Gadget", "tableName": "t_gadget", "moduleName": "biz",
     "fields": [{"name": "label", "type": "String"}],
     "apis": [{"name": "save"}, {"name": "calibrate", "paramMode": "CUSTOM"}]}
]"#;

const GADGET_IN_BIZ: &str = r#"[
    {"className": "Gadget", "tableName": "t_gadget", "moduleName": "biz",
     "fields": [{"name": "label", "type": "String"}],
     "apis": [{"name": "save"}, {"name": "calibrate", "paramMode": "CUSTOM"}]}
]"#;

const GIZMO_IN_SHOP: &str = r#"[
    {"className": "Gizmo", "tableName": "t_gizmo", "moduleName": "shop",
     "fields": [{"name": "size", "type": "Integer"}],
     "apis": [{"name": "save"}]}
]"#;

#[test]
fn test_clean_keeps_remaining_entities_of_the_same_module() {
    let dir = TempDir::new().unwrap();
    let spec = write_spec(dir.path(), "shop.json", WIDGET_AND_GADGET);
    let cfg = GenConfig::from_json_str(r#"{"extensions": ["Widget", "Gadget"]}"#).unwrap();
    run(dir.path(), &spec, &cfg, false);

    let app = dir.path().join("app");
    let widget_impl = app.join("services/biz/widget_service_impl.py");
    let gadget_impl = app.join("services/biz/gadget_service_impl.py");
    let edited = format!("{}
# calibrated by hand
", read(&gadget_impl));
    fs::write(&gadget_impl, &edited).unwrap();

    fs::write(&spec, GADGET_IN_BIZ).unwrap();
    run(dir.path(), &spec, &cfg, true);

    assert!(!app.join("models/biz/widget.py").exists());
    assert!(!app.join("services/biz/widget_service.py").exists());
    for kept in [
        "models/biz/gadget.py",
        "schemas/biz/gadget.py",
        "services/biz/gadget_service.py",
        "api/biz/gadget.py",
    ] {
        let path = app.join(kept);
        assert!(is_generated_file(&path), "{kept} should be regenerated");
    }
    assert!(app.join("models/biz").join(DIR_MARKER).exists());
    assert_eq!(read(&gadget_impl), edited);
    assert!(widget_impl.exists());
    assert!(read(&app.join("services/biz/gadget_service.py"))
        .contains("from .gadget_service_impl import GadgetServiceImpl"));
}

#[test]
fn test_second_spec_does_not_take_over_a_module_dir() {
    let dir = TempDir::new().unwrap();
    let gadgets = write_spec(dir.path(), "gadgets.json", GADGET_ONLY);
    let gizmos = write_spec(dir.path(), "gizmos.json", GIZMO_IN_SHOP);
    let cfg = GenConfig::default();

    run(dir.path(), &gadgets, &cfg, false);
    run(dir.path(), &gizmos, &cfg, false);

    let app = dir.path().join("app");
    let shop_models = app.join("models/shop");
    assert_eq!(dir_marker_origin(&shop_models), Some(spec_origin(&gadgets)));
    assert!(shop_models.join("gizmo.py").exists());

    run(dir.path(), &gizmos, &cfg, true);
    assert!(shop_models.join("gadget.py").exists());
    assert!(app.join("api/shop/gadget.py").exists());
    assert_eq!(dir_marker_origin(&shop_models), Some(spec_origin(&gadgets)));
}

#[test]
fn test_clean_leaves_other_specs_and_unmarked_dirs_alone() {
    let dir = TempDir::new().unwrap();
    let shop = write_spec(dir.path(), "shop.json", SHOP_SPEC);
    let gadgets = write_spec(dir.path(), "gadgets.json", GADGET_ONLY);
    let cfg = GenConfig::default();

    run(dir.path(), &gadgets, &cfg, false);
    let app = dir.path().join("app");
    let gadget_model = app.join("models/shop/gadget.py");
    let gadget_before = read(&gadget_model);

    // a hand-written module directory containing a file that looks generated
    let custom = app.join("models/custom");
    fs::create_dir_all(&custom).unwrap();
    fs::write(custom.join("thing.py"), "# generated - DO NOT EDIT\nx = 1\n").unwrap();
    let custom_before = snapshot(&custom);

    run(dir.path(), &shop, &cfg, true);

    assert_eq!(read(&gadget_model), gadget_before);
    assert!(app.join("models/shop").join(DIR_MARKER).exists());
    assert_eq!(snapshot(&custom), custom_before);
}

#[test]
fn test_plan_only_touches_marked_files() {
    let dir = TempDir::new().unwrap();
    let spec = write_spec(dir.path(), "shop.json", SHOP_SPEC);
    let cfg = GenConfig::default();
    run(dir.path(), &spec, &cfg, false);

    let layout = OutputLayout::new(dir.path(), &cfg);
    let notes = layout.models_dir.join("biz/notes.txt");
    fs::write(&notes, "remember the widgets\n").unwrap();

    let plan = plan_clean(&layout, &spec).unwrap();
    assert!(!plan.files.is_empty());
    for file in &plan.files {
        let is_marker = file.file_name().is_some_and(|n| n == DIR_MARKER);
        assert!(is_marker || is_generated_file(file), "{}", file.display());
    }
    assert!(!plan.files.contains(&notes));
    assert!(plan.foreign.is_empty());
}
