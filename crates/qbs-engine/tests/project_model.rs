use qbs_engine::{
    IntelliSenseMode, LanguageStandard, ProjectModel, RunnableProduct, enumerate_products,
    source_configuration,
};
use std::fs;
use std::path::Path;

fn load_model(fixture_name: &str) -> ProjectModel {
    let path = Path::new("tests/fixtures").join(fixture_name);
    let content = fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("Failed to read fixture: {}", path.display()));
    let data = serde_json::from_str(&content)
        .unwrap_or_else(|_| panic!("Failed to parse fixture: {}", path.display()));
    ProjectModel::new(data)
}

#[test]
fn test_tree_navigation() {
    let model = load_model("resolved_project.json");
    let root = model.root();

    assert_eq!(root.name(), "demo");
    assert_eq!(root.id(), "/work/demo/build/gcc-debug");
    assert_eq!(root.products().len(), 2);
    assert_eq!(root.sub_projects().len(), 1);

    let app = root.products()[0];
    assert!(!app.is_empty());
    assert!(app.is_runnable());
    assert_eq!(app.location().line(), 3);

    let groups = app.groups();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].id(), "app");
    assert_eq!(groups[0].source_artifacts().len(), 2);
    assert!(groups[0].source_wildcards_artifacts().is_empty());
    assert_eq!(groups[1].source_wildcards_artifacts()[0].file_name(), "table.c");

    let docs = root.products()[1];
    assert!(docs.groups().is_empty());
    assert!(docs.target_executable().is_none());
}

#[test]
fn test_placeholder_products_are_distinguished() {
    let model = load_model("resolved_project.json");
    let libs = model.root().sub_projects()[0];
    let products = libs.products();

    assert_eq!(products.len(), 2);
    assert!(!products[0].is_empty());
    assert!(products[1].is_empty());
    assert_eq!(products[1].name(), "pending");
}

#[test]
fn test_enumerate_enabled_products() {
    let model = load_model("resolved_project.json");
    let products = enumerate_products(model.root());

    assert_eq!(
        products,
        vec![
            RunnableProduct {
                full_display_name: "app".to_string(),
                target_executable: Some(
                    "/work/demo/build/gcc-debug/install-root/usr/local/bin/app".to_string()
                ),
            },
            RunnableProduct {
                full_display_name: "core {profile: gcc}".to_string(),
                target_executable: None,
            },
        ]
    );
}

#[test]
fn test_build_system_files() {
    let model = load_model("resolved_project.json");
    assert_eq!(model.build_system_files().len(), 3);
}

#[test]
fn test_source_configurations() {
    let model = load_model("resolved_project.json");

    let main = source_configuration(&model, Path::new("/work/demo/app/main.cpp")).unwrap();
    assert_eq!(main.standard, LanguageStandard::Cxx14);
    assert_eq!(main.intellisense_mode, IntelliSenseMode::GccX64);
    assert_eq!(main.compiler_path, "/usr/bin/g++");
    assert_eq!(
        main.include_paths,
        vec!["/usr/include/c++/9", "/work/demo/lib/include"]
    );

    let table = source_configuration(&model, Path::new("/work/demo/app/gen/table.c")).unwrap();
    assert_eq!(table.standard, LanguageStandard::C11);

    let core = source_configuration(&model, Path::new("/work/demo/lib/core.cpp")).unwrap();
    assert_eq!(core.standard, LanguageStandard::Cxx20);
    assert_eq!(core.intellisense_mode, IntelliSenseMode::ClangArm64);

    let json = serde_json::to_value(&core).unwrap();
    assert_eq!(json["standard"], "c++20");
    assert_eq!(json["intellisense_mode"], "clang-arm64");
}
