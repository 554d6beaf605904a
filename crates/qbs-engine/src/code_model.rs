use serde::Serialize;
use std::path::Path;

use crate::project::ProjectModel;
use crate::toolchain::{
    CompilerProperties, IntelliSenseMode, LanguageStandard, intellisense_mode, language_standard,
};

/// Everything a code-completion provider needs to parse one source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceConfiguration {
    pub include_paths: Vec<String>,
    pub defines: Vec<String>,
    pub compiler_path: String,
    pub prefix_headers: Vec<String>,
    pub standard: LanguageStandard,
    pub intellisense_mode: IntelliSenseMode,
}

/// Configuration for `file`, or `None` when no product in the model lists it.
///
/// Group properties take precedence over the product's.
pub fn source_configuration(model: &ProjectModel, file: &Path) -> Option<SourceConfiguration> {
    let context = model.find_source(file)?;
    let props = context
        .group
        .module_properties()
        .or_else(|| context.product.module_properties())
        .map(CompilerProperties::from_value);
    let tags = context.artifact.file_tags();

    Some(match props {
        Some(props) => SourceConfiguration {
            include_paths: props.all_include_paths(),
            defines: props.defines.clone(),
            compiler_path: props.compiler_path.clone(),
            prefix_headers: props.prefix_headers.clone(),
            standard: language_standard(Some(&props), &tags),
            intellisense_mode: intellisense_mode(Some(&props)),
        },
        None => SourceConfiguration {
            include_paths: Vec::new(),
            defines: Vec::new(),
            compiler_path: String::new(),
            prefix_headers: Vec::new(),
            standard: language_standard(None, &tags),
            intellisense_mode: intellisense_mode(None),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model() -> ProjectModel {
        ProjectModel::new(json!({
            "name": "root",
            "products": [{
                "name": "app",
                "module-properties": {
                    "qbs.toolchain": ["gcc"],
                    "qbs.architecture": "x86_64",
                    "cpp.compilerVersionMajor": 12,
                    "cpp.defines": ["PRODUCT"]
                },
                "groups": [
                    {
                        "name": "sources",
                        "source-artifacts": [{ "file-path": "/p/main.cpp", "file-tags": ["cpp"] }]
                    },
                    {
                        "name": "legacy",
                        "module-properties": {
                            "qbs.toolchain": ["gcc"],
                            "qbs.architecture": "x86_64",
                            "cpp.cLanguageVersion": ["c99"],
                            "cpp.defines": ["LEGACY"]
                        },
                        "source-artifacts-from-wildcards": [{ "file-path": "/p/old.c", "file-tags": ["c"] }]
                    }
                ]
            }],
            "sub-projects": [{
                "name": "tools",
                "products": [{
                    "name": "gen",
                    "groups": [{ "name": "g", "source-artifacts": [{ "file-path": "/p/tools/gen.cpp", "file-tags": "cpp" }] }]
                }]
            }]
        }))
    }

    #[test]
    fn test_product_properties_apply_to_plain_group() {
        let config = source_configuration(&model(), Path::new("/p/main.cpp")).unwrap();
        assert_eq!(config.defines, vec!["PRODUCT"]);
        assert_eq!(config.standard, LanguageStandard::Cxx17);
        assert_eq!(config.intellisense_mode, IntelliSenseMode::GccX64);
    }

    #[test]
    fn test_group_properties_override_product() {
        let config = source_configuration(&model(), Path::new("/p/old.c")).unwrap();
        assert_eq!(config.defines, vec!["LEGACY"]);
        assert_eq!(config.standard, LanguageStandard::C99);
    }

    #[test]
    fn test_sub_project_source_without_properties() {
        let config = source_configuration(&model(), Path::new("/p/tools/gen.cpp")).unwrap();
        assert!(config.include_paths.is_empty());
        assert_eq!(config.standard, LanguageStandard::Cxx03);
        assert_eq!(config.intellisense_mode, IntelliSenseMode::GccX86);
    }

    #[test]
    fn test_unknown_file() {
        assert!(source_configuration(&model(), Path::new("/elsewhere.cpp")).is_none());
    }
}
