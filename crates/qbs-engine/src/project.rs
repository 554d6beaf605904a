use qbs_types::OperationResult;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

static NULL: Value = Value::Null;

/// Snapshot of one resolve.
///
/// Each successful resolve produces a new model; the old one is dropped, never
/// patched. The only mutation is attaching the build-system file list, which
/// the tool may send separately from the project data.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectModel {
    data: Value,
}

impl ProjectModel {
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    /// Model for a successful `project-resolved` result, `None` if it carried no data.
    pub fn from_resolved(result: &OperationResult) -> Option<Self> {
        let mut model = Self::new(result.project_data.clone()?);
        if let Some(files) = &result.build_system_files {
            model.set_build_system_files(files.clone());
        }
        Some(model)
    }

    pub fn root(&self) -> Project<'_> {
        Project::new(&self.data)
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.root().is_empty()
    }

    pub fn set_build_system_files(&mut self, files: Value) {
        if let Value::Object(obj) = &mut self.data {
            obj.insert("build-system-files".to_string(), files);
        }
    }

    pub fn build_system_files(&self) -> Vec<&str> {
        string_items(self.data.get("build-system-files"))
    }

    /// Locate the product and group that own `file`.
    pub fn find_source(&self, file: &Path) -> Option<SourceContext<'_>> {
        find_in_project(self.root(), file)
    }
}

fn find_in_project<'a>(project: Project<'a>, file: &Path) -> Option<SourceContext<'a>> {
    for product in project.products() {
        for group in product.groups() {
            let artifact = group
                .source_artifacts()
                .into_iter()
                .chain(group.source_wildcards_artifacts())
                .find(|artifact| Path::new(artifact.file_path()) == file);
            if let Some(artifact) = artifact {
                return Some(SourceContext {
                    product,
                    group,
                    artifact,
                });
            }
        }
    }
    project
        .sub_projects()
        .into_iter()
        .find_map(|sub| find_in_project(sub, file))
}

/// Product/group/artifact triple owning a source file
#[derive(Debug, Clone, Copy)]
pub struct SourceContext<'a> {
    pub product: Product<'a>,
    pub group: Group<'a>,
    pub artifact: SourceArtifact<'a>,
}

/// Where a node is defined in the project files.
///
/// Absent data yields "" and -1 rather than an error.
#[derive(Debug, Clone, Copy)]
pub struct Location<'a> {
    data: &'a Value,
}

impl<'a> Location<'a> {
    fn new(data: Option<&'a Value>) -> Self {
        Self {
            data: data.unwrap_or(&NULL),
        }
    }

    pub fn file_path(&self) -> &'a str {
        str_at(self.data, "file-path")
    }

    pub fn file_name(&self) -> &'a str {
        file_name_of(self.file_path())
    }

    pub fn line(&self) -> i64 {
        int_at(self.data, "line")
    }

    pub fn column(&self) -> i64 {
        int_at(self.data, "column")
    }

    pub fn is_valid(&self) -> bool {
        !self.file_path().is_empty()
    }

    pub fn id(&self) -> String {
        format!("{}:{}:{}", self.file_path(), self.line(), self.column())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Project<'a> {
    data: &'a Value,
}

impl<'a> Project<'a> {
    pub fn new(data: &'a Value) -> Self {
        Self { data }
    }

    /// Projects are identified by their build directory
    pub fn id(&self) -> &'a str {
        self.build_directory()
    }

    pub fn name(&self) -> &'a str {
        str_at(self.data, "name")
    }

    pub fn build_directory(&self) -> &'a str {
        str_at(self.data, "build-directory")
    }

    pub fn location(&self) -> Location<'a> {
        Location::new(self.data.get("location"))
    }

    pub fn is_empty(&self) -> bool {
        !self.data.is_object()
    }

    pub fn products(&self) -> Vec<Product<'a>> {
        items(self.data.get("products")).map(Product::new).collect()
    }

    pub fn sub_projects(&self) -> Vec<Project<'a>> {
        items(self.data.get("sub-projects"))
            .map(Project::new)
            .collect()
    }

    pub fn data(&self) -> &'a Value {
        self.data
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Product<'a> {
    data: &'a Value,
}

impl<'a> Product<'a> {
    pub fn new(data: &'a Value) -> Self {
        Self { data }
    }

    pub fn id(&self) -> &'a str {
        self.build_directory()
    }

    pub fn name(&self) -> &'a str {
        match self.data {
            Value::String(name) => name,
            _ => str_at(self.data, "name"),
        }
    }

    pub fn full_display_name(&self) -> &'a str {
        match self.data {
            Value::String(name) => name,
            _ => str_at(self.data, "full-display-name"),
        }
    }

    pub fn build_directory(&self) -> &'a str {
        str_at(self.data, "build-directory")
    }

    pub fn location(&self) -> Location<'a> {
        Location::new(self.data.get("location"))
    }

    pub fn target_executable(&self) -> Option<&'a str> {
        Some(str_at(self.data, "target-executable")).filter(|s| !s.is_empty())
    }

    pub fn is_runnable(&self) -> bool {
        bool_at(self.data, "is-runnable")
    }

    pub fn is_enabled(&self) -> bool {
        bool_at(self.data, "is-enabled")
    }

    pub fn module_properties(&self) -> Option<&'a Value> {
        self.data.get("module-properties").filter(|v| v.is_object())
    }

    /// True for placeholders: a bare product name sent before full data arrives.
    pub fn is_empty(&self) -> bool {
        !self.data.is_object()
    }

    pub fn groups(&self) -> Vec<Group<'a>> {
        items(self.data.get("groups")).map(Group::new).collect()
    }

    pub fn data(&self) -> &'a Value {
        self.data
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Group<'a> {
    data: &'a Value,
}

impl<'a> Group<'a> {
    pub fn new(data: &'a Value) -> Self {
        Self { data }
    }

    pub fn id(&self) -> &'a str {
        self.name()
    }

    pub fn name(&self) -> &'a str {
        str_at(self.data, "name")
    }

    pub fn location(&self) -> Location<'a> {
        Location::new(self.data.get("location"))
    }

    pub fn module_properties(&self) -> Option<&'a Value> {
        self.data.get("module-properties").filter(|v| v.is_object())
    }

    pub fn source_artifacts(&self) -> Vec<SourceArtifact<'a>> {
        items(self.data.get("source-artifacts"))
            .map(SourceArtifact::new)
            .collect()
    }

    pub fn source_wildcards_artifacts(&self) -> Vec<SourceArtifact<'a>> {
        items(self.data.get("source-artifacts-from-wildcards"))
            .map(SourceArtifact::new)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.source_artifacts().is_empty() && self.source_wildcards_artifacts().is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SourceArtifact<'a> {
    data: &'a Value,
}

impl<'a> SourceArtifact<'a> {
    pub fn new(data: &'a Value) -> Self {
        Self { data }
    }

    pub fn id(&self) -> &'a str {
        self.file_path()
    }

    pub fn file_path(&self) -> &'a str {
        str_at(self.data, "file-path")
    }

    pub fn file_name(&self) -> &'a str {
        file_name_of(self.file_path())
    }

    pub fn file_tags(&self) -> Vec<&'a str> {
        string_items(self.data.get("file-tags"))
    }
}

/// Enabled product usable as a run or debug target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunnableProduct {
    pub full_display_name: String,
    pub target_executable: Option<String>,
}

/// Every enabled product in `project` and its sub-projects, depth first.
pub fn enumerate_products(project: Project<'_>) -> Vec<RunnableProduct> {
    let mut out = Vec::new();
    collect_products(project, &mut out);
    out
}

fn collect_products(project: Project<'_>, out: &mut Vec<RunnableProduct>) {
    for product in project.products() {
        if product.is_enabled() {
            out.push(RunnableProduct {
                full_display_name: product.full_display_name().to_string(),
                target_executable: product.target_executable().map(str::to_string),
            });
        }
    }
    for sub in project.sub_projects() {
        collect_products(sub, out);
    }
}

fn items(value: Option<&Value>) -> impl Iterator<Item = &Value> {
    value.and_then(Value::as_array).into_iter().flatten()
}

fn string_items(value: Option<&Value>) -> Vec<&str> {
    match value {
        Some(Value::String(s)) => vec![s.as_str()],
        _ => items(value).filter_map(Value::as_str).collect(),
    }
}

fn str_at<'a>(data: &'a Value, key: &str) -> &'a str {
    data.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn bool_at(data: &Value, key: &str) -> bool {
    data.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn int_at(data: &Value, key: &str) -> i64 {
    match data.get(key) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(-1),
        Some(Value::String(s)) => s.parse().unwrap_or(-1),
        _ => -1,
    }
}

fn file_name_of(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
