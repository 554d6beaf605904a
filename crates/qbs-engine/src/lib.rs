pub mod code_model;
pub mod project;
pub mod toolchain;

pub use code_model::{SourceConfiguration, source_configuration};
pub use project::{
    Group, Location, Product, Project, ProjectModel, RunnableProduct, SourceArtifact,
    SourceContext, enumerate_products,
};
pub use toolchain::{
    CompilerProperties, IntelliSenseMode, LanguageStandard, ToolchainFamily, intellisense_mode,
    language_standard,
};
