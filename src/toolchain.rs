//! Per-language indexer toolchain table
//!
//! Maps each `Language` to the external SCIP indexer that produces its index
//! artifact: the binary to invoke, the host tools it needs at runtime, how to
//! install it, and whether it requires a build-configuration manifest.

use crate::language::Language;

/// How an indexer tool is installed when missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallMethod {
    /// Global npm package providing the indexer binary.
    Npm { package: &'static str },
    /// `go install <module>@latest` into the shared bin dir via GOBIN.
    GoInstall { module: &'static str },
    /// Rustup-managed toolchain component.
    RustupComponent { component: &'static str },
    /// .NET global tool; falls back to building from source when no
    /// prebuilt package matches the host runtime.
    DotnetTool {
        package: &'static str,
        source_repo: &'static str,
    },
    /// Standalone binary fetched from a release URL. `{os}` and `{arch}`
    /// are substituted with the host platform.
    BinaryRelease { url_template: &'static str },
}

/// Build-configuration manifest an indexer requires in the codebase root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    /// `tsconfig.json` for scip-typescript on TypeScript projects.
    TsConfig,
    /// `jsconfig.json` for scip-typescript on plain JavaScript projects.
    JsConfig,
    /// `compile_commands.json` compilation database for scip-clang.
    CompileCommands,
}

impl ManifestKind {
    /// File name of the manifest in the codebase root.
    pub fn file_name(&self) -> &'static str {
        match self {
            ManifestKind::TsConfig => "tsconfig.json",
            ManifestKind::JsConfig => "jsconfig.json",
            ManifestKind::CompileCommands => "compile_commands.json",
        }
    }
}

/// Static description of one language's indexer toolchain.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// Indexer binary name as found on disk.
    pub tool: &'static str,
    /// Host tools that must be present to run the indexer (beyond the
    /// indexer binary itself).
    pub runtime: &'static [&'static str],
    /// Installation strategy for the indexer binary.
    pub install: InstallMethod,
    /// Manifest the indexer requires, if any.
    pub manifest: Option<ManifestKind>,
}

impl Language {
    /// The indexer toolchain for this language.
    pub fn tool_spec(&self) -> ToolSpec {
        match self {
            Language::Python => ToolSpec {
                tool: "scip-python",
                runtime: &["node"],
                install: InstallMethod::Npm {
                    package: "@sourcegraph/scip-python",
                },
                manifest: None,
            },
            Language::JavaScript => ToolSpec {
                tool: "scip-typescript",
                runtime: &["node"],
                install: InstallMethod::Npm {
                    package: "@sourcegraph/scip-typescript",
                },
                manifest: Some(ManifestKind::JsConfig),
            },
            Language::TypeScript => ToolSpec {
                tool: "scip-typescript",
                runtime: &["node"],
                install: InstallMethod::Npm {
                    package: "@sourcegraph/scip-typescript",
                },
                manifest: Some(ManifestKind::TsConfig),
            },
            Language::Go => ToolSpec {
                tool: "scip-go",
                runtime: &["go"],
                install: InstallMethod::GoInstall {
                    module: "github.com/sourcegraph/scip-go/cmd/scip-go",
                },
                manifest: None,
            },
            Language::Rust => ToolSpec {
                tool: "rust-analyzer",
                runtime: &["cargo"],
                install: InstallMethod::RustupComponent {
                    component: "rust-analyzer",
                },
                manifest: None,
            },
            Language::CSharp => ToolSpec {
                tool: "scip-dotnet",
                runtime: &["dotnet"],
                install: InstallMethod::DotnetTool {
                    package: "scip-dotnet",
                    source_repo: "https://github.com/sourcegraph/scip-dotnet",
                },
                manifest: None,
            },
            Language::Cpp => ToolSpec {
                tool: "scip-clang",
                runtime: &[],
                install: InstallMethod::BinaryRelease {
                    url_template:
                        "https://github.com/sourcegraph/scip-clang/releases/latest/download/scip-clang-{arch}-{os}",
                },
                manifest: Some(ManifestKind::CompileCommands),
            },
        }
    }
}
