//! File name vocabularies used to pick candidate files
//!
//! Matching is exact membership of the lower-cased file name. Names that
//! are not listed are skipped, including unusual manifest names and
//! casing variants of known extensions.

use crate::types::FileCategory;

/// README file names
pub const README_NAMES: &[&str] = &[
    "readme.md",
    "readme.markdown",
    "readme.txt",
    "readme",
    "readme.rst",
    "readme.html",
    "readme.adoc",
    "readme.asciidoc",
];

/// License file names
pub const LICENSE_NAMES: &[&str] = &[
    "license.md",
    "license.txt",
    "license",
    "license.rst",
    "copying",
    "copying.txt",
    "copying.md",
    "unlicense",
    "licence",
    "licence.txt",
    "licence.md",
];

/// Dependency manifests, build files and version pinning files
pub const DEPENDENCY_NAMES: &[&str] = &[
    "requirements.txt",
    "pipfile",
    "pyproject.toml",
    "setup.py",
    "gemfile",
    "package.json",
    "pom.xml",
    "build.gradle",
    "go.mod",
    "composer.json",
    "cargo.toml",
    "vcpkg.json",
    "conanfile.txt",
    "cmakelists.txt",
    "spack.yaml",
    ".csproj",
    "packages.config",
    "package.swift",
    "podfile",
    "pubspec.yaml",
    "description",
    "mix.exs",
    "install.sh",
    "bootstrap.sh",
    "cpanfile",
    "makefile.pl",
    "build.pl",
    "stack.yaml",
    "cabal.project",
    "rebar.config",
    "project.toml",
    "manifest.toml",
    "build.sbt",
    ".gemspec",
    ".npmrc",
    ".yarnrc",
    ".python-version",
    "bower.json",
    ".bowerrc",
    ".ruby-version",
    ".nvmrc",
    ".tool-versions",
    "shard.yml",
    "deno.json",
    "deno.jsonc",
    "tsconfig.json",
    "lerna.json",
    "gradle.properties",
    "build.boot",
    "cartfile",
    "cartfile.resolved",
    "packages.swift",
    "default.nix",
    "workspace",
    "build.bazel",
];

/// Citation and bibliography files
pub const CITATION_NAMES: &[&str] = &[
    "citation.cff",
    "citation",
    "citation.bib",
    "bibtex.bib",
    "references.bib",
    "references.json",
    "references.yaml",
    "references.ris",
    "export.ris",
    "manuscript.bib",
    "library.bib",
    "sources.bib",
    ".bib",
    ".ris",
    "endnote.xml",
    "refman.txt",
    "scopus.bib",
    "wos.bib",
    "pubmed.xml",
];

/// Returns true if the file name is a known README name
pub fn is_readme_name(name: &str) -> bool {
    README_NAMES.contains(&name.to_lowercase().as_str())
}

/// Returns true if the file name is a known dependency manifest
pub fn is_dependency_name(name: &str) -> bool {
    DEPENDENCY_NAMES.contains(&name.to_lowercase().as_str())
}

/// Classify a file name into a category
///
/// Categories are checked in the order readme, license, dependency,
/// citation; the first vocabulary containing the name wins.
pub fn classify(name: &str) -> Option<FileCategory> {
    let lower = name.to_lowercase();
    let lower = lower.as_str();

    if README_NAMES.contains(&lower) {
        Some(FileCategory::Readme)
    } else if LICENSE_NAMES.contains(&lower) {
        Some(FileCategory::License)
    } else if DEPENDENCY_NAMES.contains(&lower) {
        Some(FileCategory::Dependency)
    } else if CITATION_NAMES.contains(&lower) {
        Some(FileCategory::Citation)
    } else {
        None
    }
}
