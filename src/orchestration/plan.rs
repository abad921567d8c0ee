//! Upload plan: the ordered list of package cycles for one run
//!
//! All path and name conventions of the nightly PPA are derived here and
//! nowhere else. They must stay bit-exact, the PPA and the export scripts
//! depend on them:
//!
//! - run directory: `<root>/<date>-<distro>`
//! - component staging directory: `<product>-nightly-<package>-<date>`
//! - main staging directory: `<product>-nightly-<date>`
//! - version: `<date>-0<product><revision>`
//! - changes file: `<product>-nightly[-<package>]_<version>_source.changes`

use crate::core::config::UploadConfig;
use crate::core::context::BuildContext;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Whether a package is a component or the application itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    Component,
    Main,
}

/// One entry of the package table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageSpec {
    pub name: String,
    pub kind: PackageKind,
}

impl PackageSpec {
    pub fn component(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PackageKind::Component,
        }
    }

    pub fn main(product: impl Into<String>) -> Self {
        Self {
            name: product.into(),
            kind: PackageKind::Main,
        }
    }

    /// Source package name as uploaded to the PPA
    pub fn source_name(&self, product: &str) -> String {
        match self.kind {
            PackageKind::Component => format!("{}-nightly-{}", product, self.name),
            PackageKind::Main => format!("{}-nightly", product),
        }
    }

    pub fn staging_dir_name(&self, product: &str, date: &str) -> String {
        format!("{}-{}", self.source_name(product), date)
    }

    pub fn changes_file_name(&self, product: &str, version: &str) -> String {
        format!("{}_{}_source.changes", self.source_name(product), version)
    }

    /// Directory under the packaging dir holding this package's `debian/` tree
    pub fn packaging_dir_name(&self) -> String {
        format!("{}-debian", self.name)
    }
}

pub fn version_string(product: &str, date: &str, revision: u32) -> String {
    format!("{}-0{}{}", date, product, revision)
}

pub fn run_dir_name(date: &str, distro: &str) -> String {
    format!("{}-{}", date, distro)
}

/// Everything one cycle needs, fully resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedCycle {
    pub package: PackageSpec,
    pub staging_dir: PathBuf,
    pub packaging_source: PathBuf,
    pub version: String,
    pub changes_file: PathBuf,
    /// Binary package to wait for; the main package is not waited for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_url: Option<String>,
}

/// Ordered cycles for a run: selected components in table order, then the main package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadPlan {
    pub run_dir: PathBuf,
    pub cycles: Vec<PlannedCycle>,
    /// Selected names that are not in the package table
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored: Vec<String>,
}

impl UploadPlan {
    pub fn build(config: &UploadConfig, context: &BuildContext, selected: &[String]) -> Self {
        let run_dir = context
            .root_dir
            .join(run_dir_name(&context.date, &config.distro));
        let version = version_string(&config.product, &context.date, context.revision);

        let mut cycles: Vec<PlannedCycle> = config
            .packages
            .iter()
            .filter(|name| selected.contains(*name))
            .map(|name| {
                let spec = PackageSpec::component(name.clone());
                let url = format!(
                    "{}-{}/{}_{}_{}.deb",
                    config.archive_base,
                    spec.name,
                    spec.source_name(&config.product),
                    version,
                    config.artifact_arch
                );
                Self::cycle(config, context, &run_dir, &version, spec, Some(url))
            })
            .collect();

        cycles.push(Self::cycle(
            config,
            context,
            &run_dir,
            &version,
            PackageSpec::main(config.product.clone()),
            None,
        ));

        let ignored = selected
            .iter()
            .filter(|name| **name != config.product && !config.packages.contains(*name))
            .cloned()
            .collect();

        Self {
            run_dir,
            cycles,
            ignored,
        }
    }

    fn cycle(
        config: &UploadConfig,
        context: &BuildContext,
        run_dir: &std::path::Path,
        version: &str,
        package: PackageSpec,
        availability_url: Option<String>,
    ) -> PlannedCycle {
        PlannedCycle {
            staging_dir: run_dir.join(package.staging_dir_name(&config.product, &context.date)),
            packaging_source: context.packaging_dir.join(package.packaging_dir_name()),
            version: version.to_string(),
            changes_file: run_dir.join(package.changes_file_name(&config.product, version)),
            availability_url,
            package,
        }
    }

    /// Human-readable listing for the `plan` command
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Run directory: {}", self.run_dir.display());

        for (index, cycle) in self.cycles.iter().enumerate() {
            let _ = writeln!(out, "\n{}. {}", index + 1, cycle.package.name);
            let _ = writeln!(out, "   staging:   {}", cycle.staging_dir.display());
            let _ = writeln!(out, "   packaging: {}", cycle.packaging_source.display());
            let _ = writeln!(out, "   version:   {}", cycle.version);
            let _ = writeln!(out, "   changes:   {}", cycle.changes_file.display());
            match &cycle.availability_url {
                Some(url) => {
                    let _ = writeln!(out, "   wait for:  {}", url);
                }
                None => {
                    let _ = writeln!(out, "   wait for:  (not polled)");
                }
            }
        }

        if !self.ignored.is_empty() {
            let _ = writeln!(out, "\nIgnored (unknown packages): {}", self.ignored.join(", "));
        }

        out
    }
}
