//! Hand-assembled `tar.gz` distribution.
//!
//! Copies the compiled binary and a generated README into a fresh staging
//! directory and archives it. The bundler is not involved.

use crate::bundler::BuildTarget;
use crate::bundler::platform::BuildContext;
use crate::bundler::utils::fs;
use crate::error::{BuildError, ErrorExt, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use handlebars::Handlebars;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const README_TEMPLATE: &str = r#"# {{product_name}} {{version}}

Build {{build_number}} for Linux {{arch}} ({{toolchain_triple}}), packaged {{date}}.

## Running

```sh
./{{binary_name}}
```

## Runtime dependencies

- webkit2gtk 4.1 (`libwebkit2gtk-4.1-0`)
- GTK 3 (`libgtk-3-0`)
- librsvg (`librsvg2-2`)

On Debian and Ubuntu:

```sh
sudo apt install libwebkit2gtk-4.1-0 libgtk-3-0 librsvg2-2
```
"#;

/// `<product>_<version>_<arch>`, the archive stem and its top-level directory.
pub fn archive_stem<R>(ctx: &BuildContext<'_, R>, target: &BuildTarget) -> String {
    format!(
        "{}_{}_{}",
        ctx.config.targets.product_name, ctx.config.version.current, target.arch
    )
}

/// Builds the archive under `<bundle>/tar.gz/` and returns its path.
///
/// The staging directory is removed whether or not archiving succeeded.
pub async fn build_tarball<R>(
    ctx: &BuildContext<'_, R>,
    target: &BuildTarget,
    binary: &Path,
) -> Result<PathBuf> {
    let stem = archive_stem(ctx, target);
    let out_dir = ctx.layout.bundle_root(target.toolchain_triple).join("tar.gz");
    let staging = out_dir.join(format!(".staging-{}", uuid::Uuid::new_v4()));
    let archive = out_dir.join(format!("{stem}.tar.gz"));

    let outcome = assemble(ctx, target, binary, &staging, &stem, &archive).await;
    if let Err(e) = fs::remove_dir_all(&staging).await {
        log::warn!("Failed to remove staging directory {}: {}", staging.display(), e);
    }
    outcome?;

    log::debug!("Created {}", archive.display());
    Ok(archive)
}

async fn assemble<R>(
    ctx: &BuildContext<'_, R>,
    target: &BuildTarget,
    binary: &Path,
    staging: &Path,
    stem: &str,
    archive: &Path,
) -> Result<()> {
    let content = staging.join(stem);
    fs::create_dir_all(&content, true).await?;

    fs::copy_file(binary, &content.join(&ctx.config.targets.binary_name)).await?;

    let readme = content.join("README.md");
    tokio::fs::write(&readme, render_readme(ctx, target)?)
        .await
        .fs_context("writing README", &readme)?;

    let content = content.clone();
    let stem = stem.to_string();
    let archive = archive.to_path_buf();
    tokio::task::spawn_blocking(move || write_archive(&content, &stem, &archive))
        .await
        .map_err(|e| BuildError::Other(anyhow::anyhow!("Archive task panicked: {e}")))?
}

fn write_archive(content: &Path, stem: &str, archive: &Path) -> Result<()> {
    let file = std::fs::File::create(archive).fs_context("creating archive", archive)?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder
        .append_dir_all(stem, content)
        .fs_context("adding files to archive", content)?;
    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .fs_context("finishing archive", archive)?;
    Ok(())
}

fn render_readme<R>(ctx: &BuildContext<'_, R>, target: &BuildTarget) -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    let mut data = BTreeMap::new();
    data.insert("product_name", ctx.config.targets.product_name.clone());
    data.insert("binary_name", ctx.config.targets.binary_name.clone());
    data.insert("version", ctx.config.version.current.clone());
    data.insert("build_number", ctx.config.version.build_number.clone());
    data.insert("arch", target.arch.to_string());
    data.insert("toolchain_triple", target.toolchain_triple.to_string());
    data.insert("date", chrono::Local::now().format("%Y-%m-%d").to_string());

    handlebars
        .register_template_string("README.md", README_TEMPLATE)
        .map_err(|e| anyhow::anyhow!("failed to register README template: {e}"))?;
    let rendered = handlebars
        .render("README.md", &data)
        .map_err(|e| anyhow::anyhow!("failed to render README template: {e}"))?;
    Ok(rendered)
}
