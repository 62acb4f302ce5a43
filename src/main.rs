//! CRT shader check
//!
//! Builds the full shader set on a headless GPU from the user's config and
//! reports what was built. With `--watch`, keeps running and rebuilds the
//! postprocess chain whenever the config or a shader file changes.
//!
//! ```sh
//! crt-shadercheck [--config PATH] [--watch]
//! ```

mod gpu;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use crt_config::{Config, ShaderEvent, ShaderWatcher};
use crt_shaders::{FrameFlags, GpuPipeline, ShaderSet, Uniforms, WgpuCompiler};
use gpu::HeadlessGpu;

const USAGE: &str = "usage: crt-shadercheck [--config PATH] [--watch]";

/// Command line options
#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    watch: bool,
    help: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().context("--config needs a path")?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--watch" | "-w" => parsed.watch = true,
            "--help" | "-h" => parsed.help = true,
            other => bail!("unknown argument {other:?}\n{USAGE}"),
        }
    }
    Ok(parsed)
}

/// Attachment format the pipelines are built for
fn target_format(config: &Config) -> wgpu::TextureFormat {
    if config.shaders.linear_blending {
        wgpu::TextureFormat::Bgra8UnormSrgb
    } else {
        wgpu::TextureFormat::Bgra8Unorm
    }
}

/// Per-frame uniforms seeded from the config
fn base_uniforms(config: &Config) -> Uniforms {
    let mut uniforms = Uniforms::default();
    uniforms.min_contrast = config.shaders.clamped_min_contrast();
    uniforms
        .flags
        .set(FrameFlags::LINEAR_BLENDING, config.shaders.linear_blending);
    uniforms
}

fn load_config(path: Option<&Path>) -> Result<(Config, PathBuf)> {
    match path {
        Some(path) => {
            let config = Config::load_from(path)?;
            Ok((config, path.to_path_buf()))
        }
        None => Ok((Config::load()?, Config::config_file_path()?)),
    }
}

fn report(shaders: &ShaderSet<GpuPipeline>) {
    let built = [shaders.text(), shaders.background(), shaders.image()]
        .iter()
        .filter(|p| p.is_some())
        .count();
    println!("built-in pipelines: {built}/3");
    println!("postprocess stages: {}", shaders.postprocess().len());
}

fn main() -> Result<()> {
    env_logger::init();

    let args = parse_args(std::env::args().skip(1))?;
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    let (config, config_path) = load_config(args.config.as_deref())?;
    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let sources = config.load_postprocess_chain(&base_dir);
    log::info!(
        "{} of {} configured postprocess shaders loaded",
        sources.len(),
        config.shaders.postprocess.len()
    );

    let gpu = HeadlessGpu::new()?;
    log::info!("Using adapter {}", gpu.adapter.get_info().name);

    let format = target_format(&config);
    let compiler = WgpuCompiler::new(gpu.device.clone(), format);
    let mut shaders =
        ShaderSet::new(&compiler, &sources).context("Failed to build built-in pipelines")?;

    let uniforms = base_uniforms(&config);
    println!("target format: {format:?}");
    println!(
        "uniforms: {} bytes, min contrast {}, flags {:#06b}",
        uniforms.as_bytes().len(),
        uniforms.min_contrast,
        uniforms.flags.bits()
    );
    report(&shaders);

    if args.watch {
        let watcher = ShaderWatcher::new(config_path, &config)?;
        println!("watching for shader changes, Ctrl-C to stop");
        loop {
            let Some(event) = watcher.recv_timeout(Duration::from_secs(1)) else {
                continue;
            };
            match event {
                ShaderEvent::PostprocessChanged(sources) => {
                    shaders.replace_postprocess(&compiler, &sources);
                    report(&shaders);
                }
                ShaderEvent::ConfigReloaded(config) => {
                    if target_format(&config) != compiler.target_format() {
                        log::warn!("linear_blending changed, restart to rebuild built-in pipelines");
                    }
                }
                ShaderEvent::ReloadError(e) => log::warn!("Reload failed: {e}"),
            }
        }
    }

    shaders.deinit();
    Ok(())
}
