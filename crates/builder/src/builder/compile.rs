//! Application compile and link.

use super::flags;
use super::process::{Invocation, ToolRunner};
use super::{BuildConfig, BuildError};
use anyhow::Result;
use std::path::Path;

/// Select the DLL C runtime and keep the static one out of the link, so the
/// executable and the engine library agree on a single runtime.
pub const RUNTIME_FLAGS: &[&str] = &["-fms-runtime-lib=dll", "-Wl,-nodefaultlib:libcmt"];

/// Path as a compiler argument, with forward slashes.
pub fn path_arg(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Compiler arguments in link order: base flags, variant flags, source,
/// engine library, runtime flags, output.
pub fn compiler_args(config: &BuildConfig) -> Result<Vec<String>, BuildError> {
    let mut args = flags::split(&config.flags)?;
    args.extend(
        config
            .variant
            .compiler_flags()
            .iter()
            .map(ToString::to_string),
    );
    args.push(path_arg(&config.root.join(&config.project.project.source)));
    args.push(format!("-l{}", path_arg(&config.artifact_path())));
    args.extend(RUNTIME_FLAGS.iter().map(ToString::to_string));
    args.push(format!("--output={}", path_arg(&config.exe_path())));
    Ok(args)
}

pub fn invocation(config: &BuildConfig) -> Result<Invocation, BuildError> {
    Ok(Invocation::new(&config.project.compiler.program, &config.root).args(compiler_args(config)?))
}

/// Compile the application and report how long the compiler took.
pub fn build(config: &BuildConfig, runner: &dyn ToolRunner) -> Result<()> {
    let invocation = invocation(config)?;
    log::info!("{}", invocation.command_line());

    println!("Starting project build...");
    let output = runner.run(&invocation)?;
    println!(
        "Finished project build in {:.3} seconds.",
        output.duration.as_secs_f64()
    );

    output.check(&invocation.program)?;
    log::info!("Built {}", config.exe_path().display());
    Ok(())
}
