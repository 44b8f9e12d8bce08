//! Per-runtime dependency bootstrapping
//!
//! Node.js and Python plugins ship without their dependency trees; after
//! extraction the runtime's package manager is invoked inside the plugin
//! directory. Compiled runtimes ship self-contained binaries and need no
//! bootstrap.

use std::path::Path;
use std::process::Command;

use tracing::info;

use pulumi_core::{Error, Result};

/// Install Node.js dependencies with `npm install --production`.
pub fn install_node_dependencies(dir: &Path) -> Result<()> {
    info!("installing nodejs plugin dependencies in {}", dir.display());

    let output = Command::new(npm_command())
        .arg("install")
        .arg("--production")
        .current_dir(dir)
        .output()?;

    if !output.status.success() {
        return Err(Error::DependencyInstall {
            runtime: "nodejs",
            output: combined_output(&output),
        });
    }
    Ok(())
}

/// Install Python dependencies into a virtual environment named `venv_name`.
///
/// Creates the venv, upgrades the packaging toolchain inside it, then
/// installs `requirements.txt` when present.
pub fn install_python_dependencies(dir: &Path, venv_name: &str) -> Result<()> {
    info!("installing python plugin dependencies in {}", dir.display());

    create_virtual_environment(dir, venv_name)?;

    let venv_bin = dir.join(venv_name).join(if cfg!(windows) { "Scripts" } else { "bin" });
    let pip = venv_bin.join(if cfg!(windows) { "pip.exe" } else { "pip" });

    run_checked(
        Command::new(&pip)
            .args(["install", "--upgrade", "pip", "setuptools", "wheel"])
            .current_dir(dir),
        "python",
    )?;

    if dir.join("requirements.txt").exists() {
        run_checked(
            Command::new(&pip)
                .args(["install", "-r", "requirements.txt"])
                .current_dir(dir),
            "python",
        )?;
    }

    Ok(())
}

fn npm_command() -> &'static str {
    if cfg!(windows) {
        "npm.cmd"
    } else {
        "npm"
    }
}

/// Create the venv with `python3`, falling back to plain `python` on hosts
/// (notably Windows) that only register the unversioned name.
fn create_virtual_environment(dir: &Path, venv_name: &str) -> Result<()> {
    let attempt = Command::new("python3")
        .args(["-m", "venv", venv_name])
        .current_dir(dir)
        .output();

    let output = match attempt {
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Command::new("python")
            .args(["-m", "venv", venv_name])
            .current_dir(dir)
            .output()?,
        other => other?,
    };

    if !output.status.success() {
        return Err(Error::DependencyInstall {
            runtime: "python",
            output: combined_output(&output),
        });
    }
    Ok(())
}

fn run_checked(command: &mut Command, runtime: &'static str) -> Result<()> {
    let output = command.output()?;
    if !output.status.success() {
        return Err(Error::DependencyInstall {
            runtime,
            output: combined_output(&output),
        });
    }
    Ok(())
}

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}
