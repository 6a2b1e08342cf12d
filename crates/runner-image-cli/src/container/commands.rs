// Construction of the engine command lines. Pure functions; nothing here runs
// a process.

use runner_image_common::constants::{variables, DEFAULT_ENGINE, DISTRO_VERSION_BUILD_ARG};
use runner_image_common::ImageSpec;
use runner_image_sdk::ProcessCommand;
use std::path::Path;

use crate::identity::RunnerIdentity;

/// Whether `program` is the default engine, by name or by path.
fn is_default_engine(program: &str) -> bool {
    Path::new(program)
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n == DEFAULT_ENGINE)
        .unwrap_or(false)
}

/// `build` for a runner image.
///
/// The default engine goes through `buildx build --load` so that a foreign
/// `--platform` builds on any host and still lands in the local image store.
/// Runs with `context` as its working directory.
pub fn build_command(program: &str, image: &ImageSpec, dockerfile: &Path, context: &Path) -> ProcessCommand {
    let mut command = ProcessCommand::new(program);
    command = if is_default_engine(program) {
        command.args(["buildx", "build", "--load"])
    } else {
        command.arg("build")
    };

    command = command
        .arg("-f")
        .arg(dockerfile.display().to_string())
        .arg("-t")
        .arg(image.tag());

    if let Some(platform) = image.platform() {
        command = command.arg("--platform").arg(platform);
    }

    command
        .arg("--build-arg")
        .arg(format!("{DISTRO_VERSION_BUILD_ARG}={}", image.version))
        .arg(context.display().to_string())
        .current_dir(context)
}

/// `run` for the image under test, named after the generated runner and
/// carrying the registration identity in its environment.
pub fn run_command(program: &str, image: &ImageSpec, identity: &RunnerIdentity) -> ProcessCommand {
    let mut command = ProcessCommand::new(program).args(["run", "-i", "--rm"]);

    if let Some(platform) = image.platform() {
        command = command.arg("--platform").arg(platform);
    }

    command
        .arg("--name")
        .arg(&identity.runner_name)
        .args(env_args(&[
            (variables::ACCESS_TOKEN, identity.access_token()),
            (variables::OWNER, identity.owner.as_str()),
            (variables::REPO, identity.repo.as_str()),
            (variables::RUNNER_NAME, identity.runner_name.as_str()),
        ]))
        .arg(image.tag())
        .interactive(true)
}

/// `stop <name>`.
pub fn stop_command(program: &str, container_name: &str) -> ProcessCommand {
    ProcessCommand::new(program).arg("stop").arg(container_name)
}

/// Plain `build -t <tag> .` inside an example directory.
pub fn example_build_command(program: &str, directory: &Path, tag: &str) -> ProcessCommand {
    ProcessCommand::new(program)
        .args(["build", "-t", tag, "."])
        .current_dir(directory)
}

/// `run --rm -i` for an example image, which reads the `RUNNER_*` variables.
pub fn example_run_command(
    program: &str,
    directory: &Path,
    tag: &str,
    owner: &str,
    repo: &str,
    access_token: &str,
) -> ProcessCommand {
    ProcessCommand::new(program)
        .args(["run", "--rm", "-i"])
        .args(env_args(&[
            (variables::RUNNER_ACCESS_TOKEN, access_token),
            (variables::RUNNER_OWNER, owner),
            (variables::RUNNER_REPO, repo),
            (variables::RUNNER_NAME, tag),
        ]))
        .arg(tag)
        .current_dir(directory)
        .interactive(true)
}

fn env_args(vars: &[(&str, &str)]) -> Vec<String> {
    vars.iter()
        .flat_map(|(key, value)| ["-e".to_string(), format!("{key}={value}")])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use runner_image_common::{Architecture, Distribution, SecretMasker};
    use std::path::PathBuf;

    fn identity() -> RunnerIdentity {
        RunnerIdentity::new("test-0a1b2c3d", "74th", "runner-repo", "ghp_secret")
    }

    #[test]
    fn default_engine_uses_buildx_and_loads() {
        let image = ImageSpec::new(Distribution::Ubuntu, "22.04", None);
        let cmd = build_command("docker", &image, Path::new("/repo/image/ubuntu/Dockerfile"), Path::new("/repo"));
        assert_eq!(cmd.file_name, "docker");
        assert_eq!(
            cmd.arguments,
            vec![
                "buildx",
                "build",
                "--load",
                "-f",
                "/repo/image/ubuntu/Dockerfile",
                "-t",
                "github-actions-self-hosted-runner-ubuntu:22.04",
                "--build-arg",
                "DISTRO_VERSION=22.04",
                "/repo",
            ]
        );
        assert_eq!(cmd.working_directory, Some(PathBuf::from("/repo")));
    }

    #[test]
    fn default_engine_detected_by_path() {
        let image = ImageSpec::new(Distribution::Debian, "latest", None);
        let cmd = build_command("/usr/bin/docker", &image, Path::new("D"), Path::new("/r"));
        assert_eq!(cmd.arguments[..3], ["buildx", "build", "--load"]);
    }

    #[test]
    fn other_engines_use_plain_build() {
        let image = ImageSpec::new(Distribution::Debian, "bookworm", Some(Architecture::Arm64));
        let cmd = build_command("podman", &image, Path::new("/r/image/debian/Dockerfile"), Path::new("/r"));
        assert_eq!(
            cmd.arguments,
            vec![
                "build",
                "-f",
                "/r/image/debian/Dockerfile",
                "-t",
                "github-actions-self-hosted-runner-debian-arm64:bookworm",
                "--platform",
                "linux/arm64",
                "--build-arg",
                "DISTRO_VERSION=bookworm",
                "/r",
            ]
        );
    }

    #[test]
    fn run_command_injects_identity() {
        let image = ImageSpec::new(Distribution::Ubuntu, "latest", Some(Architecture::Amd64));
        let cmd = run_command("docker", &image, &identity());
        assert_eq!(
            cmd.arguments,
            vec![
                "run",
                "-i",
                "--rm",
                "--platform",
                "linux/amd64",
                "--name",
                "test-0a1b2c3d",
                "-e",
                "ACCESS_TOKEN=ghp_secret",
                "-e",
                "OWNER=74th",
                "-e",
                "REPO=runner-repo",
                "-e",
                "RUNNER_NAME=test-0a1b2c3d",
                "github-actions-self-hosted-runner-ubuntu-amd64:latest",
            ]
        );
        assert!(cmd.interactive);
    }

    #[test]
    fn run_command_without_platform() {
        let image = ImageSpec::new(Distribution::Ubuntu, "latest", None);
        let cmd = run_command("podman", &image, &identity());
        assert!(!cmd.arguments.iter().any(|a| a == "--platform"));
        assert_eq!(cmd.arguments.last().map(String::as_str), Some("github-actions-self-hosted-runner-ubuntu:latest"));
    }

    #[test]
    fn masked_run_command_hides_token() {
        let masker = SecretMasker::new();
        masker.add_value("ghp_secret");
        let image = ImageSpec::new(Distribution::Ubuntu, "latest", None);
        let printed = masker.mask_secrets(&run_command("docker", &image, &identity()).command_line());
        assert!(!printed.contains("ghp_secret"));
        assert!(printed.contains("ACCESS_TOKEN=***"));
        assert!(printed.contains("RUNNER_NAME=test-0a1b2c3d"));
    }

    #[test]
    fn stop_targets_container_name() {
        let cmd = stop_command("docker", "test-0a1b2c3d");
        assert_eq!(cmd.command_line(), "docker stop test-0a1b2c3d");
    }

    #[test]
    fn example_commands() {
        let dir = Path::new("/repo/examples/add_scripts");
        let build = example_build_command("docker", dir, "example-add-scripts");
        assert_eq!(build.arguments, vec!["build", "-t", "example-add-scripts", "."]);
        assert_eq!(build.working_directory.as_deref(), Some(dir));

        let run = example_run_command("docker", dir, "example-add-scripts", "74th", "repo", "tok");
        assert_eq!(
            run.arguments,
            vec![
                "run",
                "--rm",
                "-i",
                "-e",
                "RUNNER_ACCESS_TOKEN=tok",
                "-e",
                "RUNNER_OWNER=74th",
                "-e",
                "RUNNER_REPO=repo",
                "-e",
                "RUNNER_NAME=example-add-scripts",
                "example-add-scripts",
            ]
        );
    }
}
