use crate::browser::config::LaunchConfig;
use std::process::Command;

/// Build the Chrome launch command for a task run: profile binding, fixed
/// window size, the allocated remote-debugging port, and hygiene flags.
/// Non-headless; the user is expected to watch the agent work.
pub fn build_command(config: &LaunchConfig, cdp_port: u16) -> Command {
    let mut cmd = Command::new(&config.chrome_path);

    for arg in config.browser_args() {
        cmd.arg(arg);
    }

    cmd.arg(format!("--remote-debugging-port={}", cdp_port));

    cmd.arg("--no-first-run");
    cmd.arg("--no-default-browser-check");
    cmd.arg("--disable-background-networking");
    cmd.arg("--disable-sync");

    // Start blank so the first observed page state is ours
    cmd.arg("about:blank");

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Detach into its own process group so Chrome outlives transient
        // signals aimed at us; we still kill it by pid on close.
        unsafe {
            cmd.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }
    }

    cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::config::WindowSize;
    use std::path::PathBuf;

    #[test]
    fn test_build_command_flags() {
        let config = LaunchConfig {
            chrome_path: PathBuf::from("/usr/bin/google-chrome"),
            user_data_dir: PathBuf::from("/tmp/ud"),
            profile_directory: "Default".to_string(),
            window: WindowSize::default(),
            viewport: WindowSize::default(),
        };

        let cmd = build_command(&config, 9355);
        let args: Vec<String> = cmd
            .get_args()
            .map(|s| s.to_string_lossy().to_string())
            .collect();

        assert!(args.contains(&"--user-data-dir=/tmp/ud".to_string()));
        assert!(args.contains(&"--profile-directory=Default".to_string()));
        assert!(args.contains(&"--window-size=1920,1080".to_string()));
        assert!(args.contains(&"--remote-debugging-port=9355".to_string()));
        assert!(args.contains(&"--no-first-run".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("about:blank"));
        // Never headless
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
    }
}
