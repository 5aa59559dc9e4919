use std::process::Command;

use tracing::warn;

use crate::config::ManagerConfig;

/// Runs an external command and echoes its output. Diagnostic only: a
/// command that cannot be spawned is logged and yields empty output, it
/// never fails the caller.
pub fn run_command(program: &str, args: &[&str]) -> (String, String) {
    println!("{} {}", program, args.join(" "));
    match Command::new(program).args(args).output() {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout).to_string();
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            if !stdout.is_empty() {
                println!("{stdout}");
            }
            if !stderr.is_empty() {
                println!("{stderr}");
            }
            (stdout, stderr)
        }
        Err(err) => {
            warn!("failed to run {program}: {err}");
            (String::new(), String::new())
        }
    }
}

/// Dumps node, pod and event state through the cluster CLI, then probes the
/// configured nodes for the application image. Output is only echoed; the
/// single parsed detail is a substring presence check.
pub fn comprehensive_diagnosis(config: &ManagerConfig) {
    println!("\nComprehensive cluster diagnosis");
    println!("{}", "=".repeat(50));

    println!("\nNode status:");
    run_command("kubectl", &["get", "nodes", "-o", "wide"]);

    println!("\nPod status (all namespaces):");
    run_command("kubectl", &["get", "pods", "-o", "wide", "--all-namespaces"]);

    println!("\nApplication pods:");
    let selector = config.label_selector();
    run_command("kubectl", &["describe", "pods", "-l", &selector]);

    println!("\nRecent events:");
    run_command(
        "kubectl",
        &["get", "events", "--sort-by=.metadata.creationTimestamp"],
    );

    println!("\nImage presence on nodes:");
    for node in &config.diagnostic_nodes {
        let (stdout, _) = run_command("docker", &["exec", node, "crictl", "images"]);
        let found = stdout.contains(&config.image_filter);
        println!(
            "  {}: {}",
            node,
            if found { "image found" } else { "image NOT found" }
        );
    }
}
