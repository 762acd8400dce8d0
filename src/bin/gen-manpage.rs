//! Man page generator for glhub
//!
//! Writes `glhub.1` plus one `glhub-<command>.1` page per subcommand.
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::CommandFactory;
use std::fs;
use std::path::{Path, PathBuf};

#[path = "../cli.rs"]
#[allow(dead_code)]
mod cli;

/// Subcommands as standalone commands named `glhub-<name>`
fn subcommand_pages(cmd: &clap::Command) -> Vec<clap::Command> {
    cmd.get_subcommands()
        .map(|sub| sub.clone().name(format!("glhub-{}", sub.get_name())))
        .collect()
}

fn render_to_vec(cmd: clap::Command) -> std::io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    clap_mangen::Man::new(cmd).render(&mut buffer)?;
    Ok(buffer)
}

fn render(cmd: clap::Command, path: &Path) -> std::io::Result<()> {
    fs::write(path, render_to_vec(cmd)?)?;
    println!("  {}", path.display());
    Ok(())
}

fn main() -> std::io::Result<()> {
    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));

    fs::create_dir_all(&output_dir)?;

    let cmd = cli::Cli::command();
    println!("Generated man pages:");
    for sub in subcommand_pages(&cmd) {
        let page = output_dir.join(format!("{}.1", sub.get_name()));
        render(sub, &page)?;
    }
    render(cmd, &output_dir.join("glhub.1"))?;

    println!("\nTo view the main page:");
    println!("  man -l {}", output_dir.join("glhub.1").display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subcommand_pages() {
        let cmd = cli::Cli::command();
        let pages = subcommand_pages(&cmd);
        assert!(pages.iter().any(|p| p.get_name() == "glhub-program"));
        assert!(pages.iter().any(|p| p.get_name() == "glhub-i2c-write"));

        let program = pages
            .into_iter()
            .find(|p| p.get_name() == "glhub-program")
            .unwrap();
        let page = String::from_utf8(render_to_vec(program).unwrap()).unwrap();
        assert!(page.contains("Reprogram the hub firmware"));
    }
}
