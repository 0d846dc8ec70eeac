//! `campusdesk onboard` — First-time setup.
//!
//! Writes `campusdesk.toml` and a `.env` placeholder into the working
//! directory. Existing files are never overwritten.

use std::path::{Path, PathBuf};

use campusdesk_config::{API_KEY_ENV, AppConfig, LOCAL_CONFIG_FILE};

const ENV_FILE: &str = ".env";

/// What happened to each file onboarding manages.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Created(PathBuf),
    Exists(PathBuf),
}

fn env_template() -> String {
    format!("# Backend credential for CampusDesk\n{API_KEY_ENV}=\n")
}

fn write_if_absent(path: PathBuf, contents: &str) -> std::io::Result<Outcome> {
    if path.exists() {
        return Ok(Outcome::Exists(path));
    }
    std::fs::write(&path, contents)?;
    Ok(Outcome::Created(path))
}

fn write_templates(dir: &Path) -> std::io::Result<Vec<Outcome>> {
    Ok(vec![
        write_if_absent(dir.join(LOCAL_CONFIG_FILE), &AppConfig::default_toml())?,
        write_if_absent(dir.join(ENV_FILE), &env_template())?,
    ])
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;

    println!("🎓 CampusDesk — First-Time Setup");
    println!("================================\n");

    for outcome in write_templates(&cwd)? {
        match outcome {
            Outcome::Created(path) => println!("✅ Created {}", path.display()),
            Outcome::Exists(path) => println!("  {} already exists, left unchanged", path.display()),
        }
    }

    println!("\n📝 Next steps:");
    println!("   1. Put your key in .env: {API_KEY_ENV}=AIza...");
    println!("   2. Run: campusdesk doctor");
    println!("   3. Run: campusdesk serve\n");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_both_templates() {
        let dir = tempfile::tempdir().unwrap();
        let outcomes = write_templates(dir.path()).unwrap();

        assert!(outcomes.iter().all(|o| matches!(o, Outcome::Created(_))));
        let env = std::fs::read_to_string(dir.path().join(".env")).unwrap();
        assert!(env.contains("GEMINI_API_KEY="));

        let config = AppConfig::load_from(&dir.path().join(LOCAL_CONFIG_FILE)).unwrap();
        assert_eq!(config.gateway.port, 5000);
    }

    #[test]
    fn existing_files_untouched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "GEMINI_API_KEY=keep-me\n").unwrap();

        let outcomes = write_templates(dir.path()).unwrap();
        assert!(matches!(outcomes[0], Outcome::Created(_)));
        assert!(matches!(outcomes[1], Outcome::Exists(_)));

        let env = std::fs::read_to_string(dir.path().join(".env")).unwrap();
        assert_eq!(env, "GEMINI_API_KEY=keep-me\n");
    }
}
