use std::path::PathBuf;
use clap::Parser;

/// Re-render video files as colored ASCII edge sketches.
///
/// Each input produces one output next to it, named by dropping the source
/// extension and appending the output suffix (`clip.mov` -> `clip_out.mp4`).
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Video file(s) to convert, processed in order
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
}

impl Cli {
    /// Validate command line arguments
    pub fn validate(&self) -> Result<(), String> {
        for input in &self.inputs {
            if !input.exists() {
                return Err(format!("Video file does not exist: {}", input.display()));
            }
            if !input.is_file() {
                return Err(format!("Not a regular file: {}", input.display()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_rejected() {
        let cli = Cli {
            inputs: vec![PathBuf::from("definitely-not-here.mp4")],
        };
        let err = cli.validate().unwrap_err();
        assert!(err.contains("does not exist"));
    }

    #[test]
    fn test_existing_file_accepted() {
        let cli = Cli {
            inputs: vec![PathBuf::from("Cargo.toml")],
        };
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_directory_rejected() {
        let cli = Cli {
            inputs: vec![PathBuf::from("src")],
        };
        let err = cli.validate().unwrap_err();
        assert!(err.contains("Not a regular file"));
    }
}
