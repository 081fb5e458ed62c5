use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Chat with hosted or local AI models", long_about = None)]
pub struct Args {
    /// Message to send. Piped stdin is added as context.
    pub query: Option<String>,

    /// Start an interactive conversation
    #[arg(short, long)]
    pub chat: bool,

    /// Provider to use (openai, anthropic, groq, openrouter, gemini, local, auto)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Model to use (provider-specific)
    #[arg(short, long)]
    pub model: Option<String>,

    /// System prompt; changing it starts a new conversation
    #[arg(short, long)]
    pub system: Option<String>,

    #[arg(short, long)]
    pub temperature: Option<f32>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Start a new conversation for every message
    #[arg(long)]
    pub isolated: bool,

    /// Show which providers were registered and exit
    #[arg(long)]
    pub providers: bool,

    /// Generate an image from this prompt
    #[arg(long, value_name = "PROMPT")]
    pub image: Option<String>,

    /// Directory for generated images
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out: PathBuf,

    /// Base URL of a local OpenAI-compatible server
    #[arg(long, value_name = "URL")]
    pub local_url: Option<String>,

    /// Settings file (defaults to ~/.techne/ai.yaml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log request details
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_one_shot_flags() {
        let args = Args::try_parse_from([
            "techne",
            "explain stoicism",
            "--provider",
            "local",
            "--temperature",
            "0.2",
            "--max-tokens",
            "300",
            "--isolated",
        ])
        .unwrap();
        assert_eq!(args.query.as_deref(), Some("explain stoicism"));
        assert_eq!(args.provider.as_deref(), Some("local"));
        assert_eq!(args.temperature, Some(0.2));
        assert_eq!(args.max_tokens, Some(300));
        assert!(args.isolated);
        assert!(!args.chat);
    }

    #[test]
    fn test_image_mode_defaults_output_dir() {
        let args = Args::try_parse_from(["techne", "--image", "a lighthouse"]).unwrap();
        assert_eq!(args.image.as_deref(), Some("a lighthouse"));
        assert_eq!(args.out, PathBuf::from("."));
    }
}
