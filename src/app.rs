use crate::cli::Args;
use crate::commands::{ChatState, dispatcher::CommandDispatcher};
use crate::display;
use crate::input;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use is_terminal::IsTerminal;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use techne_ai::{
    AiError, ChatOutcome, GenerationOptions, ImageData, ImageGeneration, ImageOptions,
    Orchestrator,
};
use tracing::debug;

pub struct Application {
    args: Args,
    state: ChatState,
    command_dispatcher: CommandDispatcher,
}

impl Application {
    pub fn new(args: Args, orchestrator: Orchestrator) -> Self {
        let options = GenerationOptions {
            provider: args.provider.clone(),
            model: args.model.clone(),
            system_message: args.system.clone(),
            temperature: args.temperature,
            max_tokens: args.max_tokens,
            new_conversation: args.isolated,
            verbose: args.verbose,
        };
        let state = ChatState::new(orchestrator, options, args.out.clone());
        Self {
            args,
            state,
            command_dispatcher: crate::commands::create_command_registry(),
        }
    }

    pub async fn run(&mut self) -> Result<(), AiError> {
        if self.args.providers {
            display::display_startup_report(
                self.state.orchestrator.startup_report(),
                &self.state.orchestrator.current_configuration(),
            );
            return Ok(());
        }

        if let Some(prompt) = self.args.image.clone() {
            return generate_and_save(&mut self.state, &prompt).await;
        }

        let context = if !io::stdin().is_terminal() {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| AiError::Input(format!("Failed to read from stdin: {}", e)))?;
            Some(buffer).filter(|b| !b.trim().is_empty())
        } else {
            None
        };

        if self.args.chat {
            self.handle_continuous_chat_mode().await
        } else {
            self.handle_chat_mode(context).await
        }
    }

    async fn handle_chat_mode(&mut self, context: Option<String>) -> Result<(), AiError> {
        let query = match (self.args.query.as_deref(), context) {
            (Some(q), Some(ctx)) => format!("<context>\n{}\n</context>\n\n{}", ctx, q),
            (None, Some(ctx)) => ctx,
            (Some(q), None) => q.to_string(),
            (None, None) => {
                return Err(AiError::Input(
                    "Nothing to send. Pass a message, pipe input, or use --chat".to_string(),
                ));
            }
        };
        self.send(&query).await
    }

    async fn handle_continuous_chat_mode(&mut self) -> Result<(), AiError> {
        let mut editor = input::create_editor(self.command_dispatcher.clone())?;
        display::display_welcome(&self.state.orchestrator.current_configuration());

        if let Some(q) = self.args.query.clone() {
            self.send(&q).await.or_else(report)?;
        }

        while self.state.should_continue {
            let Some(line) = input::read_input(&mut editor)? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(command_line) = line.strip_prefix('/') {
                let mut parts = command_line.split_whitespace();
                let name = parts.next().unwrap_or_default();
                let args: Vec<&str> = parts.collect();
                match self
                    .command_dispatcher
                    .execute(name, &args, &mut self.state)
                    .await
                {
                    Ok(Some(message)) => display::display_info(&message),
                    Ok(None) => {}
                    Err(e) => display::display_error(&e),
                }
                continue;
            }

            self.send(line).await.or_else(report)?;
        }

        input::save_history(&mut editor)?;
        Ok(())
    }

    async fn send(&mut self, message: &str) -> Result<(), AiError> {
        let outcome = self
            .state
            .orchestrator
            .send_message(message, &self.state.options)
            .await?;
        match outcome {
            ChatOutcome::Reply(reply) => {
                display::display_response(&reply);
                // Later turns keep the session's prompt.
                self.state.options.system_message = None;
            }
            ChatOutcome::Unavailable(failure) => display::display_unavailable(&failure),
        }
        Ok(())
    }
}

/// Show a per-message error and keep the conversation going.
fn report(e: AiError) -> Result<(), AiError> {
    display::display_error(&e);
    Ok(())
}

pub async fn generate_and_save(state: &mut ChatState, prompt: &str) -> Result<(), AiError> {
    let options = ImageOptions {
        provider: state.options.provider.clone(),
        model: None,
        size: None,
        count: None,
    };
    let generation = state.orchestrator.generate_image(prompt, &options).await?;
    let saved = save_images(&generation, &state.out_dir)?;
    display::display_images(&generation, &saved);
    Ok(())
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}

/// Writes inline images to `dir`. Images returned as URLs are left for the caller to show.
pub fn save_images(generation: &ImageGeneration, dir: &Path) -> Result<Vec<PathBuf>, AiError> {
    fs::create_dir_all(dir)?;
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let mut saved = Vec::new();

    for (i, image) in generation.images.iter().enumerate() {
        let ImageData::Base64(data) = &image.data else {
            continue;
        };
        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|e| AiError::InvalidResponse {
                provider: generation.provider.clone(),
                detail: format!("image {} is not valid base64: {}", i + 1, e),
            })?;
        let path = dir.join(format!(
            "{}-{}-{}.{}",
            generation.provider,
            stamp,
            i + 1,
            extension_for(&image.mime_type)
        ));
        fs::write(&path, bytes)?;
        debug!(path = %path.display(), "saved generated image");
        saved.push(path);
    }
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use techne_ai::GeneratedImage;

    fn generation(images: Vec<GeneratedImage>) -> ImageGeneration {
        ImageGeneration {
            images,
            provider: "gemini".to_string(),
            model: "m".to_string(),
        }
    }

    #[test]
    fn test_saves_inline_images_and_skips_urls() {
        let dir = tempfile::tempdir().unwrap();
        let generation = generation(vec![
            GeneratedImage {
                mime_type: "image/png".to_string(),
                data: ImageData::Base64(STANDARD.encode(b"png-bytes")),
            },
            GeneratedImage {
                mime_type: "image/png".to_string(),
                data: ImageData::Url("https://example.com/a.png".to_string()),
            },
            GeneratedImage {
                mime_type: "image/jpeg".to_string(),
                data: ImageData::Base64(STANDARD.encode(b"jpeg-bytes")),
            },
        ]);

        let saved = save_images(&generation, dir.path()).unwrap();

        assert_eq!(saved.len(), 2);
        assert_eq!(fs::read(&saved[0]).unwrap(), b"png-bytes");
        assert!(saved[1].extension().is_some_and(|e| e == "jpg"));
    }

    #[test]
    fn test_corrupt_base64_is_invalid_response() {
        let dir = tempfile::tempdir().unwrap();
        let generation = generation(vec![GeneratedImage {
            mime_type: "image/png".to_string(),
            data: ImageData::Base64("***".to_string()),
        }]);
        assert!(matches!(
            save_images(&generation, dir.path()),
            Err(AiError::InvalidResponse { .. })
        ));
    }
}
