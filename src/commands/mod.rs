pub mod dispatcher;
pub mod handler;
pub mod registry;

use std::path::PathBuf;
use techne_ai::{GenerationOptions, Orchestrator};

pub use dispatcher::create_command_registry;

/// Everything a slash command may read or change during an interactive session.
pub struct ChatState {
    pub orchestrator: Orchestrator,
    pub options: GenerationOptions,
    pub out_dir: PathBuf,
    pub should_continue: bool,
}

impl ChatState {
    pub fn new(orchestrator: Orchestrator, options: GenerationOptions, out_dir: PathBuf) -> Self {
        Self {
            orchestrator,
            options,
            out_dir,
            should_continue: true,
        }
    }
}
