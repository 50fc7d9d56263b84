//! Scroll synchronization core for a speech-following teleprompter.
//!
//! A [`session::PrompterSession`] owns one scroll coordinate and arbitrates
//! between manual autoplay, touch drags, voice-activity pacing and
//! transcript alignment. Rendering and the speech engine stay outside; they
//! talk to the session through [`layout::AnchorResolver`] and
//! [`recognition::RecognitionEngine`].

pub mod aligner;
pub mod cancellation;
pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod gesture;
pub mod layout;
pub mod normalizer;
pub mod recognition;
pub mod session;
pub mod tokenizer;
pub mod voice_activity;

pub use error::{PrompterError, Result};
pub use session::{PrompterSession, PrompterSnapshot, SessionCommand, SessionEvent};

use std::fs;
use std::path::Path;
use ts_rs::TS;

fn export_single_type<T: TS + 'static>(out_dir: &Path) -> std::result::Result<(), String> {
    T::export_all_to(out_dir).map_err(|err| err.to_string())
}

/// Write TypeScript definitions of every renderer-facing type to `out_dir`,
/// replacing any previously generated `.ts` files.
pub fn export_ts_bindings(out_dir: &Path) -> std::result::Result<(), String> {
    fs::create_dir_all(out_dir)
        .map_err(|err| format!("Failed to create {}: {err}", out_dir.display()))?;

    for entry in fs::read_dir(out_dir)
        .map_err(|err| format!("Failed to list {}: {err}", out_dir.display()))?
    {
        let entry = entry.map_err(|err| format!("Failed to read entry: {err}"))?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("ts") {
            fs::remove_file(&path)
                .map_err(|err| format!("Failed to remove {}: {err}", path.display()))?;
        }
    }

    export_single_type::<session::PrompterSnapshot>(out_dir)?;
    export_single_type::<session::MicStatus>(out_dir)?;
    export_single_type::<controller::ScrollMode>(out_dir)?;
    export_single_type::<controller::ScrollState>(out_dir)?;
    export_single_type::<config::FollowStrategy>(out_dir)?;
    export_single_type::<tokenizer::ScriptToken>(out_dir)?;
    export_single_type::<tokenizer::TokenAnchor>(out_dir)?;
    Ok(())
}
