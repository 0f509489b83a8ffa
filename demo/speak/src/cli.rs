use cadence_core::{EngineKind, Setting};
use clap::{Parser, ValueEnum};

/// Speak text with the saved speech settings
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Text to speak; settings are still applied when omitted
    pub text: Vec<String>,

    /// Speech engine (espeak, simulated)
    #[arg(long)]
    pub engine: Option<EngineKind>,

    /// List installed voices and exit
    #[arg(long)]
    pub voices: bool,

    /// Set the language tag, e.g. en-GB
    #[arg(short, long)]
    pub language: Option<String>,

    /// Step the speaking rate
    #[arg(long, value_enum)]
    pub rate: Option<Step>,

    /// Step the pitch multiplier
    #[arg(long, value_enum)]
    pub pitch: Option<Step>,

    /// Step the volume
    #[arg(long, value_enum)]
    pub volume: Option<Step>,

    #[arg(long, conflicts_with = "unmute")]
    pub mute: bool,

    #[arg(long)]
    pub unmute: bool,

    /// Clear saved settings before applying the others
    #[arg(long)]
    pub reset: bool,

    /// On Ctrl-C, finish the current word before stopping
    #[arg(long)]
    pub word_boundary: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Up,
    Down,
}

impl Cli {
    pub fn steps(&self) -> Vec<(Setting, Step)> {
        [
            (Setting::Rate, self.rate),
            (Setting::PitchMultiplier, self.pitch),
            (Setting::Volume, self.volume),
        ]
        .into_iter()
        .filter_map(|(setting, step)| step.map(|s| (setting, s)))
        .collect()
    }

    pub fn joined_text(&self) -> String {
        self.text.join(" ")
    }
}
