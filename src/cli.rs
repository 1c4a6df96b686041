use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Chat with LLM profiles that can call weather, news, currency and other tools", long_about = None)]
pub struct Args {
    /// Question to ask; stdin is prepended as context when piped
    pub query: Option<String>,

    /// Start an interactive chat session
    #[arg(short, long)]
    pub chat: bool,

    /// Profile to use (e.g. Gemini-2.0-flash, DeepSeek-Chat-V3)
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Model to use instead of the profile's default
    #[arg(short, long)]
    pub model: Option<String>,

    /// Write the session transcript to this file
    #[arg(long)]
    pub transcript: Option<PathBuf>,

    /// List profiles and exit
    #[arg(long)]
    pub list_profiles: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}
