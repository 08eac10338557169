//! Terminal front end: turns input lines into studio intents and renders
//! studio state as text. Holds no state of its own.

use crate::{
    models::{AspectRatio, GenerationSession, ImageModel, ImageSize},
    studio::{IgnoredReason, PendingBatch, Studio, StudioState, Submission, SubmitOutcome},
};
use colored::*;
use std::path::Path;

pub const HELP: &str = "\
Type a prompt and press enter to generate.
  /ratio <square|portrait|landscape|story|cinema>
  /model <flash|pro>
  /size <1K|2K|4K>            size tier (Pro only)
  /batch <n>                  images per prompt
  /edit <image-id>            use an image as the edit source
  /edit clear                 drop the edit source
  /download <image-id>        save an image as nano-banana-<id>.png
  /rerun <session-id> [size]  run a past prompt again
  /history                    show all sessions
  /key                        select an API key
  /dismiss                    hide the error banner
  /help
  /quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Prompt(String),
    Ratio(AspectRatio),
    Model(ImageModel),
    Size(ImageSize),
    Batch(usize),
    Edit(String),
    ClearEdit,
    Download(String),
    Rerun {
        session_id: String,
        size: Option<ImageSize>,
    },
    History,
    SelectKey,
    Dismiss,
    Help,
    Quit,
}

pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if !line.starts_with('/') {
        return Ok(Some(Command::Prompt(line.to_string())));
    }

    let mut words = line[1..].split_whitespace();
    let name = words.next().unwrap_or_default().to_lowercase();
    let arg = words.next();
    let extra = words.next();

    let command = match (name.as_str(), arg) {
        ("ratio", Some(value)) => Command::Ratio(value.parse()?),
        ("model", Some(value)) => Command::Model(value.parse()?),
        ("size", Some(value)) => Command::Size(value.parse()?),
        ("batch", Some(value)) => match value.parse::<usize>() {
            Ok(n) if n > 0 => Command::Batch(n),
            _ => return Err(format!("batch size must be a positive number, got '{}'", value)),
        },
        ("edit", Some("clear")) => Command::ClearEdit,
        ("edit", Some(id)) => Command::Edit(id.to_string()),
        ("download", Some(id)) => Command::Download(id.to_string()),
        ("rerun", Some(id)) => Command::Rerun {
            session_id: id.to_string(),
            size: extra.map(str::parse::<ImageSize>).transpose()?,
        },
        ("history", None) => Command::History,
        ("key", None) => Command::SelectKey,
        ("dismiss", None) => Command::Dismiss,
        ("help", _) => Command::Help,
        ("quit", _) | ("exit", _) => Command::Quit,
        (name, _) => return Err(format!("unknown or incomplete command '/{}' (try /help)", name)),
    };
    Ok(Some(command))
}

/// What the event loop should do after a command was applied.
pub enum Reaction {
    Show(String),
    Dispatched(PendingBatch),
    Quit,
}

pub async fn dispatch(studio: &mut Studio, command: Command, download_dir: &Path) -> Reaction {
    match command {
        Command::Prompt(text) => {
            studio.set_prompt(text);
            submission(studio.begin_submit(None, None), studio.state())
        }
        Command::Rerun { session_id, size } => {
            let prompt = studio
                .state()
                .history()
                .session(&session_id)
                .map(|session| session.prompt.clone());
            match prompt {
                Some(prompt) => submission(studio.begin_submit(Some(&prompt), size), studio.state()),
                None => Reaction::Show(notice(&format!("no session {}", session_id))),
            }
        }
        Command::Ratio(ratio) => {
            studio.set_aspect_ratio(ratio);
            Reaction::Show(render_sidebar(studio.state()))
        }
        Command::Model(model) => {
            studio.set_model(model);
            Reaction::Show(render_sidebar(studio.state()))
        }
        Command::Size(size) => {
            studio.set_image_size(size);
            Reaction::Show(render_sidebar(studio.state()))
        }
        Command::Batch(n) => {
            studio.set_batch_size(n);
            Reaction::Show(render_sidebar(studio.state()))
        }
        Command::Edit(image_id) => match studio.select_edit_source(&image_id) {
            Ok(()) => Reaction::Show(render_status(studio.state())),
            Err(e) => Reaction::Show(notice(&e.to_string())),
        },
        Command::ClearEdit => {
            studio.clear_edit_source();
            Reaction::Show(render_status(studio.state()))
        }
        Command::Download(image_id) => match studio.download_image(&image_id, download_dir).await {
            Ok(path) => Reaction::Show(format!("Saved {}", path.display())),
            Err(e) => Reaction::Show(notice(&e.to_string())),
        },
        Command::History => Reaction::Show(render_feed(studio.state())),
        Command::SelectKey => {
            let _ = studio.reselect_credential().await;
            Reaction::Show(render_status(studio.state()))
        }
        Command::Dismiss => {
            studio.dismiss_error();
            Reaction::Show(render_status(studio.state()))
        }
        Command::Help => Reaction::Show(HELP.to_string()),
        Command::Quit => Reaction::Quit,
    }
}

fn submission(submission: Submission, state: &StudioState) -> Reaction {
    match submission {
        Submission::Dispatched(batch) => Reaction::Dispatched(batch),
        Submission::Settled(outcome) => Reaction::Show(render_outcome(&outcome, state)),
    }
}

fn notice(message: &str) -> String {
    format!("{} {}", "!".yellow().bold(), message)
}

pub fn render_outcome(outcome: &SubmitOutcome, state: &StudioState) -> String {
    match outcome {
        SubmitOutcome::Ignored(IgnoredReason::BlankPrompt) => String::new(),
        SubmitOutcome::Ignored(IgnoredReason::Busy) => {
            notice("still generating, prompt ignored")
        }
        SubmitOutcome::Completed { session_id, .. } => match state.history().session(session_id) {
            Some(session) => render_session(session),
            None => render_status(state),
        },
        SubmitOutcome::Rejected(_) | SubmitOutcome::Failed(_) | SubmitOutcome::Reauthenticated => {
            render_status(state)
        }
    }
}

pub fn render_sidebar(state: &StudioState) -> String {
    let settings = state.settings();
    let mut out = String::new();

    out.push_str(&format!("{}\n", "ASPECT RATIO".bright_black().bold()));
    for ratio in AspectRatio::ALL {
        let label = format!("{:<10} {}", ratio.name(), ratio.token());
        if ratio == settings.aspect_ratio {
            out.push_str(&format!("  {} {}\n", "●".purple(), label.purple().bold()));
        } else {
            out.push_str(&format!("  ○ {}\n", label));
        }
    }

    out.push_str(&format!("{}\n", "MODEL".bright_black().bold()));
    for model in ImageModel::ALL {
        let marker = if model == settings.model { "●" } else { "○" };
        out.push_str(&format!("  {} {}\n", marker, model.label()));
    }
    if settings.model.is_premium() {
        out.push_str(&format!("  size  {}\n", settings.image_size));
    }
    out.push_str(&format!("  batch {}", settings.batch_size));
    out
}

pub fn render_session(session: &GenerationSession) -> String {
    let mut out = format!(
        "{} {}\n",
        format!("[{}]", session.id).bright_black(),
        format!("Prompt: {}", session.prompt).bold()
    );
    let mut detail = format!("{} · {}", session.settings.model.label(), session.settings.aspect_ratio);
    if let Some(size) = session.settings.size {
        detail.push_str(&format!(" · {}", size));
    }
    out.push_str(&format!("  {}\n", detail.bright_black()));
    for image in &session.images {
        out.push_str(&format!("  {} {}\n", "▣".purple(), image.id));
    }
    out.trim_end().to_string()
}

pub fn render_feed(state: &StudioState) -> String {
    let history = state.history();
    if history.is_empty() && !state.is_busy() {
        return format!(
            "{}\n{}",
            "No generations yet".bold(),
            "Start your creative journey by entering a prompt below.".bright_black()
        );
    }

    let mut blocks: Vec<String> = Vec::new();
    if state.is_busy() {
        blocks.push(busy_line());
    }
    blocks.extend(history.sessions().iter().map(render_session));
    blocks.join("\n\n")
}

pub fn render_status(state: &StudioState) -> String {
    let mut lines = Vec::new();
    if let Some(error) = state.error() {
        lines.push(format!("{} {}", "✖".red().bold(), error.red()));
    }
    if state.is_busy() {
        lines.push(busy_line());
    }
    if let Some(source) = state.edit_source() {
        lines.push(format!("{} editing from image {}", "✎".cyan(), source.id));
    }
    if lines.is_empty() {
        lines.push("ready".bright_black().to_string());
    }
    lines.join("\n")
}

fn busy_line() -> String {
    format!("{}", "⟳ Synthesizing Neural Lattice".bright_black())
}
