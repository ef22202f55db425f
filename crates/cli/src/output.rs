//! Terminal rendering: styled text and the animated banner.

use console::{Term, style};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use plexus_engine::{Animation, AnimationHandle, Banner, BannerRenderer};
use tracing::debug;

/// Formats an error line.
pub fn error(message: &str) -> String {
    format!("{} {}", style("✗").red().bold(), message)
}

/// Formats a key-value pair.
pub fn key_value(key: &str, value: &str) -> String {
    format!("{}: {}", style(key).cyan(), value)
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn finished_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Draws the banner on stderr, spinning next to the slogan while the
/// command starts.
///
/// Off a terminal the banner is two plain lines and nothing animates.
pub struct TerminalRenderer {
    animation: Animation,
    term: Term,
}

impl TerminalRenderer {
    pub fn new(animation: Animation) -> Self {
        Self {
            animation,
            term: Term::stderr(),
        }
    }

    /// Writes one banner line. A closed stderr only loses the banner.
    fn write(&self, line: &str) {
        if let Err(e) = self.term.write_line(line) {
            debug!(error = %e, "failed to draw banner");
        }
    }
}

impl BannerRenderer for TerminalRenderer {
    fn render(&self, banner: &Banner) -> AnimationHandle {
        let heading = format!(
            "{} {}",
            style(&banner.title).cyan().bold(),
            style(format!("v{}", banner.version)).dim()
        );
        self.write(&heading);

        if !self.term.is_term() {
            self.write(&banner.slogan);
            return AnimationHandle::noop();
        }

        let spinner = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        spinner.set_style(spinner_style());
        spinner.set_message(style(&banner.slogan).italic().to_string());

        let ticking = spinner.clone();
        let slogan = banner.slogan.clone();
        self.animation.start(
            move |_| ticking.tick(),
            move || {
                spinner.set_style(finished_style());
                spinner.finish_with_message(style(slogan).italic().to_string());
            },
        )
    }
}
