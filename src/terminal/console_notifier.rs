use console::{style, StyledObject};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::notify::{Indicator, Notifier, ProgressGuard};
use crate::session::{error_chain, WorkflowError};

const SPINNER_TICK: Duration = Duration::from_millis(100);

/// Shows alerts and progress on the terminal
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn alert(&self, message: &str, indicator: Indicator) {
        println!("{}", style_alert(message, indicator));
    }

    fn error(&self, error: &WorkflowError) {
        let message = error_chain(error);
        eprintln!("{}", style_alert(&message, Indicator::Red));
    }

    fn progress(&self, message: &str) -> ProgressGuard {
        let spinner = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(spinner_style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(SPINNER_TICK);
        ProgressGuard::new(move || spinner.finish_and_clear())
    }
}

fn style_alert(message: &str, indicator: Indicator) -> StyledObject<&str> {
    let styled = style(message).bold();
    match indicator {
        Indicator::Green => styled.green(),
        Indicator::Orange => styled.yellow(),
        Indicator::Red => styled.red(),
    }
}
